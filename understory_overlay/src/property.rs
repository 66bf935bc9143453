// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! String-keyed property tables.
//!
//! Every settable property of an element is reachable by name with a string value. The same
//! tables drive scripted construction, [`OverlayManager::set_param`](crate::OverlayManager::set_param),
//! and the property copy performed by cloning and template instantiation.
//!
//! Properties shared by all elements live in one table owned by this module. Element kinds add
//! their own by implementing [`Properties`], which gives them [`PropertyAccess`] for free.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::PropertyError;
use crate::render::MaterialLibrary;
use crate::tree::ElementTree;
use crate::types::{ElementId, HorizontalAlignment, MetricsMode, VerticalAlignment};

/// Get/set pair for one named property of `T`.
pub struct PropertyCommand<T> {
    /// Property name, as used in scripts.
    pub name: &'static str,
    /// Human readable description.
    pub description: &'static str,
    /// Read the current value as a string.
    pub get: fn(&T) -> String,
    /// Parse and apply a value.
    pub set: fn(&mut T, &str) -> Result<(), PropertyError>,
}

impl<T> core::fmt::Debug for PropertyCommand<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyCommand")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A type with a static property table.
pub trait Properties: Sized + 'static {
    /// The table, in the order properties are copied.
    const PROPERTIES: &'static [PropertyCommand<Self>];
}

/// Object-safe access to a property table.
pub trait PropertyAccess {
    /// Current value of `name`, or `None` if there is no such property.
    fn property(&self, name: &str) -> Option<String>;
    /// Parse and apply `value` to `name`.
    fn set_property(&mut self, name: &str, value: &str) -> Result<(), PropertyError>;
    /// Names of all properties, in table order.
    fn property_names(&self) -> Vec<&'static str>;
}

impl<T: Properties> PropertyAccess for T {
    fn property(&self, name: &str) -> Option<String> {
        T::PROPERTIES
            .iter()
            .find(|c| c.name == name)
            .map(|c| (c.get)(self))
    }

    fn set_property(&mut self, name: &str, value: &str) -> Result<(), PropertyError> {
        let command = T::PROPERTIES
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| PropertyError::Unknown(name.to_string()))?;
        (command.set)(self, value)
    }

    fn property_names(&self) -> Vec<&'static str> {
        T::PROPERTIES.iter().map(|c| c.name).collect()
    }
}

/// Parse a float property value.
pub fn parse_f64(name: &'static str, value: &str) -> Result<f64, PropertyError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| invalid(name, value))
}

/// Parse a boolean property value (`true`/`yes`/`1` or `false`/`no`/`0`).
pub fn parse_bool(name: &'static str, value: &str) -> Result<bool, PropertyError> {
    match value.trim() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

/// Parse exactly `N` whitespace separated floats.
pub fn parse_floats<const N: usize>(
    name: &'static str,
    value: &str,
) -> Result<[f64; N], PropertyError> {
    let mut out = [0.0; N];
    let mut parts = value.split_whitespace();
    for slot in &mut out {
        let part = parts.next().ok_or_else(|| invalid(name, value))?;
        *slot = parse_f64(name, part).map_err(|_| invalid(name, value))?;
    }
    if parts.next().is_some() {
        return Err(invalid(name, value));
    }
    Ok(out)
}

/// Format a float the way [`parse_f64`] reads it back.
pub fn format_f64(value: f64) -> String {
    format!("{value}")
}

pub(crate) fn invalid(name: &'static str, value: &str) -> PropertyError {
    PropertyError::InvalidValue {
        name,
        value: value.to_string(),
    }
}

/// A property shared by every element. It needs tree access because geometry setters
/// invalidate descendants, and the material library because materials resolve on set.
struct ElementCommand {
    name: &'static str,
    get: fn(&ElementTree, ElementId) -> String,
    set: fn(
        &mut ElementTree,
        ElementId,
        &str,
        &dyn MaterialLibrary,
    ) -> Result<(), PropertyError>,
}

// `metrics_mode` comes first so that copied coordinates are read in the right units.
static ELEMENT_PROPERTIES: &[ElementCommand] = &[
    ElementCommand {
        name: "metrics_mode",
        get: |t, id| t.metrics_mode(id).name().to_string(),
        set: |t, id, v, _| {
            let mode = MetricsMode::from_name(v).ok_or_else(|| invalid("metrics_mode", v))?;
            t.set_metrics_mode(id, mode);
            Ok(())
        },
    },
    ElementCommand {
        name: "horz_align",
        get: |t, id| t.horizontal_alignment(id).name().to_string(),
        set: |t, id, v, _| {
            let align =
                HorizontalAlignment::from_name(v).ok_or_else(|| invalid("horz_align", v))?;
            t.set_horizontal_alignment(id, align);
            Ok(())
        },
    },
    ElementCommand {
        name: "vert_align",
        get: |t, id| t.vertical_alignment(id).name().to_string(),
        set: |t, id, v, _| {
            let align = VerticalAlignment::from_name(v).ok_or_else(|| invalid("vert_align", v))?;
            t.set_vertical_alignment(id, align);
            Ok(())
        },
    },
    ElementCommand {
        name: "left",
        get: |t, id| format_f64(t.placement(id).left),
        set: |t, id, v, _| {
            t.set_left(id, parse_f64("left", v)?);
            Ok(())
        },
    },
    ElementCommand {
        name: "top",
        get: |t, id| format_f64(t.placement(id).top),
        set: |t, id, v, _| {
            t.set_top(id, parse_f64("top", v)?);
            Ok(())
        },
    },
    ElementCommand {
        name: "width",
        get: |t, id| format_f64(t.placement(id).width),
        set: |t, id, v, _| {
            t.set_width(id, parse_f64("width", v)?);
            Ok(())
        },
    },
    ElementCommand {
        name: "height",
        get: |t, id| format_f64(t.placement(id).height),
        set: |t, id, v, _| {
            t.set_height(id, parse_f64("height", v)?);
            Ok(())
        },
    },
    ElementCommand {
        name: "visible",
        get: |t, id| t.is_visible(id).to_string(),
        set: |t, id, v, _| {
            t.set_visible(id, parse_bool("visible", v)?);
            Ok(())
        },
    },
    ElementCommand {
        name: "caption",
        get: |t, id| t.caption(id).to_string(),
        set: |t, id, v, _| {
            t.set_caption(id, v);
            Ok(())
        },
    },
    ElementCommand {
        name: "material",
        get: |t, id| {
            t.material(id)
                .map(|m| m.name.clone())
                .unwrap_or_default()
        },
        set: |t, id, v, materials| {
            let name = v.trim();
            if name.is_empty() {
                t.set_material(id, None);
                return Ok(());
            }
            let material = materials
                .material(name)
                .ok_or_else(|| PropertyError::MaterialNotFound(name.to_string()))?;
            t.set_material(id, Some(material));
            Ok(())
        },
    },
];

impl ElementTree {
    /// Set a property by name: shared element properties first, then the element kind's own.
    ///
    /// On error the element keeps every previously applied value.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn set_param(
        &mut self,
        id: ElementId,
        name: &str,
        value: &str,
        materials: &dyn MaterialLibrary,
    ) -> Result<(), PropertyError> {
        if let Some(command) = ELEMENT_PROPERTIES.iter().find(|c| c.name == name) {
            return (command.set)(self, id, value, materials);
        }
        self.node_mut(id).kind.set_property(name, value)?;
        self.invalidate_geometry(id);
        Ok(())
    }

    /// Current value of a property by name, or `None` if the element has no such property.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn param(&self, id: ElementId, name: &str) -> Option<String> {
        match ELEMENT_PROPERTIES.iter().find(|c| c.name == name) {
            Some(command) => Some((command.get)(self, id)),
            None => self.node(id).kind.property(name),
        }
    }

    /// All property names of an element, shared ones first, in copy order.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn param_names(&self, id: ElementId) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = ELEMENT_PROPERTIES.iter().map(|c| c.name).collect();
        names.extend(self.node(id).kind.property_names());
        names
    }

    /// Copy every property of `from` onto `to` through the property tables.
    ///
    /// Properties `to` does not understand are skipped, which lets templates of one type seed
    /// instances of another.
    pub fn copy_params(
        &mut self,
        from: ElementId,
        to: ElementId,
        materials: &dyn MaterialLibrary,
    ) -> Result<(), PropertyError> {
        for name in self.param_names(from) {
            let Some(value) = self.param(from, name) else {
                continue;
            };
            match self.set_param(to, name, &value, materials) {
                Ok(()) | Err(PropertyError::Unknown(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Knob {
        turns: f64,
        locked: bool,
    }

    impl Properties for Knob {
        const PROPERTIES: &'static [PropertyCommand<Self>] = &[
            PropertyCommand {
                name: "turns",
                description: "How far the knob is turned.",
                get: |k| format_f64(k.turns),
                set: |k, v| {
                    k.turns = parse_f64("turns", v)?;
                    Ok(())
                },
            },
            PropertyCommand {
                name: "locked",
                description: "Whether the knob is locked.",
                get: |k| k.locked.to_string(),
                set: |k, v| {
                    k.locked = parse_bool("locked", v)?;
                    Ok(())
                },
            },
        ];
    }

    #[test]
    fn table_get_and_set() {
        let mut knob = Knob::default();
        knob.set_property("turns", "2.5").unwrap();
        knob.set_property("locked", "yes").unwrap();
        assert_eq!(knob.property("turns").as_deref(), Some("2.5"));
        assert_eq!(knob.property("locked").as_deref(), Some("true"));
        assert_eq!(knob.property_names(), ["turns", "locked"]);
    }

    #[test]
    fn unknown_and_invalid_are_reported() {
        let mut knob = Knob::default();
        assert_eq!(
            knob.set_property("colour", "red"),
            Err(PropertyError::Unknown("colour".into()))
        );
        assert!(matches!(
            knob.set_property("turns", "lots"),
            Err(PropertyError::InvalidValue { name: "turns", .. })
        ));
        assert_eq!(knob.turns, 0.0, "failed set must not change state");
        assert_eq!(knob.property("colour"), None);
    }

    #[test]
    fn parse_float_lists() {
        assert_eq!(parse_floats::<3>("tiling", "0 2 4"), Ok([0.0, 2.0, 4.0]));
        assert!(parse_floats::<3>("tiling", "0 2").is_err());
        assert!(parse_floats::<3>("tiling", "0 2 4 8").is_err());
        assert!(parse_floats::<2>("uv", "a b").is_err());
    }
}
