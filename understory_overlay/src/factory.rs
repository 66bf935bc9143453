// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element construction by type name, and automatic element naming.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::element::ElementKind;
use crate::elements::{Panel, TextArea};
use crate::error::OverlayError;

/// Creates fresh element kinds of one type.
pub trait ElementFactory {
    /// Build a new kind in its default state.
    fn create(&self) -> Box<dyn ElementKind>;
}

impl<F> ElementFactory for F
where
    F: Fn() -> Box<dyn ElementKind>,
{
    fn create(&self) -> Box<dyn ElementKind> {
        self()
    }
}

/// Registry mapping type names to [`ElementFactory`]s.
///
/// Used for scripted construction and for cloning, which must create an element of the same
/// type as the original from nothing but its type name.
#[derive(Default)]
pub struct ElementFactories {
    factories: HashMap<String, Box<dyn ElementFactory>>,
}

impl core::fmt::Debug for ElementFactories {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ElementFactories")
            .field("types", &self.type_names())
            .finish()
    }
}

impl ElementFactories {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `Panel` and `TextArea` kinds.
    pub fn with_defaults() -> Self {
        let mut factories = Self::new();
        factories.register(Panel::TYPE_NAME, || {
            Box::new(Panel::new()) as Box<dyn ElementKind>
        });
        factories.register(TextArea::TYPE_NAME, || {
            Box::new(TextArea::new()) as Box<dyn ElementKind>
        });
        factories
    }

    /// Register `factory` under `type_name`, replacing any previous one.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        factory: impl ElementFactory + 'static,
    ) {
        let type_name = type_name.into();
        if self
            .factories
            .insert(type_name.clone(), Box::new(factory))
            .is_some()
        {
            tracing::debug!(type_name = type_name.as_str(), "element factory replaced");
        }
    }

    /// Returns true if a factory is registered for `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create a new kind of type `type_name`.
    pub fn create(&self, type_name: &str) -> Result<Box<dyn ElementKind>, OverlayError> {
        self.factories
            .get(type_name)
            .map(|factory| factory.create())
            .ok_or_else(|| OverlayError::UnknownElementType(type_name.to_string()))
    }
}

/// Source of names for elements created without one.
///
/// Owned by the registry, so separate registries never share a counter.
#[derive(Clone, Debug, Default)]
pub struct NameSequence {
    next: u64,
}

impl NameSequence {
    /// A sequence starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next name, `unnamed_<n>`.
    pub fn next_name(&mut self) -> String {
        let name = format!("unnamed_{}", self.next);
        self.next += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_create_builtin_kinds() {
        let factories = ElementFactories::with_defaults();
        assert_eq!(factories.type_names(), ["Panel", "TextArea"]);
        let panel = factories.create("Panel").unwrap();
        assert!(panel.is_container());
        assert_eq!(panel.type_name(), "Panel");
        let text = factories.create("TextArea").unwrap();
        assert!(!text.is_container());
    }

    #[test]
    fn unknown_type_is_an_error() {
        let factories = ElementFactories::new();
        assert!(!factories.contains("Panel"));
        assert_eq!(
            factories.create("Panel").err(),
            Some(OverlayError::UnknownElementType("Panel".into()))
        );
    }

    #[test]
    fn custom_factory_replaces_builtin() {
        let mut factories = ElementFactories::with_defaults();
        factories.register("Panel", || {
            let mut panel = Panel::new();
            panel.set_transparent(true);
            Box::new(panel) as Box<dyn ElementKind>
        });
        let kind = factories.create("Panel").unwrap();
        assert!(kind.downcast_ref::<Panel>().unwrap().is_transparent());
    }

    #[test]
    fn names_are_sequential_per_sequence() {
        let mut a = NameSequence::new();
        let mut b = NameSequence::new();
        assert_eq!(a.next_name(), "unnamed_0");
        assert_eq!(a.next_name(), "unnamed_1");
        assert_eq!(b.next_name(), "unnamed_0", "sequences are independent");
    }
}
