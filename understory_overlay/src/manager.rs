// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The overlay registry: owner of overlays, elements, templates, and factories.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::arena::Arena;
use crate::error::OverlayError;
use crate::factory::{ElementFactories, NameSequence};
use crate::overlay::{Overlay, OverlayMut};
use crate::render::{MaterialLibrary, MaterialSet, RenderQueue};
use crate::tree::ElementTree;
use crate::types::{ElementId, OverlayId, Viewport};

/// Owns every overlay and element, and drives the per-frame pass.
///
/// Elements are created through the registered [`ElementFactories`], live in one
/// [`ElementTree`], and become visible once a root container holding them is added to a shown
/// overlay. Each frame the host calls [`OverlayManager::queue_for_rendering`] with the current
/// viewport.
///
/// ## Example
///
/// ```rust
/// use understory_overlay::{MaterialSet, OverlayManager, RenderList, Viewport};
///
/// let mut manager = OverlayManager::new(MaterialSet::new());
/// let hud = manager.create("hud").unwrap();
/// let root = manager.create_element("Panel", Some("root")).unwrap();
/// let label = manager.create_element("TextArea", Some("label")).unwrap();
/// manager.set_param(label, "caption", "Hello").unwrap();
/// manager.tree_mut().add_child(root, label);
///
/// let mut hud = manager.overlay_mut(hud).unwrap();
/// hud.add_element(root).unwrap();
/// hud.show();
///
/// let mut queue = RenderList::new();
/// manager.queue_for_rendering(&mut queue, Viewport::new(800, 600));
/// assert!(queue.entries.iter().any(|e| e.name == "label"));
/// ```
pub struct OverlayManager {
    tree: ElementTree,
    overlays: Arena<OverlayId, Overlay>,
    overlay_lookup: HashMap<String, OverlayId>,
    factories: ElementFactories,
    templates: HashMap<String, ElementId>,
    names: NameSequence,
    materials: Box<dyn MaterialLibrary>,
    viewport: Viewport,
    viewport_changed: bool,
}

impl core::fmt::Debug for OverlayManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OverlayManager")
            .field("tree", &self.tree)
            .field("overlays", &self.overlays.len())
            .field("factories", &self.factories)
            .field("templates", &self.templates)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl Default for OverlayManager {
    fn default() -> Self {
        Self::new(MaterialSet::new())
    }
}

impl OverlayManager {
    /// Create a registry resolving materials through `materials`, with the built-in element
    /// kinds registered.
    pub fn new(materials: impl MaterialLibrary + 'static) -> Self {
        Self {
            tree: ElementTree::new(),
            overlays: Arena::default(),
            overlay_lookup: HashMap::new(),
            factories: ElementFactories::with_defaults(),
            templates: HashMap::new(),
            names: NameSequence::new(),
            materials: Box::new(materials),
            viewport: Viewport::default(),
            viewport_changed: false,
        }
    }

    /// The element tree.
    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    /// The element tree, mutably.
    pub fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    /// Element factories; register custom kinds here.
    pub fn factories_mut(&mut self) -> &mut ElementFactories {
        &mut self.factories
    }

    /// The material library used when the `material` property is set.
    pub fn materials(&self) -> &dyn MaterialLibrary {
        &*self.materials
    }

    /// Replace the material library. Elements keep the materials they already resolved.
    pub fn set_materials(&mut self, materials: impl MaterialLibrary + 'static) {
        self.materials = Box::new(materials);
    }

    /// Viewport of the last frame.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Returns true if the last frame's viewport size differed from the one before.
    pub fn has_viewport_changed(&self) -> bool {
        self.viewport_changed
    }

    // --- overlays ---

    /// Create an empty, hidden overlay.
    pub fn create(&mut self, name: &str) -> Result<OverlayId, OverlayError> {
        if self.overlay_lookup.contains_key(name) {
            return Err(OverlayError::DuplicateOverlay(name.to_string()));
        }
        let id = self.overlays.insert(Overlay::new(name.to_string()));
        self.overlay_lookup.insert(name.to_string(), id);
        tracing::debug!(overlay = name, "overlay created");
        Ok(id)
    }

    /// Look an overlay up by name.
    pub fn by_name(&self, name: &str) -> Option<OverlayId> {
        self.overlay_lookup.get(name).copied()
    }

    /// Read access to an overlay.
    pub fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(id)
    }

    /// Mutable access to an overlay together with the element tree.
    pub fn overlay_mut(&mut self, id: OverlayId) -> Option<OverlayMut<'_>> {
        let overlay = self.overlays.get_mut(id)?;
        Some(OverlayMut {
            id,
            overlay,
            tree: &mut self.tree,
            viewport: self.viewport,
        })
    }

    /// Mutable access to the overlay called `name`.
    pub fn by_name_mut(&mut self, name: &str) -> Result<OverlayMut<'_>, OverlayError> {
        let id = self
            .by_name(name)
            .ok_or_else(|| OverlayError::UnknownOverlay(name.to_string()))?;
        self.overlay_mut(id)
            .ok_or_else(|| OverlayError::UnknownOverlay(name.to_string()))
    }

    /// Live overlays in creation order (slots are reused after destruction).
    pub fn overlays(&self) -> impl Iterator<Item = (OverlayId, &Overlay)> + '_ {
        self.overlays.iter()
    }

    /// Destroy the overlay called `name` and every element under its root containers.
    ///
    /// Unknown names are logged and ignored.
    pub fn destroy(&mut self, name: &str) {
        match self.by_name(name) {
            Some(id) => self.destroy_overlay(id),
            None => tracing::warn!(overlay = name, "destroy of unknown overlay ignored"),
        }
    }

    /// Destroy an overlay and every element under its root containers.
    ///
    /// Stale handles are logged and ignored.
    pub fn destroy_overlay(&mut self, id: OverlayId) {
        let Some(overlay) = self.overlays.remove(id) else {
            tracing::warn!(?id, "destroy of stale overlay ignored");
            return;
        };
        self.overlay_lookup.remove(overlay.name());
        for &root in overlay.roots() {
            self.tree.destroy(root);
        }
        tracing::debug!(overlay = overlay.name(), "overlay destroyed");
    }

    /// Destroy every overlay.
    pub fn destroy_all(&mut self) {
        let ids: Vec<OverlayId> = self.overlays.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.destroy_overlay(id);
        }
    }

    // --- elements ---

    /// Create an unattached element of `type_name`, named `name` or automatically.
    pub fn create_element(
        &mut self,
        type_name: &str,
        name: Option<&str>,
    ) -> Result<ElementId, OverlayError> {
        let kind = self.factories.create(type_name)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => self.names.next_name(),
        };
        Ok(self.tree.insert(name, kind))
    }

    /// Create an element and register it as the template `name`.
    pub fn create_template(
        &mut self,
        type_name: &str,
        name: &str,
    ) -> Result<ElementId, OverlayError> {
        if self.templates.contains_key(name) {
            return Err(OverlayError::DuplicateTemplate(name.to_string()));
        }
        let id = self.create_element(type_name, Some(name))?;
        self.templates.insert(name.to_string(), id);
        Ok(id)
    }

    /// The template called `name`, if any.
    pub fn template(&self, name: &str) -> Option<ElementId> {
        self.templates.get(name).copied()
    }

    /// Create `instance_name` from the template `template_name`.
    ///
    /// The new element has the template's type unless `type_name` overrides it; properties
    /// are copied and cloneable template children are instantiated as
    /// `<instance_name>/<child name>`.
    pub fn create_from_template(
        &mut self,
        template_name: &str,
        type_name: Option<&str>,
        instance_name: &str,
    ) -> Result<ElementId, OverlayError> {
        let template = self
            .template(template_name)
            .ok_or_else(|| OverlayError::UnknownTemplate(template_name.to_string()))?;
        let type_name = match type_name {
            Some(t) => t,
            None => self
                .tree
                .type_name(template)
                .ok_or(OverlayError::StaleElement(template))?,
        };
        let id = self.create_element(type_name, Some(instance_name))?;
        if let Err(err) =
            self.tree
                .copy_from_template(id, template, &self.factories, &*self.materials)
        {
            self.tree.destroy(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Clone an element (and its cloneable subtree) under `instance_name`.
    pub fn clone_element(
        &mut self,
        id: ElementId,
        instance_name: &str,
    ) -> Result<ElementId, OverlayError> {
        if !self.tree.is_alive(id) {
            return Err(OverlayError::StaleElement(id));
        }
        self.tree
            .clone_element(id, instance_name, &self.factories, &*self.materials)
    }

    /// Destroy an element and its subtree, unhooking it from its parent, overlay, and the
    /// template index. Stale handles are logged and ignored.
    pub fn destroy_element(&mut self, id: ElementId) {
        if !self.tree.is_alive(id) {
            tracing::warn!(?id, "destroy of stale element ignored");
            return;
        }
        if self.tree.parent_of(id).is_none()
            && let Some(overlay) = self
                .tree
                .overlay_of(id)
                .and_then(|o| self.overlays.get_mut(o))
        {
            overlay.forget_root(id);
        }
        self.templates.retain(|_, t| *t != id);
        self.tree.destroy(id);
    }

    // --- properties ---

    /// Set a property by name, resolving materials through the registry's library.
    pub fn set_param(
        &mut self,
        id: ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), OverlayError> {
        if !self.tree.is_alive(id) {
            return Err(OverlayError::StaleElement(id));
        }
        self.tree.set_param(id, name, value, &*self.materials)?;
        Ok(())
    }

    /// Current value of a property by name.
    pub fn param(&self, id: ElementId, name: &str) -> Option<String> {
        if !self.tree.is_alive(id) {
            return None;
        }
        self.tree.param(id, name)
    }

    /// Apply a list of `name value` attributes, logging and skipping the ones that fail.
    ///
    /// Returns the number of attributes applied.
    pub fn apply_params<'p>(
        &mut self,
        id: ElementId,
        params: impl IntoIterator<Item = (&'p str, &'p str)>,
    ) -> usize {
        let mut applied = 0;
        for (name, value) in params {
            match self.set_param(id, name, value) {
                Ok(()) => applied += 1,
                Err(err) => {
                    tracing::warn!(param = name, value, error = %err, "attribute skipped");
                }
            }
        }
        applied
    }

    // --- per frame ---

    /// Run the frame pass: propagate a viewport change (size or texel offsets), then update and
    /// submit every shown overlay.
    pub fn queue_for_rendering(&mut self, queue: &mut dyn RenderQueue, viewport: Viewport) {
        let propagate = viewport != self.viewport;
        self.viewport_changed = !viewport.same_size(&self.viewport);
        self.viewport = viewport;
        if propagate {
            tracing::debug!(
                width = viewport.width,
                height = viewport.height,
                resized = self.viewport_changed,
                "viewport changed"
            );
            self.tree.set_default_viewport(viewport);
        }
        let ids: Vec<OverlayId> = self.overlays.iter().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(overlay) = self.overlays.get_mut(id) {
                overlay.find_visible(
                    &mut self.tree,
                    viewport,
                    propagate,
                    self.viewport_changed,
                    queue,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Rect};

    use crate::elements::Panel;
    use crate::error::PropertyError;
    use crate::render::{Material, RenderList};
    use crate::testing::{approx, approx_rect};
    use crate::types::{HorizontalAlignment, MetricsMode, VerticalAlignment};

    fn materials() -> MaterialSet {
        let mut set = MaterialSet::new();
        set.insert(Material::new("Hud/Bar", 1));
        set.insert(Material::new("Hud/Font", 1));
        set
    }

    /// `hud` overlay with a transparent full-screen `root` panel.
    fn hud() -> (OverlayManager, OverlayId, ElementId) {
        let mut m = OverlayManager::new(materials());
        let hud = m.create("hud").unwrap();
        let root = m.create_element("Panel", Some("root")).unwrap();
        m.set_param(root, "transparent", "true").unwrap();
        m.overlay_mut(hud).unwrap().add_element(root).unwrap();
        (m, hud, root)
    }

    #[test]
    fn hud_scenario() {
        let (mut m, hud, root) = hud();
        let bar = m.create_element("Panel", Some("bar")).unwrap();
        let tree = m.tree_mut();
        tree.set_metrics_mode(bar, MetricsMode::Relative);
        tree.set_position(bar, 0.1, 0.1);
        tree.set_dimensions(bar, 0.2, 0.05);
        tree.set_horizontal_alignment(bar, HorizontalAlignment::Left);
        tree.set_vertical_alignment(bar, VerticalAlignment::Top);
        tree.add_child(root, bar);
        m.set_param(bar, "material", "Hud/Bar").unwrap();
        m.overlay_mut(hud).unwrap().show();

        let mut list = RenderList::new();
        m.queue_for_rendering(&mut list, Viewport::new(800, 600));

        let tree = m.tree_mut();
        assert_eq!(tree.derived_left(bar), 0.1);
        assert_eq!(tree.derived_top(bar), 0.1);
        let expected = Rect::new(0.0, 0.0, 1.0, 1.0).intersect(Rect::new(0.1, 0.1, 0.3, 0.15));
        assert!(approx_rect(tree.clipping_region(bar), expected));

        let names: Vec<&str> = list.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["bar"], "transparent root is walked but not drawn");
        assert_eq!(list.entries[0].priority, 10_001);
        assert_eq!(list.entries[0].vertex_count, 4);
        assert_eq!(list.entries[0].material.as_deref(), Some("Hud/Bar"));
    }

    #[test]
    fn duplicate_and_unknown_overlays() {
        let mut m = OverlayManager::default();
        let a = m.create("a").unwrap();
        assert_eq!(m.create("a"), Err(OverlayError::DuplicateOverlay("a".into())));
        assert_eq!(m.by_name("a"), Some(a));
        assert_eq!(m.by_name_mut("a").map(|o| o.id()), Ok(a));
        assert_eq!(
            m.by_name_mut("missing").map(|o| o.id()),
            Err(OverlayError::UnknownOverlay("missing".into()))
        );
        m.destroy("missing");
        m.destroy("a");
        m.destroy("a");
        assert_eq!(m.by_name("a"), None);
        assert!(m.overlay(a).is_none());
        m.destroy_overlay(a);
        assert!(m.create("a").is_ok(), "name is free again");
    }

    #[test]
    fn destroying_overlay_frees_its_elements() {
        let (mut m, hud, root) = hud();
        let child = m.create_element("TextArea", None).unwrap();
        assert_eq!(m.tree().name(child), Some("unnamed_0"));
        m.tree_mut().add_child(root, child);
        let loose = m.create_element("Panel", None).unwrap();
        assert_eq!(m.tree().name(loose), Some("unnamed_1"));

        m.destroy_overlay(hud);
        assert!(!m.tree().is_alive(root) && !m.tree().is_alive(child));
        assert!(m.tree().is_alive(loose), "unattached elements are not owned by overlays");

        m.destroy_all();
        assert_eq!(m.overlays().count(), 0);
    }

    #[test]
    fn destroy_element_unhooks_roots_and_templates() {
        let (mut m, hud, root) = hud();
        m.destroy_element(root);
        assert!(m.overlay(hud).unwrap().roots().is_empty());
        m.destroy_element(root);

        let t = m.create_template("Panel", "Box").unwrap();
        assert_eq!(
            m.create_template("Panel", "Box"),
            Err(OverlayError::DuplicateTemplate("Box".into()))
        );
        m.destroy_element(t);
        assert_eq!(m.template("Box"), None);
    }

    #[test]
    fn templates_instantiate_deep_copies() {
        let mut m = OverlayManager::new(materials());
        let t = m.create_template("Panel", "Stats").unwrap();
        let label = m.create_element("TextArea", Some("fps")).unwrap();
        m.tree_mut().add_child(t, label);
        m.apply_params(
            t,
            [
                ("left", "0.5"),
                ("material", "Hud/Bar"),
                ("tiling", "0 2 2 3 4 5"),
            ],
        );
        m.apply_params(label, [("caption", "FPS"), ("char_height", "0.03")]);

        let a = m.create_from_template("Stats", None, "StatsA").unwrap();
        let b = m.create_from_template("Stats", None, "StatsB").unwrap();
        assert_eq!(m.tree().type_name(a), Some("Panel"));
        assert_eq!(m.param(a, "left").as_deref(), Some("0.5"));
        assert_eq!(m.param(a, "tiling").as_deref(), Some("0 2 2 3 4 5"));
        let a_label = m.tree().child(a, "StatsA/fps");
        let b_label = m.tree().child(b, "StatsB/fps");
        assert_eq!(m.param(a_label, "char_height").as_deref(), Some("0.03"));

        m.set_param(a_label, "caption", "changed").unwrap();
        assert_eq!(m.tree().caption(b_label), "FPS");
        assert_eq!(m.tree().caption(label), "FPS");

        assert_eq!(
            m.create_from_template("Nope", None, "x"),
            Err(OverlayError::UnknownTemplate("Nope".into()))
        );
        assert_eq!(
            m.create_from_template("Stats", Some("Gauge"), "x"),
            Err(OverlayError::UnknownElementType("Gauge".into()))
        );
    }

    #[test]
    fn clone_through_manager() {
        let (mut m, _, root) = hud();
        let c = m.clone_element(root, "copy").unwrap();
        assert_eq!(m.tree().name(c), Some("copy/root"));
        assert_eq!(m.param(c, "transparent").as_deref(), Some("true"));
        m.destroy_element(c);
        assert_eq!(m.clone_element(c, "again"), Err(OverlayError::StaleElement(c)));
    }

    #[test]
    fn failed_params_keep_previous_values() {
        let (mut m, _, root) = hud();
        m.set_param(root, "left", "0.25").unwrap();
        m.set_param(root, "material", "Hud/Bar").unwrap();
        assert_eq!(
            m.set_param(root, "material", "Missing"),
            Err(OverlayError::Property(PropertyError::MaterialNotFound(
                "Missing".into()
            )))
        );
        assert_eq!(m.param(root, "material").as_deref(), Some("Hud/Bar"));
        assert_eq!(
            m.set_param(root, "colour", "red"),
            Err(OverlayError::Property(PropertyError::Unknown("colour".into())))
        );
        assert_eq!(m.param(root, "left").as_deref(), Some("0.25"));

        let applied = m.apply_params(root, [("top", "0.5"), ("bogus", "1"), ("width", "x")]);
        assert_eq!(applied, 1);
        assert_eq!(m.param(root, "top").as_deref(), Some("0.5"));
        assert_eq!(m.param(root, "width").as_deref(), Some("1"));
    }

    #[test]
    fn viewport_change_rescales_pixel_elements() {
        let (mut m, hud, root) = hud();
        let bar = m.create_element("Panel", Some("bar")).unwrap();
        m.tree_mut().add_child(root, bar);
        m.apply_params(bar, [("metrics_mode", "pixels"), ("left", "200"), ("width", "100")]);
        m.overlay_mut(hud).unwrap().show();

        let mut list = RenderList::new();
        m.queue_for_rendering(&mut list, Viewport::new(800, 600));
        assert!(m.has_viewport_changed());
        assert!(approx(m.tree_mut().derived_left(bar), 0.25));

        m.queue_for_rendering(&mut list, Viewport::new(800, 600));
        assert!(!m.has_viewport_changed());

        m.queue_for_rendering(&mut list, Viewport::new(400, 300));
        assert!(m.has_viewport_changed());
        assert!(approx(m.tree_mut().derived_left(bar), 0.5));
        assert!(approx(m.tree().relative_placement(bar).width, 0.25));
        assert_eq!(m.param(bar, "left").as_deref(), Some("200"));
    }

    #[test]
    fn texel_offsets_alone_reach_elements() {
        let (mut m, hud, root) = hud();
        m.overlay_mut(hud).unwrap().show();
        let mut list = RenderList::new();
        m.queue_for_rendering(&mut list, Viewport::new(800, 600));
        assert!(approx(m.tree_mut().derived_left(root), 0.0));

        let shifted = Viewport::new(800, 600).with_texel_offsets(-0.5, 0.0);
        m.queue_for_rendering(&mut list, shifted);
        assert!(!m.has_viewport_changed(), "size is unchanged");
        assert!(approx(m.tree_mut().derived_left(root), -0.5 / 800.0));
        assert_eq!(m.tree().default_viewport(), shifted);
    }

    #[test]
    fn root_destroyed_through_tree_leaves_frame_running() {
        let (mut m, hud, root) = hud();
        m.overlay_mut(hud).unwrap().show();
        m.tree_mut().destroy(root);

        let mut list = RenderList::new();
        m.queue_for_rendering(&mut list, Viewport::new(800, 600));
        assert!(list.entries.is_empty());
        let overlay = m.overlay(hud).unwrap();
        assert!(overlay.roots().is_empty());
        assert_eq!(overlay.root("root"), None);
        assert_eq!(
            m.overlay_mut(hud)
                .unwrap()
                .find_element_at(Point::new(0.5, 0.5)),
            None
        );
    }

    #[test]
    fn missing_material_degrades_frame() {
        let (mut m, hud, root) = hud();
        let broken = m.create_element("Panel", Some("broken")).unwrap();
        let fine = m.create_element("Panel", Some("fine")).unwrap();
        m.tree_mut().add_child(root, broken);
        m.tree_mut().add_child(root, fine);
        m.set_param(fine, "material", "Hud/Bar").unwrap();
        m.overlay_mut(hud).unwrap().show();

        let mut list = RenderList::new();
        m.queue_for_rendering(&mut list, Viewport::new(800, 600));
        let names: Vec<&str> = list.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["fine"]);
        assert!(!m.tree().needs_texture_rebuild(broken));
        assert_eq!(
            m.tree().kind::<Panel>(fine).unwrap().tex_coords_layers(),
            1,
            "sibling still built its UVs"
        );
    }

    #[test]
    fn hidden_overlay_submits_nothing() {
        let (mut m, hud, root) = hud();
        m.set_param(root, "transparent", "false").unwrap();
        m.set_param(root, "material", "Hud/Bar").unwrap();
        let mut list = RenderList::new();
        m.queue_for_rendering(&mut list, Viewport::new(800, 600));
        assert!(list.entries.is_empty());

        m.overlay_mut(hud).unwrap().show();
        m.queue_for_rendering(&mut list, Viewport::new(800, 600));
        assert_eq!(list.entries.len(), 1);
        assert_eq!(
            m.overlay_mut(hud)
                .unwrap()
                .find_element_at(Point::new(0.5, 0.5)),
            Some(root)
        );
    }

    #[test]
    fn overlay_transform_reaches_elements() {
        let (mut m, hud, root) = hud();
        let mut o = m.overlay_mut(hud).unwrap();
        o.show();
        o.set_scroll(0.5, 0.0);
        let mut list = RenderList::new();
        m.queue_for_rendering(&mut list, Viewport::new(800, 600));
        let t = m.tree().world_transform(root).unwrap();
        assert_eq!(t * Point::ZERO, Point::new(0.5, 0.0));
    }
}
