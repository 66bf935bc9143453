// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root trees.
//!
//! An [`Overlay`] is a named layer of root containers with its own z-order band, visibility,
//! and 2D transform. Overlays are owned by an [`OverlayManager`](crate::OverlayManager); an
//! [`OverlayMut`] pairs one of them with the element tree for operations that touch both.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Affine, Point, Vec2};

use crate::error::OverlayError;
use crate::render::RenderQueue;
use crate::tree::ElementTree;
use crate::types::{ElementId, OverlayId, Viewport};

/// Overlay z-orders must stay below this value.
pub const MAX_OVERLAY_Z_ORDER: u16 = 650;

/// Z-order given to new overlays.
pub const DEFAULT_OVERLAY_Z_ORDER: u16 = 100;

/// A named root tree.
#[derive(Clone, Debug)]
pub struct Overlay {
    name: String,
    roots: Vec<ElementId>,
    root_lookup: HashMap<String, ElementId>,
    z_order: u16,
    visible: bool,
    initialized: bool,
    scroll: Vec2,
    scale: Vec2,
    /// Degrees.
    rotation: f64,
    transform: Affine,
    /// Set when the transform changed and has not been pushed to the elements yet.
    transform_updated: bool,
}

impl Overlay {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            roots: Vec::new(),
            root_lookup: HashMap::new(),
            z_order: DEFAULT_OVERLAY_Z_ORDER,
            visible: false,
            initialized: false,
            scroll: Vec2::ZERO,
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
            transform: Affine::IDENTITY,
            transform_updated: true,
        }
    }

    /// Overlay name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root containers, in the order they were added.
    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    /// The root container called `name`, if any.
    pub fn root(&self, name: &str) -> Option<ElementId> {
        self.root_lookup.get(name).copied()
    }

    /// Z-order band of the overlay; its elements start at `z_order * 100`.
    pub fn z_order(&self) -> u16 {
        self.z_order
    }

    /// Returns true if the overlay is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns true once the overlay has been shown for the first time.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Scroll offset in relative units.
    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    /// Scale factors.
    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Rotation in degrees.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Combined transform: scroll, then rotation, then scale.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    fn update_transform(&mut self) {
        let radians = self.rotation * (core::f64::consts::PI / 180.0);
        self.transform = Affine::translate(self.scroll)
            * Affine::rotate(radians)
            * Affine::scale_non_uniform(self.scale.x, self.scale.y);
        self.transform_updated = true;
    }

    pub(crate) fn forget_root(&mut self, root: ElementId) {
        self.roots.retain(|r| *r != root);
        self.root_lookup.retain(|_, r| *r != root);
    }

    /// Drop roots that were destroyed through the element tree directly.
    pub(crate) fn prune_dead_roots(&mut self, tree: &ElementTree) {
        let before = self.roots.len();
        self.roots.retain(|r| tree.is_alive(*r));
        if self.roots.len() != before {
            self.root_lookup.retain(|_, r| tree.is_alive(*r));
            tracing::debug!(
                overlay = self.name.as_str(),
                dropped = before - self.roots.len(),
                "dead roots pruned"
            );
        }
    }

    /// Bring the overlay's roots up to date and submit them to `queue` if the overlay is shown.
    ///
    /// `propagate` pushes `viewport` into every root (any change, including texel offsets);
    /// `viewport_changed` reports a change of pixel size to the metrics resync.
    pub(crate) fn find_visible(
        &mut self,
        tree: &mut ElementTree,
        viewport: Viewport,
        propagate: bool,
        viewport_changed: bool,
        queue: &mut dyn RenderQueue,
    ) {
        self.prune_dead_roots(tree);
        if propagate {
            for &root in &self.roots {
                tree.notify_viewport(root, viewport);
            }
        }
        if !self.visible {
            return;
        }
        if self.transform_updated {
            for &root in &self.roots {
                tree.notify_world_transform(root, self.transform);
            }
            self.transform_updated = false;
        }
        for &root in &self.roots {
            tree.update(root, viewport_changed);
            tree.update_render_queue(root, queue);
        }
    }
}

/// Mutable access to one overlay together with the element tree.
#[derive(Debug)]
pub struct OverlayMut<'a> {
    pub(crate) id: OverlayId,
    pub(crate) overlay: &'a mut Overlay,
    pub(crate) tree: &'a mut ElementTree,
    pub(crate) viewport: Viewport,
}

impl OverlayMut<'_> {
    /// Handle of the overlay.
    pub fn id(&self) -> OverlayId {
        self.id
    }

    /// Read access to the overlay.
    pub fn overlay(&self) -> &Overlay {
        self.overlay
    }

    /// Add a root container.
    ///
    /// The container and its subtree join the overlay immediately: they receive the overlay's
    /// viewport and transform, z-orders are reassigned, and they are initialized if the overlay
    /// already was shown.
    ///
    /// # Panics
    ///
    /// Panics if the container already has a parent or the overlay already has a root with the
    /// same name.
    pub fn add_element(&mut self, container: ElementId) -> Result<(), OverlayError> {
        let Some(name) = self.tree.name(container).map(ToString::to_string) else {
            return Err(OverlayError::StaleElement(container));
        };
        if !self.tree.is_container(container) {
            return Err(OverlayError::NotAContainer(name));
        }
        assert!(
            self.tree.parent_of(container).is_none(),
            "element '{name}' already has a parent"
        );
        assert!(
            !self.overlay.root_lookup.contains_key(&name),
            "overlay '{}' already has a root called '{name}'",
            self.overlay.name
        );
        self.overlay.roots.push(container);
        self.overlay.root_lookup.insert(name, container);
        self.tree.notify_overlay(container, Some(self.id));
        self.tree.notify_viewport(container, self.viewport);
        self.tree
            .notify_world_transform(container, self.overlay.transform);
        self.assign_z_orders();
        if self.overlay.initialized {
            self.tree.initialize_subtree(container);
        }
        Ok(())
    }

    /// Remove a root container; it stays alive, unattached. Returns false if it was not a root
    /// of this overlay.
    pub fn remove_element(&mut self, container: ElementId) -> bool {
        if !self.overlay.roots.contains(&container) {
            return false;
        }
        self.overlay.forget_root(container);
        self.tree.notify_overlay(container, None);
        self.assign_z_orders();
        true
    }

    fn assign_z_orders(&mut self) {
        self.overlay.prune_dead_roots(self.tree);
        let mut z = i32::from(self.overlay.z_order) * 100;
        for &root in &self.overlay.roots {
            z = self.tree.notify_z_order(root, z);
        }
    }

    /// Show the overlay, initializing every root subtree the first time.
    pub fn show(&mut self) {
        self.overlay.visible = true;
        if !self.overlay.initialized {
            self.overlay.prune_dead_roots(self.tree);
            for &root in &self.overlay.roots {
                self.tree.initialize_subtree(root);
            }
            self.overlay.initialized = true;
            tracing::debug!(overlay = self.overlay.name.as_str(), "overlay initialized");
        }
    }

    /// Hide the overlay.
    pub fn hide(&mut self) {
        self.overlay.visible = false;
    }

    /// Move the overlay to another z-order band and reassign element z-orders.
    pub fn set_z_order(&mut self, z_order: u16) -> Result<(), OverlayError> {
        if z_order >= MAX_OVERLAY_Z_ORDER {
            return Err(OverlayError::ZOrderOutOfRange(z_order));
        }
        self.overlay.z_order = z_order;
        self.assign_z_orders();
        Ok(())
    }

    /// Set the scroll offset in relative units.
    pub fn set_scroll(&mut self, x: f64, y: f64) {
        self.overlay.scroll = Vec2::new(x, y);
        self.overlay.update_transform();
    }

    /// Add to the scroll offset.
    pub fn scroll(&mut self, dx: f64, dy: f64) {
        self.overlay.scroll += Vec2::new(dx, dy);
        self.overlay.update_transform();
    }

    /// Set the scale factors.
    pub fn set_scale(&mut self, x: f64, y: f64) {
        self.overlay.scale = Vec2::new(x, y);
        self.overlay.update_transform();
    }

    /// Set the rotation in degrees.
    pub fn set_rotation(&mut self, degrees: f64) {
        self.overlay.rotation = degrees;
        self.overlay.update_transform();
    }

    /// Add to the rotation, in degrees.
    pub fn rotate(&mut self, degrees: f64) {
        self.overlay.rotation += degrees;
        self.overlay.update_transform();
    }

    /// Find the topmost element under `point` (relative screen units) among all root
    /// containers; a root's result wins if its z-order is at least the best result so far, so a
    /// later root wins ties.
    pub fn find_element_at(&mut self, point: Point) -> Option<ElementId> {
        self.overlay.prune_dead_roots(self.tree);
        let mut found = None;
        let mut best_z = -1;
        for &root in &self.overlay.roots {
            let Some(z) = self.tree.z_order(root) else {
                continue;
            };
            if z < best_z {
                continue;
            }
            if let Some(hit) = self.tree.find_element_at(root, point) {
                best_z = self.tree.z_order(hit).unwrap_or(z);
                found = Some(hit);
            }
        }
        found
    }
}
