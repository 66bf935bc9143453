// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element storage, local geometry, lazy derived state, and the per-frame walk.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Affine, Rect, Vec2};
use smallvec::SmallVec;

use crate::arena::Arena;
use crate::element::{ElementKind, GeometryContext};
use crate::metrics::{pixel_scale, texel_offsets, to_pixels, to_relative};
use crate::render::{Material, RenderGroup, RenderItem, RenderQueue};
use crate::types::{
    ElementFlags, ElementId, HorizontalAlignment, MetricsMode, OverlayId, Placement,
    VerticalAlignment, Viewport,
};

bitflags::bitflags! {
    /// Stale cached state of one element.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct Dirty: u8 {
        /// Derived position and clipping region.
        const DERIVED   = 0b001;
        /// Vertex positions built by the element kind.
        const POSITIONS = 0b010;
        /// Texture coordinates built by the element kind.
        const TEXTURE   = 0b100;
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) kind: Box<dyn ElementKind>,
    pub(crate) parent: Option<ElementId>,
    pub(crate) overlay: Option<OverlayId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) child_lookup: HashMap<String, ElementId>,
    /// Container-typed subset of `children`, in insertion order.
    pub(crate) child_containers: SmallVec<[ElementId; 4]>,
    relative: Placement,
    /// Placement in metrics-mode units; mirrors `relative` in relative mode.
    pixels: Placement,
    pixel_scale: Vec2,
    pub(crate) viewport: Viewport,
    metrics_mode: MetricsMode,
    h_align: HorizontalAlignment,
    v_align: VerticalAlignment,
    pub(crate) flags: ElementFlags,
    pub(crate) dirty: Dirty,
    derived: Rect,
    clip: Rect,
    pub(crate) z_order: i32,
    pub(crate) world_transform: Affine,
    pub(crate) initialized: bool,
    pub(crate) source_template: Option<ElementId>,
    caption: String,
    material: Option<Material>,
}

impl Node {
    fn new(name: String, kind: Box<dyn ElementKind>, viewport: Viewport) -> Self {
        Self {
            name,
            kind,
            parent: None,
            overlay: None,
            children: Vec::new(),
            child_lookup: HashMap::new(),
            child_containers: SmallVec::new(),
            relative: Placement::default(),
            pixels: Placement::default(),
            pixel_scale: Vec2::new(1.0, 1.0),
            viewport,
            metrics_mode: MetricsMode::Relative,
            h_align: HorizontalAlignment::Left,
            v_align: VerticalAlignment::Top,
            flags: ElementFlags::default(),
            dirty: Dirty::all(),
            derived: Rect::ZERO,
            clip: Rect::ZERO,
            z_order: 0,
            world_transform: Affine::IDENTITY,
            initialized: false,
            source_template: None,
            caption: String::new(),
            material: None,
        }
    }
}

// Builds a `GeometryContext` from a node's fields so the kind can be borrowed mutably alongside.
macro_rules! geometry_context {
    ($node:expr) => {
        GeometryContext {
            name: &$node.name,
            derived: $node.derived,
            clip: $node.clip,
            z_order: $node.z_order,
            viewport: $node.viewport,
            metrics_mode: $node.metrics_mode,
            pixel_scale: $node.pixel_scale,
            caption: &$node.caption,
            material: $node.material.as_ref(),
        }
    };
}

/// Arena of overlay elements.
///
/// Every element of an [`OverlayManager`](crate::OverlayManager) lives here, attached or not.
/// Local changes are pushed down the tree immediately as dirty flags; derived position and
/// clipping are pulled lazily, recomputing only the stale ancestors of the node being read.
///
/// ## Example
///
/// ```rust
/// use understory_overlay::{ElementTree, Viewport, elements::Panel};
///
/// let mut tree = ElementTree::with_viewport(Viewport::new(800, 600));
/// let root = tree.insert("root", Box::new(Panel::new()));
/// let bar = tree.insert("bar", Box::new(Panel::new()));
/// tree.add_child(root, bar);
/// tree.set_position(bar, 0.1, 0.1);
/// tree.set_dimensions(bar, 0.2, 0.05);
///
/// assert_eq!(tree.derived_left(bar), 0.1);
/// assert_eq!(tree.derived_top(bar), 0.1);
/// ```
#[derive(Debug, Default)]
pub struct ElementTree {
    elements: Arena<ElementId, Node>,
    /// Viewport handed to newly inserted elements.
    viewport: Viewport,
}

impl ElementTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tree whose new elements start out with `viewport`.
    pub fn with_viewport(viewport: Viewport) -> Self {
        Self {
            elements: Arena::default(),
            viewport,
        }
    }

    /// Viewport handed to newly inserted elements.
    pub fn default_viewport(&self) -> Viewport {
        self.viewport
    }

    /// Change the viewport handed to newly inserted elements.
    ///
    /// Existing elements are not touched; use [`ElementTree::notify_viewport`] for those.
    pub fn set_default_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Insert a new, unattached element.
    pub fn insert(&mut self, name: impl Into<String>, kind: Box<dyn ElementKind>) -> ElementId {
        let node = Node::new(name.into(), kind, self.viewport);
        self.elements.insert(node)
    }

    /// Destroy an element and its whole subtree, detaching it from its parent first.
    ///
    /// Stale ids are ignored.
    pub fn destroy(&mut self, id: ElementId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_child(parent, id);
        }
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: ElementId) {
        let Some(node) = self.elements.remove(id) else {
            return;
        };
        tracing::trace!(element = node.name.as_str(), "element destroyed");
        for child in node.children {
            self.free_subtree(child);
        }
    }

    /// Returns true if `id` refers to a live element.
    pub fn is_alive(&self, id: ElementId) -> bool {
        self.elements.contains(id)
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the tree holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.len() == 0
    }

    /// Access a node; panics if `id` is stale.
    pub(crate) fn node(&self, id: ElementId) -> &Node {
        self.elements.get(id).expect("dangling ElementId")
    }

    /// Access a node mutably; panics if `id` is stale.
    pub(crate) fn node_mut(&mut self, id: ElementId) -> &mut Node {
        self.elements.get_mut(id).expect("dangling ElementId")
    }

    pub(crate) fn mark_subtree_dirty(&mut self, id: ElementId, flags: Dirty) {
        if !self.is_alive(id) {
            return;
        }
        let children = {
            let n = self.node_mut(id);
            n.dirty |= flags;
            n.children.clone()
        };
        for c in children {
            self.mark_subtree_dirty(c, flags);
        }
    }

    /// Flag both geometry rebuilds of a single element.
    pub(crate) fn invalidate_geometry(&mut self, id: ElementId) {
        self.node_mut(id).dirty |= Dirty::POSITIONS | Dirty::TEXTURE;
    }

    // --- identity and structure ---

    /// Element name, or `None` for stale ids.
    pub fn name(&self, id: ElementId) -> Option<&str> {
        self.elements.get(id).map(|n| n.name.as_str())
    }

    /// Type name of the element's kind, or `None` for stale ids.
    pub fn type_name(&self, id: ElementId) -> Option<&'static str> {
        self.elements.get(id).map(|n| n.kind.type_name())
    }

    /// Returns true if the element may own children.
    pub fn is_container(&self, id: ElementId) -> bool {
        self.elements.get(id).is_some_and(|n| n.kind.is_container())
    }

    /// Returns the parent of an element, or `None` for unattached, root, or stale ids.
    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.elements.get(id).and_then(|n| n.parent)
    }

    /// Returns the overlay an element is displayed by, if any.
    pub fn overlay_of(&self, id: ElementId) -> Option<OverlayId> {
        self.elements.get(id).and_then(|n| n.overlay)
    }

    /// Children in insertion order, or an empty slice if `id` is stale.
    pub fn children_of(&self, id: ElementId) -> &[ElementId] {
        self.elements
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// The element this one was cloned or instantiated from, if it is still alive.
    pub fn source_template(&self, id: ElementId) -> Option<ElementId> {
        self.elements
            .get(id)
            .and_then(|n| n.source_template)
            .filter(|t| self.is_alive(*t))
    }

    /// Returns true once the element has been initialized.
    pub fn is_initialized(&self, id: ElementId) -> bool {
        self.elements.get(id).is_some_and(|n| n.initialized)
    }

    /// Assigned z-order, or `None` for stale ids.
    pub fn z_order(&self, id: ElementId) -> Option<i32> {
        self.elements.get(id).map(|n| n.z_order)
    }

    /// World transform pushed by the owning overlay.
    pub fn world_transform(&self, id: ElementId) -> Option<Affine> {
        self.elements.get(id).map(|n| n.world_transform)
    }

    /// Last viewport the element was notified of.
    pub fn viewport(&self, id: ElementId) -> Option<Viewport> {
        self.elements.get(id).map(|n| n.viewport)
    }

    // --- local geometry ---

    /// Local placement in the units of the element's metrics mode.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn placement(&self, id: ElementId) -> Placement {
        let n = self.node(id);
        match n.metrics_mode {
            MetricsMode::Relative => n.relative,
            _ => n.pixels,
        }
    }

    /// Local placement in relative screen units, whatever the metrics mode.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn relative_placement(&self, id: ElementId) -> Placement {
        self.node(id).relative
    }

    /// Write the authoritative placement and re-derive the other representation.
    fn write_placement(&mut self, id: ElementId, f: impl FnOnce(&mut Placement)) {
        let n = self.node_mut(id);
        match n.metrics_mode {
            MetricsMode::Relative => {
                f(&mut n.relative);
                n.pixels = n.relative;
            }
            mode => {
                f(&mut n.pixels);
                n.relative = to_relative(mode, &n.viewport, n.pixels);
            }
        }
        self.mark_subtree_dirty(id, Dirty::DERIVED | Dirty::POSITIONS);
    }

    /// Write the relative placement and re-derive the metrics-mode one.
    fn write_relative(&mut self, id: ElementId, f: impl FnOnce(&mut Placement)) {
        let n = self.node_mut(id);
        f(&mut n.relative);
        n.pixels = to_pixels(n.metrics_mode, &n.viewport, n.relative);
        self.mark_subtree_dirty(id, Dirty::DERIVED | Dirty::POSITIONS);
    }

    /// Set the position in metrics-mode units.
    pub fn set_position(&mut self, id: ElementId, left: f64, top: f64) {
        self.write_placement(id, |p| {
            p.left = left;
            p.top = top;
        });
    }

    /// Set the size in metrics-mode units.
    pub fn set_dimensions(&mut self, id: ElementId, width: f64, height: f64) {
        self.write_placement(id, |p| {
            p.width = width;
            p.height = height;
        });
    }

    /// Set the left offset in metrics-mode units.
    pub fn set_left(&mut self, id: ElementId, left: f64) {
        self.write_placement(id, |p| p.left = left);
    }

    /// Set the top offset in metrics-mode units.
    pub fn set_top(&mut self, id: ElementId, top: f64) {
        self.write_placement(id, |p| p.top = top);
    }

    /// Set the width in metrics-mode units.
    pub fn set_width(&mut self, id: ElementId, width: f64) {
        self.write_placement(id, |p| p.width = width);
    }

    /// Set the height in metrics-mode units.
    pub fn set_height(&mut self, id: ElementId, height: f64) {
        self.write_placement(id, |p| p.height = height);
    }

    /// Set the position in relative units, whatever the metrics mode.
    pub fn set_screen_position(&mut self, id: ElementId, left: f64, top: f64) {
        self.write_relative(id, |p| {
            p.left = left;
            p.top = top;
        });
    }

    /// Set the size in relative units, whatever the metrics mode.
    pub fn set_screen_dimensions(&mut self, id: ElementId, width: f64, height: f64) {
        self.write_relative(id, |p| {
            p.width = width;
            p.height = height;
        });
    }

    /// Active metrics mode.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn metrics_mode(&self, id: ElementId) -> MetricsMode {
        self.node(id).metrics_mode
    }

    /// Switch metrics mode. The element stays where it is on screen; its coordinates are
    /// re-expressed in the new units.
    pub fn set_metrics_mode(&mut self, id: ElementId, mode: MetricsMode) {
        let n = self.node_mut(id);
        if n.metrics_mode == mode {
            return;
        }
        let snapshot = n.relative;
        n.metrics_mode = mode;
        n.pixel_scale = pixel_scale(mode, &n.viewport);
        n.pixels = to_pixels(mode, &n.viewport, snapshot);
        self.mark_subtree_dirty(id, Dirty::DERIVED | Dirty::POSITIONS);
    }

    /// Current horizontal alignment.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn horizontal_alignment(&self, id: ElementId) -> HorizontalAlignment {
        self.node(id).h_align
    }

    /// Change which horizontal point of the parent is the origin of `left`.
    pub fn set_horizontal_alignment(&mut self, id: ElementId, align: HorizontalAlignment) {
        self.node_mut(id).h_align = align;
        self.mark_subtree_dirty(id, Dirty::DERIVED | Dirty::POSITIONS);
    }

    /// Current vertical alignment.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn vertical_alignment(&self, id: ElementId) -> VerticalAlignment {
        self.node(id).v_align
    }

    /// Change which vertical point of the parent is the origin of `top`.
    pub fn set_vertical_alignment(&mut self, id: ElementId, align: VerticalAlignment) {
        self.node_mut(id).v_align = align;
        self.mark_subtree_dirty(id, Dirty::DERIVED | Dirty::POSITIONS);
    }

    // --- flags and appearance ---

    /// Returns true if the element is visible.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn is_visible(&self, id: ElementId) -> bool {
        self.node(id).flags.contains(ElementFlags::VISIBLE)
    }

    /// Show or hide an element (and, for rendering and hit tests, its subtree).
    pub fn set_visible(&mut self, id: ElementId, visible: bool) {
        self.node_mut(id).flags.set(ElementFlags::VISIBLE, visible);
    }

    /// Make the element visible.
    pub fn show(&mut self, id: ElementId) {
        self.set_visible(id, true);
    }

    /// Hide the element.
    pub fn hide(&mut self, id: ElementId) {
        self.set_visible(id, false);
    }

    /// Returns true if the element takes part in hit tests below its container.
    pub fn is_enabled(&self, id: ElementId) -> bool {
        self.node(id).flags.contains(ElementFlags::ENABLED)
    }

    /// Enable or disable hit testing of the element.
    pub fn set_enabled(&mut self, id: ElementId, enabled: bool) {
        self.node_mut(id).flags.set(ElementFlags::ENABLED, enabled);
    }

    /// Returns true if the element is copied when its container is cloned.
    pub fn is_cloneable(&self, id: ElementId) -> bool {
        self.node(id).flags.contains(ElementFlags::CLONEABLE)
    }

    /// Include or exclude the element from container clones.
    pub fn set_cloneable(&mut self, id: ElementId, cloneable: bool) {
        self.node_mut(id).flags.set(ElementFlags::CLONEABLE, cloneable);
    }

    /// Returns true if hit tests are forwarded to the element's children.
    pub fn children_process_events(&self, id: ElementId) -> bool {
        self.node(id).flags.contains(ElementFlags::CHILD_EVENTS)
    }

    /// Forward hit tests to children, or stop at this element.
    pub fn set_children_process_events(&mut self, id: ElementId, enabled: bool) {
        self.node_mut(id)
            .flags
            .set(ElementFlags::CHILD_EVENTS, enabled);
    }

    /// Element caption.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn caption(&self, id: ElementId) -> &str {
        &self.node(id).caption
    }

    /// Change the caption; the element's geometry is rebuilt on the next update.
    pub fn set_caption(&mut self, id: ElementId, caption: &str) {
        let n = self.node_mut(id);
        n.caption.clear();
        n.caption.push_str(caption);
        self.invalidate_geometry(id);
    }

    /// Resolved material, if any.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn material(&self, id: ElementId) -> Option<&Material> {
        self.node(id).material.as_ref()
    }

    /// Replace the material; the element's geometry is rebuilt on the next update.
    pub fn set_material(&mut self, id: ElementId, material: Option<Material>) {
        self.node_mut(id).material = material;
        self.invalidate_geometry(id);
    }

    // --- element kinds ---

    /// Borrow the element's kind as `K`, or `None` if it is another kind or `id` is stale.
    pub fn kind<K: ElementKind>(&self, id: ElementId) -> Option<&K> {
        self.elements.get(id)?.kind.downcast_ref::<K>()
    }

    /// Run `f` on the element's kind as `K` and schedule a geometry rebuild.
    ///
    /// Returns `None` without calling `f` if the kind does not match or `id` is stale.
    pub fn modify_kind<K: ElementKind, R>(
        &mut self,
        id: ElementId,
        f: impl FnOnce(&mut K) -> R,
    ) -> Option<R> {
        let kind = self.elements.get_mut(id)?.kind.downcast_mut::<K>()?;
        let out = f(kind);
        self.invalidate_geometry(id);
        Some(out)
    }

    // --- derived state ---

    /// Returns true if the derived position and clipping region are stale.
    pub fn is_derived_out_of_date(&self, id: ElementId) -> bool {
        self.node(id).dirty.contains(Dirty::DERIVED)
    }

    /// Returns true if vertex positions will be rebuilt on the next update.
    pub fn needs_position_rebuild(&self, id: ElementId) -> bool {
        self.node(id).dirty.contains(Dirty::POSITIONS)
    }

    /// Returns true if texture coordinates will be rebuilt on the next update.
    pub fn needs_texture_rebuild(&self, id: ElementId) -> bool {
        self.node(id).dirty.contains(Dirty::TEXTURE)
    }

    /// Absolute left edge in relative screen units.
    pub fn derived_left(&mut self, id: ElementId) -> f64 {
        self.resolve_derived(id);
        self.node(id).derived.x0
    }

    /// Absolute top edge in relative screen units.
    pub fn derived_top(&mut self, id: ElementId) -> f64 {
        self.resolve_derived(id);
        self.node(id).derived.y0
    }

    /// Absolute rectangle in relative screen units.
    pub fn derived_rect(&mut self, id: ElementId) -> Rect {
        self.resolve_derived(id);
        self.node(id).derived
    }

    /// The element's rectangle intersected with every ancestor's.
    ///
    /// In debug builds, panics if the element was never initialized: a clipping region is only
    /// meaningful once the element is part of a shown overlay.
    pub fn clipping_region(&mut self, id: ElementId) -> Rect {
        debug_assert!(
            self.node(id).initialized,
            "clipping region of '{}' queried before initialization",
            self.node(id).name
        );
        self.resolved_clip(id)
    }

    pub(crate) fn resolved_clip(&mut self, id: ElementId) -> Rect {
        self.resolve_derived(id);
        self.node(id).clip
    }

    /// Recompute stale derived state of `id` and of its stale ancestors, outermost first.
    ///
    /// A dirty node always has dirty descendants, so the walk stops at the first clean
    /// ancestor.
    fn resolve_derived(&mut self, id: ElementId) {
        let mut stale: SmallVec<[ElementId; 8]> = SmallVec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let n = self.node(c);
            if !n.dirty.contains(Dirty::DERIVED) {
                break;
            }
            stale.push(c);
            current = n.parent;
        }
        for c in stale.into_iter().rev() {
            self.recompute_from_parent(c);
        }
    }

    fn recompute_from_parent(&mut self, id: ElementId) {
        let n = self.node(id);
        let (parent_rect, parent_clip) = match n.parent {
            Some(p) => {
                let parent = self.node(p);
                (parent.derived, Some(parent.clip))
            }
            None => {
                let offset = texel_offsets(&n.viewport);
                (Rect::new(offset.x, offset.y, 1.0 + offset.x, 1.0 + offset.y), None)
            }
        };
        let origin_x = match n.h_align {
            HorizontalAlignment::Left => parent_rect.x0,
            HorizontalAlignment::Center => (parent_rect.x0 + parent_rect.x1) * 0.5,
            HorizontalAlignment::Right => parent_rect.x1,
        };
        let origin_y = match n.v_align {
            VerticalAlignment::Top => parent_rect.y0,
            VerticalAlignment::Center => (parent_rect.y0 + parent_rect.y1) * 0.5,
            VerticalAlignment::Bottom => parent_rect.y1,
        };
        let left = origin_x + n.relative.left;
        let top = origin_y + n.relative.top;
        let derived = Rect::new(left, top, left + n.relative.width, top + n.relative.height);
        let clip = match parent_clip {
            Some(parent_clip) => parent_clip.intersect(derived),
            None => derived,
        };
        let n = self.node_mut(id);
        n.derived = derived;
        n.clip = clip;
        n.dirty.remove(Dirty::DERIVED);
    }

    // --- notifications ---

    /// Push a new viewport into a subtree, rescaling pixel-based elements.
    pub fn notify_viewport(&mut self, id: ElementId, viewport: Viewport) {
        let children = {
            let n = self.node_mut(id);
            n.viewport = viewport;
            n.pixel_scale = pixel_scale(n.metrics_mode, &viewport);
            if n.metrics_mode != MetricsMode::Relative {
                n.relative = n.pixels.scaled(n.pixel_scale);
            }
            n.dirty |= Dirty::DERIVED | Dirty::POSITIONS;
            n.children.clone()
        };
        for c in children {
            self.notify_viewport(c, viewport);
        }
    }

    /// Push the owning overlay's transform into a subtree.
    pub fn notify_world_transform(&mut self, id: ElementId, transform: Affine) {
        let children = {
            let n = self.node_mut(id);
            n.world_transform = transform;
            n.children.clone()
        };
        for c in children {
            self.notify_world_transform(c, transform);
        }
    }

    // --- per frame ---

    /// Bring a subtree up to date: resync metrics, resolve derived state, and rebuild
    /// geometry of initialized elements. `viewport_changed` forces pixel-based elements to
    /// rescale.
    ///
    /// A failed geometry rebuild is logged and does not stop the walk.
    pub fn update(&mut self, id: ElementId, viewport_changed: bool) {
        self.sync_metrics(id, viewport_changed);
        self.resolve_derived(id);

        let n = self.node_mut(id);
        if n.initialized {
            if n.dirty.contains(Dirty::POSITIONS) {
                let ctx = geometry_context!(n);
                if let Err(err) = n.kind.rebuild_position_geometry(&ctx) {
                    tracing::warn!(element = ctx.name, error = %err, "position rebuild failed");
                }
                n.dirty.remove(Dirty::POSITIONS);
            }
            if n.dirty.contains(Dirty::TEXTURE) {
                let ctx = geometry_context!(n);
                if let Err(err) = n.kind.rebuild_texture_geometry(&ctx) {
                    tracing::warn!(element = ctx.name, error = %err, "texture rebuild failed");
                }
                n.dirty.remove(Dirty::TEXTURE);
            }
        }

        let children = n.children.clone();
        for c in children {
            self.update(c, viewport_changed);
        }
    }

    /// Re-derive relative units of a pixel-based element from its authoritative pixels.
    fn sync_metrics(&mut self, id: ElementId, viewport_changed: bool) {
        let n = self.node_mut(id);
        if n.metrics_mode == MetricsMode::Relative
            || !(viewport_changed || n.dirty.contains(Dirty::POSITIONS))
        {
            return;
        }
        n.pixel_scale = pixel_scale(n.metrics_mode, &n.viewport);
        let relative = n.pixels.scaled(n.pixel_scale);
        if relative != n.relative {
            n.relative = relative;
            self.mark_subtree_dirty(id, Dirty::DERIVED | Dirty::POSITIONS);
        }
    }

    /// Run the one-shot initialization of a single element.
    pub(crate) fn initialize_node(&mut self, id: ElementId) {
        if self.node(id).initialized {
            return;
        }
        self.resolve_derived(id);
        let n = self.node_mut(id);
        let ctx = geometry_context!(n);
        n.kind.initialize(&ctx);
        n.initialized = true;
        n.dirty |= Dirty::POSITIONS | Dirty::TEXTURE;
        tracing::debug!(element = n.name.as_str(), "element initialized");
    }

    /// Submit a visible subtree to `queue`, each element at its z-order.
    ///
    /// Hidden elements are skipped together with their children.
    pub fn update_render_queue(&self, id: ElementId, queue: &mut dyn RenderQueue) {
        let n = self.node(id);
        if !n.flags.contains(ElementFlags::VISIBLE) {
            return;
        }
        let ctx = geometry_context!(n);
        if n.kind.renders_self(&ctx) {
            let priority = u16::try_from(n.z_order.max(0)).unwrap_or(u16::MAX);
            queue.enqueue(
                RenderItem {
                    element: id,
                    name: &n.name,
                    type_name: n.kind.type_name(),
                    material: n.material.as_ref(),
                    operation: n.kind.render_operation(),
                    world_transform: n.world_transform,
                },
                priority,
                RenderGroup::OVERLAY,
            );
        }
        for &c in &n.children {
            self.update_render_queue(c, queue);
        }
    }
}
