// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-type half of an element.
//!
//! Positioning, clipping, z-order, and dirty tracking are the same for every element and live
//! in [`ElementTree`](crate::ElementTree). What differs between element types (the geometry
//! they emit, whether they hold children, and their extra properties) is expressed by
//! [`ElementKind`]. Each node of the tree owns one boxed kind.

use core::any::Any;
use core::fmt::Debug;

use kurbo::{Rect, Vec2};

use crate::error::GeometryError;
use crate::property::PropertyAccess;
use crate::render::{Material, RenderOperation};
use crate::types::{MetricsMode, Viewport};

/// Read-only view of an element's resolved state, handed to [`ElementKind`] callbacks.
#[derive(Clone, Copy, Debug)]
pub struct GeometryContext<'a> {
    /// Element name.
    pub name: &'a str,
    /// Derived rectangle in relative screen units (`x0, y0` = derived left/top).
    pub derived: Rect,
    /// Clipping region in relative screen units.
    pub clip: Rect,
    /// Assigned z-order.
    pub z_order: i32,
    /// Last viewport the element was notified of.
    pub viewport: Viewport,
    /// Active metrics mode.
    pub metrics_mode: MetricsMode,
    /// Current `mode units → relative` scale factors.
    pub pixel_scale: Vec2,
    /// Element caption.
    pub caption: &'a str,
    /// Resolved material, if any.
    pub material: Option<&'a Material>,
}

/// Behaviour specific to one element type.
///
/// Implementations provide geometry and type-specific properties; everything about placement
/// is handled by the tree. Geometry callbacks only run once the element is initialized, and
/// only when the corresponding dirty flag is set.
pub trait ElementKind: PropertyAccess + Any + Debug {
    /// Type name used by the factory registry, e.g. `"Panel"`.
    fn type_name(&self) -> &'static str;

    /// Whether elements of this kind may own children.
    fn is_container(&self) -> bool {
        false
    }

    /// One-shot setup, called the first time the element becomes reachable from a shown
    /// overlay.
    fn initialize(&mut self, _ctx: &GeometryContext<'_>) {}

    /// Rebuild vertex positions from the derived rectangle.
    fn rebuild_position_geometry(&mut self, ctx: &GeometryContext<'_>)
    -> Result<(), GeometryError>;

    /// Rebuild texture coordinates.
    fn rebuild_texture_geometry(&mut self, ctx: &GeometryContext<'_>) -> Result<(), GeometryError>;

    /// Geometry produced by the last successful rebuilds.
    fn render_operation(&self) -> &RenderOperation;

    /// Whether the element itself is submitted when visible. Containers are always walked.
    fn renders_self(&self, _ctx: &GeometryContext<'_>) -> bool {
        true
    }
}

impl dyn ElementKind {
    /// Downcast to a concrete kind.
    pub fn downcast_ref<K: ElementKind>(&self) -> Option<&K> {
        (self as &dyn Any).downcast_ref::<K>()
    }

    /// Downcast to a concrete kind, mutably.
    pub fn downcast_mut<K: ElementKind>(&mut self) -> Option<&mut K> {
        (self as &mut dyn Any).downcast_mut::<K>()
    }
}
