// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Overlay: hierarchical 2D overlays composited over a rendered scene.
//!
//! An overlay is a named, z-ordered layer of root containers. Elements nest inside containers,
//! are placed relative to their parent, and are drawn on top of everything else each frame.
//! Typical uses are HUDs, debug panels, and loading screens.
//!
//! - Placement in one of three metrics modes: relative to the screen, in pixels, or in
//!   aspect-adjusted units that keep a square square on any display.
//! - Derived screen position and clip region computed lazily, and only for what changed.
//! - Per-overlay scroll, scale, and rotation, folded into one world transform per element.
//! - Z-order assigned depth first, so later and deeper elements draw on top and win hit tests.
//! - Element kinds created by type name through a factory registry, with named parameters,
//!   templates, and deep cloning.
//!
//! ## Not a renderer
//!
//! This crate produces geometry in clip space plus per-layer texture coordinates and hands it
//! to a [`RenderQueue`] together with the element's material and priority. Materials are
//! resolved by name through a host-provided [`MaterialLibrary`]; uploading buffers and issuing
//! draw calls is left to the host.
//!
//! ## API overview
//!
//! - [`OverlayManager`]: registry of overlays, templates, and element factories; drives the frame.
//! - [`ElementTree`]: storage for every element, with placement, alignment, visibility, derived
//!   geometry, container operations, and parameters.
//! - [`Overlay`] / [`OverlayMut`]: a layer's state and the operations that touch its elements.
//! - [`ElementKind`]: what an element draws. Built-in kinds live in [`elements`].
//! - [`Properties`] / [`PropertyCommand`]: static tables of named, string-valued parameters.
//! - [`metrics`]: conversions between relative and metrics-mode units.
//!
//! Key operations:
//! - [`OverlayManager::create`] / [`OverlayManager::create_element`] → ids.
//! - [`ElementTree::add_child`] and [`OverlayMut::add_element`] build the hierarchy.
//! - [`ElementTree::set_position`] / [`ElementTree::set_dimensions`] /
//!   [`ElementTree::set_metrics_mode`] edit placement.
//! - [`OverlayManager::set_param`] / [`OverlayManager::param`] reach kind-specific state by name.
//! - [`OverlayManager::queue_for_rendering`] updates and enqueues every visible overlay.
//! - [`OverlayMut::find_element_at`] returns the topmost element under a screen point.
//!
//! ## Logging
//!
//! Recoverable problems (geometry that cannot be built, unknown overlays, rejected parameters
//! applied in bulk) are reported through [`tracing`] and never abort the frame.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod arena;
mod container;
mod element;
pub mod elements;
mod error;
mod factory;
mod manager;
pub mod metrics;
mod overlay;
mod property;
mod render;
mod tree;
mod types;

#[cfg(test)]
mod testing;

pub use element::{ElementKind, GeometryContext};
pub use error::{GeometryError, OverlayError, PropertyError};
pub use factory::{ElementFactories, ElementFactory, NameSequence};
pub use manager::OverlayManager;
pub use overlay::{DEFAULT_OVERLAY_Z_ORDER, MAX_OVERLAY_Z_ORDER, Overlay, OverlayMut};
pub use property::{
    Properties, PropertyAccess, PropertyCommand, format_f64, parse_bool, parse_f64, parse_floats,
};
pub use render::{
    Material, MaterialLibrary, MaterialSet, RenderEntry, RenderGroup, RenderItem, RenderList,
    RenderOperation, RenderQueue, Topology,
};
pub use tree::ElementTree;
pub use types::{
    ElementFlags, ElementId, HorizontalAlignment, MetricsMode, OverlayId, Placement,
    VerticalAlignment, Viewport,
};
