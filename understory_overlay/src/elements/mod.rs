// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in element kinds.
//!
//! - [`Panel`]: a textured rectangle that can hold children.
//! - [`TextArea`]: a single caption laid out as one quad per glyph.

mod panel;
mod text_area;

pub use panel::{MAX_TEXTURE_LAYERS, Panel};
pub use text_area::TextArea;

/// Map a relative screen coordinate to homogeneous clip space (x right, y up).
fn to_clip(x: f64, y: f64) -> kurbo::Point {
    kurbo::Point::new(x * 2.0 - 1.0, -(y * 2.0 - 1.0))
}
