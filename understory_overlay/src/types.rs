// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: handles, metrics modes, alignment, placements, viewport, and flags.

use kurbo::Vec2;

/// Identifier for an element in an [`ElementTree`](crate::ElementTree) (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementId(pub(crate) u32, pub(crate) u32);

/// Identifier for an overlay owned by an [`OverlayManager`](crate::OverlayManager) (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct OverlayId(pub(crate) u32, pub(crate) u32);

/// How an element interprets the coordinates handed to its setters.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum MetricsMode {
    /// Fractions of the parent screen, `0.0..=1.0` on both axes.
    #[default]
    Relative,
    /// Absolute pixels of the current viewport.
    Pixels,
    /// Pixel-like units where the screen is 10000 units tall and units stay square.
    RelativeAspectAdjusted,
}

impl MetricsMode {
    /// Script name of the mode.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Relative => "relative",
            Self::Pixels => "pixels",
            Self::RelativeAspectAdjusted => "relative_aspect_adjusted",
        }
    }

    /// Parse a script name, as produced by [`MetricsMode::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "relative" => Some(Self::Relative),
            "pixels" => Some(Self::Pixels),
            "relative_aspect_adjusted" => Some(Self::RelativeAspectAdjusted),
            _ => None,
        }
    }
}

/// Which horizontal point of the parent rectangle is the origin of `left`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum HorizontalAlignment {
    /// Parent's left edge.
    #[default]
    Left,
    /// Midpoint of the parent's span.
    Center,
    /// Parent's right edge; pass a negative `left` to inset.
    Right,
}

impl HorizontalAlignment {
    /// Script name of the alignment.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }

    /// Parse a script name, as produced by [`HorizontalAlignment::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Which vertical point of the parent rectangle is the origin of `top`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum VerticalAlignment {
    /// Parent's top edge.
    #[default]
    Top,
    /// Midpoint of the parent's span.
    Center,
    /// Parent's bottom edge; pass a negative `top` to inset.
    Bottom,
}

impl VerticalAlignment {
    /// Script name of the alignment.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
        }
    }

    /// Parse a script name, as produced by [`VerticalAlignment::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "top" => Some(Self::Top),
            "center" => Some(Self::Center),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Local position and size of an element in one unit system.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placement {
    /// Offset from the aligned origin along x.
    pub left: f64,
    /// Offset from the aligned origin along y.
    pub top: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

impl Placement {
    /// Create a placement from its four components.
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Multiply x components by `scale.x` and y components by `scale.y`.
    pub fn scaled(self, scale: Vec2) -> Self {
        Self {
            left: self.left * scale.x,
            top: self.top * scale.y,
            width: self.width * scale.x,
            height: self.height * scale.y,
        }
    }

    /// Divide x components by `scale.x` and y components by `scale.y`.
    pub fn unscaled(self, scale: Vec2) -> Self {
        Self {
            left: self.left / scale.x,
            top: self.top / scale.y,
            width: self.width / scale.x,
            height: self.height / scale.y,
        }
    }
}

/// Viewport description supplied by the render system each frame.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Horizontal offset, in pixels, mapping texel origins to pixel origins.
    pub horizontal_texel_offset: f64,
    /// Vertical offset, in pixels, mapping texel origins to pixel origins.
    pub vertical_texel_offset: f64,
}

impl Viewport {
    /// A viewport of the given pixel size without texel offsets.
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            horizontal_texel_offset: 0.0,
            vertical_texel_offset: 0.0,
        }
    }

    /// Set the render system's texel offsets.
    #[must_use]
    pub const fn with_texel_offsets(mut self, horizontal: f64, vertical: f64) -> Self {
        self.horizontal_texel_offset = horizontal;
        self.vertical_texel_offset = vertical;
        self
    }

    /// Returns `true` if both viewports have the same pixel size.
    pub const fn same_size(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }
}

bitflags::bitflags! {
    /// Per-element switches for rendering, picking, and cloning.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ElementFlags: u8 {
        /// Element is submitted for rendering and found by hit tests.
        const VISIBLE      = 0b0000_0001;
        /// Element takes part in hit testing below its container.
        const ENABLED      = 0b0000_0010;
        /// Element is copied when its container is cloned or instantiated from a template.
        const CLONEABLE    = 0b0000_0100;
        /// Container forwards hit tests to its children.
        const CHILD_EVENTS = 0b0000_1000;
    }
}

impl Default for ElementFlags {
    fn default() -> Self {
        Self::all()
    }
}
