// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use kurbo::{Point, Vec2};

use crate::element::{ElementKind, GeometryContext};
use crate::error::GeometryError;
use crate::property::{
    Properties, PropertyCommand, format_f64, invalid, parse_bool, parse_f64, parse_floats,
};
use crate::render::{RenderOperation, Topology};

use super::to_clip;

/// Number of texture layers a panel keeps tiling factors for.
pub const MAX_TEXTURE_LAYERS: usize = 8;

/// A rectangle filled with its material, optionally tiled per texture layer.
///
/// Panels are containers. A transparent panel is never drawn itself but still lays out and
/// draws its children, which makes it the usual choice for grouping.
#[derive(Clone, Debug)]
pub struct Panel {
    transparent: bool,
    tiling: [Vec2; MAX_TEXTURE_LAYERS],
    uv_top_left: Point,
    uv_bottom_right: Point,
    op: RenderOperation,
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel {
    /// Factory type name.
    pub const TYPE_NAME: &'static str = "Panel";

    /// An opaque panel with unit tiling and full-texture UVs.
    pub fn new() -> Self {
        Self {
            transparent: false,
            tiling: [Vec2::new(1.0, 1.0); MAX_TEXTURE_LAYERS],
            uv_top_left: Point::ZERO,
            uv_bottom_right: Point::new(1.0, 1.0),
            op: RenderOperation::new(Topology::TriangleStrip),
        }
    }

    /// Returns true if the panel itself is not drawn.
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Skip drawing the panel itself; children are unaffected.
    pub fn set_transparent(&mut self, transparent: bool) {
        self.transparent = transparent;
    }

    /// Tiling factors of `layer`.
    ///
    /// # Panics
    ///
    /// Panics if `layer >= MAX_TEXTURE_LAYERS`.
    pub fn tiling(&self, layer: usize) -> Vec2 {
        self.tiling[layer]
    }

    /// Repeat the texture of `layer` `x` times across and `y` times down.
    ///
    /// # Panics
    ///
    /// Panics if `layer >= MAX_TEXTURE_LAYERS` or a factor is zero.
    pub fn set_tiling(&mut self, layer: usize, x: f64, y: f64) {
        assert!(
            layer < MAX_TEXTURE_LAYERS,
            "texture layer {layer} out of range"
        );
        assert!(x != 0.0 && y != 0.0, "tiling factors must be non-zero");
        self.tiling[layer] = Vec2::new(x, y);
    }

    /// Texture coordinates of the top-left and bottom-right corners.
    pub fn uv(&self) -> (Point, Point) {
        (self.uv_top_left, self.uv_bottom_right)
    }

    /// Show a sub-rectangle of the texture.
    pub fn set_uv(&mut self, top_left: Point, bottom_right: Point) {
        self.uv_top_left = top_left;
        self.uv_bottom_right = bottom_right;
    }

    /// Number of UV sets built by the last texture rebuild.
    pub fn tex_coords_layers(&self) -> usize {
        self.op.tex_coords.len()
    }
}

/// A texture layer written as a float, if it names one of the panel's layers.
fn layer_index(layer: f64) -> Option<usize> {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Round-tripped below to reject fractional or negative layers."
    )]
    let index = layer as usize;
    #[allow(clippy::cast_precision_loss, reason = "Layer indices are tiny.")]
    let exact = index as f64 == layer;
    (exact && index < MAX_TEXTURE_LAYERS).then_some(index)
}

impl Properties for Panel {
    const PROPERTIES: &'static [PropertyCommand<Self>] = &[
        PropertyCommand {
            name: "transparent",
            description: "Whether the panel itself is drawn; children are drawn regardless.",
            get: |p| p.transparent.to_string(),
            set: |p, v| {
                p.transparent = parse_bool("transparent", v)?;
                Ok(())
            },
        },
        PropertyCommand {
            name: "tiling",
            description: "Texture tiling as one or more 'layer x y' triples. Reads back layer 0 \
                          and every other layer that is not 1 1.",
            get: |p| {
                let mut out = String::new();
                for (layer, t) in p.tiling.iter().enumerate() {
                    if layer != 0 && *t == Vec2::new(1.0, 1.0) {
                        continue;
                    }
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(&format!(
                        "{layer} {} {}",
                        format_f64(t.x),
                        format_f64(t.y)
                    ));
                }
                out
            },
            set: |p, v| {
                let values = v
                    .split_whitespace()
                    .map(|part| parse_f64("tiling", part))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| invalid("tiling", v))?;
                if values.is_empty() || values.len() % 3 != 0 {
                    return Err(invalid("tiling", v));
                }
                let mut layers = Vec::with_capacity(values.len() / 3);
                for triple in values.chunks_exact(3) {
                    let (x, y) = (triple[1], triple[2]);
                    match layer_index(triple[0]) {
                        Some(index) if x != 0.0 && y != 0.0 => layers.push((index, x, y)),
                        _ => return Err(invalid("tiling", v)),
                    }
                }
                for (index, x, y) in layers {
                    p.set_tiling(index, x, y);
                }
                Ok(())
            },
        },
        PropertyCommand {
            name: "uv_coords",
            description: "Texture sub-rectangle: 'u1 v1 u2 v2'.",
            get: |p| {
                format!(
                    "{} {} {} {}",
                    format_f64(p.uv_top_left.x),
                    format_f64(p.uv_top_left.y),
                    format_f64(p.uv_bottom_right.x),
                    format_f64(p.uv_bottom_right.y)
                )
            },
            set: |p, v| {
                let [u1, v1, u2, v2] = parse_floats::<4>("uv_coords", v)?;
                p.set_uv(Point::new(u1, v1), Point::new(u2, v2));
                Ok(())
            },
        },
    ];
}

impl ElementKind for Panel {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn is_container(&self) -> bool {
        true
    }

    fn rebuild_position_geometry(
        &mut self,
        ctx: &GeometryContext<'_>,
    ) -> Result<(), GeometryError> {
        // 0-----2
        // |    /|
        // |  /  |
        // |/    |
        // 1-----3
        let top_left = to_clip(ctx.derived.x0, ctx.derived.y0);
        let right = top_left.x + ctx.derived.width() * 2.0;
        let bottom = top_left.y - ctx.derived.height() * 2.0;
        self.op.positions.clear();
        self.op.positions.extend([
            top_left,
            Point::new(top_left.x, bottom),
            Point::new(right, top_left.y),
            Point::new(right, bottom),
        ]);
        Ok(())
    }

    fn rebuild_texture_geometry(
        &mut self,
        ctx: &GeometryContext<'_>,
    ) -> Result<(), GeometryError> {
        let Some(material) = ctx.material else {
            self.op.tex_coords.clear();
            if self.transparent {
                return Ok(());
            }
            return Err(GeometryError::MissingMaterial(ctx.name.to_string()));
        };
        let layers = material.texture_layers.min(MAX_TEXTURE_LAYERS);
        let tl = self.uv_top_left;
        self.op.tex_coords = self.tiling[..layers]
            .iter()
            .map(|tile| {
                let upper_x = self.uv_bottom_right.x * tile.x;
                let upper_y = self.uv_bottom_right.y * tile.y;
                Vec::from([
                    tl,
                    Point::new(tl.x, upper_y),
                    Point::new(upper_x, tl.y),
                    Point::new(upper_x, upper_y),
                ])
            })
            .collect();
        Ok(())
    }

    fn render_operation(&self) -> &RenderOperation {
        &self.op
    }

    fn renders_self(&self, ctx: &GeometryContext<'_>) -> bool {
        !self.transparent && ctx.material.is_some()
    }
}
