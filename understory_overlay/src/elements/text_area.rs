// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::ToString;
use alloc::vec::Vec;

use kurbo::Point;

use crate::element::{ElementKind, GeometryContext};
use crate::error::GeometryError;
use crate::metrics::guarded_size;
use crate::property::{Properties, PropertyCommand, format_f64, invalid, parse_f64};
use crate::render::{RenderOperation, Topology};
use crate::types::HorizontalAlignment;

use super::to_clip;

/// Glyph width over glyph height for the fixed-pitch font atlas.
const GLYPH_ASPECT: f64 = 0.5;

/// Glyph cells per row (and rows) of the atlas; cell `n` holds the character with code `n`.
const ATLAS_CELLS: u32 = 16;

/// Texture coordinates of a character cell, `(u1, v1, u2, v2)`.
fn glyph_uv(c: char) -> (f64, f64, f64, f64) {
    let code = u32::from(c);
    let code = if code < ATLAS_CELLS * ATLAS_CELLS {
        code
    } else {
        u32::from('?')
    };
    let cell = 1.0 / f64::from(ATLAS_CELLS);
    let u1 = f64::from(code % ATLAS_CELLS) * cell;
    let v1 = f64::from(code / ATLAS_CELLS) * cell;
    (u1, v1, u1 + cell, v1 + cell)
}

/// A caption laid out left to right as one quad per visible glyph.
///
/// Lines break at `\n`. Character height and space width are given in the element's metrics
/// units; each line is justified at the element's left edge according to
/// [`TextArea::alignment`]. Glyph UVs address a 16×16 fixed-pitch atlas indexed by character
/// code, carried in the same pass as positions.
#[derive(Clone, Debug)]
pub struct TextArea {
    char_height: f64,
    /// Zero means "derive from the width of a glyph".
    space_width: f64,
    alignment: HorizontalAlignment,
    text_width: f64,
    op: RenderOperation,
}

impl Default for TextArea {
    fn default() -> Self {
        Self::new()
    }
}

impl TextArea {
    /// Factory type name.
    pub const TYPE_NAME: &'static str = "TextArea";

    /// A text area with a character height of 0.02 and left-justified lines.
    pub fn new() -> Self {
        Self {
            char_height: 0.02,
            space_width: 0.0,
            alignment: HorizontalAlignment::Left,
            text_width: 0.0,
            op: RenderOperation::new(Topology::TriangleList),
        }
    }

    /// Character height in metrics-mode units.
    pub fn char_height(&self) -> f64 {
        self.char_height
    }

    /// Set the character height in metrics-mode units.
    pub fn set_char_height(&mut self, height: f64) {
        self.char_height = height;
    }

    /// Width of a space in metrics-mode units; zero derives it from the glyph width.
    pub fn space_width(&self) -> f64 {
        self.space_width
    }

    /// Set the width of a space in metrics-mode units.
    pub fn set_space_width(&mut self, width: f64) {
        self.space_width = width;
    }

    /// How each line sits relative to the element's left edge.
    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Change line justification.
    pub fn set_alignment(&mut self, alignment: HorizontalAlignment) {
        self.alignment = alignment;
    }

    /// Width of the longest line of the last layout, in relative units.
    pub fn text_width(&self) -> f64 {
        self.text_width
    }
}

impl Properties for TextArea {
    const PROPERTIES: &'static [PropertyCommand<Self>] = &[
        PropertyCommand {
            name: "char_height",
            description: "Character height in metrics-mode units.",
            get: |t| format_f64(t.char_height),
            set: |t, v| {
                t.char_height = parse_f64("char_height", v)?;
                Ok(())
            },
        },
        PropertyCommand {
            name: "space_width",
            description: "Width of a space in metrics-mode units; 0 derives it from the font.",
            get: |t| format_f64(t.space_width),
            set: |t, v| {
                t.space_width = parse_f64("space_width", v)?;
                Ok(())
            },
        },
        PropertyCommand {
            name: "alignment",
            description: "Line justification: left, center, or right.",
            get: |t| t.alignment.name().to_string(),
            set: |t, v| {
                t.alignment =
                    HorizontalAlignment::from_name(v).ok_or_else(|| invalid("alignment", v))?;
                Ok(())
            },
        },
    ];
}

impl ElementKind for TextArea {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn rebuild_position_geometry(
        &mut self,
        ctx: &GeometryContext<'_>,
    ) -> Result<(), GeometryError> {
        let size = guarded_size(&ctx.viewport);
        let aspect_coef = size.y / size.x;
        // Everything below is in clip space, which spans 2 units per screen.
        let char_height = self.char_height * ctx.pixel_scale.y * 2.0;
        let glyph_width = GLYPH_ASPECT * aspect_coef * char_height;
        let space_width = if self.space_width == 0.0 {
            glyph_width
        } else {
            self.space_width * ctx.pixel_scale.x * 2.0
        };

        let origin = to_clip(ctx.derived.x0, ctx.derived.y0);
        let mut positions = Vec::new();
        let mut uvs = Vec::new();
        let mut largest: f64 = 0.0;
        let mut top = origin.y;

        for line in ctx.caption.split('\n') {
            let length: f64 = line
                .chars()
                .map(|c| if c == ' ' { space_width } else { glyph_width })
                .sum();
            let mut left = match self.alignment {
                HorizontalAlignment::Left => origin.x,
                HorizontalAlignment::Center => origin.x - length * 0.5,
                HorizontalAlignment::Right => origin.x - length,
            };
            for c in line.chars() {
                if c == ' ' {
                    left += space_width;
                    continue;
                }
                let (u1, v1, u2, v2) = glyph_uv(c);
                let right = left + glyph_width;
                let bottom = top - char_height;
                // Two triangles: (tl, bl, tr) and (tr, bl, br).
                positions.extend([
                    Point::new(left, top),
                    Point::new(left, bottom),
                    Point::new(right, top),
                    Point::new(right, top),
                    Point::new(left, bottom),
                    Point::new(right, bottom),
                ]);
                uvs.extend([
                    Point::new(u1, v1),
                    Point::new(u1, v2),
                    Point::new(u2, v1),
                    Point::new(u2, v1),
                    Point::new(u1, v2),
                    Point::new(u2, v2),
                ]);
                left = right;
            }
            largest = largest.max(length);
            top -= char_height;
        }

        self.text_width = largest * 0.5;
        self.op.positions = positions;
        self.op.tex_coords.clear();
        self.op.tex_coords.push(uvs);
        Ok(())
    }

    fn rebuild_texture_geometry(
        &mut self,
        _ctx: &GeometryContext<'_>,
    ) -> Result<(), GeometryError> {
        // UVs are produced together with positions.
        Ok(())
    }

    fn render_operation(&self) -> &RenderOperation {
        &self.op
    }

    fn renders_self(&self, ctx: &GeometryContext<'_>) -> bool {
        !ctx.caption.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyAccess;
    use crate::testing::approx;
    use crate::types::{MetricsMode, Viewport};
    use kurbo::Rect;

    fn ctx<'a>(caption: &'a str, viewport: Viewport, mode: MetricsMode) -> GeometryContext<'a> {
        let r = Rect::new(0.5, 0.5, 1.0, 0.6);
        GeometryContext {
            name: "label",
            derived: r,
            clip: r,
            z_order: 3,
            viewport,
            metrics_mode: mode,
            pixel_scale: crate::metrics::pixel_scale(mode, &viewport),
            caption,
            material: None,
        }
    }

    #[test]
    fn one_quad_per_visible_glyph() {
        let mut text = TextArea::new();
        let c = ctx("ab c\nd", Viewport::new(800, 800), MetricsMode::Relative);
        text.rebuild_position_geometry(&c).unwrap();
        let op = text.render_operation();
        assert_eq!(op.topology, Topology::TriangleList);
        assert_eq!(op.positions.len(), 4 * 6, "spaces and newlines emit nothing");
        assert_eq!(op.tex_coords.len(), 1);
        assert_eq!(op.tex_coords[0].len(), op.positions.len());

        // Square viewport: glyph is half as wide as tall; char height 0.02 → 0.04 clip units.
        let first = &op.positions[..6];
        assert!(approx(first[0].x, 0.0) && approx(first[0].y, 0.0));
        assert!(approx(first[1].y, -0.04));
        assert!(approx(first[2].x, 0.02));
        // `d` starts the second line back at the left edge.
        let d = op.positions[18];
        assert!(approx(d.x, 0.0) && approx(d.y, -0.04));
        // Widest line: a, b, space, c.
        assert!(approx(text.text_width(), 0.04));
    }

    #[test]
    fn right_alignment_ends_at_origin() {
        let mut text = TextArea::new();
        text.set_property("alignment", "right").unwrap();
        text.set_property("space_width", "0.05").unwrap();
        let c = ctx("x y", Viewport::new(800, 800), MetricsMode::Relative);
        text.rebuild_position_geometry(&c).unwrap();
        let last = text.render_operation().positions[11];
        assert!(approx(last.x, 0.0), "right edge of last glyph is {}", last.x);
        let first = text.render_operation().positions[0];
        assert!(approx(first.x, -(0.02 + 0.1 + 0.02)));
    }

    #[test]
    fn pixel_char_height_scales_with_viewport() {
        let mut text = TextArea::new();
        text.set_char_height(30.0);
        let c = ctx("A", Viewport::new(600, 600), MetricsMode::Pixels);
        text.rebuild_position_geometry(&c).unwrap();
        let p = &text.render_operation().positions;
        assert!(approx(p[0].y - p[1].y, 0.1));
    }

    #[test]
    fn atlas_cells() {
        let (u1, v1, u2, v2) = glyph_uv('A');
        assert!(approx(u1, 1.0 / 16.0) && approx(v1, 4.0 / 16.0));
        assert!(approx(u2 - u1, 1.0 / 16.0) && approx(v2 - v1, 1.0 / 16.0));
        let (_, row, _, _) = glyph_uv('é');
        assert!(approx(row, 14.0 / 16.0), "latin-1 stays in the atlas");
        assert_eq!(glyph_uv('\u{2603}'), glyph_uv('?'));
    }

    #[test]
    fn empty_caption_is_not_drawn() {
        let text = TextArea::new();
        let vp = Viewport::new(800, 600);
        assert!(!text.renders_self(&ctx("", vp, MetricsMode::Relative)));
        assert!(text.renders_self(&ctx("hi", vp, MetricsMode::Relative)));
    }
}
