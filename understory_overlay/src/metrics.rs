// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversions between screen-relative and pixel coordinates.
//!
//! Every element stores its placement twice: once in relative units (fractions of the screen)
//! and once in the units of its [`MetricsMode`]. The functions here are the only place where the
//! two are related: `relative = pixels × scale`.
//!
//! - [`MetricsMode::Pixels`]: `scale = (1 / width, 1 / height)`.
//! - [`MetricsMode::RelativeAspectAdjusted`]: `scale = (1 / (10000 × aspect), 1 / 10000)`, so a
//!   unit covers the same number of physical pixels on both axes.
//! - [`MetricsMode::Relative`]: `scale = (1, 1)`; the "pixel" placement mirrors the relative one.
//!
//! A zero-sized viewport side is treated as 1 pixel.

use kurbo::Vec2;

use crate::types::{MetricsMode, Placement, Viewport};

/// Number of aspect-adjusted units spanning the screen height.
pub const ASPECT_ADJUSTED_UNITS: f64 = 10000.0;

/// Viewport size in pixels with zero sides replaced by one.
pub fn guarded_size(viewport: &Viewport) -> Vec2 {
    let w = if viewport.width == 0 {
        1.0
    } else {
        f64::from(viewport.width)
    };
    let h = if viewport.height == 0 {
        1.0
    } else {
        f64::from(viewport.height)
    };
    Vec2::new(w, h)
}

/// Scale factors mapping `mode` units to relative units for `viewport`.
pub fn pixel_scale(mode: MetricsMode, viewport: &Viewport) -> Vec2 {
    let size = guarded_size(viewport);
    match mode {
        MetricsMode::Relative => Vec2::new(1.0, 1.0),
        MetricsMode::Pixels => Vec2::new(1.0 / size.x, 1.0 / size.y),
        MetricsMode::RelativeAspectAdjusted => Vec2::new(
            1.0 / (ASPECT_ADJUSTED_UNITS * (size.x / size.y)),
            1.0 / ASPECT_ADJUSTED_UNITS,
        ),
    }
}

/// Convert a placement in `mode` units into relative units.
pub fn to_relative(mode: MetricsMode, viewport: &Viewport, pixels: Placement) -> Placement {
    pixels.scaled(pixel_scale(mode, viewport))
}

/// Convert a placement in relative units into `mode` units.
pub fn to_pixels(mode: MetricsMode, viewport: &Viewport, relative: Placement) -> Placement {
    match mode {
        MetricsMode::Relative => relative,
        _ => relative.unscaled(pixel_scale(mode, viewport)),
    }
}

/// Render-system texel offsets expressed in relative units.
pub fn texel_offsets(viewport: &Viewport) -> Vec2 {
    let size = guarded_size(viewport);
    Vec2::new(
        viewport.horizontal_texel_offset / size.x,
        viewport.vertical_texel_offset / size.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        let d = a - b;
        d < EPS && d > -EPS
    }

    fn approx_placement(a: Placement, b: Placement) -> bool {
        approx(a.left, b.left)
            && approx(a.top, b.top)
            && approx(a.width, b.width)
            && approx(a.height, b.height)
    }

    #[test]
    fn scale_factors_per_mode() {
        let vp = Viewport::new(800, 600);
        assert_eq!(pixel_scale(MetricsMode::Relative, &vp), Vec2::new(1.0, 1.0));
        let px = pixel_scale(MetricsMode::Pixels, &vp);
        assert!(approx(px.x, 1.0 / 800.0) && approx(px.y, 1.0 / 600.0));
        let aa = pixel_scale(MetricsMode::RelativeAspectAdjusted, &vp);
        assert!(approx(aa.y, 1.0 / 10000.0));
        assert!(approx(aa.x, 1.0 / (10000.0 * (800.0 / 600.0))));
    }

    #[test]
    fn aspect_adjusted_units_are_square() {
        let vp = Viewport::new(1920, 1080);
        let scale = pixel_scale(MetricsMode::RelativeAspectAdjusted, &vp);
        // One unit in physical pixels along each axis.
        let ux = scale.x * 1920.0;
        let uy = scale.y * 1080.0;
        assert!(approx(ux, uy), "unit is {ux} px wide but {uy} px tall");
    }

    #[test]
    fn zero_viewport_is_guarded() {
        let vp = Viewport::new(0, 0);
        let px = pixel_scale(MetricsMode::Pixels, &vp);
        assert_eq!(px, Vec2::new(1.0, 1.0));
        let aa = pixel_scale(MetricsMode::RelativeAspectAdjusted, &vp);
        assert!(aa.x.is_finite() && aa.y.is_finite());
        assert!(texel_offsets(&Viewport::new(0, 0).with_texel_offsets(0.5, 0.5)).x.is_finite());
    }

    #[test]
    fn round_trip_all_modes() {
        let viewports = [
            Viewport::new(800, 600),
            Viewport::new(1920, 1080),
            Viewport::new(333, 777),
            Viewport::new(0, 480),
        ];
        let placements = [
            Placement::new(0.0, 0.0, 1.0, 1.0),
            Placement::new(0.1, 0.1, 0.2, 0.05),
            Placement::new(-0.25, 0.75, 0.5, 0.125),
            Placement::new(0.333, 0.667, 0.001, 0.999),
        ];
        let modes = [
            MetricsMode::Relative,
            MetricsMode::Pixels,
            MetricsMode::RelativeAspectAdjusted,
        ];
        for vp in &viewports {
            for mode in modes {
                for rel in placements {
                    let px = to_pixels(mode, vp, rel);
                    let back = to_relative(mode, vp, px);
                    assert!(
                        approx_placement(rel, back),
                        "{mode:?} at {vp:?}: {rel:?} -> {px:?} -> {back:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn pixels_of_full_screen() {
        let vp = Viewport::new(800, 600);
        let px = to_pixels(MetricsMode::Pixels, &vp, Placement::new(0.5, 0.5, 1.0, 1.0));
        assert!(approx_placement(
            px,
            Placement::new(400.0, 300.0, 800.0, 600.0)
        ));
    }

    #[test]
    fn texel_offsets_are_relative() {
        let vp = Viewport::new(800, 600).with_texel_offsets(-0.5, -0.5);
        let off = texel_offsets(&vp);
        assert!(approx(off.x, -0.5 / 800.0) && approx(off.y, -0.5 / 600.0));
    }
}
