// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test helpers shared by the unit tests of several modules.

use alloc::boxed::Box;
use alloc::string::ToString;

use kurbo::Rect;

use crate::element::{ElementKind, GeometryContext};
use crate::error::GeometryError;
use crate::factory::ElementFactories;
use crate::property::{Properties, PropertyCommand, format_f64, parse_f64};
use crate::render::{RenderOperation, Topology};

pub(crate) const EPS: f64 = 1e-9;

pub(crate) fn approx(a: f64, b: f64) -> bool {
    let d = a - b;
    d < EPS && d > -EPS
}

pub(crate) fn approx_rect(a: Rect, b: Rect) -> bool {
    approx(a.x0, b.x0) && approx(a.y0, b.y0) && approx(a.x1, b.x1) && approx(a.y1, b.y1)
}

/// Element kind that records what the tree asked of it.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub(crate) container: bool,
    pub(crate) fail: bool,
    pub(crate) weight: f64,
    pub(crate) initialized: u32,
    pub(crate) position_builds: u32,
    pub(crate) texture_builds: u32,
    pub(crate) last_derived: Option<Rect>,
    op: RenderOperation,
}

impl Recorder {
    pub(crate) fn leaf() -> Self {
        Self::default()
    }

    pub(crate) fn container() -> Self {
        Self {
            container: true,
            ..Self::default()
        }
    }
}

impl Properties for Recorder {
    const PROPERTIES: &'static [PropertyCommand<Self>] = &[PropertyCommand {
        name: "weight",
        description: "Arbitrary number carried through clones.",
        get: |p| format_f64(p.weight),
        set: |p, v| {
            p.weight = parse_f64("weight", v)?;
            Ok(())
        },
    }];
}

impl ElementKind for Recorder {
    fn type_name(&self) -> &'static str {
        if self.container {
            "RecorderContainer"
        } else {
            "Recorder"
        }
    }

    fn is_container(&self) -> bool {
        self.container
    }

    fn initialize(&mut self, _ctx: &GeometryContext<'_>) {
        self.initialized += 1;
    }

    fn rebuild_position_geometry(
        &mut self,
        ctx: &GeometryContext<'_>,
    ) -> Result<(), GeometryError> {
        self.position_builds += 1;
        self.last_derived = Some(ctx.derived);
        if self.fail {
            return Err(GeometryError::MissingMaterial(ctx.name.to_string()));
        }
        self.op = RenderOperation::new(Topology::TriangleStrip);
        self.op.positions.extend([ctx.derived.origin(); 4]);
        Ok(())
    }

    fn rebuild_texture_geometry(
        &mut self,
        ctx: &GeometryContext<'_>,
    ) -> Result<(), GeometryError> {
        self.texture_builds += 1;
        if self.fail {
            return Err(GeometryError::MissingMaterial(ctx.name.to_string()));
        }
        Ok(())
    }

    fn render_operation(&self) -> &RenderOperation {
        &self.op
    }
}

/// Factories for the recorder kinds plus the built-in ones.
pub(crate) fn recorder_factories() -> ElementFactories {
    let mut factories = ElementFactories::with_defaults();
    factories.register("Recorder", || Box::new(Recorder::leaf()) as Box<dyn ElementKind>);
    factories.register("RecorderContainer", || {
        Box::new(Recorder::container()) as Box<dyn ElementKind>
    });
    factories
}
