// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-queue and material collaborators.
//!
//! The overlay engine does not talk to a GPU. Each frame it hands every visible element to a
//! [`RenderQueue`] as a [`RenderItem`], with the element's z-order as priority. Materials are
//! resolved by name through a [`MaterialLibrary`] when the `material` property is set.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Affine, Point};

use crate::types::ElementId;

/// A resolved material, as far as overlay geometry is concerned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Material {
    /// Library name of the material.
    pub name: String,
    /// Number of texture layers of the first pass; one UV set is generated per layer.
    pub texture_layers: usize,
}

impl Material {
    /// A material with the given name and texture layer count.
    pub fn new(name: impl Into<String>, texture_layers: usize) -> Self {
        Self {
            name: name.into(),
            texture_layers,
        }
    }
}

/// Looks materials up by name.
pub trait MaterialLibrary {
    /// Return the material registered under `name`, if any.
    fn material(&self, name: &str) -> Option<Material>;
}

/// A hash-map backed [`MaterialLibrary`].
#[derive(Clone, Debug, Default)]
pub struct MaterialSet {
    materials: HashMap<String, Material>,
}

impl MaterialSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a material.
    pub fn insert(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    /// Remove a material; elements that already resolved it keep their copy.
    pub fn remove(&mut self, name: &str) -> Option<Material> {
        self.materials.remove(name)
    }
}

impl MaterialLibrary for MaterialSet {
    fn material(&self, name: &str) -> Option<Material> {
        self.materials.get(name).cloned()
    }
}

/// Primitive assembly for a [`RenderOperation`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Topology {
    /// Four vertices per quad, strip order.
    #[default]
    TriangleStrip,
    /// Six vertices per quad.
    TriangleList,
}

/// Vertex data produced by an element's geometry callbacks.
///
/// Positions are in homogeneous clip space (`-1..=1`, y up). `tex_coords` holds one UV set per
/// texture layer, each with one entry per position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOperation {
    /// How vertices are assembled.
    pub topology: Topology,
    /// Clip-space vertex positions.
    pub positions: Vec<Point>,
    /// UV sets, one per texture layer.
    pub tex_coords: Vec<Vec<Point>>,
}

impl RenderOperation {
    /// An empty operation with the given topology.
    pub const fn new(topology: Topology) -> Self {
        Self {
            topology,
            positions: Vec::new(),
            tex_coords: Vec::new(),
        }
    }
}

/// Render queue group identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderGroup(pub u8);

impl RenderGroup {
    /// The group overlays are rendered in, after the 3D scene.
    pub const OVERLAY: Self = Self(100);
}

/// One visible element handed to the render queue.
#[derive(Clone, Copy, Debug)]
pub struct RenderItem<'a> {
    /// The submitted element.
    pub element: ElementId,
    /// Element name.
    pub name: &'a str,
    /// Element type name.
    pub type_name: &'static str,
    /// Resolved material, if any.
    pub material: Option<&'a Material>,
    /// Geometry built by the element's callbacks.
    pub operation: &'a RenderOperation,
    /// Transform of the owning overlay.
    pub world_transform: Affine,
}

/// Receives visible elements each frame.
pub trait RenderQueue {
    /// Add an element to the queue. `priority` is the element's z-order.
    fn enqueue(&mut self, item: RenderItem<'_>, priority: u16, group: RenderGroup);
}

/// One entry recorded by a [`RenderList`].
#[derive(Clone, Debug, PartialEq)]
pub struct RenderEntry {
    /// The submitted element.
    pub element: ElementId,
    /// Element name at submission time.
    pub name: String,
    /// Element type name.
    pub type_name: &'static str,
    /// Material name, if any.
    pub material: Option<String>,
    /// Priority passed by the engine.
    pub priority: u16,
    /// Group passed by the engine.
    pub group: RenderGroup,
    /// Number of positions in the submitted geometry.
    pub vertex_count: usize,
}

/// A [`RenderQueue`] that records what was submitted, in submission order.
#[derive(Clone, Debug, Default)]
pub struct RenderList {
    /// Recorded entries.
    pub entries: Vec<RenderEntry>,
}

impl RenderList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries sorted by priority, stable for equal priorities.
    pub fn sorted(&self) -> Vec<&RenderEntry> {
        let mut out: Vec<&RenderEntry> = self.entries.iter().collect();
        out.sort_by_key(|e| (e.group, e.priority));
        out
    }
}

impl RenderQueue for RenderList {
    fn enqueue(&mut self, item: RenderItem<'_>, priority: u16, group: RenderGroup) {
        self.entries.push(RenderEntry {
            element: item.element,
            name: item.name.into(),
            type_name: item.type_name,
            material: item.material.map(|m| m.name.clone()),
            priority,
            group,
            vertex_count: item.operation.positions.len(),
        });
    }
}
