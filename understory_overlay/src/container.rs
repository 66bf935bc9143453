// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Container behaviour: children, z-order assignment, hit testing, initialization order,
//! cloning, and template instantiation.

use alloc::format;
use alloc::string::String;

use kurbo::{Point, Rect};

use crate::error::OverlayError;
use crate::factory::ElementFactories;
use crate::render::MaterialLibrary;
use crate::tree::{Dirty, ElementTree};
use crate::types::{ElementFlags, ElementId, OverlayId};

/// Inclusive containment: points on the right and bottom edges count as inside.
fn contains_inclusive(rect: Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

impl ElementTree {
    /// Attach `child` under the container `parent`.
    ///
    /// The child is synchronized right away: it learns its parent and overlay, takes the
    /// z-order following its parent's, inherits the world transform and viewport, and is
    /// initialized if the parent already is.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a container, if `child` already has a parent or is the root of
    /// an overlay, if `child` is `parent` or one of its ancestors, or if `parent` already has a
    /// child with the same name.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) {
        let (name, is_container) = {
            let c = self.node(child);
            assert!(
                c.parent.is_none(),
                "element '{}' already has a parent",
                c.name
            );
            assert!(
                c.overlay.is_none(),
                "element '{}' is the root of an overlay",
                c.name
            );
            (c.name.clone(), c.kind.is_container())
        };
        let mut ancestor = Some(parent);
        while let Some(a) = ancestor {
            assert!(a != child, "element '{name}' cannot become its own descendant");
            ancestor = self.node(a).parent;
        }
        let p = self.node_mut(parent);
        assert!(
            p.kind.is_container(),
            "element '{}' is not a container",
            p.name
        );
        assert!(
            !p.child_lookup.contains_key(&name),
            "child with the name '{name}' already exists in '{}'",
            p.name
        );
        p.children.push(child);
        p.child_lookup.insert(name, child);
        if is_container {
            p.child_containers.push(child);
        }
        let (overlay, z, transform, viewport, initialized) = (
            p.overlay,
            p.z_order,
            p.world_transform,
            p.viewport,
            p.initialized,
        );

        self.node_mut(child).parent = Some(parent);
        self.notify_overlay(child, overlay);
        self.notify_z_order(child, z + 1);
        self.notify_world_transform(child, transform);
        self.notify_viewport(child, viewport);
        if initialized {
            self.initialize_subtree(child);
        }
    }

    /// Detach the child called `name` from `parent` and return it.
    ///
    /// The child keeps living, unattached, until it is destroyed or added elsewhere.
    ///
    /// # Panics
    ///
    /// Panics if `parent` has no child with that name.
    pub fn remove_child(&mut self, parent: ElementId, name: &str) -> ElementId {
        let child = self.child(parent, name);
        self.unlink_child(parent, child);
        self.notify_overlay(child, None);
        self.mark_subtree_dirty(child, Dirty::DERIVED | Dirty::POSITIONS);
        child
    }

    pub(crate) fn unlink_child(&mut self, parent: ElementId, child: ElementId) {
        let name = self.node(child).name.clone();
        let p = self.node_mut(parent);
        p.children.retain(|c| *c != child);
        p.child_containers.retain(|c| *c != child);
        p.child_lookup.remove(&name);
        self.node_mut(child).parent = None;
    }

    /// The child of `parent` called `name`.
    ///
    /// # Panics
    ///
    /// Panics if there is no such child.
    pub fn child(&self, parent: ElementId, name: &str) -> ElementId {
        let p = self.node(parent);
        match p.child_lookup.get(name) {
            Some(id) => *id,
            None => panic!("child with the name '{name}' not found in '{}'", p.name),
        }
    }

    /// The child of `parent` called `name`, if any.
    pub fn find_child(&self, parent: ElementId, name: &str) -> Option<ElementId> {
        self.node(parent).child_lookup.get(name).copied()
    }

    /// Child containers of `parent`, in insertion order.
    pub fn child_containers(&self, parent: ElementId) -> &[ElementId] {
        &self.node(parent).child_containers
    }

    /// Set the overlay back-reference of a whole subtree.
    pub(crate) fn notify_overlay(&mut self, id: ElementId, overlay: Option<OverlayId>) {
        let children = {
            let n = self.node_mut(id);
            n.overlay = overlay;
            n.children.clone()
        };
        for c in children {
            self.notify_overlay(c, overlay);
        }
    }

    /// Assign z-orders to a subtree in pre-order, starting with `z` for `id`.
    ///
    /// Returns the first z-order after the subtree, so siblings can be folded over.
    pub fn notify_z_order(&mut self, id: ElementId, z: i32) -> i32 {
        let children = {
            let n = self.node_mut(id);
            n.z_order = z;
            n.children.clone()
        };
        let mut next = z + 1;
        for c in children {
            next = self.notify_z_order(c, next);
        }
        next
    }

    /// Find the element under `point` (relative screen units) in the subtree at `id`.
    ///
    /// An element is hit if it is visible and its clipping region contains the point. A
    /// container that is hit and forwards events scans all of its visible, enabled children;
    /// a child's result replaces the running result when the child's z-order is at least the
    /// best seen so far, so on equal z-orders the later child wins.
    pub fn find_element_at(&mut self, id: ElementId, point: Point) -> Option<ElementId> {
        let flags = self.node(id).flags;
        if !flags.contains(ElementFlags::VISIBLE) {
            return None;
        }
        if !contains_inclusive(self.resolved_clip(id), point) {
            return None;
        }
        if !self.node(id).kind.is_container() || !flags.contains(ElementFlags::CHILD_EVENTS) {
            return Some(id);
        }

        let mut found = id;
        let mut best_z = -1;
        for c in self.node(id).children.clone() {
            let n = self.node(c);
            if !n.flags.contains(ElementFlags::VISIBLE | ElementFlags::ENABLED) {
                continue;
            }
            let z = n.z_order;
            if z >= best_z
                && let Some(hit) = self.find_element_at(c, point)
            {
                best_z = z;
                found = hit;
            }
        }
        Some(found)
    }

    /// Initialize a subtree: child containers first, then the remaining children, then the
    /// element itself. Already initialized elements are skipped.
    pub(crate) fn initialize_subtree(&mut self, id: ElementId) {
        let n = self.node(id);
        let containers = n.child_containers.clone();
        let children = n.children.clone();
        for c in containers {
            self.initialize_subtree(c);
        }
        for c in children {
            self.initialize_subtree(c);
        }
        self.initialize_node(id);
    }

    /// Create a same-typed copy of `id` named `<instance_name>/<name>`.
    ///
    /// Every property is copied through the property tables and the copy remembers `id` as its
    /// source template. Cloneable children of a container are cloned recursively, with the same
    /// instance name, and attached to the copy. On error nothing is left behind.
    pub fn clone_element(
        &mut self,
        id: ElementId,
        instance_name: &str,
        factories: &ElementFactories,
        materials: &dyn MaterialLibrary,
    ) -> Result<ElementId, OverlayError> {
        let (name, type_name) = {
            let n = self.node(id);
            (format!("{instance_name}/{}", n.name), n.kind.type_name())
        };
        let copy = self.insert(name, factories.create(type_name)?);
        if let Err(err) = self.fill_clone(id, copy, instance_name, factories, materials) {
            self.destroy(copy);
            return Err(err);
        }
        Ok(copy)
    }

    fn fill_clone(
        &mut self,
        original: ElementId,
        copy: ElementId,
        instance_name: &str,
        factories: &ElementFactories,
        materials: &dyn MaterialLibrary,
    ) -> Result<(), OverlayError> {
        self.copy_params(original, copy, materials)?;
        self.node_mut(copy).source_template = Some(original);
        if !self.node(original).kind.is_container() || !self.node(copy).kind.is_container() {
            return Ok(());
        }
        for c in self.node(original).children.clone() {
            if !self.is_cloneable(c) {
                continue;
            }
            let child = self.clone_element(c, instance_name, factories, materials)?;
            self.add_child(copy, child);
        }
        Ok(())
    }

    /// Make `id` a copy of `template`: copy its properties and, for containers, instantiate
    /// each cloneable template child as `<name of id>/<child name>`, recursively.
    pub fn copy_from_template(
        &mut self,
        id: ElementId,
        template: ElementId,
        factories: &ElementFactories,
        materials: &dyn MaterialLibrary,
    ) -> Result<(), OverlayError> {
        self.copy_params(template, id, materials)?;
        self.node_mut(id).source_template = Some(template);
        if !self.node(template).kind.is_container() || !self.node(id).kind.is_container() {
            return Ok(());
        }
        let prefix = self.node(id).name.clone();
        for c in self.node(template).children.clone() {
            if !self.is_cloneable(c) {
                continue;
            }
            let (name, type_name) = {
                let n = self.node(c);
                (child_name(&prefix, &n.name), n.kind.type_name())
            };
            let child = self.insert(name, factories.create(type_name)?);
            if let Err(err) = self.copy_from_template(child, c, factories, materials) {
                self.destroy(child);
                return Err(err);
            }
            self.add_child(id, child);
        }
        Ok(())
    }
}

fn child_name(prefix: &str, name: &str) -> String {
    format!("{prefix}/{name}")
}
