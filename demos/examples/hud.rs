// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small HUD: a pixel-placed bar with a label, cloned from a template, then resized.
//!
//! This example shows how to:
//! - register materials and build elements by type name,
//! - mix metrics modes inside one overlay,
//! - instantiate a template and pick elements under the cursor,
//! - collect the frame's render entries in draw order.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_demos --example hud`

use kurbo::Point;
use understory_overlay::{Material, MaterialSet, MetricsMode, OverlayManager, RenderList, Viewport};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut materials = MaterialSet::new();
    materials.insert(Material::new("Hud/Bar", 1));
    materials.insert(Material::new("Hud/Frame", 2));
    let mut manager = OverlayManager::new(materials);

    // A reusable "stat bar": a framed panel holding a caption.
    let frame = manager
        .create_template("Panel", "StatBar")
        .expect("fresh template name");
    let caption = manager
        .create_element("TextArea", Some("text"))
        .expect("built-in kind");
    let applied = manager.apply_params(
        frame,
        [
            ("metrics_mode", "pixels"),
            ("width", "200"),
            ("height", "24"),
            ("material", "Hud/Frame"),
            ("tiling", "1 4 1"),
        ],
    );
    tracing::info!(applied, "configured StatBar template");
    manager.apply_params(
        caption,
        [("left", "0.01"), ("top", "0.005"), ("char_height", "0.02")],
    );
    manager.tree_mut().add_child(frame, caption);

    let hud = manager.create("hud").expect("fresh overlay name");
    let root = manager
        .create_element("Panel", Some("root"))
        .expect("built-in kind");
    manager
        .set_param(root, "transparent", "true")
        .expect("known param");

    let health = manager
        .create_from_template("StatBar", None, "health")
        .expect("template exists");
    manager.set_param(health, "material", "Hud/Bar").expect("known material");
    manager.tree_mut().set_position(health, 16.0, 16.0);
    if let Some(text) = manager.tree().find_child(health, "health/text") {
        manager.set_param(text, "caption", "HP 87/100").expect("known param");
    }

    let fps = manager
        .create_element("TextArea", Some("fps"))
        .expect("built-in kind");
    manager.apply_params(
        fps,
        [
            ("caption", "FPS 60"),
            ("horz_align", "right"),
            ("alignment", "right"),
            ("left", "-0.01"),
            ("top", "0.01"),
        ],
    );

    manager.tree_mut().add_child(root, health);
    manager.tree_mut().add_child(root, fps);
    {
        let mut hud = manager.overlay_mut(hud).expect("live overlay");
        hud.add_element(root).expect("root is a container");
        hud.show();
    }

    for viewport in [Viewport::new(1280, 720), Viewport::new(1920, 1080)] {
        let mut queue = RenderList::new();
        manager.queue_for_rendering(&mut queue, viewport);
        println!("frame at {}x{}:", viewport.width, viewport.height);
        for entry in queue.sorted() {
            println!(
                "  {:>6} {:<16} {:<10} {:>3} vertices",
                entry.priority,
                entry.name,
                entry.material.as_deref().unwrap_or("-"),
                entry.vertex_count,
            );
        }
        let bar = manager.tree_mut().derived_rect(health);
        println!("  health bar covers {bar:?} of the screen");
    }

    // Switching to relative units keeps the bar where it is on screen.
    manager
        .tree_mut()
        .set_metrics_mode(health, MetricsMode::Relative);
    println!("health placement: {:?}", manager.tree().placement(health));

    let cursor = Point::new(0.02, 0.02);
    let picked = manager
        .overlay_mut(hud)
        .and_then(|mut hud| hud.find_element_at(cursor));
    let name = picked.and_then(|id| manager.tree().name(id));
    println!("under {cursor:?}: {name:?}");
}
