// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshots of a scene for post-mortem inspection.
//!
//! [`scene_json`] walks the tree from its roots and dumps placement, derived
//! geometry, layout, and cache bookkeeping per node. Derived values are read
//! through the raw `*_at` accessors and therefore reflect the last
//! [`Scene::evaluate`].

use kurbo::{Affine, Point};
use serde_json::{Value, json};
use trellis_core::props::Origin;
use trellis_core::scene::{LayoutMode, NodeId, NodeKind, Scene};

/// Returns a JSON array with one object per root, children nested.
#[must_use]
pub fn scene_json(scene: &Scene) -> Value {
    let roots: Vec<Value> = scene
        .roots()
        .into_iter()
        .map(|id| node_json(scene, id))
        .collect();
    json!({
        "frame_index": scene.frame_index(),
        "viewport_zoom": scene.viewport_zoom(),
        "cache": {
            "max_total_area": scene.cache_stats().max_total_area,
            "allocated_area": scene.cache_stats().allocated_area,
            "side_factor": scene.cache_stats().side_factor,
        },
        "roots": roots,
    })
}

/// Returns the JSON object for one node and its subtree.
#[must_use]
pub fn node_json(scene: &Scene, id: NodeId) -> Value {
    let idx = id.index();
    let p = scene.placement(id);
    let size = scene.size(id);
    let corners = scene.corners_at(idx);
    let cache = scene.cache_status(id);
    let children: Vec<Value> = scene.children(id).map(|c| node_json(scene, c)).collect();

    let kind = match scene.kind_at(idx) {
        NodeKind::Leaf => "leaf",
        NodeKind::Group => match scene.layout_mode(id) {
            LayoutMode::FitContent => "group:fit-content",
            LayoutMode::Fixed => "group:fixed",
        },
    };

    json!({
        "id": format!("{id:?}"),
        "kind": kind,
        "visible": scene.effective_visible_at(idx),
        "placement": {
            "left": p.left,
            "top": p.top,
            "width": size.width,
            "height": size.height,
            "stroke_width": scene.stroke_width(id),
            "scale": [p.scale_x, p.scale_y],
            "skew": [p.skew_x, p.skew_y],
            "angle": p.angle,
            "flip": [p.flip_x, p.flip_y],
            "origin": [origin(p.origin_x), origin(p.origin_y)],
        },
        "absolute": matrix(scene.absolute_matrix_at(idx)),
        "corners": [point(corners.tl), point(corners.tr), point(corners.br), point(corners.bl)],
        "cache": {
            "enabled": cache.enabled,
            "caching": cache.caching,
            "valid": cache.valid,
            "revision": cache.revision,
            "allocated": cache.allocated.map(|s| [s.width, s.height]),
        },
        "children": children,
    })
}

fn origin(o: Origin) -> Value {
    match o {
        Origin::Start => json!("start"),
        Origin::Center => json!("center"),
        Origin::End => json!("end"),
        Origin::Fraction(f) => json!(f),
    }
}

fn matrix(m: Affine) -> Value {
    json!(m.as_coeffs())
}

fn point(p: Point) -> Value {
    json!([p.x, p.y])
}

#[cfg(test)]
mod tests {
    use trellis_core::props::NodeOptions;

    use super::*;

    #[test]
    fn snapshot_nests_children() {
        let mut scene = Scene::new();
        let group = scene.create_group(LayoutMode::FitContent, &NodeOptions::new());
        let leaf = scene.create_leaf(&NodeOptions::new().position(10.0, 20.0).size(30.0, 40.0));
        scene.add_child(group, leaf).unwrap();
        let _ = scene.evaluate();

        let v = scene_json(&scene);
        assert_eq!(v["frame_index"], 1);
        let root = &v["roots"][0];
        assert_eq!(root["kind"], "group:fit-content");
        assert_eq!(root["placement"]["width"], 30.0);
        let child = &root["children"][0];
        assert_eq!(child["kind"], "leaf");
        assert_eq!(child["corners"][0], json!([10.0, 20.0]));
        assert_eq!(child["cache"]["caching"], false);
    }
}
