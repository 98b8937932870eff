//! Shared scene builders for optimizer integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use redlilium_optimizer::animation::{AnimationClip, KeyframeTrack};
use redlilium_optimizer::geometry::{names, Geometry};
use redlilium_optimizer::scene::{Material, Mesh, NodeId, SceneGraph, SceneNode};

/// Install a test logger once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub fn materials(count: usize) -> Vec<Arc<Material>> {
    (0..count)
        .map(|i| Arc::new(Material::new(format!("material_{i}"))))
        .collect()
}

/// Clip with position, quaternion and scale tracks targeting `node`.
pub fn trs_clip(node: &str) -> AnimationClip {
    let times = vec![0.0, 0.5, 1.0];
    AnimationClip::new(
        "action",
        vec![
            KeyframeTrack::new(format!("{node}.position"), times.clone(), vec![0.0; 9]),
            KeyframeTrack::new(
                format!("{node}.quaternion"),
                times.clone(),
                [0.0, 0.0, 0.0, 1.0].repeat(3),
            ),
            KeyframeTrack::new(format!("{node}.scale"), times, vec![1.0; 9]),
        ],
    )
}

/// A group root with one mesh child. Returns `(graph, root, mesh)`.
pub fn single_mesh_scene(name: &str, mesh: Mesh) -> (SceneGraph, NodeId, NodeId) {
    let mut graph = SceneGraph::new();
    let root = graph.add(SceneNode::group("scene"));
    let mesh = graph
        .add_child(root, SceneNode::mesh(name, mesh))
        .expect("root exists");
    (graph, root, mesh)
}

/// Positions of `geometry` as drawn, one `[x, y, z]` per index entry.
pub fn drawn_positions(geometry: &Geometry) -> Vec<[f64; 3]> {
    let Some(positions) = geometry.attribute(names::POSITION) else {
        return Vec::new();
    };
    let read = |v: usize| {
        [
            positions.get(v, 0).unwrap_or(f64::NAN),
            positions.get(v, 1).unwrap_or(f64::NAN),
            positions.get(v, 2).unwrap_or(f64::NAN),
        ]
    };
    match geometry.index() {
        Some(index) => index.indices().iter().map(|&i| read(i as usize)).collect(),
        None => (0..positions.count()).map(read).collect(),
    }
}

/// Mesh payload of a node, panicking if it is not a mesh.
pub fn mesh_of(graph: &SceneGraph, id: NodeId) -> &Mesh {
    graph
        .node(id)
        .expect("node exists")
        .mesh_data()
        .expect("node is a mesh")
}
