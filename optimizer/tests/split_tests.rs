//! Per-material splitting of scene subtrees.

mod common;

use std::sync::Arc;

use rstest::rstest;

use common::{init_logging, materials, mesh_of, single_mesh_scene, trs_clip};
use redlilium_optimizer::geometry::generators::{generate_box, generate_sphere};
use redlilium_optimizer::geometry::{names, AttributeBuffer, Geometry};
use redlilium_optimizer::math::{Mat4, Vec3};
use redlilium_optimizer::optimize::{
    deindex, AncestorPolicy, MeshSplitter, OptimizeError, OptimizeOptions, SkipReason,
};
use redlilium_optimizer::scene::{
    InspectorMetadata, Mesh, MorphState, NodeId, NodeTransform, SceneGraph, SceneNode, Skeleton,
    SkinBinding,
};

fn cube_mesh() -> Mesh {
    Mesh::new(generate_box(0.5, [0, 1, 0, 2, 1, 2]), materials(3))
}

/// Sphere whose index range is cut into four equal material groups.
fn cylinder_mesh() -> Mesh {
    let mut geometry = generate_sphere(1.0, 8, 4);
    let quarter = geometry.draw_count() / 4;
    for material in 0..4 {
        geometry.add_group(material * quarter, quarter, material);
    }
    Mesh::new(geometry, materials(4))
}

#[test]
fn test_cube_scenario() {
    init_logging();
    let (mut graph, root, source) = single_mesh_scene("cube", cube_mesh());
    let source_materials = mesh_of(&graph, source).materials.clone();
    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();

    assert_eq!(report.produced.len(), 3);
    assert!(report.skipped.is_empty());
    let mut triangles = 0;
    for (material, &id) in report.produced.iter().enumerate() {
        let node = graph.node(id).unwrap();
        assert_eq!(node.name, format!("cube_{material}"));
        assert_eq!(graph.parent(id), Some(report.root));

        let mesh = mesh_of(&graph, id);
        assert_eq!(mesh.materials.len(), 1);
        assert!(Arc::ptr_eq(&mesh.materials[0], &source_materials[material]));
        let geometry = &mesh.geometry;
        assert_eq!(geometry.vertex_count(), 6);
        assert_eq!(geometry.triangle_count(), 4);
        assert!(geometry.index().unwrap().indices().iter().all(|&i| i < 6));
        assert!(geometry.bounding_box().is_some());
        triangles += geometry.triangle_count();
    }
    assert_eq!(triangles, 12);

    // The source subtree is untouched until the caller swaps it out.
    assert_eq!(graph.parent(source), Some(root));
    assert_eq!(mesh_of(&graph, source).geometry.vertex_count(), 8);
}

#[test]
fn test_replaced_subtree_can_be_freed() {
    init_logging();
    let mut graph = SceneGraph::new();
    let world = graph.add(SceneNode::group("world"));
    let root = graph
        .add_child(world, SceneNode::group("scene").with_animations(vec![trs_clip("cube")]))
        .unwrap();
    graph
        .add_child(root, SceneNode::mesh("cube", cube_mesh()))
        .unwrap();

    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();
    graph.replace(root, report.root).unwrap();

    // Original scene + cube, then the copied cube detached from the copy.
    assert_eq!(graph.remove_subtree(root), 2);
    for &source in &report.detached {
        assert_eq!(graph.remove_subtree(source), 1);
    }
    let live = graph.descendants(world);
    assert_eq!(live.len(), 1 + 1 + 3);
    assert_eq!(graph.len(), live.len());
    assert!(!graph.contains(root));
    for &id in &report.produced {
        assert_eq!(graph.parent(id), Some(report.root));
    }
}

#[test]
fn test_cylinder_scenario_relinks_tracks() {
    init_logging();
    let mut graph = SceneGraph::new();
    let root = graph.add(SceneNode::group("scene").with_animations(vec![trs_clip("Cylinder")]));
    graph
        .add_child(root, SceneNode::mesh("Cylinder", cylinder_mesh()))
        .unwrap();

    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();
    assert_eq!(report.produced.len(), 4);

    let clip = &graph.animation_clips(report.root)[0];
    assert_eq!(clip.tracks.len(), 12);
    assert_eq!(report.relinked_tracks.matched, 3);
    assert_eq!(report.relinked_tracks.added, 12);
    for material in 0..4 {
        for property in ["position", "quaternion", "scale"] {
            assert!(clip.track(&format!("Cylinder_{material}.{property}")).is_some());
        }
    }
    assert!(clip.tracks_for("Cylinder").next().is_none());

    // The original clip is untouched.
    assert_eq!(graph.animation_clips(root)[0].tracks.len(), 3);
}

#[test]
fn test_colliding_output_names_keep_every_track() {
    init_logging();
    let mut clip = trs_clip("A");
    clip.tracks.extend(trs_clip("A_0").tracks);
    let mut graph = SceneGraph::new();
    let root = graph.add(SceneNode::group("scene").with_animations(vec![clip]));
    for name in ["A", "A_0"] {
        let mesh = Mesh::new(generate_box(0.5, [0, 1, 0, 1, 0, 1]), materials(2));
        graph.add_child(root, SceneNode::mesh(name, mesh)).unwrap();
    }

    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();
    let names: Vec<_> = report
        .produced
        .iter()
        .map(|&id| graph.node(id).unwrap().name.clone())
        .collect();
    assert_eq!(names, ["A_0", "A_1", "A_0_0", "A_0_1"]);

    let clip = &graph.animation_clips(report.root)[0];
    assert_eq!(clip.tracks.len(), 12);
    for name in &names {
        assert_eq!(clip.tracks_for(name).count(), 3, "tracks of {name}");
    }
    assert_eq!(report.relinked_tracks.matched, 6);
    assert_eq!(report.relinked_tracks.added, 12);
}

#[test]
fn test_triangle_conservation() {
    init_logging();
    let (mut graph, root, _) = single_mesh_scene("Cylinder", cylinder_mesh());
    let source_triangles = mesh_of(&graph, graph.children(root)[0])
        .geometry
        .triangle_count();

    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();
    let split_triangles: usize = report
        .produced
        .iter()
        .map(|&id| mesh_of(&graph, id).geometry.triangle_count())
        .sum();
    assert_eq!(split_triangles, source_triangles);

    for &id in &report.produced {
        let geometry = &mesh_of(&graph, id).geometry;
        let vertex_count = geometry.vertex_count() as u32;
        assert!(geometry
            .index()
            .unwrap()
            .indices()
            .iter()
            .all(|&i| i < vertex_count));
        assert!(geometry.vertex_count() <= geometry.index().unwrap().len());
    }
}

#[test]
fn test_unindexed_source_is_welded_first() {
    init_logging();
    let mesh = Mesh::new(
        deindex(&generate_box(0.5, [0, 1, 0, 2, 1, 2])),
        materials(3),
    );
    let (mut graph, root, _) = single_mesh_scene("cube", mesh);
    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();

    for &id in &report.produced {
        let geometry = &mesh_of(&graph, id).geometry;
        assert_eq!(geometry.vertex_count(), 6);
        assert_eq!(geometry.triangle_count(), 4);
    }
}

#[test]
fn test_unindexed_without_welding_keeps_soup_size() {
    init_logging();
    let mesh = Mesh::new(
        deindex(&generate_box(0.5, [0, 1, 0, 2, 1, 2])),
        materials(3),
    );
    let (mut graph, root, _) = single_mesh_scene("cube", mesh);
    let options = OptimizeOptions::default().with_dedup_unindexed(false);
    let mut splitter = MeshSplitter::new(options);
    let report = splitter.split_subtree(&mut graph, root).unwrap();

    for &id in &report.produced {
        assert_eq!(mesh_of(&graph, id).geometry.vertex_count(), 12);
    }
}

#[test]
fn test_transform_and_inspector_metadata() {
    init_logging();
    let mut graph = SceneGraph::new();
    let root = graph.add(SceneNode::group("scene"));
    let elsewhere = graph.add(SceneNode::group("elsewhere"));
    let transform = NodeTransform::IDENTITY
        .with_translation([1.0, 2.0, 3.0])
        .with_scale([2.0, 2.0, 2.0]);
    graph
        .add_child(
            root,
            SceneNode::mesh("redirected", cube_mesh())
                .with_transform(transform)
                .with_metadata(InspectorMetadata {
                    selectable: false,
                    hit_redirect: Some(root),
                }),
        )
        .unwrap();
    graph
        .add_child(
            root,
            SceneNode::mesh("foreign", cube_mesh()).with_metadata(InspectorMetadata {
                selectable: true,
                hit_redirect: Some(elsewhere),
            }),
        )
        .unwrap();

    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();
    assert_eq!(report.produced.len(), 6);

    for &id in &report.produced {
        let node = graph.node(id).unwrap();
        if node.name.starts_with("redirected_") {
            assert_eq!(node.transform, transform);
            assert!(!node.metadata.selectable);
            assert_eq!(node.metadata.hit_redirect, Some(report.root));
        } else {
            assert!(node.metadata.selectable);
            assert_eq!(node.metadata.hit_redirect, Some(elsewhere));
        }
    }
}

#[test]
fn test_skinned_mesh_shares_skeleton() {
    init_logging();
    let mut graph = SceneGraph::new();
    let world = graph.add(
        SceneNode::group("world")
            .with_transform(NodeTransform::IDENTITY.with_translation([5.0, 0.0, 0.0])),
    );
    let root = graph
        .add_child(
            world,
            SceneNode::group("model")
                .with_transform(NodeTransform::IDENTITY.with_translation([0.0, 0.0, 2.0])),
        )
        .unwrap();
    let hip = graph
        .add_child(
            root,
            SceneNode::bone("hip")
                .with_transform(NodeTransform::IDENTITY.with_translation([0.0, 1.0, 0.0])),
        )
        .unwrap();
    let skeleton = Arc::new(Skeleton::from_bind_pose(&graph, vec![hip]));

    // Corner 0 has no weight at all, the others weigh twice over.
    let weights: Vec<f32> = (0..8)
        .flat_map(|v| if v == 0 { [0.0; 4] } else { [1.5, 0.5, 0.0, 0.0] })
        .collect();
    let geometry = generate_box(0.5, [0, 1, 0, 2, 1, 2])
        .with_attribute(names::SKIN_INDEX, AttributeBuffer::from_u16(vec![0; 32], 4))
        .with_attribute(names::SKIN_WEIGHT, AttributeBuffer::from_f32(weights, 4));
    let bind = Mat4::new_translation(&Vec3::new(0.0, 0.5, 0.0));
    let mesh = Mesh::new(geometry, materials(3))
        .with_skin(SkinBinding::new(Arc::clone(&skeleton), bind));
    graph.add_child(root, SceneNode::mesh("body", mesh)).unwrap();

    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();
    assert_eq!(report.produced.len(), 3);
    graph.replace(root, report.root).unwrap();

    // The outputs share one skeleton, bound to the bones of the live copy.
    let live = graph.descendants(world);
    let shared = Arc::clone(
        &mesh_of(&graph, report.produced[0])
            .skin()
            .expect("split mesh stays skinned")
            .skeleton,
    );
    assert!(!Arc::ptr_eq(&shared, &skeleton));
    assert_eq!(shared.bones().len(), 1);
    let bone = shared.bones()[0];
    assert!(live.contains(&bone));
    assert_eq!(graph.node(bone).unwrap().name, "hip");
    assert_eq!(skeleton.bones(), &[hip]);
    assert!(!live.contains(&hip));

    let mut reset_corners = 0;
    for &id in &report.produced {
        assert!(live.contains(&id));
        let mesh = mesh_of(&graph, id);
        let skin = mesh.skin().expect("split mesh stays skinned");
        assert!(Arc::ptr_eq(&skin.skeleton, &shared));
        assert_eq!(skin.bind_matrix, bind);

        let geometry = &mesh.geometry;
        let weights = geometry.attribute(names::SKIN_WEIGHT).unwrap();
        let positions = geometry.attribute(names::POSITION).unwrap();
        for v in 0..geometry.vertex_count() {
            let sum: f64 = (0..4).map(|c| weights.get(v, c).unwrap()).sum();
            assert!((sum - 1.0).abs() < 1e-6);
            let is_corner_zero = (0..3).all(|c| positions.get(v, c) == Some(-0.5));
            if is_corner_zero {
                assert_eq!(weights.get(v, 0), Some(1.0));
                reset_corners += 1;
            } else {
                assert_eq!(weights.get(v, 0), Some(0.75));
            }
        }
    }
    // Corner 0 touches the -X, -Y and -Z faces: materials 1 and 2.
    assert_eq!(reset_corners, 2);

    // Refreshed in the pose the copy takes once swapped in, which is the bind pose.
    let state = shared.state();
    assert!(state.revision > 0);
    assert!(state.bone_texture.is_some());
    assert_eq!(state.bone_matrices.len(), 16);
    for (value, expected) in state.bone_matrices.iter().zip(Mat4::identity().as_slice()) {
        assert!((value - expected).abs() < 1e-5);
    }
}

#[test]
fn test_morph_state_is_shared() {
    init_logging();
    let base = generate_box(0.5, [0, 1, 0, 2, 1, 2]);
    let target = AttributeBuffer::from_f32(vec![0.1; 24], 3).with_name("bulge");
    let geometry = base.with_morph_attribute(names::POSITION, vec![target]);
    let morph = MorphState::from_geometry(&geometry).unwrap();
    let mesh = Mesh::new(geometry, materials(3)).with_morph(morph.clone());
    let (mut graph, root, _) = single_mesh_scene("blob", mesh);

    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();

    for &id in &report.produced {
        let mesh = mesh_of(&graph, id);
        let shared = mesh.morph.as_ref().unwrap();
        assert!(shared.shares_storage_with(&morph));
        let targets = mesh.geometry.morph_attribute(names::POSITION).unwrap();
        assert_eq!(targets[0].count(), 6);
        assert_eq!(targets[0].name.as_deref(), Some("bulge"));
    }

    morph.set_influence("bulge", 0.5);
    let first = mesh_of(&graph, report.produced[0]);
    assert_eq!(first.morph.as_ref().unwrap().influence("bulge"), Some(0.5));
}

#[test]
fn test_mesh_without_positions_is_removed() {
    init_logging();
    let geometry = Geometry::new()
        .with_attribute(names::UV, AttributeBuffer::from_f32(vec![0.0; 6], 2))
        .with_group(0, 3, 0);
    let mut graph = SceneGraph::new();
    let root = graph.add(SceneNode::group("scene").with_animations(vec![trs_clip("ghost")]));
    graph
        .add_child(root, SceneNode::mesh("ghost", Mesh::new(geometry, materials(1))))
        .unwrap();

    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();
    assert!(report.produced.is_empty());
    assert_eq!(report.detached.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::NoPositions);
    assert!(graph.children(report.root).is_empty());
    assert!(graph.animation_clips(report.root)[0].tracks.is_empty());
}

#[test]
fn test_empty_material_group_is_skipped() {
    init_logging();
    let geometry = generate_box(0.5, [0; 6]).with_group(36, 0, 1);
    let (mut graph, root, _) = single_mesh_scene("cube", Mesh::new(geometry, materials(2)));

    let mut splitter = MeshSplitter::new(OptimizeOptions::default());
    let report = splitter.split_subtree(&mut graph, root).unwrap();
    assert_eq!(report.produced.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].material_index, 1);
    assert_eq!(report.skipped[0].reason, SkipReason::NoPositions);
}

#[test]
fn test_dispose_hook_called_per_source() {
    init_logging();
    let mut graph = SceneGraph::new();
    let root = graph.add(SceneNode::group("scene"));
    graph.add_child(root, SceneNode::mesh("a", cube_mesh())).unwrap();
    graph.add_child(root, SceneNode::mesh("b", cube_mesh())).unwrap();

    let mut disposed: Vec<String> = Vec::new();
    let report = {
        let disposer = |name: &str, geometry: Geometry| {
            assert_eq!(geometry.vertex_count(), 8);
            disposed.push(name.to_string());
        };
        let mut splitter = MeshSplitter::with_disposer(OptimizeOptions::default(), disposer);
        splitter.split_subtree(&mut graph, root).unwrap()
    };
    assert_eq!(disposed, ["a", "b"]);
    assert_eq!(report.detached.len(), 2);
    for &id in &report.detached {
        assert!(graph.parent(id).is_none());
        assert_eq!(mesh_of(&graph, id).geometry.vertex_count(), 0);
    }
}

/// `scene > outer (mesh) > inner (mesh)`, with a clip animating both.
fn nested_scene() -> (SceneGraph, NodeId) {
    let mut graph = SceneGraph::new();
    let mut clip = trs_clip("outer");
    clip.tracks.extend(trs_clip("inner").tracks);
    let root = graph.add(SceneNode::group("scene").with_animations(vec![clip]));
    let outer = graph
        .add_child(root, SceneNode::mesh("outer", cube_mesh()))
        .unwrap();
    graph
        .add_child(outer, SceneNode::mesh("inner", cube_mesh()))
        .unwrap();
    (graph, root)
}

#[test]
fn test_ancestor_abort_leaves_graph_untouched() {
    init_logging();
    let (mut graph, root) = nested_scene();
    let nodes_before = graph.len();
    let options = OptimizeOptions::default().with_ancestor_policy(AncestorPolicy::Abort);
    let mut splitter = MeshSplitter::new(options);

    let result = splitter.split_subtree(&mut graph, root);
    match result {
        Err(OptimizeError::MeshIsAncestor { mesh, descendant }) => {
            assert_eq!(mesh, "outer");
            assert_eq!(descendant, "inner");
        }
        other => panic!("expected MeshIsAncestor, got {other:?}"),
    }
    assert_eq!(graph.len(), nodes_before);
}

#[rstest]
#[case::leave_in_place(AncestorPolicy::LeaveInPlace)]
#[case::skip_mesh(AncestorPolicy::SkipMesh)]
fn test_ancestor_policies(#[case] policy: AncestorPolicy) {
    init_logging();
    let (mut graph, root) = nested_scene();
    let mut splitter = MeshSplitter::new(OptimizeOptions::default().with_ancestor_policy(policy));
    let report = splitter.split_subtree(&mut graph, root).unwrap();

    assert_eq!(report.anomalies.len(), 1);
    let outer = report.anomalies[0];
    assert_eq!(graph.parent(outer), Some(report.root));
    let inner_outputs: Vec<_> = graph
        .children(outer)
        .iter()
        .map(|&id| graph.node(id).unwrap().name.clone())
        .collect();
    assert_eq!(inner_outputs, ["inner_0", "inner_1", "inner_2"]);

    let clip = &graph.animation_clips(report.root)[0];
    assert!(clip.tracks_for("inner").next().is_none());
    assert_eq!(clip.tracks_for("inner_2").count(), 3);

    match policy {
        AncestorPolicy::LeaveInPlace => {
            assert!(!graph.node(outer).unwrap().is_mesh());
            assert_eq!(report.produced.len(), 6);
            assert_eq!(clip.tracks_for("outer").count(), 3);
            assert_eq!(clip.tracks_for("outer_0").count(), 3);
            assert_eq!(clip.tracks.len(), 3 + 9 + 9);
            // The demoted node's own tracks stay and are not counted as added.
            assert_eq!(report.relinked_tracks.matched, 6);
            assert_eq!(report.relinked_tracks.removed, 3);
            assert_eq!(report.relinked_tracks.added, 18);
        }
        AncestorPolicy::SkipMesh => {
            assert!(graph.node(outer).unwrap().is_mesh());
            assert_eq!(report.produced.len(), 3);
            assert_eq!(clip.tracks_for("outer").count(), 3);
            assert_eq!(clip.tracks.len(), 3 + 9);
            assert_eq!(report.relinked_tracks.added, 9);
        }
        AncestorPolicy::Abort => unreachable!(),
    }
}
