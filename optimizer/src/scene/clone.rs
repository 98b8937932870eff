//! Subtree cloning that keeps inspector metadata and skeletons consistent.

use std::collections::HashMap;
use std::sync::Arc;

use crate::optimize::OptimizeResult;
use crate::profiling::profile_function;

use super::graph::SceneGraph;
use super::skin::Skeleton;
use super::types::{InspectorMetadata, NodeId};

/// Deep-clone the subtree under `root` into new, parentless nodes.
///
/// Geometry, transforms and animation clips are copied; materials and morph
/// state stay shared through their `Arc`s. Inspector metadata is copied in a
/// second lock-step walk over both trees: hit redirects that pointed at
/// `root` are repointed at the clone's root, all others are kept.
///
/// A skeleton with bones inside the subtree is replaced by one new skeleton
/// over the cloned bones, shared by every cloned mesh that was bound to it.
/// Skeletons whose bones all live elsewhere stay shared with the original.
///
/// Returns the id of the cloned root.
pub fn clone_subtree(graph: &mut SceneGraph, root: NodeId) -> OptimizeResult<NodeId> {
    profile_function!();

    let root_copy = graph.node(root)?.detached_copy();
    let clone_root = graph.add(root_copy);
    let mut copies = HashMap::from([(root, clone_root)]);
    let mut stack = vec![(root, clone_root)];
    while let Some((original, copy)) = stack.pop() {
        let children = graph.children(original).to_vec();
        for child in children {
            let node = graph.node(child)?.detached_copy();
            let child_copy = graph.add_child(copy, node)?;
            copies.insert(child, child_copy);
            stack.push((child, child_copy));
        }
    }

    copy_inspector_metadata(graph, root, clone_root);
    rebind_skeletons(graph, clone_root, &copies);
    log::debug!(
        "Cloned subtree \"{}\" ({} nodes)",
        graph.node(root)?.name,
        copies.len()
    );
    Ok(clone_root)
}

/// Point the skinned meshes under `clone_root` at skeletons over the cloned
/// bones. `copies` maps original nodes to their clones.
fn rebind_skeletons(graph: &mut SceneGraph, clone_root: NodeId, copies: &HashMap<NodeId, NodeId>) {
    let mut remapped: HashMap<*const Skeleton, Arc<Skeleton>> = HashMap::new();
    for id in graph.descendants(clone_root) {
        let Some(skin) = graph
            .get_mut(id)
            .and_then(|node| node.mesh_data_mut())
            .and_then(|mesh| mesh.skin.as_mut())
        else {
            continue;
        };
        if !skin.skeleton.bones().iter().any(|bone| copies.contains_key(bone)) {
            continue;
        }
        let skeleton = remapped
            .entry(Arc::as_ptr(&skin.skeleton))
            .or_insert_with(|| {
                Arc::new(
                    skin.skeleton
                        .remapped(|bone| copies.get(&bone).copied().unwrap_or(bone)),
                )
            });
        skin.skeleton = Arc::clone(skeleton);
    }
    if !remapped.is_empty() {
        log::debug!("Rebound {} skeletons onto cloned bones", remapped.len());
    }
}

/// Walk `original_root` and `clone_root` in the same order and copy each
/// node's inspector metadata onto its counterpart, remapping redirects to the
/// original root.
fn copy_inspector_metadata(graph: &mut SceneGraph, original_root: NodeId, clone_root: NodeId) {
    let mut stack = vec![(original_root, clone_root)];
    while let Some((original, copy)) = stack.pop() {
        let Some(source) = graph.get(original).map(|n| n.metadata) else {
            continue;
        };
        let hit_redirect = match source.hit_redirect {
            Some(target) if target == original_root => Some(clone_root),
            other => other,
        };
        if let Some(node) = graph.get_mut(copy) {
            node.metadata = InspectorMetadata {
                selectable: source.selectable,
                hit_redirect,
            };
        }

        let originals = graph.children(original);
        let copies = graph.children(copy);
        debug_assert_eq!(originals.len(), copies.len());
        stack.extend(originals.iter().copied().zip(copies.iter().copied()));
    }
}
