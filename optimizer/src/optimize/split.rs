//! Splitting multi-material meshes into one mesh per material.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::animation::{relink_all, RelinkStats, TrackRename};
use crate::geometry::{Geometry, Group};
use crate::math::Mat4;
use crate::profiling::{profile_function, profile_scope};
use crate::scene::{
    clone_subtree, normalize_skin_weights, InspectorMetadata, Mesh, NodeId, NodeKind,
    NodeTransform, SceneGraph, SceneNode,
};

use super::compact::compact;
use super::dedup::indexify;
use super::error::{OptimizeError, OptimizeResult};
use super::options::{AncestorPolicy, OptimizeOptions};

/// Receives the geometry of every mesh the splitter retires.
///
/// Implemented for any `FnMut(&str, Geometry)`, so a closure can release
/// GPU buffers or collect statistics.
pub trait GeometryDisposer {
    fn dispose_geometry(&mut self, mesh_name: &str, geometry: Geometry);
}

impl<F> GeometryDisposer for F
where
    F: FnMut(&str, Geometry),
{
    fn dispose_geometry(&mut self, mesh_name: &str, geometry: Geometry) {
        self(mesh_name, geometry)
    }
}

/// Default disposer: drops the geometry.
struct DropDisposer;

impl GeometryDisposer for DropDisposer {
    fn dispose_geometry(&mut self, mesh_name: &str, geometry: Geometry) {
        log::debug!(
            "Released geometry of \"{}\" ({} bytes)",
            mesh_name,
            geometry.stats().byte_len
        );
    }
}

/// Hit redirects equal to `from` are rewritten to `to` on split outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootRemap {
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The material's groups reference no drawable positions.
    NoPositions,
    /// The groups name a material slot the mesh does not have.
    MissingMaterial,
}

/// A (mesh, material) pair that produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOutput {
    pub mesh: String,
    pub material_index: usize,
    pub reason: SkipReason,
}

/// Summary of a [`MeshSplitter::split_subtree`] run.
#[derive(Debug, Clone)]
pub struct SplitReport {
    /// Root of the rebuilt subtree, to be swapped in with [`SceneGraph::replace`].
    pub root: NodeId,
    /// New single-material meshes, in creation order.
    pub produced: Vec<NodeId>,
    /// Source meshes detached from the rebuilt subtree.
    pub detached: Vec<NodeId>,
    pub skipped: Vec<SkippedOutput>,
    /// Meshes with mesh descendants, handled by the ancestor policy.
    pub anomalies: Vec<NodeId>,
    pub relinked_tracks: RelinkStats,
}

/// Where a detached copy will sit once swapped into the scene.
#[derive(Debug, Clone, Copy)]
struct Placement {
    root: NodeId,
    parent_world: Mat4,
}

impl Placement {
    /// World matrix of `id` as it will be after the swap. Nodes outside the
    /// copy are already in place.
    fn world_matrix(&self, graph: &SceneGraph, id: NodeId) -> Option<Mat4> {
        if !graph.contains(id) {
            return None;
        }
        let world = graph.world_matrix(id);
        if id == self.root || graph.is_ancestor_of(self.root, id) {
            Some(self.parent_world * world)
        } else {
            Some(world)
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitContext {
    remap: Option<RootRemap>,
    placement: Option<Placement>,
}

/// Outputs built for one source mesh.
struct MeshSplit {
    nodes: Vec<SceneNode>,
    skipped: Vec<SkippedOutput>,
}

/// Splits meshes with several draw groups into one mesh per material.
///
/// ```ignore
/// let mut splitter = MeshSplitter::new(OptimizeOptions::default());
/// let report = splitter.split_subtree(&mut graph, root)?;
/// graph.replace(root, report.root)?;
/// ```
pub struct MeshSplitter<'d> {
    options: OptimizeOptions,
    disposer: Box<dyn GeometryDisposer + 'd>,
}

impl MeshSplitter<'static> {
    /// Create a splitter that simply drops retired geometry.
    pub fn new(options: OptimizeOptions) -> Self {
        Self {
            options,
            disposer: Box::new(DropDisposer),
        }
    }
}

impl<'d> MeshSplitter<'d> {
    /// Create a splitter that hands retired geometry to `disposer`.
    pub fn with_disposer(options: OptimizeOptions, disposer: impl GeometryDisposer + 'd) -> Self {
        Self {
            options,
            disposer: Box::new(disposer),
        }
    }

    pub fn options(&self) -> &OptimizeOptions {
        &self.options
    }

    /// Rebuild the subtree under `root` with every mesh split by material.
    ///
    /// The original subtree is left untouched. The returned report's `root`
    /// is a parentless copy in which each multi-material mesh is replaced by
    /// sibling meshes named `"<mesh>_<material>"`, and the animation clips of
    /// the copy target those new meshes. A root that is itself a mesh is
    /// wrapped in a group node that takes over its clips and inspector flags.
    ///
    /// Fails with [`OptimizeError::MeshIsAncestor`] before touching the graph
    /// when the policy is [`AncestorPolicy::Abort`] and a mesh has mesh
    /// descendants.
    pub fn split_subtree(
        &mut self,
        graph: &mut SceneGraph,
        root: NodeId,
    ) -> OptimizeResult<SplitReport> {
        profile_function!();

        graph.node(root)?;
        if self.options.ancestor_policy == AncestorPolicy::Abort {
            if let Some((mesh, descendant)) = first_ancestor_mesh(graph, root) {
                return Err(OptimizeError::MeshIsAncestor {
                    mesh: graph.node(mesh)?.name.clone(),
                    descendant: graph.node(descendant)?.name.clone(),
                });
            }
        }

        let copy = clone_subtree(graph, root)?;
        let new_root = wrap_mesh_root(graph, copy)?;
        let context = SplitContext {
            remap: Some(RootRemap {
                from: root,
                to: new_root,
            }),
            placement: Some(Placement {
                root: new_root,
                parent_world: graph
                    .parent(root)
                    .map_or_else(Mat4::identity, |parent| graph.world_matrix(parent)),
            }),
        };

        let mut report = SplitReport {
            root: new_root,
            produced: Vec::new(),
            detached: Vec::new(),
            skipped: Vec::new(),
            anomalies: Vec::new(),
            relinked_tracks: RelinkStats::default(),
        };
        let mut renames: Vec<TrackRename> = Vec::new();

        let meshes: Vec<NodeId> = graph
            .descendants(new_root)
            .into_iter()
            .filter(|&id| graph.get(id).is_some_and(SceneNode::is_mesh))
            .collect();

        for mesh in meshes {
            let name = graph.node(mesh)?.name.clone();
            let is_ancestor = has_mesh_descendant(graph, mesh);
            if is_ancestor {
                report.anomalies.push(mesh);
                if self.options.ancestor_policy == AncestorPolicy::SkipMesh {
                    log::warn!("Mesh \"{name}\" has mesh descendants, leaving it unsplit");
                    continue;
                }
                log::warn!("Mesh \"{name}\" has mesh descendants, keeping it as a group node");
            }

            let outputs = self.split_outputs(graph, mesh, &context, &mut report.skipped)?;
            let mut targets: Vec<String> = Vec::with_capacity(outputs.len());
            for &output in &outputs {
                targets.push(graph.node(output)?.name.clone());
            }
            report.produced.extend_from_slice(&outputs);

            let rename = TrackRename::new(name, targets);
            if is_ancestor {
                // The demoted node keeps its own tracks so its children stay animated.
                self.demote(graph, mesh)?;
                renames.push(rename.keeping_source());
            } else {
                self.retire(graph, mesh)?;
                report.detached.push(mesh);
                renames.push(rename);
            }
        }

        for id in graph.descendants(new_root) {
            let Some(node) = graph.get_mut(id) else {
                continue;
            };
            for clip in &mut node.animations {
                let stats = relink_all(clip, &renames);
                report.relinked_tracks = report.relinked_tracks.merge(stats);
            }
        }

        log::info!(
            "Split \"{}\": {} meshes produced, {} detached, {} skipped, {} tracks relinked",
            graph.node(new_root)?.name,
            report.produced.len(),
            report.detached.len(),
            report.skipped.len(),
            report.relinked_tracks.added
        );
        Ok(report)
    }

    /// Split one mesh in place: add a sibling mesh per material, then detach
    /// the source and hand its geometry to the disposer.
    ///
    /// Returns the new meshes in ascending material order. Clips are not
    /// touched; see [`relink_all`](crate::animation::relink_all).
    pub fn split_by_material(
        &mut self,
        graph: &mut SceneGraph,
        mesh: NodeId,
        remap: Option<RootRemap>,
    ) -> OptimizeResult<Vec<NodeId>> {
        let context = SplitContext {
            remap,
            placement: None,
        };
        let mut skipped = Vec::new();
        let outputs = self.split_outputs(graph, mesh, &context, &mut skipped)?;
        self.retire(graph, mesh)?;
        Ok(outputs)
    }

    /// Build and attach the per-material meshes of `mesh`.
    fn split_outputs(
        &mut self,
        graph: &mut SceneGraph,
        mesh: NodeId,
        context: &SplitContext,
        skipped: &mut Vec<SkippedOutput>,
    ) -> OptimizeResult<Vec<NodeId>> {
        profile_scope!("split_outputs");

        let parent = graph.parent(mesh);
        let split = self.build_outputs(graph, mesh, context)?;
        skipped.extend(split.skipped);

        if parent.is_none() && !split.nodes.is_empty() {
            log::warn!(
                "Mesh \"{}\" has no parent, split meshes are left unattached",
                graph.node(mesh)?.name
            );
        }
        let mut outputs = Vec::with_capacity(split.nodes.len());
        for node in split.nodes {
            let id = match parent {
                Some(parent) => graph.add_child(parent, node)?,
                None => graph.add(node),
            };
            outputs.push(id);
        }
        Ok(outputs)
    }

    fn build_outputs(
        &self,
        graph: &SceneGraph,
        mesh: NodeId,
        context: &SplitContext,
    ) -> OptimizeResult<MeshSplit> {
        let node = graph.node(mesh)?;
        let source = node.mesh_data().ok_or(OptimizeError::NotAMesh(mesh))?;
        let mut split = MeshSplit {
            nodes: Vec::new(),
            skipped: Vec::new(),
        };

        let mut by_material: BTreeMap<usize, Vec<Group>> = BTreeMap::new();
        for group in source.geometry.groups_or_default() {
            by_material.entry(group.material_index).or_default().push(group);
        }

        if !source.geometry.has_positions() {
            log::warn!("Mesh \"{}\" has no positions, nothing to split", node.name);
            split.skipped.extend(by_material.keys().map(|&material_index| SkippedOutput {
                mesh: node.name.clone(),
                material_index,
                reason: SkipReason::NoPositions,
            }));
            return Ok(split);
        }

        let geometry: Cow<Geometry> =
            if !source.geometry.is_indexed() && self.options.dedup_unindexed {
                Cow::Owned(indexify(&source.geometry, self.options.effective_tolerance()))
            } else {
                Cow::Borrowed(&source.geometry)
            };

        if let Some(skin) = source.skin() {
            if self.options.refresh_skeletons {
                match context.placement {
                    Some(placement) => skin
                        .skeleton
                        .update_with(|bone| placement.world_matrix(graph, bone)),
                    None => skin.skeleton.update(graph),
                }
                skin.skeleton.compute_bone_texture();
            }
        }

        let hit_redirect = match (node.metadata.hit_redirect, context.remap) {
            (Some(target), Some(remap)) if target == remap.from => Some(remap.to),
            (redirect, _) => redirect,
        };

        for (material_index, groups) in by_material {
            let Some(material) = source.material(material_index) else {
                log::warn!(
                    "Mesh \"{}\" has no material in slot {}, skipping its groups",
                    node.name,
                    material_index
                );
                split.skipped.push(SkippedOutput {
                    mesh: node.name.clone(),
                    material_index,
                    reason: SkipReason::MissingMaterial,
                });
                continue;
            };

            let compacted = compact(&geometry, &groups);
            if !compacted.has_positions() {
                log::debug!(
                    "Mesh \"{}\" material {} draws nothing, skipping",
                    node.name,
                    material_index
                );
                split.skipped.push(SkippedOutput {
                    mesh: node.name.clone(),
                    material_index,
                    reason: SkipReason::NoPositions,
                });
                continue;
            }

            let mut output = compacted.into_geometry(&geometry);
            if let Some(label) = geometry.label() {
                output = output.with_label(format!("{label}_{material_index}"));
            }
            if self.options.compute_bounds {
                output.compute_bounding_sphere();
            }

            let mut mesh = Mesh::new(output, vec![Arc::clone(material)]);
            if let Some(skin) = source.skin() {
                mesh.skin = Some(skin.rebind());
                if self.options.normalize_skin_weights {
                    let reset = normalize_skin_weights(&mut mesh.geometry);
                    if reset > 0 {
                        log::debug!(
                            "Mesh \"{}_{}\": {} vertices had no skin weight",
                            node.name,
                            material_index,
                            reset
                        );
                    }
                }
            }
            mesh.morph = source.morph.clone();

            split.nodes.push(
                SceneNode::mesh(format!("{}_{}", node.name, material_index), mesh)
                    .with_transform(node.transform)
                    .with_metadata(InspectorMetadata {
                        selectable: node.metadata.selectable,
                        hit_redirect,
                    }),
            );
        }

        log::debug!(
            "Mesh \"{}\": {} outputs, {} skipped",
            node.name,
            split.nodes.len(),
            split.skipped.len()
        );
        Ok(split)
    }

    /// Detach `mesh` and dispose of its geometry.
    fn retire(&mut self, graph: &mut SceneGraph, mesh: NodeId) -> OptimizeResult<()> {
        let child_count = graph.children(mesh).len();
        if child_count > 0 {
            log::warn!(
                "Detaching mesh \"{}\" together with its {} children",
                graph.node(mesh)?.name,
                child_count
            );
        }
        graph.detach(mesh);
        self.dispose(graph, mesh)
    }

    /// Turn `mesh` into a plain group node, disposing of its geometry.
    fn demote(&mut self, graph: &mut SceneGraph, mesh: NodeId) -> OptimizeResult<()> {
        self.dispose(graph, mesh)?;
        graph.node_mut(mesh)?.kind = NodeKind::Group;
        Ok(())
    }

    fn dispose(&mut self, graph: &mut SceneGraph, mesh: NodeId) -> OptimizeResult<()> {
        let node = graph.node_mut(mesh)?;
        let name = node.name.clone();
        let data = node.mesh_data_mut().ok_or(OptimizeError::NotAMesh(mesh))?;
        let geometry = std::mem::take(&mut data.geometry);
        self.disposer.dispose_geometry(&name, geometry);
        Ok(())
    }
}

/// If `root` is a mesh, move it under a new group node that takes its name,
/// clips and inspector flags. Returns the id of the subtree's root.
fn wrap_mesh_root(graph: &mut SceneGraph, root: NodeId) -> OptimizeResult<NodeId> {
    let node = graph.node_mut(root)?;
    if !node.is_mesh() {
        return Ok(root);
    }
    let wrapper = SceneNode::group(node.name.clone())
        .with_transform(NodeTransform::IDENTITY)
        .with_metadata(node.metadata)
        .with_animations(std::mem::take(&mut node.animations));
    let wrapper = graph.add(wrapper);
    graph.attach(wrapper, root)?;

    for id in graph.descendants(wrapper) {
        if let Some(node) = graph.get_mut(id) {
            if node.metadata.hit_redirect == Some(root) {
                node.metadata.hit_redirect = Some(wrapper);
            }
        }
    }
    log::debug!("Wrapped mesh root {:?} in group {:?}", root, wrapper);
    Ok(wrapper)
}

fn has_mesh_descendant(graph: &SceneGraph, mesh: NodeId) -> bool {
    first_mesh_below(graph, mesh).is_some()
}

fn first_mesh_below(graph: &SceneGraph, node: NodeId) -> Option<NodeId> {
    graph
        .descendants(node)
        .into_iter()
        .skip(1)
        .find(|&id| graph.get(id).is_some_and(SceneNode::is_mesh))
}

/// First mesh (in pre-order) that has a mesh below it, with that descendant.
fn first_ancestor_mesh(graph: &SceneGraph, root: NodeId) -> Option<(NodeId, NodeId)> {
    graph
        .descendants(root)
        .into_iter()
        .filter(|&id| graph.get(id).is_some_and(SceneNode::is_mesh))
        .find_map(|mesh| first_mesh_below(graph, mesh).map(|below| (mesh, below)))
}
