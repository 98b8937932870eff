//! Skeletons and skin bindings.
//!
//! A [`Skeleton`] is shared through `Arc` by every mesh bound to it; meshes
//! split from one skinned source reference the same bones instead of copies.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::geometry::{names, Geometry};
use crate::math::{self, Mat4};

use super::graph::SceneGraph;
use super::types::NodeId;

/// Bone matrices packed into a square RGBA32F texture.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneTexture {
    /// Width and height in texels.
    pub size: usize,
    /// `size * size * 4` floats; the first `bones * 16` hold the matrices.
    pub data: Vec<f32>,
}

impl BoneTexture {
    /// Side length able to hold `bone_count` matrices (4 texels each),
    /// rounded up to a power of two, minimum 4.
    pub fn size_for(bone_count: usize) -> usize {
        let texels = (bone_count * 4) as f64;
        (texels.sqrt().ceil() as usize).next_power_of_two().max(4)
    }
}

/// Mutable skinning state, refreshed whenever bones move or a mesh is rebound.
#[derive(Debug, Clone, Default)]
pub struct SkeletonState {
    /// Column-major bone matrices, 16 floats per bone.
    pub bone_matrices: Vec<f32>,
    pub bone_texture: Option<BoneTexture>,
    /// Incremented on every [`Skeleton::update`].
    pub revision: u64,
}

/// Bones and their inverse bind matrices.
#[derive(Debug)]
pub struct Skeleton {
    bones: Vec<NodeId>,
    bone_inverses: Vec<Mat4>,
    state: Mutex<SkeletonState>,
}

impl Skeleton {
    /// Create a skeleton from bone nodes and their inverse bind matrices.
    ///
    /// Missing inverses are filled with identity.
    pub fn new(bones: Vec<NodeId>, mut bone_inverses: Vec<Mat4>) -> Self {
        if bone_inverses.len() != bones.len() {
            log::warn!(
                "Skeleton has {} bones but {} inverse bind matrices",
                bones.len(),
                bone_inverses.len()
            );
            bone_inverses.resize(bones.len(), Mat4::identity());
        }
        let state = SkeletonState {
            bone_matrices: vec![0.0; bones.len() * 16],
            ..Default::default()
        };
        Self {
            bones,
            bone_inverses,
            state: Mutex::new(state),
        }
    }

    /// Create a skeleton whose bind pose is the bones' current world transforms.
    pub fn from_bind_pose(graph: &SceneGraph, bones: Vec<NodeId>) -> Self {
        let inverses = bones
            .iter()
            .map(|&bone| math::inverse_or_identity(&graph.world_matrix(bone)))
            .collect();
        Self::new(bones, inverses)
    }

    pub fn bones(&self) -> &[NodeId] {
        &self.bones
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn bone_inverses(&self) -> &[Mat4] {
        &self.bone_inverses
    }

    /// A skeleton over the bones `map` returns for each of ours, with the same
    /// inverse bind matrices and a copy of the current state.
    pub fn remapped(&self, map: impl Fn(NodeId) -> NodeId) -> Self {
        Self {
            bones: self.bones.iter().map(|&bone| map(bone)).collect(),
            bone_inverses: self.bone_inverses.clone(),
            state: Mutex::new(self.state()),
        }
    }

    /// Recompute bone matrices (`world(bone) * inverse_bind(bone)`) and copy them
    /// into the bone texture when one exists.
    pub fn update(&self, graph: &SceneGraph) {
        self.update_with(|bone| graph.contains(bone).then(|| graph.world_matrix(bone)));
    }

    /// Like [`update`](Self::update), with bone world matrices supplied by
    /// `world_of`. Bones it returns `None` for get identity matrices.
    pub fn update_with(&self, world_of: impl Fn(NodeId) -> Option<Mat4>) {
        let mut state = self.state.lock();
        state.bone_matrices.resize(self.bones.len() * 16, 0.0);

        for (i, (&bone, inverse)) in self.bones.iter().zip(&self.bone_inverses).enumerate() {
            let matrix = match world_of(bone) {
                Some(world) => world * inverse,
                None => {
                    log::warn!("Skeleton bone {:?} is not in the scene graph", bone);
                    Mat4::identity()
                }
            };
            state.bone_matrices[i * 16..(i + 1) * 16].copy_from_slice(matrix.as_slice());
        }

        let SkeletonState {
            bone_matrices,
            bone_texture,
            ..
        } = &mut *state;
        if let Some(texture) = bone_texture {
            texture.data[..bone_matrices.len()].copy_from_slice(bone_matrices);
        }
        state.revision += 1;
    }

    /// Allocate (or reallocate) the bone texture and fill it with the current
    /// bone matrices. Returns the texture side length.
    pub fn compute_bone_texture(&self) -> usize {
        let mut state = self.state.lock();
        let size = BoneTexture::size_for(self.bones.len());
        let mut data = vec![0.0; size * size * 4];
        data[..state.bone_matrices.len()].copy_from_slice(&state.bone_matrices);
        state.bone_texture = Some(BoneTexture { size, data });
        size
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SkeletonState {
        self.state.lock().clone()
    }
}

/// How the bind matrix relates to the mesh's world transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindMode {
    /// The skinned mesh shares the skeleton's world space.
    #[default]
    Attached,
    /// The skinned mesh has its own world transform.
    Detached,
}

/// Links a mesh to a skeleton.
///
/// Per-vertex bone indices and weights live in the geometry under
/// [`names::SKIN_INDEX`] and [`names::SKIN_WEIGHT`].
#[derive(Debug, Clone)]
pub struct SkinBinding {
    pub skeleton: Arc<Skeleton>,
    pub bind_mode: BindMode,
    pub bind_matrix: Mat4,
    pub bind_matrix_inverse: Mat4,
}

impl SkinBinding {
    /// Bind to `skeleton` with the given bind matrix.
    pub fn new(skeleton: Arc<Skeleton>, bind_matrix: Mat4) -> Self {
        Self {
            skeleton,
            bind_mode: BindMode::default(),
            bind_matrix,
            bind_matrix_inverse: math::inverse_or_identity(&bind_matrix),
        }
    }

    /// Set the bind mode.
    #[must_use]
    pub fn with_bind_mode(mut self, bind_mode: BindMode) -> Self {
        self.bind_mode = bind_mode;
        self
    }

    /// A new binding to the same skeleton object with the same bind matrix.
    pub fn rebind(&self) -> Self {
        Self::new(Arc::clone(&self.skeleton), self.bind_matrix).with_bind_mode(self.bind_mode)
    }
}

/// Scale every vertex's skin weights so they sum to one.
///
/// Vertices whose weights sum to zero (or to a non-finite value) get full
/// weight on their first influence. Returns the number of vertices whose
/// weights were replaced that way.
pub fn normalize_skin_weights(geometry: &mut Geometry) -> usize {
    let Some(weights) = geometry.attribute_mut(names::SKIN_WEIGHT) else {
        return 0;
    };

    let mut reset = 0;
    for v in 0..weights.count() {
        let sum: f64 = (0..weights.item_size())
            .filter_map(|c| weights.get(v, c))
            .map(f64::abs)
            .sum();
        let scale = 1.0 / sum;
        if sum > 0.0 && scale.is_finite() {
            for c in 0..weights.item_size() {
                let value = weights.get(v, c).unwrap_or(0.0);
                weights.set(v, c, value * scale);
            }
        } else {
            for c in 0..weights.item_size() {
                weights.set(v, c, if c == 0 { 1.0 } else { 0.0 });
            }
            reset += 1;
        }
    }
    reset
}
