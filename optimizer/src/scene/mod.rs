//! Scene graph types for the inspector and the optimizer.
//!
//! These types are format-agnostic and can be produced by any loader
//! (glTF, FBX, custom formats) or built programmatically.
//!
//! - [`SceneGraph`] — Arena of nodes addressed by [`NodeId`]
//! - [`SceneNode`] / [`NodeKind`] — A node and its payload
//! - [`NodeTransform`] — TRS transform using plain arrays
//! - [`InspectorMetadata`] — Selectability and hit redirection
//! - [`Mesh`] / [`Material`] / [`MorphState`] — Mesh payload
//! - [`Skeleton`] / [`SkinBinding`] — Skeletal skinning
//! - [`clone_subtree`] — Deep clone with metadata remapping

mod clone;
mod graph;
mod mesh;
mod skin;
mod types;

pub use clone::clone_subtree;
pub use graph::SceneGraph;
pub use mesh::{Material, Mesh, MorphState};
pub use skin::{
    normalize_skin_weights, BindMode, BoneTexture, Skeleton, SkeletonState, SkinBinding,
};
pub use types::{InspectorMetadata, NodeId, NodeKind, NodeTransform, SceneNode};
