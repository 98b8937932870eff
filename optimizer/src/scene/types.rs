//! Scene graph node types.

use crate::animation::AnimationClip;
use crate::math::{self, Mat4, Vec3};

use super::mesh::Mesh;

/// Node transform decomposed into translation, rotation, and scale.
///
/// Uses plain arrays for portability. Convert with [`to_matrix`](Self::to_matrix)
/// when a matrix is needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    /// Translation [x, y, z].
    pub translation: [f32; 3],
    /// Rotation quaternion [x, y, z, w].
    pub rotation: [f32; 4],
    /// Scale [x, y, z].
    pub scale: [f32; 3],
}

impl NodeTransform {
    /// Identity transform: no translation, identity rotation, unit scale.
    pub const IDENTITY: Self = Self {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    /// Returns this transform with a different translation.
    #[must_use]
    pub const fn with_translation(mut self, translation: [f32; 3]) -> Self {
        self.translation = translation;
        self
    }

    /// Returns this transform with a different rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns this transform with a different scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    /// Local TRS matrix.
    pub fn to_matrix(&self) -> Mat4 {
        math::mat4_from_scale_rotation_translation(
            Vec3::from(self.scale),
            math::quat_from_array(self.rotation),
            Vec3::from(self.translation),
        )
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Handle to a node inside a [`SceneGraph`](super::SceneGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Arena slot of this node.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Per-node data consumed by the inspector overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectorMetadata {
    /// Whether the node can be picked in the inspector.
    pub selectable: bool,
    /// Node to select instead of this one when it is hit-tested.
    /// A back-reference only; it never owns the target.
    pub hit_redirect: Option<NodeId>,
}

impl Default for InspectorMetadata {
    fn default() -> Self {
        Self {
            selectable: true,
            hit_redirect: None,
        }
    }
}

/// What a node carries besides its transform.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Pure grouping node.
    Group,
    /// Skeleton joint.
    Bone,
    /// Renderable mesh.
    Mesh(Mesh),
}

/// A node in a [`SceneGraph`](super::SceneGraph).
///
/// Parent and child links are maintained by the graph; build nodes with the
/// `with_*` methods and insert them through
/// [`SceneGraph::add_child`](super::SceneGraph::add_child).
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Node name. Animation tracks address nodes by this name.
    pub name: String,
    /// Local transform relative to parent.
    pub transform: NodeTransform,
    /// Node payload.
    pub kind: NodeKind,
    /// Inspector flags.
    pub metadata: InspectorMetadata,
    /// Animation clips rooted at this node.
    pub animations: Vec<AnimationClip>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl SceneNode {
    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: NodeTransform::IDENTITY,
            kind,
            metadata: InspectorMetadata::default(),
            animations: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Creates a grouping node.
    pub fn group(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Group)
    }

    /// Creates a bone node.
    pub fn bone(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Bone)
    }

    /// Creates a mesh node.
    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self::with_kind(name, NodeKind::Mesh(mesh))
    }

    /// Set the local transform.
    #[must_use]
    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the inspector metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: InspectorMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the animation clips.
    #[must_use]
    pub fn with_animations(mut self, animations: Vec<AnimationClip>) -> Self {
        self.animations = animations;
        self
    }

    pub fn mesh_data(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_data_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Copy of this node without parent or children links.
    pub(crate) fn detached_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            transform: self.transform,
            kind: self.kind.clone(),
            metadata: self.metadata,
            animations: self.animations.clone(),
            parent: None,
            children: Vec::new(),
        }
    }
}
