//! Arena-backed scene graph.

use crate::animation::AnimationClip;
use crate::math::Mat4;
use crate::optimize::{OptimizeError, OptimizeResult};

use super::types::{NodeId, SceneNode};

/// A forest of [`SceneNode`]s addressed by [`NodeId`].
///
/// Detaching a node only unlinks it from its parent, so ids held elsewhere
/// (hit redirects, skeleton bones) stay valid. Detached subtrees are freed
/// with [`remove_subtree`](Self::remove_subtree); their slots are never
/// reused, so a stale id reads as missing rather than as another node.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<Option<SceneNode>>,
    live: usize,
}

impl SceneGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node without a parent.
    pub fn add(&mut self, mut node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = None;
        node.children.clear();
        self.nodes.push(Some(node));
        self.live += 1;
        id
    }

    /// Insert a node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: SceneNode) -> OptimizeResult<NodeId> {
        self.node(parent)?;
        let id = self.add(node);
        self.link(parent, id, None);
        Ok(id)
    }

    /// Move `child` (with its subtree) under `parent`, appended last.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> OptimizeResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if parent == child || self.is_ancestor_of(child, parent) {
            return Err(OptimizeError::CyclicAttach { parent, child });
        }
        self.detach(child);
        self.link(parent, child, None);
        Ok(())
    }

    /// Unlink a node from its parent. The node and its subtree stay in the arena.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|&c| c != id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
    }

    /// Detach `root` and free it together with its descendants. Returns the
    /// number of nodes removed.
    pub fn remove_subtree(&mut self, root: NodeId) -> usize {
        self.detach(root);
        let doomed = self.descendants(root);
        for &id in &doomed {
            if let Some(slot) = self.nodes.get_mut(id.index()) {
                *slot = None;
            }
        }
        self.live -= doomed.len();
        log::debug!("Removed {} nodes under {:?}", doomed.len(), root);
        doomed.len()
    }

    /// Put `replacement` in the place of `original` under the same parent and
    /// detach `original`. A parentless `original` leaves `replacement` as a root.
    pub fn replace(&mut self, original: NodeId, replacement: NodeId) -> OptimizeResult<()> {
        self.node(original)?;
        self.node(replacement)?;
        if original == replacement {
            return Ok(());
        }
        let Some(parent) = self.parent(original) else {
            self.detach(replacement);
            return Ok(());
        };
        if self.is_ancestor_of(replacement, parent) {
            return Err(OptimizeError::CyclicAttach {
                parent,
                child: replacement,
            });
        }
        self.detach(replacement);
        let position = self
            .children(parent)
            .iter()
            .position(|&c| c == original);
        self.detach(original);
        self.link(parent, replacement, position);
        Ok(())
    }

    /// Callers check that both nodes exist.
    fn link(&mut self, parent: NodeId, child: NodeId, position: Option<usize>) {
        if let Some(node) = self.get_mut(parent) {
            match position {
                Some(position) if position <= node.children.len() => {
                    node.children.insert(position, child)
                }
                _ => node.children.push(child),
            }
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Like [`get`](Self::get), but reports unknown ids as an error.
    pub fn node(&self, id: NodeId) -> OptimizeResult<&SceneNode> {
        self.get(id).ok_or(OptimizeError::UnknownNode(id))
    }

    /// Like [`get_mut`](Self::get_mut), but reports unknown ids as an error.
    pub fn node_mut(&mut self, id: NodeId) -> OptimizeResult<&mut SceneNode> {
        self.get_mut(id).ok_or(OptimizeError::UnknownNode(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(SceneNode::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(SceneNode::children).unwrap_or_default()
    }

    /// Number of nodes not yet removed, attached or not.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// `root` and all its descendants in depth-first pre-order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if !self.contains(root) {
            return order;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    /// Check if `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// First node named `name` in pre-order below (and including) `root`.
    pub fn find_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&id| self.get(id).is_some_and(|n| n.name == name))
    }

    /// World matrix of a node: the product of local transforms from its root down.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::identity();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.get(id)) {
            matrix = node.transform.to_matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// Animation clips stored on `root`.
    pub fn animation_clips(&self, root: NodeId) -> &[AnimationClip] {
        self.get(root)
            .map(|n| n.animations.as_slice())
            .unwrap_or_default()
    }
}
