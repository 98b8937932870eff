//! Optimizer error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::scene::NodeId;

/// Errors returned for API misuse or an aborted split.
///
/// Data problems inside a mesh (missing material slots, empty groups,
/// out-of-range indices) are not errors: the affected output is skipped
/// and a warning is logged.
#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("Node {0:?} does not exist in the scene graph")]
    UnknownNode(NodeId),
    #[error("Node {0:?} is not a mesh")]
    NotAMesh(NodeId),
    #[error("Mesh \"{mesh}\" is an ancestor of mesh \"{descendant}\"")]
    MeshIsAncestor { mesh: String, descendant: String },
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    CyclicAttach { parent: NodeId, child: NodeId },
    #[error("Failed to read config {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type OptimizeResult<T> = Result<T, OptimizeError>;
