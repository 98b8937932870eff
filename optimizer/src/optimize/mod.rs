//! Geometry optimization passes.
//!
//! - [`indexify`] — Weld a triangle soup into indexed geometry
//! - [`compact`] / [`IndexCompactor`] — Extract the vertices used by a set of draw groups
//! - [`MeshSplitter`] — Split multi-material meshes into one mesh per material
//! - [`OptimizeOptions`] — Tolerance and policies, loadable from TOML

mod compact;
mod dedup;
mod error;
mod options;
mod split;

pub use compact::{compact, Compacted, IndexCompactor, IndexMapper};
pub use dedup::{deindex, indexify};
pub use error::{OptimizeError, OptimizeResult};
pub use options::{AncestorPolicy, OptimizeOptions, DEFAULT_TOLERANCE};
pub use split::{
    GeometryDisposer, MeshSplitter, RootRemap, SkipReason, SkippedOutput, SplitReport,
};
