//! # RedLilium Optimizer
//!
//! Buffer-level geometry optimization for imported scenes.
//!
//! - [`optimize::indexify`] welds non-indexed vertex streams into indexed
//!   geometry within a tolerance.
//! - [`optimize::MeshSplitter`] splits multi-material meshes into one mesh per
//!   material, compacting vertex, morph and skinning data and moving
//!   animation tracks onto the new meshes.
//!
//! Scenes are built with [`scene::SceneGraph`]; no file format parsing is
//! done here.

pub mod animation;
pub mod geometry;
pub mod math;
pub mod optimize;
pub mod profiling;
pub mod scene;

pub use optimize::{
    indexify, MeshSplitter, OptimizeError, OptimizeOptions, OptimizeResult, SplitReport,
};

/// Optimizer library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
