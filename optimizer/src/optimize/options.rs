//! Optimizer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{OptimizeError, OptimizeResult};

/// Default vertex welding tolerance.
pub const DEFAULT_TOLERANCE: f32 = 1e-4;

/// What to do with a mesh that has other meshes below it in the subtree.
///
/// Detaching such a mesh would also detach its mesh descendants and the
/// meshes split from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncestorPolicy {
    /// Split the mesh but keep the source attached. Logs a warning.
    #[default]
    LeaveInPlace,
    /// Leave the mesh untouched. Logs a warning.
    SkipMesh,
    /// Fail the whole split before touching the graph.
    Abort,
}

/// Settings for [`MeshSplitter`](super::MeshSplitter) and
/// [`indexify`](super::indexify).
///
/// Loadable from the `[optimize]` table of a TOML file:
///
/// ```toml
/// [optimize]
/// tolerance = 0.0001
/// ancestor_policy = "skip_mesh"
/// compute_bounds = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeOptions {
    /// Per-component tolerance for merging vertices.
    pub tolerance: f32,
    pub ancestor_policy: AncestorPolicy,
    /// Deduplicate unindexed geometry before splitting.
    pub dedup_unindexed: bool,
    /// Make skin weights of split meshes sum to one.
    pub normalize_skin_weights: bool,
    /// Recompute bone matrices and the bone texture for skinned outputs.
    pub refresh_skeletons: bool,
    /// Recompute bounding box and sphere of split meshes.
    pub compute_bounds: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            ancestor_policy: AncestorPolicy::default(),
            dedup_unindexed: true,
            normalize_skin_weights: true,
            refresh_skeletons: true,
            compute_bounds: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OptionsFile {
    #[serde(default)]
    optimize: OptimizeOptions,
}

impl OptimizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_ancestor_policy(mut self, policy: AncestorPolicy) -> Self {
        self.ancestor_policy = policy;
        self
    }

    #[must_use]
    pub fn with_dedup_unindexed(mut self, enabled: bool) -> Self {
        self.dedup_unindexed = enabled;
        self
    }

    #[must_use]
    pub fn with_normalize_skin_weights(mut self, enabled: bool) -> Self {
        self.normalize_skin_weights = enabled;
        self
    }

    #[must_use]
    pub fn with_refresh_skeletons(mut self, enabled: bool) -> Self {
        self.refresh_skeletons = enabled;
        self
    }

    #[must_use]
    pub fn with_compute_bounds(mut self, enabled: bool) -> Self {
        self.compute_bounds = enabled;
        self
    }

    /// Parse options from TOML text. Missing keys (or a missing
    /// `[optimize]` table) keep their defaults.
    pub fn from_toml_str(text: &str) -> OptimizeResult<Self> {
        let file: OptionsFile = toml::from_str(text)?;
        Ok(file.optimize)
    }

    /// Load options from a TOML file.
    pub fn load(path: &Path) -> OptimizeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| OptimizeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let options = Self::from_toml_str(&text)?;
        log::info!("Loaded optimizer options from {}", path.display());
        Ok(options)
    }

    /// Tolerance clamped to a usable value: negative or NaN becomes zero.
    pub fn effective_tolerance(&self) -> f32 {
        sanitize_tolerance(self.tolerance)
    }
}

pub(crate) fn sanitize_tolerance(tolerance: f32) -> f32 {
    if tolerance >= 0.0 {
        tolerance
    } else {
        log::warn!("Invalid vertex tolerance {tolerance}, using 0");
        0.0
    }
}
