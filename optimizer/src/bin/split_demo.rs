//! Split demo: builds a multi-material cube scene, splits it by material and
//! logs what happened.
//!
//! ```bash
//! cargo run --bin split_demo -- --tolerance 0.001 --unindexed
//! cargo run --bin split_demo -- --config optimize.toml
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;
    use std::sync::Arc;

    use clap::Parser;
    use redlilium_optimizer::animation::{AnimationClip, KeyframeTrack};
    use redlilium_optimizer::geometry::generators::generate_box;
    use redlilium_optimizer::geometry::Geometry;
    use redlilium_optimizer::optimize::{deindex, AncestorPolicy, MeshSplitter, OptimizeOptions};
    use redlilium_optimizer::scene::{Material, Mesh, NodeTransform, SceneGraph, SceneNode};
    use redlilium_optimizer::OptimizeResult;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
    enum CliAncestorPolicy {
        /// Split ancestor meshes and keep them as group nodes.
        LeaveInPlace,
        /// Leave ancestor meshes unsplit.
        SkipMesh,
        /// Refuse to split.
        Abort,
    }

    impl From<CliAncestorPolicy> for AncestorPolicy {
        fn from(cli: CliAncestorPolicy) -> Self {
            match cli {
                CliAncestorPolicy::LeaveInPlace => AncestorPolicy::LeaveInPlace,
                CliAncestorPolicy::SkipMesh => AncestorPolicy::SkipMesh,
                CliAncestorPolicy::Abort => AncestorPolicy::Abort,
            }
        }
    }

    /// Split a generated multi-material cube by material.
    #[derive(Parser, Debug)]
    #[command(name = "split_demo", version)]
    struct Args {
        /// TOML file with an `[optimize]` table. Flags override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Vertex welding tolerance.
        #[arg(long)]
        tolerance: Option<f32>,

        /// What to do with meshes that have mesh children.
        #[arg(long, value_enum)]
        ancestor_policy: Option<CliAncestorPolicy>,

        /// Feed the cube as a non-indexed triangle soup so it gets welded first.
        #[arg(long)]
        unindexed: bool,

        /// Attach a second cube under the first one.
        #[arg(long)]
        nested: bool,
    }

    fn cube(name: &str, unindexed: bool) -> SceneNode {
        let geometry = generate_box(0.5, [0, 1, 0, 2, 1, 2]).with_label(name);
        let geometry = if unindexed { deindex(&geometry) } else { geometry };
        let materials = ["red", "green", "blue"]
            .into_iter()
            .map(|n| Arc::new(Material::new(n)))
            .collect();
        SceneNode::mesh(name, Mesh::new(geometry, materials))
            .with_transform(NodeTransform::IDENTITY.with_translation([0.0, 1.0, 0.0]))
    }

    fn spin_clip(target: &str) -> AnimationClip {
        let times = vec![0.0, 1.0, 2.0];
        AnimationClip::new(
            "spin",
            vec![
                KeyframeTrack::new(format!("{target}.position"), times.clone(), vec![0.0; 9]),
                KeyframeTrack::new(
                    format!("{target}.quaternion"),
                    times.clone(),
                    [0.0, 0.0, 0.0, 1.0].repeat(3),
                ),
                KeyframeTrack::new(format!("{target}.scale"), times, vec![1.0; 9]),
            ],
        )
    }

    pub fn run() -> OptimizeResult<()> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        let args = Args::parse();

        let mut options = match &args.config {
            Some(path) => OptimizeOptions::load(path)?,
            None => OptimizeOptions::default(),
        };
        if let Some(tolerance) = args.tolerance {
            options = options.with_tolerance(tolerance);
        }
        if let Some(policy) = args.ancestor_policy {
            options = options.with_ancestor_policy(policy.into());
        }
        log::info!("Options: {:?}", options);

        let mut graph = SceneGraph::new();
        let root = graph.add(SceneNode::group("scene").with_animations(vec![spin_clip("cube")]));
        let cube_id = graph.add_child(root, cube("cube", args.unindexed))?;
        if args.nested {
            graph.add_child(cube_id, cube("inner", args.unindexed))?;
        }

        let mut released = 0usize;
        let report = {
            let disposer = |name: &str, geometry: Geometry| {
                let stats = geometry.stats();
                log::info!(
                    "Disposed \"{}\": {} vertices, {} bytes",
                    name,
                    stats.vertex_count,
                    stats.byte_len
                );
                released += stats.byte_len;
            };
            let mut splitter = MeshSplitter::with_disposer(options, disposer);
            splitter.split_subtree(&mut graph, root)?
        };
        graph.replace(root, report.root)?;
        let mut freed = graph.remove_subtree(root);
        for &source in &report.detached {
            freed += graph.remove_subtree(source);
        }
        log::info!("Freed {} nodes of the replaced subtree", freed);

        for &id in &report.produced {
            let node = graph.node(id)?;
            if let Some(mesh) = node.mesh_data() {
                let stats = mesh.geometry.stats();
                log::info!(
                    "  {}: {} vertices, {} triangles, material {:?}",
                    node.name,
                    stats.vertex_count,
                    stats.triangle_count,
                    mesh.materials.first().and_then(|m| m.name.as_deref())
                );
            }
        }
        for skipped in &report.skipped {
            log::warn!(
                "  skipped {} material {}: {:?}",
                skipped.mesh,
                skipped.material_index,
                skipped.reason
            );
        }
        for clip in graph.animation_clips(report.root) {
            for track in &clip.tracks {
                log::info!("  track {}", track.name);
            }
        }
        log::info!("Released {} bytes of source geometry", released);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(e) = native::run() {
        log::error!("Split failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
