//! Keyframe animation data and track relinking.
//!
//! - [`AnimationClip`] — Named collection of keyframe tracks
//! - [`KeyframeTrack`] — One time-sampled curve addressed as `"<node>.<property>"`
//! - [`relink`] / [`relink_all`] — Move tracks from one node name onto several new node names

mod clip;
mod relink;

pub use clip::{AnimationClip, Interpolation, KeyframeTrack};
pub use relink::{relink, relink_all, RelinkStats, TrackRename};
