//! Animation clip and track types.

/// Keyframe interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Linear interpolation between keyframes.
    #[default]
    Linear,
    /// Step (constant) interpolation.
    Step,
    /// Cubic spline interpolation (values carry in/out tangents).
    CubicSpline,
}

/// A time-sampled animation curve.
///
/// The name addresses the animated property as `"<node name>.<property>"`,
/// e.g. `"Cylinder.position"` or `"Face.morph_target_influences[smile]"`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack {
    pub name: String,
    /// Keyframe times in seconds, ascending.
    pub times: Vec<f32>,
    /// Flattened keyframe values, `values.len() / times.len()` per key.
    pub values: Vec<f32>,
    pub interpolation: Interpolation,
}

impl KeyframeTrack {
    /// Create a linearly interpolated track.
    pub fn new(name: impl Into<String>, times: Vec<f32>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            times,
            values,
            interpolation: Interpolation::Linear,
        }
    }

    /// Set the interpolation mode.
    #[must_use]
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// The property part of the name if the track targets the node `node`.
    pub fn property_of(&self, node: &str) -> Option<&str> {
        self.name
            .strip_prefix(node)
            .and_then(|rest| rest.strip_prefix('.'))
    }

    /// A copy of this track targeting `node` instead, if it targets `from`.
    pub fn retargeted(&self, from: &str, node: &str) -> Option<Self> {
        let property = self.property_of(from)?;
        Some(Self {
            name: format!("{node}.{property}"),
            ..self.clone()
        })
    }

    /// Values per keyframe.
    pub fn value_size(&self) -> usize {
        if self.times.is_empty() {
            0
        } else {
            self.values.len() / self.times.len()
        }
    }

    /// Time of the last keyframe.
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }
}

/// A named set of tracks played together.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Clip length in seconds.
    pub duration: f32,
    pub tracks: Vec<KeyframeTrack>,
}

impl AnimationClip {
    /// Create a clip whose duration is the latest keyframe across `tracks`.
    pub fn new(name: impl Into<String>, tracks: Vec<KeyframeTrack>) -> Self {
        let mut clip = Self {
            name: name.into(),
            duration: 0.0,
            tracks,
        };
        clip.reset_duration();
        clip
    }

    /// Recompute the duration from the tracks.
    pub fn reset_duration(&mut self) {
        self.duration = self
            .tracks
            .iter()
            .map(KeyframeTrack::end_time)
            .fold(0.0, f32::max);
    }

    /// Find a track by its full name.
    pub fn track(&self, name: &str) -> Option<&KeyframeTrack> {
        self.tracks.iter().find(|t| t.name == name)
    }

    /// Tracks whose target node is `node`.
    pub fn tracks_for<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a KeyframeTrack> {
        self.tracks
            .iter()
            .filter(move |t| t.property_of(node).is_some())
    }
}
