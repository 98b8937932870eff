//! Moving animation tracks from a split mesh onto the meshes that replace it.

use std::collections::HashSet;

use crate::profiling::profile_function;

use super::clip::{AnimationClip, KeyframeTrack};

/// Outcome of a [`relink`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelinkStats {
    /// Tracks that targeted the source node.
    pub matched: usize,
    /// Retargeted copies appended to the clip.
    pub added: usize,
    /// Tracks removed from the clip (the matched originals).
    pub removed: usize,
}

impl RelinkStats {
    /// Combine two results.
    pub fn merge(self, other: RelinkStats) -> RelinkStats {
        RelinkStats {
            matched: self.matched + other.matched,
            added: self.added + other.added,
            removed: self.removed + other.removed,
        }
    }
}

/// Tracks of one node to be moved onto new node names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRename {
    pub source: String,
    pub targets: Vec<String>,
    /// Leave the source's own tracks in the clip next to the copies.
    pub keep_source: bool,
}

impl TrackRename {
    pub fn new(source: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            source: source.into(),
            targets,
            keep_source: false,
        }
    }

    /// Keep the source's tracks instead of removing them.
    #[must_use]
    pub fn keeping_source(mut self) -> Self {
        self.keep_source = true;
        self
    }
}

/// Replace every track of `clip` that targets `source` with one copy per
/// name in `targets`.
///
/// Unrelated tracks keep their order and come first; the copies follow,
/// grouped by target in the order given. A copy whose name is already taken
/// is dropped with a warning, so track names stay unique. An empty `targets`
/// list simply removes the source's tracks.
pub fn relink(clip: &mut AnimationClip, source: &str, targets: &[String]) -> RelinkStats {
    relink_all(clip, &[TrackRename::new(source, targets.to_vec())])
}

/// Apply several renames to `clip` in one pass.
///
/// Every track is matched against the clip as it was before the call, so a
/// copy emitted for one rename is never picked up by another. A track that
/// fits several sources (`"A"` and `"A.x"`) belongs to the longest one.
/// Copies are appended rename by rename, each grouped by target; tracks of a
/// [`keep_source`](TrackRename::keep_source) rename stay where they were.
pub fn relink_all(clip: &mut AnimationClip, renames: &[TrackRename]) -> RelinkStats {
    profile_function!();

    let mut matched: Vec<Vec<KeyframeTrack>> = vec![Vec::new(); renames.len()];
    let mut kept = Vec::with_capacity(clip.tracks.len());
    for track in std::mem::take(&mut clip.tracks) {
        match owner(&track, renames) {
            Some(i) if renames[i].keep_source => {
                matched[i].push(track.clone());
                kept.push(track);
            }
            Some(i) => matched[i].push(track),
            None => kept.push(track),
        }
    }
    clip.tracks = kept;

    let mut stats = RelinkStats::default();
    for (rename, tracks) in renames.iter().zip(&matched) {
        stats.matched += tracks.len();
        if !rename.keep_source {
            stats.removed += tracks.len();
        }
    }
    if stats.matched == 0 {
        return stats;
    }

    let mut taken: HashSet<String> = clip.tracks.iter().map(|t| t.name.clone()).collect();
    for (rename, tracks) in renames.iter().zip(&matched) {
        if tracks.is_empty() {
            continue;
        }
        for target in &rename.targets {
            for track in tracks {
                let Some(copy) = track.retargeted(&rename.source, target) else {
                    continue;
                };
                if !taken.insert(copy.name.clone()) {
                    log::warn!(
                        "Clip \"{}\": track \"{}\" already exists, dropping retargeted copy",
                        clip.name,
                        copy.name
                    );
                    continue;
                }
                clip.tracks.push(copy);
                stats.added += 1;
            }
        }
        log::debug!(
            "Clip \"{}\": relinked {} tracks of \"{}\" onto {} targets",
            clip.name,
            tracks.len(),
            rename.source,
            rename.targets.len()
        );
    }
    stats
}

/// Index of the rename owning `track`.
fn owner(track: &KeyframeTrack, renames: &[TrackRename]) -> Option<usize> {
    renames
        .iter()
        .enumerate()
        .filter(|(_, rename)| track.property_of(&rename.source).is_some())
        .max_by_key(|(_, rename)| rename.source.len())
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str) -> KeyframeTrack {
        KeyframeTrack::new(name, vec![0.0, 1.0], vec![0.0, 1.0])
    }

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_relink_counts() {
        let mut clip = AnimationClip::new(
            "anim",
            vec![
                track("Cylinder.position"),
                track("Other.scale"),
                track("Cylinder.quaternion"),
                track("Cylinder.scale"),
            ],
        );
        let stats = relink(
            &mut clip,
            "Cylinder",
            &targets(&["Cylinder_0", "Cylinder_1", "Cylinder_2", "Cylinder_3"]),
        );

        assert_eq!(stats.matched, 3);
        assert_eq!(stats.added, 12);
        assert_eq!(clip.tracks.len(), 4 - 3 + 12);
        assert_eq!(clip.tracks[0].name, "Other.scale");
        assert_eq!(clip.tracks[1].name, "Cylinder_0.position");
        assert_eq!(clip.tracks[3].name, "Cylinder_0.scale");
        assert_eq!(clip.tracks[4].name, "Cylinder_1.position");
        assert!(clip.tracks.iter().all(|t| t.property_of("Cylinder").is_none()));
    }

    #[test]
    fn test_relink_prefix_requires_dot() {
        let mut clip = AnimationClip::new("anim", vec![track("Arm.position"), track("Armature.position")]);
        let stats = relink(&mut clip, "Arm", &targets(&["Arm_0"]));
        assert_eq!(stats.matched, 1);
        let names: Vec<_> = clip.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Armature.position", "Arm_0.position"]);
    }

    #[test]
    fn test_relink_no_targets_removes() {
        let mut clip = AnimationClip::new("anim", vec![track("Box.position")]);
        let stats = relink(&mut clip, "Box", &[]);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.added, 0);
        assert!(clip.tracks.is_empty());
    }

    #[test]
    fn test_relink_drops_collisions() {
        let mut clip = AnimationClip::new(
            "anim",
            vec![track("Box.position"), track("Box_0.position")],
        );
        let stats = relink(&mut clip, "Box", &targets(&["Box_0", "Box_1"]));
        assert_eq!(stats.added, 1);
        assert_eq!(clip.tracks.len(), 2);
        assert!(clip.track("Box_1.position").is_some());
    }

    #[test]
    fn test_relink_untouched_clip() {
        let mut clip = AnimationClip::new("anim", vec![track("Other.position")]);
        let before = clip.clone();
        assert_eq!(relink(&mut clip, "Box", &targets(&["Box_0"])), RelinkStats::default());
        assert_eq!(clip, before);
    }

    #[test]
    fn test_relink_all_matches_original_names() {
        let mut clip = AnimationClip::new(
            "anim",
            vec![
                track("A.position"),
                track("A.scale"),
                track("A_0.position"),
                track("A_0.scale"),
            ],
        );
        let stats = relink_all(
            &mut clip,
            &[
                TrackRename::new("A", targets(&["A_0", "A_1"])),
                TrackRename::new("A_0", targets(&["A_0_0", "A_0_1"])),
            ],
        );

        assert_eq!(stats.matched, 4);
        assert_eq!(stats.removed, 4);
        assert_eq!(stats.added, 8);
        let names: Vec<_> = clip.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "A_0.position",
                "A_0.scale",
                "A_1.position",
                "A_1.scale",
                "A_0_0.position",
                "A_0_0.scale",
                "A_0_1.position",
                "A_0_1.scale",
            ]
        );
    }

    #[test]
    fn test_relink_all_longest_source_owns_track() {
        let mut clip = AnimationClip::new("anim", vec![track("A.x.position"), track("A.position")]);
        relink_all(
            &mut clip,
            &[
                TrackRename::new("A", targets(&["A_0"])),
                TrackRename::new("A.x", targets(&["A.x_0"])),
            ],
        );
        let names: Vec<_> = clip.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["A_0.position", "A.x_0.position"]);
    }

    #[test]
    fn test_relink_all_keep_source_counts_only_copies() {
        let mut clip = AnimationClip::new(
            "anim",
            vec![track("Outer.position"), track("Other.scale"), track("Outer.scale")],
        );
        let stats = relink_all(
            &mut clip,
            &[TrackRename::new("Outer", targets(&["Outer_0", "Outer_1"])).keeping_source()],
        );

        assert_eq!(stats.matched, 2);
        assert_eq!(stats.removed, 0);
        assert_eq!(stats.added, 4);
        let names: Vec<_> = clip.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Outer.position",
                "Other.scale",
                "Outer.scale",
                "Outer_0.position",
                "Outer_0.scale",
                "Outer_1.position",
                "Outer_1.scale",
            ]
        );
    }
}
