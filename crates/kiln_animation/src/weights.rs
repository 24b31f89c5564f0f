//! Per-bone weight table.
//!
//! Each track binding carries a weight multiplier (default 1.0) applied on
//! top of the state weight. Weights are stored as given: values above 1
//! exaggerate, negative values invert.

use kiln_core::StringHash;
use kiln_scene::NodeHandle;
use kiln_scene::skeleton::descendants_of;

use crate::binding::AnimationTarget;
use crate::state::AnimationState;

impl AnimationState {
    /// Sets the weight of one track.
    ///
    /// With `recursive`, every track bound to a descendant bone of this
    /// track's bone receives the same weight. Descendants are found through
    /// the skeleton hierarchy, so bones without a track do not break the
    /// chain. Node-hierarchy states ignore `recursive`.
    pub fn set_bone_weight(&mut self, index: usize, weight: f32, recursive: bool) {
        let Some(binding) = self.bindings.get_mut(index) else {
            return;
        };
        binding.weight = weight;
        let bone = binding.bone_index();

        if !recursive {
            return;
        }

        match &self.target {
            AnimationTarget::Nodes(_) => {
                log::warn!(
                    "Recursive bone weights are not supported for node animation (clip '{}')",
                    self.clip.name()
                );
            }
            AnimationTarget::Skeleton(target) => {
                let Some(bone) = bone else {
                    return;
                };
                let mut below = vec![false; target.parent_indices.len()];
                for i in descendants_of(&target.parent_indices, bone) {
                    below[i] = true;
                }
                for binding in &mut self.bindings {
                    if binding.bone_index().is_some_and(|b| below.get(b) == Some(&true)) {
                        binding.weight = weight;
                    }
                }
            }
        }
    }

    pub fn set_bone_weight_by_name(&mut self, name: &str, weight: f32, recursive: bool) {
        self.set_bone_weight_by_hash(StringHash::new(name), weight, recursive);
    }

    pub fn set_bone_weight_by_hash(&mut self, name_hash: StringHash, weight: f32, recursive: bool) {
        if let Some(index) = self.track_index_by_hash(name_hash) {
            self.set_bone_weight(index, weight, recursive);
        }
    }

    /// Weight of a track, or 0.0 if there is no such track.
    #[must_use]
    pub fn bone_weight(&self, index: usize) -> f32 {
        self.bindings.get(index).map_or(0.0, |b| b.weight)
    }

    #[must_use]
    pub fn bone_weight_by_name(&self, name: &str) -> f32 {
        self.bone_weight_by_hash(StringHash::new(name))
    }

    #[must_use]
    pub fn bone_weight_by_hash(&self, name_hash: StringHash) -> f32 {
        self.track_index_by_hash(name_hash)
            .map_or(0.0, |i| self.bone_weight(i))
    }

    // ========================================================================
    // Track lookup
    // ========================================================================

    #[must_use]
    pub fn track_index(&self, name: &str) -> Option<usize> {
        self.track_index_by_hash(StringHash::new(name))
    }

    #[must_use]
    pub fn track_index_by_hash(&self, name_hash: StringHash) -> Option<usize> {
        self.clip
            .track_index_by_hash(name_hash)
            .filter(|&i| i < self.bindings.len())
    }

    /// Index of the track bound to `node`.
    #[must_use]
    pub fn track_index_by_node(&self, node: NodeHandle) -> Option<usize> {
        self.bindings.iter().position(|b| b.node() == Some(node))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Quat, Vec3};
    use kiln_scene::{Bone, Scene, Skeleton};

    use super::*;
    use crate::clip::AnimationClip;
    use crate::tracks::{AnimationChannels, AnimationKeyFrame, AnimationTrack};

    fn clip(names: &[&str]) -> Arc<AnimationClip> {
        Arc::new(AnimationClip::from_tracks(
            "clip",
            names
                .iter()
                .map(|n| {
                    AnimationTrack::new(n, AnimationChannels::all()).with_key_frames(vec![
                        AnimationKeyFrame::new(0.0, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE),
                    ])
                })
                .collect(),
        ))
    }

    #[test]
    fn recursive_weight_skips_trackless_bones() {
        let mut scene = Scene::new();
        // root -> spine -> chest (no track) -> head
        //      -> leg
        let skeleton = Skeleton::new(
            "rig",
            vec![
                Bone::new("root", None),
                Bone::new("spine", Some(0)),
                Bone::new("chest", Some(1)),
                Bone::new("head", Some(2)),
                Bone::new("leg", Some(0)),
            ],
        )
        .unwrap();
        let key = scene.instantiate_skeleton(skeleton, None);
        let mut state =
            AnimationState::new_for_skeleton(&scene, key, clip(&["root", "spine", "head", "leg"]))
                .unwrap();

        state.set_bone_weight_by_name("spine", 0.3, true);
        assert_eq!(state.bone_weight_by_name("spine"), 0.3);
        assert_eq!(state.bone_weight_by_name("head"), 0.3);
        assert_eq!(state.bone_weight_by_name("root"), 1.0);
        assert_eq!(state.bone_weight_by_name("leg"), 1.0);
    }

    #[test]
    fn weights_pass_through_unclamped() {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        let mut state = AnimationState::new_for_node(&scene, root, clip(&["root"])).unwrap();

        state.set_bone_weight(0, 2.5, false);
        assert_eq!(state.bone_weight(0), 2.5);
        state.set_bone_weight(0, -1.0, true);
        assert_eq!(state.bone_weight(0), -1.0);
    }

    #[test]
    fn misses_use_sentinels() {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        let mut state = AnimationState::new_for_node(&scene, root, clip(&["root"])).unwrap();

        assert_eq!(state.track_index("nope"), None);
        assert_eq!(state.bone_weight(7), 0.0);
        assert_eq!(state.bone_weight_by_name("nope"), 0.0);
        assert_eq!(state.track_index_by_node(root), Some(0));

        state.set_bone_weight(7, 0.1, false);
        assert_eq!(state.bone_weight(0), 1.0);
    }
}
