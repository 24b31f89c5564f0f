use std::sync::Arc;

use kiln_core::{KilnError, Result};
use kiln_scene::skeleton::is_descendant;
use kiln_scene::{NodeHandle, Scene, SkeletonKey};

use crate::binding::{BoundTarget, TrackBinding};
use crate::clip::AnimationClip;
use crate::values::Pose;

/// Result of binding a clip against a skeleton.
#[derive(Debug, Clone)]
pub struct SkeletonBinding {
    pub bindings: Vec<TrackBinding>,
    pub parent_indices: Arc<[Option<usize>]>,
    pub root_bone: usize,
    /// Start bone actually used, after falling back to the root.
    pub start_bone: usize,
}

pub struct Binder;

impl Binder {
    /// Resolves each clip track to a skeleton bone by name hash.
    ///
    /// Tracks outside the start bone's subtree are bound but inactive. An
    /// absent or out-of-range start bone means the root bone.
    pub fn bind_skeleton(
        scene: &Scene,
        skeleton_key: SkeletonKey,
        clip: &AnimationClip,
        start_bone: Option<usize>,
    ) -> Result<SkeletonBinding> {
        let skeleton = scene
            .skeleton(skeleton_key)
            .ok_or(KilnError::SkeletonNotFound)?;

        let parent_indices = Arc::clone(skeleton.parent_indices());
        let root_bone = skeleton.root_bone_index();
        let start_bone = start_bone
            .filter(|&i| i < skeleton.num_bones())
            .unwrap_or(root_bone);

        let mut resolved = 0;
        let bindings: Vec<TrackBinding> = clip
            .tracks()
            .iter()
            .enumerate()
            .map(|(track_index, track)| {
                let Some(bone_index) = skeleton.bone_index_by_hash(track.name_hash()) else {
                    return TrackBinding::unresolved(track_index);
                };
                let bone = &skeleton.bones()[bone_index];
                let Some(node) = bone.node else {
                    return TrackBinding::unresolved(track_index);
                };

                resolved += 1;
                let active = is_descendant(&parent_indices, bone_index, start_bone);
                TrackBinding::resolved(
                    track_index,
                    BoundTarget::Bone { bone_index, node },
                    Pose::new(bone.initial_position, bone.initial_rotation, bone.initial_scale),
                    active,
                )
            })
            .collect();

        log::debug!(
            "Bound clip '{}' to skeleton '{}': {}/{} tracks resolved",
            clip.name(),
            skeleton.name,
            resolved,
            clip.num_tracks()
        );

        Ok(SkeletonBinding {
            bindings,
            parent_indices,
            root_bone,
            start_bone,
        })
    }

    /// Resolves each clip track to a node in the subtree under `root`.
    ///
    /// The root itself takes a track whose name matches it, or the only track
    /// of a single-track clip. Other tracks match descendants by name.
    pub fn bind_nodes(
        scene: &Scene,
        root: NodeHandle,
        clip: &AnimationClip,
        warn_unresolved: bool,
    ) -> Result<Vec<TrackBinding>> {
        let root_node = scene.get_node(root).ok_or(KilnError::NodeNotFound)?;
        let single_track = clip.num_tracks() == 1;

        let bindings = clip
            .tracks()
            .iter()
            .enumerate()
            .map(|(track_index, track)| {
                let found = if single_track || root_node.name_hash() == track.name_hash() {
                    Some(root)
                } else {
                    scene.find_child(root, track.name_hash(), true)
                };

                let Some(node) = found.and_then(|h| scene.get_node(h).map(|n| (h, n))) else {
                    if warn_unresolved {
                        log::warn!(
                            "Track '{}' of clip '{}' matches no node under '{}'",
                            track.name(),
                            clip.name(),
                            root_node.name()
                        );
                    }
                    return TrackBinding::unresolved(track_index);
                };

                let (handle, node) = node;
                let t = &node.transform;
                TrackBinding::resolved(
                    track_index,
                    BoundTarget::Node(handle),
                    Pose::new(t.position(), t.rotation(), t.scale()),
                    true,
                )
            })
            .collect();

        Ok(bindings)
    }
}
