//! Blend evaluator.
//!
//! Samples every active track at the state's time and composes the result
//! into the bound transforms. All writes are silent: the owner of the target
//! marks it dirty once after every state touching it has been applied.

use glam::{Quat, Vec3};
use kiln_scene::{Scene, Transform};

use crate::binding::{AnimationTarget, BoundTarget};
use crate::state::{AnimationBlendMode, AnimationState};
use crate::tracks::AnimationChannels;
use crate::values::Pose;

const UNIT_WEIGHT_EPSILON: f32 = 1e-6;
const SCALE_EPSILON: f32 = 1e-6;

impl AnimationState {
    /// Composes the current sample of every active track onto the target.
    ///
    /// Returns the number of tracks written. Does nothing when the state is
    /// disabled, the clip has no tracks, or the target no longer exists.
    pub fn apply(&mut self, scene: &mut Scene) -> usize {
        if !self.is_enabled() || self.clip.num_tracks() == 0 || !self.is_target_alive(scene) {
            return 0;
        }

        let skeleton = match &self.target {
            AnimationTarget::Skeleton(t) => scene.skeletons.get(t.key),
            AnimationTarget::Nodes(_) => None,
        };
        let nodes = &mut scene.nodes;

        let length = self.clip.length();
        let loop_length = (self.looped && length > 0.0).then_some(length);
        let epsilon = self.settings.weight_epsilon;
        let mut written = 0;

        for binding in &mut self.bindings {
            if !binding.active {
                continue;
            }
            let Some(target) = binding.target else {
                continue;
            };

            let weight = self.weight * binding.weight;
            if weight.abs() <= epsilon {
                continue;
            }

            if let BoundTarget::Bone { bone_index, .. } = target {
                let animated = skeleton
                    .and_then(|s| s.bone(bone_index))
                    .is_some_and(|b| b.animated);
                if !animated {
                    continue;
                }
            }

            let Some(track) = self.clip.track(binding.track_index) else {
                continue;
            };
            let Some(node) = nodes.get_mut(target.node()) else {
                continue;
            };
            let Some(sample) = track.sample(self.time, &mut binding.cursor, loop_length) else {
                continue;
            };

            match self.blend_mode {
                AnimationBlendMode::Lerp => {
                    blend_lerp(&mut node.transform, track.channels, &sample, weight);
                }
                AnimationBlendMode::Additive => {
                    blend_additive(&mut node.transform, track.channels, &sample, &binding.rest, weight);
                }
            }
            written += 1;
        }

        written
    }

    /// Silently writes the rest pose captured at bind time to every active,
    /// bound track's target.
    pub fn reset_pose(&self, scene: &mut Scene) {
        for binding in &self.bindings {
            if !binding.active {
                continue;
            }
            let Some(node) = binding.node().and_then(|h| scene.nodes.get_mut(h)) else {
                continue;
            };
            let t = &mut node.transform;
            t.set_position_silent(binding.rest.position);
            t.set_rotation_silent(binding.rest.rotation);
            t.set_scale_silent(binding.rest.scale);
        }
    }
}

/// Moves the masked channels of `transform` toward `sample` by `weight`.
pub fn blend_lerp(transform: &mut Transform, channels: AnimationChannels, sample: &Pose, weight: f32) {
    let full = (weight - 1.0).abs() <= UNIT_WEIGHT_EPSILON;

    if channels.contains(AnimationChannels::POSITION) {
        let value = if full {
            sample.position
        } else {
            transform.position().lerp(sample.position, weight)
        };
        transform.set_position_silent(value);
    }
    if channels.contains(AnimationChannels::ROTATION) {
        let value = if full {
            sample.rotation
        } else {
            transform.rotation().slerp(sample.rotation, weight).normalize()
        };
        transform.set_rotation_silent(value);
    }
    if channels.contains(AnimationChannels::SCALE) {
        let value = if full {
            sample.scale
        } else {
            transform.scale().lerp(sample.scale, weight)
        };
        transform.set_scale_silent(value);
    }
}

/// Adds the masked channels' difference between `sample` and `rest`, scaled
/// by `weight`, on top of `transform`.
pub fn blend_additive(
    transform: &mut Transform,
    channels: AnimationChannels,
    sample: &Pose,
    rest: &Pose,
    weight: f32,
) {
    if channels.contains(AnimationChannels::POSITION) {
        let delta = (sample.position - rest.position) * weight;
        transform.set_position_silent(transform.position() + delta);
    }
    if channels.contains(AnimationChannels::ROTATION) {
        let delta = Quat::IDENTITY.slerp(sample.rotation * rest.rotation.inverse(), weight);
        transform.set_rotation_silent((delta * transform.rotation()).normalize());
    }
    if channels.contains(AnimationChannels::SCALE) {
        let ratio = scale_ratio(sample.scale, rest.scale);
        let factor = Vec3::ONE.lerp(ratio, weight);
        transform.set_scale_silent(transform.scale() * factor);
    }
}

/// Per-component `sample / rest`, treating a near-zero rest as ratio 1.
fn scale_ratio(sample: Vec3, rest: Vec3) -> Vec3 {
    let ratio = |s: f32, r: f32| if r.abs() <= SCALE_EPSILON { 1.0 } else { s / r };
    Vec3::new(
        ratio(sample.x, rest.x),
        ratio(sample.y, rest.y),
        ratio(sample.z, rest.z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_vec(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn lerp_respects_channel_mask() {
        let mut t = Transform::from_trs(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let sample = Pose::new(Vec3::X * 4.0, Quat::from_rotation_y(1.0), Vec3::splat(2.0));

        blend_lerp(&mut t, AnimationChannels::POSITION, &sample, 0.5);
        assert!(approx_vec(t.position(), Vec3::X * 2.0));
        assert_eq!(t.rotation(), Quat::IDENTITY);
        assert_eq!(t.scale(), Vec3::ONE);
    }

    #[test]
    fn full_weight_lerp_writes_sample() {
        let mut t = Transform::new();
        let sample = Pose::new(Vec3::Y, Quat::from_rotation_x(0.3), Vec3::splat(3.0));
        blend_lerp(&mut t, AnimationChannels::all(), &sample, 1.0);
        assert_eq!(t.position(), sample.position);
        assert_eq!(t.rotation(), sample.rotation);
        assert_eq!(t.scale(), sample.scale);
    }

    #[test]
    fn additive_rest_pose_contributes_nothing() {
        let rest = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_z(0.4), Vec3::splat(2.0));
        let start = Pose::new(Vec3::splat(5.0), Quat::from_rotation_y(0.7), Vec3::splat(1.5));
        let mut t = Transform::from_trs(start.position, start.rotation, start.scale);

        blend_additive(&mut t, AnimationChannels::all(), &rest, &rest, 0.8);
        assert!(approx_vec(t.position(), start.position));
        assert!(t.rotation().angle_between(start.rotation) < 1e-4);
        assert!(approx_vec(t.scale(), start.scale));
    }

    #[test]
    fn additive_scale_ratio_ignores_zero_rest() {
        let mut t = Transform::from_trs(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let rest = Pose::new(Vec3::ZERO, Quat::IDENTITY, Vec3::new(0.0, 1.0, 2.0));
        let sample = Pose::new(Vec3::ZERO, Quat::IDENTITY, Vec3::new(5.0, 2.0, 4.0));

        blend_additive(&mut t, AnimationChannels::SCALE, &sample, &rest, 1.0);
        assert!(approx_vec(t.scale(), Vec3::new(1.0, 2.0, 2.0)));
    }

    #[test]
    fn additive_position_scales_by_weight() {
        let mut t = Transform::from_trs(Vec3::X, Quat::IDENTITY, Vec3::ONE);
        let rest = Pose::IDENTITY;
        let sample = Pose::new(Vec3::Y * 2.0, Quat::IDENTITY, Vec3::ONE);

        blend_additive(&mut t, AnimationChannels::POSITION, &sample, &rest, 0.5);
        assert!(approx_vec(t.position(), Vec3::new(1.0, 1.0, 0.0)));
    }
}
