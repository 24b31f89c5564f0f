//! Skeletal Mixer Demo
//!
//! Drives a small biped rig for three simulated seconds:
//! - a looped walk cycle on layer 0 with footstep triggers
//! - an additive spine lean on layer 1, faded in over half a second
//!
//! Events and the final head position are logged. Run with
//! `RUST_LOG=debug` to also see binding and mixer activity.

use std::f32::consts::FRAC_PI_8;
use std::sync::Arc;
use std::time::Duration;

use kiln::prelude::*;

const FRAME: Duration = Duration::from_micros(16_667);
const DURATION_SECS: f32 = 3.0;

fn build_rig() -> kiln::Result<Skeleton> {
    let up = |y: f32| Vec3::new(0.0, y, 0.0);
    Skeleton::new(
        "biped",
        vec![
            Bone::new("hips", None).with_bind_pose(up(1.0), Quat::IDENTITY, Vec3::ONE),
            Bone::new("spine", Some(0)).with_bind_pose(up(0.2), Quat::IDENTITY, Vec3::ONE),
            Bone::new("chest", Some(1)).with_bind_pose(up(0.25), Quat::IDENTITY, Vec3::ONE),
            Bone::new("neck", Some(2)).with_bind_pose(up(0.2), Quat::IDENTITY, Vec3::ONE),
            Bone::new("head", Some(3)).with_bind_pose(up(0.1), Quat::IDENTITY, Vec3::ONE),
            Bone::new("left_leg", Some(0)).with_bind_pose(Vec3::new(-0.1, -0.5, 0.0), Quat::IDENTITY, Vec3::ONE),
            Bone::new("right_leg", Some(0)).with_bind_pose(Vec3::new(0.1, -0.5, 0.0), Quat::IDENTITY, Vec3::ONE),
        ],
    )
}

fn swing_track(name: &str, offset: Vec3, phase: f32) -> AnimationTrack {
    let keys = (0..=4)
        .map(|i| {
            let t = i as f32 * 0.25;
            let angle = (t * std::f32::consts::TAU + phase).sin() * FRAC_PI_8;
            AnimationKeyFrame::new(t, offset, Quat::from_rotation_x(angle), Vec3::ONE)
        })
        .collect();
    AnimationTrack::new(name, AnimationChannels::ROTATION).with_key_frames(keys)
}

fn walk_clip() -> AnimationClip {
    let bob = AnimationTrack::new("hips", AnimationChannels::POSITION).with_key_frames(
        [0.0, 0.25, 0.5, 0.75, 1.0]
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let y = if i % 2 == 0 { 1.0 } else { 0.95 };
                AnimationKeyFrame::new(t, Vec3::new(0.0, y, 0.0), Quat::IDENTITY, Vec3::ONE)
            })
            .collect(),
    );

    let mut clip = AnimationClip::from_tracks(
        "walk",
        vec![
            bob,
            swing_track("left_leg", Vec3::new(-0.1, -0.5, 0.0), 0.0),
            swing_track("right_leg", Vec3::new(0.1, -0.5, 0.0), std::f32::consts::PI),
        ],
    );
    clip.add_trigger_at(0.25, true, "footstep", TriggerData::String("left".into()));
    clip.add_trigger_at(0.75, true, "footstep", TriggerData::String("right".into()));
    clip
}

fn lean_clip() -> AnimationClip {
    let lean = Quat::from_rotation_z(0.3);
    AnimationClip::from_tracks(
        "lean",
        vec![AnimationTrack::new("spine", AnimationChannels::ROTATION).with_key_frames(vec![
            AnimationKeyFrame::new(0.0, Vec3::ZERO, lean, Vec3::ONE),
            AnimationKeyFrame::new(1.0, Vec3::ZERO, lean, Vec3::ONE),
        ])],
    )
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut scene = Scene::new();
    let rig = scene.instantiate_skeleton(build_rig()?, None);

    let mut walk = AnimationState::new_for_skeleton(&scene, rig, Arc::new(walk_clip()))?;
    walk.set_looped(true);

    let mut lean = AnimationState::new_for_skeleton(&scene, rig, Arc::new(lean_clip()))?;
    lean.set_looped(true);
    lean.set_blend_mode(AnimationBlendMode::Additive);
    lean.set_layer(1);
    lean.set_weight(0.0);

    let settings = AnimationSettings {
        update_world_transforms: true,
        ..Default::default()
    };
    let mut mixer = AnimationMixer::new(settings);
    let walk_key = mixer.add_state(walk);
    let lean_key = mixer.add_state(lean);
    mixer.fade(lean_key, 1.0, 0.5);

    let mut clock = FrameClock::new();
    while clock.elapsed.as_secs_f32() < DURATION_SECS {
        let dt = clock.advance(FRAME);
        for MixerEvent { state, event } in mixer.update(dt, &mut scene) {
            let clip = if state == walk_key { "walk" } else { "lean" };
            match event {
                AnimationEvent::Trigger { name, data, .. } => {
                    log::info!("[frame {:>3}] {clip}: {name} {data:?}", clock.frame_count);
                }
                AnimationEvent::Looped => {
                    log::info!("[frame {:>3}] {clip}: looped", clock.frame_count);
                }
                AnimationEvent::Finished => {
                    log::info!("[frame {:>3}] {clip}: finished", clock.frame_count);
                }
            }
        }
    }

    let head = scene
        .skeleton(rig)
        .and_then(|s| s.bone_by_name("head"))
        .and_then(|b| b.node)
        .and_then(|h| scene.get_node(h))
        .map(|n| n.transform.world_position())
        .ok_or(KilnError::NodeNotFound)?;

    log::info!(
        "Simulated {} frames ({:.2}s); head at {head:.3}",
        clock.frame_count,
        clock.elapsed.as_secs_f32()
    );
    Ok(())
}
