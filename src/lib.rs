//! # Kiln
//!
//! Scene graph and skeletal animation blending.
//!
//! This umbrella crate re-exports the member crates under short module names
//! and lifts the most used types to the crate root:
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | [`core`] | `kiln_core` | `StringHash`, `KilnError`, `FrameClock` |
//! | [`scene`] | `kiln_scene` | `Scene`, `Node`, `Transform`, `Skeleton` |
//! | [`animation`] | `kiln_animation` | clips, states, blending, mixer |
//!
//! ```rust,ignore
//! use kiln::prelude::*;
//!
//! let mut scene = Scene::new();
//! let rig = scene.instantiate_skeleton(skeleton, None);
//! let state = AnimationState::new_for_skeleton(&scene, rig, clip)?;
//!
//! let mut mixer = AnimationMixer::new(AnimationSettings::default());
//! let walk = mixer.add_state(state);
//! for event in mixer.update(clock.tick(), &mut scene) { /* ... */ }
//! ```

pub use kiln_animation as animation;
pub use kiln_core as core;
pub use kiln_scene as scene;

pub use kiln_animation::{
    AnimationBlendMode, AnimationClip, AnimationEvent, AnimationMixer, AnimationSettings,
    AnimationState, AnimationTrack,
};
pub use kiln_core::{FrameClock, KilnError, Result, StringHash};
pub use kiln_scene::{NodeHandle, Scene, SkeletonKey};

pub mod prelude {
    pub use kiln_animation::{
        AnimationBlendMode, AnimationChannels, AnimationClip, AnimationEvent, AnimationKeyFrame,
        AnimationMixer, AnimationSettings, AnimationState, AnimationTrack, InterpolationMode,
        MixerEvent, StateKey, TriggerData,
    };
    pub use kiln_core::{FrameClock, KilnError, Result, StringHash};
    pub use kiln_scene::{Bone, Node, NodeHandle, Scene, Skeleton, SkeletonKey, Transform};

    pub use glam::{Quat, Vec3};
}
