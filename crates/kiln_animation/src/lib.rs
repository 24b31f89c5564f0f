//! Animation System
//!
//! Blends key-framed clips onto skeletons and node hierarchies:
//! - [`AnimationClip`] / [`AnimationTrack`]: shared, read-only key frame data
//! - [`AnimationState`]: one playback instance bound to one target
//! - [`AnimationMixer`]: orders, applies and commits several states per frame
//!
//! A frame looks like this:
//!
//! ```text
//! state.add_time(dt)      -> trigger / loop / finish events
//! state.apply(&mut scene) -> silent transform writes
//! scene.mark_dirty(root)  -> once per animated skeleton or node tree
//! ```

pub mod binder;
pub mod binding;
pub mod blend;
pub mod clip;
pub mod events;
pub mod mixer;
pub mod playback;
pub mod settings;
pub mod state;
pub mod tracks;
pub mod values;
pub mod weights;

pub use binder::{Binder, SkeletonBinding};
pub use binding::{AnimationTarget, BoundTarget, NodeTarget, SkeletonTarget, TrackBinding};
pub use clip::{AnimationClip, AnimationTriggerPoint, TriggerData};
pub use events::{AnimationEvent, AnimationEvents};
pub use mixer::{AnimationMixer, MixerEvent, StateKey};
pub use settings::AnimationSettings;
pub use state::{AnimationBlendMode, AnimationState};
pub use tracks::{
    AnimationChannels, AnimationKeyFrame, AnimationTrack, InterpolationMode, KeyframeCursor,
};
pub use values::{Interpolatable, Pose};
