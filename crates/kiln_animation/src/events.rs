use smallvec::SmallVec;

use crate::clip::TriggerData;

/// Notification produced while advancing an animation state's time.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationEvent {
    /// Playback crossed a trigger point.
    Trigger {
        name: String,
        time: f32,
        data: TriggerData,
    },
    /// A looped state wrapped around.
    Looped,
    /// A non-looped state reached its end (or its start, playing backward).
    Finished,
}

impl AnimationEvent {
    #[inline]
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger { .. })
    }
}

/// Events from a single `add_time` call, in playback order.
pub type AnimationEvents = SmallVec<[AnimationEvent; 4]>;
