//! Time and trigger control.
//!
//! Trigger crossing rules:
//! - forward steps fire triggers with `old < t <= new`
//! - the first forward step from the start position (a new state, or one
//!   moved there with `set_time(0.0)`) also fires triggers at time 0
//! - backward steps fire triggers with `new <= t < old`
//! - a looped step that wraps scans the rest of the current cycle, then the
//!   part of the next one it reaches
//! - a looped step of at least one full cycle fires every trigger once
//!
//! Events come out in playback order, followed by at most one `Looped` or
//! `Finished`.

use smallvec::SmallVec;

use crate::events::{AnimationEvent, AnimationEvents};
use crate::state::AnimationState;

/// Wraps `time` into `[0, length)`.
#[inline]
fn wrap_time(time: f32, length: f32) -> f32 {
    let t = time.rem_euclid(length);
    // rem_euclid can round up to `length` for tiny negative inputs
    if t >= length { 0.0 } else { t }
}

impl AnimationState {
    /// Moves the time position directly. Never fires triggers or
    /// notifications.
    ///
    /// Looped states wrap into `[0, length)`; others clamp to `[0, length]`.
    pub fn set_time(&mut self, time: f32) {
        if !time.is_finite() {
            return;
        }
        let length = self.clip.length();
        let new_time = if length <= 0.0 {
            0.0
        } else if self.looped {
            wrap_time(time, length)
        } else {
            time.clamp(0.0, length)
        };

        if new_time < self.time {
            self.reset_cursors();
        }
        self.time = new_time;
        self.at_start = new_time == 0.0;
    }

    /// Advances the time position by `delta` (which may be negative) and
    /// returns the trigger and loop notifications crossed on the way.
    pub fn add_time(&mut self, delta: f32) -> AnimationEvents {
        let mut events = AnimationEvents::new();
        let length = self.clip.length();
        if delta == 0.0 || !delta.is_finite() || length <= 0.0 {
            return events;
        }

        let old = self.time;
        let raw = old + delta;
        let forward = delta > 0.0;
        let from_start = self.at_start && old == 0.0;
        let after_old = |t: f32| t > old || (from_start && t == 0.0);

        let new = if self.looped {
            let new = wrap_time(raw, length);
            let wrapped = !(0.0..length).contains(&raw);

            if delta.abs() >= length {
                self.push_triggers(forward, |_| true, &mut events);
            } else if forward && wrapped {
                self.push_triggers(true, |t| t > old, &mut events);
                self.push_triggers(true, |t| t <= new, &mut events);
            } else if forward {
                self.push_triggers(true, |t| after_old(t) && t <= new, &mut events);
            } else if wrapped {
                self.push_triggers(false, |t| t < old, &mut events);
                self.push_triggers(false, |t| t >= new, &mut events);
            } else {
                self.push_triggers(false, |t| t >= new && t < old, &mut events);
            }

            if wrapped {
                log::trace!("Clip '{}' looped", self.clip.name());
                events.push(AnimationEvent::Looped);
            }
            new
        } else {
            let new = raw.clamp(0.0, length);
            if new == old {
                return events;
            }

            if forward {
                self.push_triggers(true, |t| after_old(t) && t <= new, &mut events);
            } else {
                self.push_triggers(false, |t| t >= new && t < old, &mut events);
            }

            if (forward && new >= length) || (!forward && new <= 0.0) {
                log::trace!("Clip '{}' finished", self.clip.name());
                events.push(AnimationEvent::Finished);
            }
            new
        };

        if new < old {
            self.reset_cursors();
        }
        self.time = new;
        self.at_start = false;
        events
    }

    /// Rewinds every key frame cursor.
    pub(crate) fn reset_cursors(&mut self) {
        for binding in &mut self.bindings {
            binding.cursor.reset();
        }
    }

    /// Pushes triggers whose (loop-wrapped) time passes `filter`, sorted in
    /// playback direction.
    fn push_triggers(
        &self,
        ascending: bool,
        filter: impl Fn(f32) -> bool,
        events: &mut AnimationEvents,
    ) {
        let length = self.clip.length();
        let triggers = self.clip.triggers();

        let mut hits: SmallVec<[(f32, usize); 8]> = triggers
            .iter()
            .enumerate()
            .filter_map(|(i, trigger)| {
                let t = if self.looped {
                    wrap_time(trigger.time, length)
                } else {
                    trigger.time
                };
                filter(t).then_some((t, i))
            })
            .collect();

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        if !ascending {
            hits.reverse();
        }

        for (_, i) in hits {
            let trigger = &triggers[i];
            log::trace!(
                "Trigger '{}' at {:.3} in clip '{}'",
                trigger.name,
                trigger.time,
                self.clip.name()
            );
            events.push(AnimationEvent::Trigger {
                name: trigger.name.clone(),
                time: trigger.time,
                data: trigger.data.clone(),
            });
        }
    }
}
