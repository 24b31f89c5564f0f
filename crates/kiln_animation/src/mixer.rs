use rustc_hash::FxHashSet;
use slotmap::{SlotMap, new_key_type};

use kiln_scene::{NodeHandle, Scene, SkeletonKey};

use crate::binding::AnimationTarget;
use crate::events::AnimationEvent;
use crate::settings::AnimationSettings;
use crate::state::AnimationState;

new_key_type! {
    pub struct StateKey;
}

/// An event raised by one of the mixer's states during [`AnimationMixer::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct MixerEvent {
    pub state: StateKey,
    pub event: AnimationEvent,
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    target: f32,
    /// Weight change per second, always positive.
    rate: f32,
}

#[derive(Debug)]
struct MixerEntry {
    state: AnimationState,
    speed: f32,
    fade: Option<Fade>,
    remove_on_completion: bool,
    finished: bool,
}

impl MixerEntry {
    /// A non-looped state resting at the end it plays toward.
    fn is_pinned(&self) -> bool {
        let state = &self.state;
        if state.is_looped() {
            return false;
        }
        if self.speed < 0.0 {
            state.time() <= 0.0
        } else {
            state.time() >= state.length()
        }
    }
}

/// The node whose subtree holds everything `target` animates.
fn owner_root(scene: &Scene, target: &AnimationTarget) -> Option<NodeHandle> {
    match target {
        AnimationTarget::Skeleton(t) => scene.skeleton(t.key).and_then(|s| s.root_node()),
        AnimationTarget::Nodes(t) => Some(t.root),
    }
}

/// Owns a set of animation states and drives them once per frame.
///
/// Each update advances time, applies every state in layer order and then
/// commits each animated skeleton or node tree exactly once.
#[derive(Debug, Default)]
pub struct AnimationMixer {
    entries: SlotMap<StateKey, MixerEntry>,
    /// Insertion order; stable tie-break for states on the same layer.
    order: Vec<StateKey>,
    settings: AnimationSettings,
}

impl AnimationMixer {
    #[must_use]
    pub fn new(settings: AnimationSettings) -> Self {
        Self {
            entries: SlotMap::with_key(),
            order: Vec::new(),
            settings,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn add_state(&mut self, state: AnimationState) -> StateKey {
        log::debug!(
            "Mixer: added state for clip '{}' on layer {}",
            state.clip().name(),
            state.layer()
        );
        let key = self.entries.insert(MixerEntry {
            state,
            speed: 1.0,
            fade: None,
            remove_on_completion: false,
            finished: false,
        });
        self.order.push(key);
        key
    }

    pub fn remove_state(&mut self, key: StateKey) -> Option<AnimationState> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|&k| k != key);
        log::debug!("Mixer: removed state for clip '{}'", entry.state.clip().name());
        Some(entry.state)
    }

    #[inline]
    #[must_use]
    pub fn state(&self, key: StateKey) -> Option<&AnimationState> {
        self.entries.get(key).map(|e| &e.state)
    }

    #[inline]
    pub fn state_mut(&mut self, key: StateKey) -> Option<&mut AnimationState> {
        self.entries.get_mut(key).map(|e| &mut e.state)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// States in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (StateKey, &AnimationState)> {
        self.order
            .iter()
            .filter_map(|&k| self.entries.get(k).map(|e| (k, &e.state)))
    }

    // ========================================================================
    // Playback controls
    // ========================================================================

    /// Sets the time scale for a state. Negative speeds play backward.
    pub fn set_speed(&mut self, key: StateKey, speed: f32) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.speed = speed;
        }
    }

    #[must_use]
    pub fn speed(&self, key: StateKey) -> Option<f32> {
        self.entries.get(key).map(|e| e.speed)
    }

    /// Moves a state's weight toward `target_weight` over `fade_time` seconds.
    /// A non-positive fade time sets the weight immediately. Fading out to
    /// zero completes the state; fading back in cancels that.
    pub fn fade(&mut self, key: StateKey, target_weight: f32, fade_time: f32) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        let target = target_weight.clamp(0.0, 1.0);
        if target > 0.0 {
            entry.finished = false;
        }
        if fade_time <= 0.0 {
            entry.state.set_weight(target);
            entry.fade = None;
            if target == 0.0 {
                entry.finished = true;
            }
            return;
        }
        let rate = (target - entry.state.weight()).abs() / fade_time;
        entry.fade = Some(Fade { target, rate });
    }

    /// Drops the state once it finishes, or once it fades out to zero.
    pub fn set_remove_on_completion(&mut self, key: StateKey, remove: bool) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.remove_on_completion = remove;
        }
    }

    // ========================================================================
    // Frame update
    // ========================================================================

    /// Advances, applies and commits every state.
    pub fn update(&mut self, dt: f32, scene: &mut Scene) -> Vec<MixerEvent> {
        let mut events = Vec::new();

        // 1. Fades and time
        for &key in &self.order {
            let Some(entry) = self.entries.get_mut(key) else {
                continue;
            };
            // Revived since it completed: weight restored and no longer at its end
            if entry.finished && entry.state.weight() > 0.0 && !entry.is_pinned() {
                entry.finished = false;
            }

            if let Some(fade) = entry.fade {
                let current = entry.state.weight();
                let step = fade.rate * dt.abs();
                let next = if current < fade.target {
                    (current + step).min(fade.target)
                } else {
                    (current - step).max(fade.target)
                };
                entry.state.set_weight(next);
                if next == fade.target {
                    entry.fade = None;
                    if fade.target == 0.0 {
                        entry.finished = true;
                    }
                }
            }

            for event in entry.state.add_time(dt * entry.speed) {
                if event == AnimationEvent::Finished {
                    entry.finished = true;
                }
                events.push(MixerEvent { state: key, event });
            }
        }

        // 2. Completed states
        let done: Vec<StateKey> = self
            .order
            .iter()
            .copied()
            .filter(|&k| {
                self.entries
                    .get(k)
                    .is_some_and(|e| e.remove_on_completion && e.finished)
            })
            .collect();
        for key in done {
            self.remove_state(key);
        }

        // 3. Layer order (stable)
        let mut ordered = self.order.clone();
        ordered.sort_by_key(|&k| self.entries.get(k).map_or(0, |e| e.state.layer()));

        let mut dirty_roots: Vec<NodeHandle> = Vec::new();
        let mut seen: FxHashSet<NodeHandle> = FxHashSet::default();
        let mut touch = |root: Option<NodeHandle>| {
            if let Some(root) = root
                && seen.insert(root)
            {
                dirty_roots.push(root);
            }
        };

        // 4. Reset to bind / rest pose
        if self.settings.reset_to_bind_pose {
            let mut reset_skeletons: FxHashSet<SkeletonKey> = FxHashSet::default();
            for &key in &ordered {
                let Some(entry) = self.entries.get(key) else {
                    continue;
                };
                match entry.state.target() {
                    AnimationTarget::Skeleton(t) => {
                        if reset_skeletons.insert(t.key) {
                            scene.reset_skeleton_pose(t.key);
                            touch(owner_root(scene, entry.state.target()));
                        }
                    }
                    AnimationTarget::Nodes(t) => {
                        entry.state.reset_pose(scene);
                        touch(Some(t.root));
                    }
                }
            }
        }

        // 5. Apply
        for &key in &ordered {
            let Some(entry) = self.entries.get_mut(key) else {
                continue;
            };
            if entry.state.apply(scene) > 0 {
                touch(owner_root(scene, entry.state.target()));
            }
        }

        // 6. Commit: every owner written by a reset or an apply
        for root in dirty_roots {
            scene.mark_dirty(root);
        }
        if self.settings.update_world_transforms {
            scene.update_matrix_world();
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Quat, Vec3};

    use super::*;
    use crate::clip::AnimationClip;
    use crate::tracks::{AnimationChannels, AnimationKeyFrame, AnimationTrack};

    fn node_state(scene: &mut Scene, length: f32) -> AnimationState {
        let root = scene.create_node("door");
        let clip = AnimationClip::from_tracks(
            "open",
            vec![AnimationTrack::new("door", AnimationChannels::POSITION).with_key_frames(vec![
                AnimationKeyFrame::default(),
                AnimationKeyFrame::new(length, Vec3::X, Quat::IDENTITY, Vec3::ONE),
            ])],
        );
        AnimationState::new_for_node(scene, root, Arc::new(clip)).unwrap()
    }

    #[test]
    fn fade_reaches_target() {
        let mut scene = Scene::new();
        let mut mixer = AnimationMixer::new(AnimationSettings::default());
        let key = mixer.add_state(node_state(&mut scene, 10.0));

        mixer.fade(key, 0.0, 1.0);
        mixer.update(0.5, &mut scene);
        assert!((mixer.state(key).unwrap().weight() - 0.5).abs() < 1e-5);
        mixer.update(0.75, &mut scene);
        assert_eq!(mixer.state(key).unwrap().weight(), 0.0);
    }

    #[test]
    fn finished_state_is_removed_when_flagged() {
        let mut scene = Scene::new();
        let mut mixer = AnimationMixer::new(AnimationSettings::default());
        let key = mixer.add_state(node_state(&mut scene, 1.0));
        mixer.set_remove_on_completion(key, true);

        let events = mixer.update(2.0, &mut scene);
        assert_eq!(
            events,
            vec![MixerEvent {
                state: key,
                event: AnimationEvent::Finished
            }]
        );
        assert!(mixer.is_empty());
        assert!(mixer.state(key).is_none());
    }

    #[test]
    fn fading_back_in_cancels_completion() {
        let mut scene = Scene::new();
        let mut mixer = AnimationMixer::new(AnimationSettings::default());
        let key = mixer.add_state(node_state(&mut scene, 10.0));

        mixer.fade(key, 0.0, 0.05);
        mixer.update(0.1, &mut scene);
        assert_eq!(mixer.state(key).unwrap().weight(), 0.0);

        mixer.fade(key, 1.0, 0.0);
        mixer.update(0.1, &mut scene);
        mixer.set_remove_on_completion(key, true);
        mixer.update(0.1, &mut scene);
        assert!(mixer.state(key).is_some());
    }

    #[test]
    fn restarted_state_is_no_longer_complete() {
        let mut scene = Scene::new();
        let mut mixer = AnimationMixer::new(AnimationSettings::default());
        let key = mixer.add_state(node_state(&mut scene, 1.0));

        mixer.update(2.0, &mut scene);
        mixer.state_mut(key).unwrap().set_looped(true);
        mixer.update(0.1, &mut scene);
        mixer.set_remove_on_completion(key, true);
        mixer.update(0.1, &mut scene);
        assert!(mixer.state(key).is_some());

        // Scrubbing a finished one-shot back also revives it
        let other = mixer.add_state(node_state(&mut scene, 1.0));
        mixer.update(2.0, &mut scene);
        mixer.state_mut(other).unwrap().set_time(0.0);
        mixer.set_remove_on_completion(other, true);
        mixer.update(0.1, &mut scene);
        assert!(mixer.state(other).is_some());
    }

    #[test]
    fn instant_fade_out_completes_like_timed_fade() {
        let mut scene = Scene::new();
        let mut mixer = AnimationMixer::new(AnimationSettings::default());
        let instant = mixer.add_state(node_state(&mut scene, 10.0));
        let timed = mixer.add_state(node_state(&mut scene, 10.0));
        mixer.set_remove_on_completion(instant, true);
        mixer.set_remove_on_completion(timed, true);

        mixer.fade(instant, 0.0, 0.0);
        mixer.fade(timed, 0.0, 0.125);
        mixer.update(0.125, &mut scene);
        assert!(mixer.is_empty());
    }

    #[test]
    fn speed_scales_time() {
        let mut scene = Scene::new();
        let mut mixer = AnimationMixer::new(AnimationSettings::default());
        let key = mixer.add_state(node_state(&mut scene, 10.0));
        mixer.set_speed(key, 2.0);
        mixer.update(1.5, &mut scene);
        assert!((mixer.state(key).unwrap().time() - 3.0).abs() < 1e-5);
    }
}
