use glam::Vec3;
use kiln_core::{KilnError, Result, StringHash};
use rustc_hash::FxHashMap;

use crate::tracks::{AnimationChannels, AnimationTrack};

/// Payload carried by a trigger point. Opaque to playback.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TriggerData {
    #[default]
    None,
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
    Vector3(Vec3),
}

/// A named, timestamped payload emitted when playback crosses `time`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTriggerPoint {
    pub time: f32,
    pub name: String,
    pub data: TriggerData,
}

impl AnimationTriggerPoint {
    #[must_use]
    pub fn new(time: f32, name: &str, data: TriggerData) -> Self {
        Self {
            time,
            name: name.to_string(),
            data,
        }
    }
}

/// Immutable-once-shared animation data: tracks plus trigger points.
///
/// Clips are built up front and then handed to states behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    name: String,
    name_hash: StringHash,
    length: f32,

    tracks: Vec<AnimationTrack>,
    track_lookup: FxHashMap<StringHash, usize>,

    triggers: Vec<AnimationTriggerPoint>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: &str, length: f32) -> Self {
        Self {
            name: name.to_string(),
            name_hash: StringHash::new(name),
            length: length.max(0.0),
            tracks: Vec::new(),
            track_lookup: FxHashMap::default(),
            triggers: Vec::new(),
        }
    }

    /// Builds a clip whose length is the last key time over all tracks.
    ///
    /// A later track with a duplicate name replaces the earlier one.
    #[must_use]
    pub fn from_tracks(name: &str, tracks: Vec<AnimationTrack>) -> Self {
        let length = tracks
            .iter()
            .map(AnimationTrack::end_time)
            .fold(0.0_f32, f32::max);

        let mut clip = Self::new(name, length);
        for track in tracks {
            clip.insert_track(track);
        }
        clip
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn name_hash(&self) -> StringHash {
        self.name_hash
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Sets the clip length. Negative values become zero.
    pub fn set_length(&mut self, length: f32) {
        self.length = length.max(0.0);
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    /// Creates a track, or returns the existing one with the same name.
    pub fn create_track(&mut self, name: &str, channels: AnimationChannels) -> &mut AnimationTrack {
        let hash = StringHash::new(name);
        let index = match self.track_lookup.get(&hash) {
            Some(&index) => index,
            None => {
                let index = self.tracks.len();
                self.tracks.push(AnimationTrack::new(name, channels));
                self.track_lookup.insert(hash, index);
                index
            }
        };
        &mut self.tracks[index]
    }

    /// Adds a track, replacing any existing track with the same name.
    pub fn insert_track(&mut self, track: AnimationTrack) -> usize {
        let hash = track.name_hash();
        if let Some(&index) = self.track_lookup.get(&hash) {
            self.tracks[index] = track;
            index
        } else {
            let index = self.tracks.len();
            self.tracks.push(track);
            self.track_lookup.insert(hash, index);
            index
        }
    }

    /// Removes a track by name. Returns whether a track was removed.
    pub fn remove_track(&mut self, name: &str) -> bool {
        let hash = StringHash::new(name);
        let Some(index) = self.track_lookup.remove(&hash) else {
            return false;
        };
        self.tracks.remove(index);
        self.rebuild_lookup();
        true
    }

    pub fn remove_all_tracks(&mut self) {
        self.tracks.clear();
        self.track_lookup.clear();
    }

    fn rebuild_lookup(&mut self) {
        self.track_lookup.clear();
        for (i, track) in self.tracks.iter().enumerate() {
            self.track_lookup.insert(track.name_hash(), i);
        }
    }

    #[inline]
    #[must_use]
    pub fn tracks(&self) -> &[AnimationTrack] {
        &self.tracks
    }

    #[inline]
    #[must_use]
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    #[must_use]
    pub fn track(&self, index: usize) -> Option<&AnimationTrack> {
        self.tracks.get(index)
    }

    #[inline]
    pub fn track_mut(&mut self, index: usize) -> Option<&mut AnimationTrack> {
        self.tracks.get_mut(index)
    }

    #[must_use]
    pub fn track_by_name(&self, name: &str) -> Option<&AnimationTrack> {
        self.track_by_hash(StringHash::new(name))
    }

    #[must_use]
    pub fn track_by_hash(&self, name_hash: StringHash) -> Option<&AnimationTrack> {
        self.track_index_by_hash(name_hash).map(|i| &self.tracks[i])
    }

    #[must_use]
    pub fn track_index_by_hash(&self, name_hash: StringHash) -> Option<usize> {
        self.track_lookup.get(&name_hash).copied()
    }

    // ========================================================================
    // Triggers
    // ========================================================================

    /// Adds a trigger, keeping triggers sorted by time.
    pub fn add_trigger(&mut self, trigger: AnimationTriggerPoint) {
        let pos = self.triggers.partition_point(|t| t.time <= trigger.time);
        self.triggers.insert(pos, trigger);
    }

    /// Adds a trigger at `time`, which is a fraction of the clip length when
    /// `normalized` is set.
    pub fn add_trigger_at(&mut self, time: f32, normalized: bool, name: &str, data: TriggerData) {
        let time = if normalized { time * self.length } else { time };
        self.add_trigger(AnimationTriggerPoint::new(time, name, data));
    }

    pub fn set_trigger(&mut self, index: usize, trigger: AnimationTriggerPoint) -> Result<()> {
        if index >= self.triggers.len() {
            return Err(KilnError::TriggerIndexOutOfBounds { index });
        }
        self.triggers.remove(index);
        self.add_trigger(trigger);
        Ok(())
    }

    pub fn remove_trigger(&mut self, index: usize) -> Result<AnimationTriggerPoint> {
        if index >= self.triggers.len() {
            return Err(KilnError::TriggerIndexOutOfBounds { index });
        }
        Ok(self.triggers.remove(index))
    }

    pub fn remove_all_triggers(&mut self) {
        self.triggers.clear();
    }

    #[inline]
    #[must_use]
    pub fn triggers(&self) -> &[AnimationTriggerPoint] {
        &self.triggers
    }

    #[inline]
    #[must_use]
    pub fn num_triggers(&self) -> usize {
        self.triggers.len()
    }

    /// Deep copy under a new name.
    #[must_use]
    pub fn clone_as(&self, name: &str) -> Self {
        let mut clip = self.clone();
        clip.name = name.to_string();
        clip.name_hash = StringHash::new(name);
        clip
    }
}
