use bitflags::bitflags;
use glam::{Quat, Vec3};
use kiln_core::{KilnError, Result, StringHash};

use crate::values::{Interpolatable, Pose};

bitflags! {
    /// Transform channels carried by a track.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct AnimationChannels: u8 {
        const POSITION = 1 << 0;
        const ROTATION = 1 << 1;
        const SCALE    = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
}

/// One key pose of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationKeyFrame {
    pub time: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl AnimationKeyFrame {
    #[must_use]
    pub fn new(time: f32, position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            time,
            position,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation, self.scale)
    }
}

impl Default for AnimationKeyFrame {
    fn default() -> Self {
        Self {
            time: 0.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

const MAX_SCAN_OFFSET: usize = 3;

/// Last visited key frame of a track, so sequential playback finds the
/// bracketing pair in O(1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

impl KeyframeCursor {
    #[inline]
    pub fn reset(&mut self) {
        self.last_index = 0;
    }
}

/// Key frames of a single bone or node, sorted ascending by time.
#[derive(Debug, Clone)]
pub struct AnimationTrack {
    name: String,
    name_hash: StringHash,
    pub channels: AnimationChannels,
    pub interpolation: InterpolationMode,
    key_frames: Vec<AnimationKeyFrame>,
}

impl AnimationTrack {
    #[must_use]
    pub fn new(name: &str, channels: AnimationChannels) -> Self {
        Self {
            name: name.to_string(),
            name_hash: StringHash::new(name),
            channels,
            interpolation: InterpolationMode::Linear,
            key_frames: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_interpolation(mut self, interpolation: InterpolationMode) -> Self {
        self.interpolation = interpolation;
        self
    }

    #[must_use]
    pub fn with_key_frames(mut self, key_frames: Vec<AnimationKeyFrame>) -> Self {
        self.key_frames = key_frames;
        self.sort_key_frames();
        self
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

    // ========================================================================
    // Key frame editing
    // ========================================================================

    /// Appends a key frame, re-sorting if it lands before the current last one.
    pub fn add_key_frame(&mut self, key_frame: AnimationKeyFrame) {
        let needs_sort = self
            .key_frames
            .last()
            .is_some_and(|last| last.time > key_frame.time);
        self.key_frames.push(key_frame);
        if needs_sort {
            self.sort_key_frames();
        }
    }

    pub fn insert_key_frame(&mut self, index: usize, key_frame: AnimationKeyFrame) -> Result<()> {
        if index > self.key_frames.len() {
            return Err(self.index_error(index));
        }
        self.key_frames.insert(index, key_frame);
        self.sort_key_frames();
        Ok(())
    }

    pub fn set_key_frame(&mut self, index: usize, key_frame: AnimationKeyFrame) -> Result<()> {
        let slot = self
            .key_frames
            .get_mut(index)
            .ok_or_else(|| KilnError::KeyFrameIndexOutOfBounds {
                track: self.name.clone(),
                index,
            })?;
        *slot = key_frame;
        self.sort_key_frames();
        Ok(())
    }

    pub fn remove_key_frame(&mut self, index: usize) -> Result<AnimationKeyFrame> {
        if index >= self.key_frames.len() {
            return Err(self.index_error(index));
        }
        Ok(self.key_frames.remove(index))
    }

    pub fn remove_all_key_frames(&mut self) {
        self.key_frames.clear();
    }

    #[inline]
    #[must_use]
    pub fn key_frame(&self, index: usize) -> Option<&AnimationKeyFrame> {
        self.key_frames.get(index)
    }

    #[inline]
    #[must_use]
    pub fn key_frames(&self) -> &[AnimationKeyFrame] {
        &self.key_frames
    }

    #[inline]
    #[must_use]
    pub fn num_key_frames(&self) -> usize {
        self.key_frames.len()
    }

    /// Time of the last key frame, or 0 for an empty track.
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.key_frames.last().map_or(0.0, |k| k.time)
    }

    fn sort_key_frames(&mut self) {
        self.key_frames.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    fn index_error(&self, index: usize) -> KilnError {
        KilnError::KeyFrameIndexOutOfBounds {
            track: self.name.clone(),
            index,
        }
    }

    // ========================================================================
    // Sampling
    // ========================================================================

    /// Finds the key frame at or before `time`, starting from the cursor.
    ///
    /// Scans a few frames forward (normal playback) or backward (small
    /// rewinds) from the cursor, then falls back to a binary search for large
    /// jumps. The cursor is updated to the returned index.
    pub fn key_frame_index(&self, time: f32, cursor: &mut KeyframeCursor) -> usize {
        let len = self.key_frames.len();
        if len <= 1 {
            cursor.last_index = 0;
            return 0;
        }

        let time = time.max(0.0);
        let i = cursor.last_index.min(len - 1);
        let t_curr = self.key_frames[i].time;

        let found_index = if time >= t_curr {
            let mut res = None;
            for offset in 0..=MAX_SCAN_OFFSET {
                let idx = i + offset;
                // Reaching the last frame means time is at or past its key
                if idx >= len - 1 {
                    res = Some(len - 1);
                    break;
                }
                if time < self.key_frames[idx + 1].time {
                    res = Some(idx);
                    break;
                }
            }
            res
        } else {
            let mut res = None;
            for offset in 1..=MAX_SCAN_OFFSET {
                if i < offset {
                    break;
                }
                let idx = i - offset;
                if time >= self.key_frames[idx].time {
                    res = Some(idx);
                    break;
                }
            }
            res
        };

        let index = found_index.unwrap_or_else(|| {
            let next_idx = self.key_frames.partition_point(|k| k.time <= time);
            next_idx.saturating_sub(1)
        });

        cursor.last_index = index;
        index
    }

    /// Samples the track at `time`.
    ///
    /// With `loop_length` set, the segment after the last key frame
    /// interpolates back toward the first key across the loop seam.
    /// Returns `None` for a track without key frames.
    pub fn sample(
        &self,
        time: f32,
        cursor: &mut KeyframeCursor,
        loop_length: Option<f32>,
    ) -> Option<Pose> {
        let len = self.key_frames.len();
        if len == 0 {
            return None;
        }

        let index = self.key_frame_index(time, cursor);
        let key = &self.key_frames[index];

        if self.interpolation == InterpolationMode::Step || len == 1 {
            return Some(key.pose());
        }

        let (next, interval) = if index + 1 < len {
            let next = &self.key_frames[index + 1];
            (next, next.time - key.time)
        } else if let Some(length) = loop_length {
            let first = &self.key_frames[0];
            (first, first.time + length - key.time)
        } else {
            return Some(key.pose());
        };

        let t = if interval > 1e-6 {
            ((time - key.time) / interval).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Some(Pose::new(
            Vec3::interpolate_linear(&key.position, &next.position, t),
            Quat::interpolate_linear(&key.rotation, &next.rotation, t),
            Vec3::interpolate_linear(&key.scale, &next.scale, t),
        ))
    }

    /// Samples without a persistent cursor.
    #[must_use]
    pub fn sample_at(&self, time: f32, loop_length: Option<f32>) -> Option<Pose> {
        let mut cursor = KeyframeCursor::default();
        self.sample(time, &mut cursor, loop_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> AnimationTrack {
        AnimationTrack::new("bone", AnimationChannels::POSITION).with_key_frames(
            (0..5)
                .map(|i| {
                    let t = i as f32;
                    AnimationKeyFrame::new(t, Vec3::splat(t * 10.0), Quat::IDENTITY, Vec3::ONE)
                })
                .collect(),
        )
    }

    #[test]
    fn cursor_moves_forward_sequentially() {
        let track = ramp();
        let mut cursor = KeyframeCursor::default();
        assert_eq!(track.key_frame_index(0.5, &mut cursor), 0);
        assert_eq!(track.key_frame_index(1.2, &mut cursor), 1);
        assert_eq!(track.key_frame_index(3.9, &mut cursor), 3);
        assert_eq!(track.key_frame_index(10.0, &mut cursor), 4);
        assert_eq!(cursor.last_index, 4);
    }

    #[test]
    fn cursor_recovers_after_rewind() {
        let track = ramp();
        let mut cursor = KeyframeCursor { last_index: 4 };
        assert_eq!(track.key_frame_index(0.1, &mut cursor), 0);
        assert_eq!(track.key_frame_index(3.5, &mut cursor), 3);
        assert_eq!(track.key_frame_index(2.5, &mut cursor), 2);
    }

    #[test]
    fn stale_cursor_out_of_range_is_clamped() {
        let track = ramp();
        let mut cursor = KeyframeCursor { last_index: 99 };
        assert_eq!(track.key_frame_index(1.5, &mut cursor), 1);
    }

    #[test]
    fn add_key_frame_keeps_order() {
        let mut track = AnimationTrack::new("t", AnimationChannels::all());
        track.add_key_frame(AnimationKeyFrame { time: 1.0, ..Default::default() });
        track.add_key_frame(AnimationKeyFrame { time: 0.5, ..Default::default() });
        track.add_key_frame(AnimationKeyFrame { time: 2.0, ..Default::default() });

        let times: Vec<f32> = track.key_frames().iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn editing_out_of_range_is_an_error() {
        let mut track = ramp();
        assert!(track.remove_key_frame(9).is_err());
        assert!(track.set_key_frame(5, AnimationKeyFrame::default()).is_err());
        assert!(track.insert_key_frame(6, AnimationKeyFrame::default()).is_err());
        assert!(track.insert_key_frame(5, AnimationKeyFrame { time: 5.0, ..Default::default() }).is_ok());
        assert_eq!(track.num_key_frames(), 6);
    }

    #[test]
    fn looped_sample_wraps_across_seam() {
        let track = AnimationTrack::new("t", AnimationChannels::POSITION).with_key_frames(vec![
            AnimationKeyFrame::new(0.0, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE),
            AnimationKeyFrame::new(1.0, Vec3::X * 10.0, Quat::IDENTITY, Vec3::ONE),
        ]);

        // Halfway between the last key (t=1) and the first key at t=2
        let looped = track.sample_at(1.5, Some(2.0)).unwrap();
        assert!((looped.position.x - 5.0).abs() < 1e-5);

        let clamped = track.sample_at(1.5, None).unwrap();
        assert!((clamped.position.x - 10.0).abs() < 1e-5);
    }

    #[test]
    fn empty_track_samples_nothing() {
        let track = AnimationTrack::new("t", AnimationChannels::all());
        assert!(track.sample_at(0.0, None).is_none());
    }
}
