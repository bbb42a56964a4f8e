use tessera_core::{Result, TesseraError};

use crate::keyframe::KeyFrame;

/// The two keyframes bracketing a time position.
#[derive(Debug)]
pub struct KeyFrameLookup<'a, K> {
    pub first: &'a K,
    pub second: &'a K,
    /// Index of `first` in the track.
    pub first_index: usize,
    /// Blend factor from `first` (0) to `second` (1).
    pub t: f32,
}

impl<K> Clone for KeyFrameLookup<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for KeyFrameLookup<'_, K> {}

/// Keyframes sorted by time.
#[derive(Debug, Clone)]
pub struct KeyFrameList<K> {
    frames: Vec<K>,
}

impl<K> Default for KeyFrameList<K> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<K: KeyFrame> KeyFrameList<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts after every keyframe with time `<=` the new one and returns
    /// its index.
    pub fn insert(&mut self, key_frame: K) -> usize {
        let time = key_frame.time();
        let index = self.frames.partition_point(|k| k.time() <= time);
        self.frames.insert(index, key_frame);
        index
    }

    pub(crate) fn insert_mut(&mut self, key_frame: K) -> &mut K {
        let index = self.insert(key_frame);
        &mut self.frames[index]
    }

    pub fn remove(&mut self, index: usize) -> Result<K> {
        if index >= self.frames.len() {
            return Err(TesseraError::out_of_bounds("keyframe", index));
        }
        Ok(self.frames.remove(index))
    }

    /// Keeps the keyframes whose flag in `keep` is set. Keyframes past the
    /// end of the mask are kept.
    pub(crate) fn retain_mask(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.frames.retain(|_| flags.next().copied().unwrap_or(true));
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&K> {
        self.frames.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut K> {
        self.frames.get_mut(index)
    }

    /// Like [`get`](Self::get) but fails with `IndexOutOfBounds`.
    pub fn try_get(&self, index: usize) -> Result<&K> {
        self.frames
            .get(index)
            .ok_or_else(|| TesseraError::out_of_bounds("keyframe", index))
    }

    pub fn try_get_mut(&mut self, index: usize) -> Result<&mut K> {
        self.frames
            .get_mut(index)
            .ok_or_else(|| TesseraError::out_of_bounds("keyframe", index))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[K] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, K> {
        self.frames.iter()
    }

    /// Finds the keyframes either side of `time_pos` in an animation of
    /// `length` seconds.
    ///
    /// Times past the end wrap back by whole lengths. Past the last keyframe
    /// the pair is (last, first) with the first keyframe treated as lying at
    /// `length + first.time`. Before the first keyframe, or exactly on one,
    /// both sides are the same keyframe and `t` is 0. `t` is always in
    /// `[0, 1)`. Returns `None` for an empty list.
    #[must_use]
    pub fn key_frames_at_time(&self, time_pos: f32, length: f32) -> Option<KeyFrameLookup<'_, K>> {
        let front = self.frames.first()?;

        // Wrap into (0, length]; a whole multiple of the length lands on `length`
        let time = if length > 0.0 && time_pos > length {
            let wrapped = time_pos.rem_euclid(length);
            if wrapped == 0.0 { length } else { wrapped }
        } else {
            time_pos
        };

        // First keyframe with time >= `time`
        let found = self.frames.partition_point(|k| k.time() < time);

        let (first_index, second_index, t2) = match self.frames.get(found) {
            None => (self.frames.len() - 1, 0, length + front.time()),
            Some(k2) => {
                let index = if found != 0 && time < k2.time() {
                    found - 1
                } else {
                    found
                };
                (index, found, k2.time())
            }
        };

        let t1 = self.frames[first_index].time();
        // A lone keyframe brackets itself
        let t = if t1 == t2 || first_index == second_index {
            0.0
        } else {
            (time - t1) / (t2 - t1)
        };

        // Landing exactly on the second keyframe is the same as starting from it
        let (first_index, t) = if t >= 1.0 { (second_index, 0.0) } else { (first_index, t) };

        Some(KeyFrameLookup {
            first: &self.frames[first_index],
            second: &self.frames[second_index],
            first_index,
            t,
        })
    }
}

impl<'a, K> IntoIterator for &'a KeyFrameList<K> {
    type Item = &'a K;
    type IntoIter = std::slice::Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
