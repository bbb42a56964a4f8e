use tessera_core::{AnimableHandle, Result, TesseraError};

use super::key_frame_list::KeyFrameList;
use crate::animation::AnimationParams;
use crate::keyframe::NumericKeyFrame;
use crate::numeric::{mismatch, AnyNumeric, NumericKind};
use crate::target::{AnimableValue, AnimationTargets};

/// Animates a generic [`AnimableValue`].
///
/// Every keyframe of a track holds the same [`NumericKind`]; the first
/// keyframe fixes it.
#[derive(Debug, Clone)]
pub struct NumericAnimationTrack {
    handle: u16,
    key_frames: KeyFrameList<NumericKeyFrame>,
    target: Option<AnimableHandle>,
}

impl NumericAnimationTrack {
    #[must_use]
    pub fn new(handle: u16) -> Self {
        Self {
            handle,
            key_frames: KeyFrameList::new(),
            target: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> u16 {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<AnimableHandle> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<AnimableHandle>) {
        self.target = target;
    }

    /// Kind shared by the keyframes, `None` while the track is empty.
    #[must_use]
    pub fn value_kind(&self) -> Option<NumericKind> {
        self.key_frames.get(0).map(|kf| kf.value().kind())
    }

    fn check_kind(&self, skip: Option<usize>, value: AnyNumeric) -> Result<()> {
        let established = self
            .key_frames
            .iter()
            .enumerate()
            .find(|(i, _)| Some(*i) != skip)
            .map(|(_, kf)| kf.value().kind());
        match established {
            Some(expected) if expected != value.kind() => Err(mismatch(expected, value.kind())),
            _ => Ok(()),
        }
    }

    pub fn create_numeric_key_frame(&mut self, time: f32, value: impl Into<AnyNumeric>) -> Result<&NumericKeyFrame> {
        let value = value.into();
        self.check_kind(None, value)?;
        Ok(self.key_frames.insert_mut(NumericKeyFrame::new(time, value)))
    }

    pub fn numeric_key_frame(&self, index: usize) -> Result<&NumericKeyFrame> {
        self.key_frames.try_get(index)
    }

    /// Replaces the value of keyframe `index`. The kind must match the
    /// other keyframes.
    pub fn set_key_frame_value(&mut self, index: usize, value: impl Into<AnyNumeric>) -> Result<()> {
        let value = value.into();
        self.check_kind(Some(index), value)?;
        self.key_frames.try_get_mut(index)?.set_value(value);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn key_frames(&self) -> &KeyFrameList<NumericKeyFrame> {
        &self.key_frames
    }

    #[inline]
    #[must_use]
    pub fn num_key_frames(&self) -> usize {
        self.key_frames.len()
    }

    pub fn remove_key_frame(&mut self, index: usize) -> Result<()> {
        self.key_frames.remove(index).map(drop)
    }

    pub fn remove_all_key_frames(&mut self) {
        self.key_frames.clear();
    }

    /// The value at `time`, or `None` if the track has no keyframes.
    pub fn interpolated_key_frame(&self, params: &AnimationParams, time: f32) -> Result<Option<NumericKeyFrame>> {
        let Some(hit) = self.key_frames.key_frames_at_time(time, params.length) else {
            return Ok(None);
        };
        let value = if hit.t == 0.0 {
            hit.first.value()
        } else {
            hit.first.value().lerp(hit.second.value(), hit.t)?
        };
        Ok(Some(NumericKeyFrame::new(time, value)))
    }

    /// Adds `value(time) * weight * scale` to `animable`.
    pub fn apply_to_animable(
        &self,
        animable: &mut dyn AnimableValue,
        params: &AnimationParams,
        time: f32,
        weight: f32,
        scale: f32,
    ) -> Result<()> {
        let Some(kf) = self.interpolated_key_frame(params, time)? else {
            return Ok(());
        };
        let delta = kf.value().scaled(weight * scale);
        animable.apply_delta_value(&delta)
    }

    /// Applies to the animable this track is bound to.
    pub fn apply(
        &self,
        targets: &mut dyn AnimationTargets,
        params: &AnimationParams,
        time: f32,
        weight: f32,
        scale: f32,
    ) -> Result<()> {
        let handle = self
            .target
            .ok_or_else(|| TesseraError::invalid(format!("numeric track {} has no target", self.handle)))?;
        let animable = targets
            .animable_mut(handle)
            .ok_or_else(|| TesseraError::not_found(format!("animable of numeric track {}", self.handle)))?;
        self.apply_to_animable(animable, params, time, weight, scale)
    }
}
