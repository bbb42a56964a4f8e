use std::sync::OnceLock;

use glam::{Quat, Vec3};
use tessera_core::math::{nlerp, position_equals, quat_angle, quat_equals, real_equal, slerp, DEFAULT_TOLERANCE};
use tessera_core::{NodeHandle, Result, RotationalSpline, SimpleSpline, TesseraError};

use super::key_frame_list::KeyFrameList;
use crate::animation::AnimationParams;
use crate::keyframe::{KeyFrameMut, TransformKeyFrame};
use crate::settings::{InterpolationMode, RotationInterpolationMode};
use crate::target::{AnimationTargets, NodeTarget};

/// Spline caches built from a node track's keyframes.
#[derive(Debug, Clone)]
pub struct TransformSplines {
    position: SimpleSpline,
    rotation: RotationalSpline,
    scale: SimpleSpline,
}

impl TransformSplines {
    fn build(key_frames: &[TransformKeyFrame]) -> Self {
        let mut splines = Self {
            position: SimpleSpline::new(),
            rotation: RotationalSpline::new(),
            scale: SimpleSpline::new(),
        };
        for kf in key_frames {
            splines.position.add_point(kf.translate());
            splines.rotation.add_point(kf.rotation());
            splines.scale.add_point(kf.scale());
        }
        splines.position.recalc_tangents();
        splines.rotation.recalc_tangents();
        splines.scale.recalc_tangents();
        splines
    }
}

pub type TransformKeyFrameMut<'a> = KeyFrameMut<'a, TransformKeyFrame, TransformSplines>;

/// Animates translation, rotation and scale of a node or bone.
#[derive(Debug, Clone)]
pub struct NodeAnimationTrack {
    handle: u16,
    key_frames: KeyFrameList<TransformKeyFrame>,
    target: Option<NodeHandle>,
    use_shortest_rotation_path: bool,
    splines: OnceLock<TransformSplines>,
}

impl NodeAnimationTrack {
    #[must_use]
    pub fn new(handle: u16) -> Self {
        Self {
            handle,
            key_frames: KeyFrameList::new(),
            target: None,
            use_shortest_rotation_path: true,
            splines: OnceLock::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> u16 {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<NodeHandle> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<NodeHandle>) {
        self.target = target;
    }

    #[inline]
    #[must_use]
    pub fn use_shortest_rotation_path(&self) -> bool {
        self.use_shortest_rotation_path
    }

    pub fn set_use_shortest_rotation_path(&mut self, shortest: bool) {
        self.use_shortest_rotation_path = shortest;
    }

    // ========================================================================
    // Keyframes
    // ========================================================================

    /// Creates an identity keyframe at `time` and returns it for editing.
    pub fn create_node_key_frame(&mut self, time: f32) -> TransformKeyFrameMut<'_> {
        let key_frame = self.key_frames.insert_mut(TransformKeyFrame::new(time));
        KeyFrameMut::new(key_frame, &mut self.splines)
    }

    pub fn node_key_frame(&self, index: usize) -> Result<&TransformKeyFrame> {
        self.key_frames.try_get(index)
    }

    pub fn node_key_frame_mut(&mut self, index: usize) -> Result<TransformKeyFrameMut<'_>> {
        let key_frame = self.key_frames.try_get_mut(index)?;
        Ok(KeyFrameMut::new(key_frame, &mut self.splines))
    }

    #[inline]
    #[must_use]
    pub fn key_frames(&self) -> &KeyFrameList<TransformKeyFrame> {
        &self.key_frames
    }

    #[inline]
    #[must_use]
    pub fn num_key_frames(&self) -> usize {
        self.key_frames.len()
    }

    pub fn remove_key_frame(&mut self, index: usize) -> Result<()> {
        self.key_frames.remove(index)?;
        self.splines.take();
        Ok(())
    }

    pub fn remove_all_key_frames(&mut self) {
        self.key_frames.clear();
        self.splines.take();
    }

    fn splines(&self) -> &TransformSplines {
        self.splines
            .get_or_init(|| TransformSplines::build(self.key_frames.as_slice()))
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// The transform at `time`, or `None` if the track has no keyframes.
    #[must_use]
    pub fn interpolated_key_frame(&self, params: &AnimationParams, time: f32) -> Option<TransformKeyFrame> {
        let hit = self.key_frames.key_frames_at_time(time, params.length)?;
        let (k1, k2, t) = (hit.first, hit.second, hit.t);

        let mut result = TransformKeyFrame::new(time);
        if t == 0.0 {
            result
                .set_rotation(k1.rotation())
                .set_translate(k1.translate())
                .set_scale(k1.scale());
            return Some(result);
        }

        match params.interpolation_mode {
            InterpolationMode::Linear => {
                let rotation = match params.rotation_interpolation_mode {
                    RotationInterpolationMode::Linear => {
                        nlerp(t, k1.rotation(), k2.rotation(), self.use_shortest_rotation_path)
                    }
                    RotationInterpolationMode::Spherical => {
                        slerp(t, k1.rotation(), k2.rotation(), self.use_shortest_rotation_path)
                    }
                };
                result
                    .set_rotation(rotation)
                    .set_translate(k1.translate().lerp(k2.translate(), t))
                    .set_scale(k1.scale().lerp(k2.scale(), t));
            }
            InterpolationMode::Spline => {
                let splines = self.splines();
                let i = hit.first_index;
                result
                    .set_translate(splines.position.interpolate(i, t))
                    .set_rotation(splines.rotation.interpolate(i, t, self.use_shortest_rotation_path))
                    .set_scale(splines.scale.interpolate(i, t));
            }
        }
        Some(result)
    }

    /// Applies the transform at `time` to `node`.
    ///
    /// With `accumulate`, the transform is added on top of the node's
    /// current state with `weight` as an absolute multiplier. Otherwise it
    /// is blended through [`NodeTarget::weighted_transform`]. `scale`
    /// scales translation and the deviation of scale from one.
    pub fn apply_to_node(
        &self,
        node: &mut dyn NodeTarget,
        params: &AnimationParams,
        time: f32,
        weight: f32,
        accumulate: bool,
        scale: f32,
    ) {
        let Some(kf) = self.interpolated_key_frame(params, time) else {
            return;
        };

        let mut kf_scale = kf.scale();
        if scale != 1.0 && kf_scale != Vec3::ONE {
            kf_scale = Vec3::ONE + (kf_scale - Vec3::ONE) * scale;
        }

        if accumulate {
            node.translate(kf.translate() * weight * scale);

            // 0 = no rotation, 1 = full keyframe rotation
            let rotation = match params.rotation_interpolation_mode {
                RotationInterpolationMode::Linear => nlerp(weight, Quat::IDENTITY, kf.rotation(), false),
                RotationInterpolationMode::Spherical => slerp(weight, Quat::IDENTITY, kf.rotation(), false),
            };
            node.rotate(rotation);

            // Weight is not applied to scale when accumulating
            node.scale(kf_scale);
        } else {
            node.weighted_transform(weight, kf.translate() * scale, kf.rotation(), kf_scale);
        }
    }

    /// Applies to the node this track is bound to.
    pub fn apply(
        &self,
        targets: &mut dyn AnimationTargets,
        params: &AnimationParams,
        time: f32,
        weight: f32,
        accumulate: bool,
        scale: f32,
    ) -> Result<()> {
        let handle = self
            .target
            .ok_or_else(|| TesseraError::invalid(format!("node track {} has no target node", self.handle)))?;
        let node = targets
            .node_mut(handle)
            .ok_or_else(|| TesseraError::not_found(format!("target node of node track {}", self.handle)))?;
        self.apply_to_node(node, params, time, weight, accumulate, scale);
        Ok(())
    }

    // ========================================================================
    // Optimisation
    // ========================================================================

    /// `true` if any keyframe moves, rotates or scales the node.
    #[must_use]
    pub fn has_non_zero_key_frames(&self) -> bool {
        self.key_frames.iter().any(|kf| {
            !position_equals(kf.translate(), Vec3::ZERO, DEFAULT_TOLERANCE)
                || !position_equals(kf.scale(), Vec3::ONE, DEFAULT_TOLERANCE)
                || !real_equal(quat_angle(kf.rotation()), 0.0, DEFAULT_TOLERANCE)
        })
    }

    /// Removes the middle keyframes of runs of five or more identical
    /// keyframes. The first and last keyframe of a run are always kept so
    /// interpolation at the run boundaries is unchanged.
    pub fn optimise(&mut self) {
        let mut last_translate = Vec3::ZERO;
        let mut last_scale = Vec3::ZERO;
        let mut last_rotation = Quat::IDENTITY;
        let mut dup_count = 0_u32;
        let mut remove = Vec::new();

        for (k, kf) in self.key_frames.iter().enumerate() {
            let duplicate = k != 0
                && position_equals(kf.translate(), last_translate, DEFAULT_TOLERANCE)
                && position_equals(kf.scale(), last_scale, DEFAULT_TOLERANCE)
                && quat_equals(kf.rotation(), last_rotation, DEFAULT_TOLERANCE);

            if duplicate {
                dup_count += 1;
                // 4 means this is the fifth identical keyframe in a row
                if dup_count == 4 {
                    remove.push(k - 2);
                    dup_count -= 1;
                }
            } else {
                dup_count = 0;
                last_translate = kf.translate();
                last_scale = kf.scale();
                last_rotation = kf.rotation();
            }
        }

        if remove.is_empty() {
            return;
        }
        log::debug!(
            "Node track {}: removed {} redundant keyframes of {}",
            self.handle,
            remove.len(),
            self.key_frames.len()
        );
        let mut keep = vec![true; self.key_frames.len()];
        for index in remove {
            if let Some(flag) = keep.get_mut(index) {
                *flag = false;
            }
        }
        self.key_frames.retain_mask(&keep);
        self.splines.take();
    }
}
