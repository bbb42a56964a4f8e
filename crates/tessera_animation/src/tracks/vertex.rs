use tessera_core::{Result, TesseraError, VertexDataHandle};

use super::key_frame_list::KeyFrameList;
use crate::animation::AnimationParams;
use crate::keyframe::{VertexMorphKeyFrame, VertexPoseKeyFrame};
use crate::pose::Pose;
use crate::target::AnimationTargets;
use crate::vertex_data::{software_vertex_morph, software_vertex_pose_blend, VertexBuffer, VertexData};

/// Kind of vertex animation carried by a track or used on a vertex data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexAnimationType {
    #[default]
    None,
    /// Whole-buffer snapshots blended pairwise.
    Morph,
    /// Weighted sums of sparse offset sets.
    Pose,
}

/// Where vertex blending happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    /// Blend on the CPU into the position buffer.
    #[default]
    Software,
    /// Bind buffers to hardware animation slots and record parametrics.
    Hardware,
}

#[derive(Debug, Clone)]
enum VertexKeyFrames {
    Morph(KeyFrameList<VertexMorphKeyFrame>),
    Pose(KeyFrameList<VertexPoseKeyFrame>),
}

/// Animates the positions of one vertex data block by morphing or by
/// blending poses.
#[derive(Debug, Clone)]
pub struct VertexAnimationTrack {
    handle: u16,
    key_frames: VertexKeyFrames,
    target: Option<VertexDataHandle>,
    target_mode: TargetMode,
}

impl VertexAnimationTrack {
    /// Fails with `InvalidParams` for [`VertexAnimationType::None`].
    pub fn new(handle: u16, animation_type: VertexAnimationType) -> Result<Self> {
        let key_frames = match animation_type {
            VertexAnimationType::Morph => VertexKeyFrames::Morph(KeyFrameList::new()),
            VertexAnimationType::Pose => VertexKeyFrames::Pose(KeyFrameList::new()),
            VertexAnimationType::None => {
                return Err(TesseraError::invalid(format!(
                    "vertex track {handle} needs a morph or pose animation type"
                )));
            }
        };
        Ok(Self {
            handle,
            key_frames,
            target: None,
            target_mode: TargetMode::default(),
        })
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> u16 {
        self.handle
    }

    #[must_use]
    pub fn animation_type(&self) -> VertexAnimationType {
        match self.key_frames {
            VertexKeyFrames::Morph(_) => VertexAnimationType::Morph,
            VertexKeyFrames::Pose(_) => VertexAnimationType::Pose,
        }
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<VertexDataHandle> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<VertexDataHandle>) {
        self.target = target;
    }

    #[inline]
    #[must_use]
    pub fn target_mode(&self) -> TargetMode {
        self.target_mode
    }

    pub fn set_target_mode(&mut self, mode: TargetMode) {
        self.target_mode = mode;
    }

    // ========================================================================
    // Keyframes
    // ========================================================================

    pub fn create_vertex_morph_key_frame(
        &mut self,
        time: f32,
        buffer: VertexBuffer,
    ) -> Result<&mut VertexMorphKeyFrame> {
        match &mut self.key_frames {
            VertexKeyFrames::Morph(list) => Ok(list.insert_mut(VertexMorphKeyFrame::new(time, buffer))),
            VertexKeyFrames::Pose(_) => Err(wrong_kind(self.handle, "morph")),
        }
    }

    pub fn create_vertex_pose_key_frame(&mut self, time: f32) -> Result<&mut VertexPoseKeyFrame> {
        match &mut self.key_frames {
            VertexKeyFrames::Pose(list) => Ok(list.insert_mut(VertexPoseKeyFrame::new(time))),
            VertexKeyFrames::Morph(_) => Err(wrong_kind(self.handle, "pose")),
        }
    }

    pub fn vertex_morph_key_frame(&self, index: usize) -> Result<&VertexMorphKeyFrame> {
        match &self.key_frames {
            VertexKeyFrames::Morph(list) => list.try_get(index),
            VertexKeyFrames::Pose(_) => Err(wrong_kind(self.handle, "morph")),
        }
    }

    pub fn vertex_morph_key_frame_mut(&mut self, index: usize) -> Result<&mut VertexMorphKeyFrame> {
        match &mut self.key_frames {
            VertexKeyFrames::Morph(list) => list.try_get_mut(index),
            VertexKeyFrames::Pose(_) => Err(wrong_kind(self.handle, "morph")),
        }
    }

    pub fn vertex_pose_key_frame(&self, index: usize) -> Result<&VertexPoseKeyFrame> {
        match &self.key_frames {
            VertexKeyFrames::Pose(list) => list.try_get(index),
            VertexKeyFrames::Morph(_) => Err(wrong_kind(self.handle, "pose")),
        }
    }

    pub fn vertex_pose_key_frame_mut(&mut self, index: usize) -> Result<&mut VertexPoseKeyFrame> {
        match &mut self.key_frames {
            VertexKeyFrames::Pose(list) => list.try_get_mut(index),
            VertexKeyFrames::Morph(_) => Err(wrong_kind(self.handle, "pose")),
        }
    }

    #[must_use]
    pub fn num_key_frames(&self) -> usize {
        match &self.key_frames {
            VertexKeyFrames::Morph(list) => list.len(),
            VertexKeyFrames::Pose(list) => list.len(),
        }
    }

    pub fn remove_key_frame(&mut self, index: usize) -> Result<()> {
        match &mut self.key_frames {
            VertexKeyFrames::Morph(list) => list.remove(index).map(drop),
            VertexKeyFrames::Pose(list) => list.remove(index).map(drop),
        }
    }

    pub fn remove_all_key_frames(&mut self) {
        match &mut self.key_frames {
            VertexKeyFrames::Morph(list) => list.clear(),
            VertexKeyFrames::Pose(list) => list.clear(),
        }
    }

    // ========================================================================
    // Application
    // ========================================================================

    /// Applies to `data` using this track's [`TargetMode`].
    pub fn apply_to_vertex_data(
        &self,
        data: &mut VertexData,
        params: &AnimationParams,
        time: f32,
        weight: f32,
        poses: &[Pose],
    ) -> Result<()> {
        self.apply_to_vertex_data_as(self.target_mode, data, params, time, weight, poses)
    }

    /// Applies to `data` in an explicit target mode.
    ///
    /// Morph tracks ignore `weight`. Pose tracks scale every influence by it.
    pub fn apply_to_vertex_data_as(
        &self,
        mode: TargetMode,
        data: &mut VertexData,
        params: &AnimationParams,
        time: f32,
        weight: f32,
        poses: &[Pose],
    ) -> Result<()> {
        match &self.key_frames {
            VertexKeyFrames::Morph(list) => {
                let Some(hit) = list.key_frames_at_time(time, params.length) else {
                    return Ok(());
                };
                let (b1, b2) = (hit.first.vertex_buffer(), hit.second.vertex_buffer());
                match mode {
                    TargetMode::Hardware => {
                        let slot = data.hardware_animation_data().first().copied().ok_or_else(|| {
                            TesseraError::invalid("hardware vertex animation elements are not set up")
                        })?;
                        let position = data.position_source()?;
                        data.set_binding(position, b1.clone());
                        data.set_binding(slot.target_source, b2.clone());
                        data.set_hardware_parametric(0, hit.t);
                    }
                    TargetMode::Software => {
                        software_vertex_morph(hit.t, b1, b2, data.position_buffer_mut()?);
                    }
                }
            }
            VertexKeyFrames::Pose(list) => {
                let Some(hit) = list.key_frames_at_time(time, params.length) else {
                    return Ok(());
                };
                let (k1, k2, t) = (hit.first, hit.second, hit.t);

                // Poses in key 1, interpolated toward key 2 (0 if absent there)
                for r1 in k1.pose_references() {
                    let end = k2.influence_of(r1.pose_index).unwrap_or(0.0);
                    let influence = (r1.influence + t * (end - r1.influence)) * weight;
                    let pose = lookup_pose(poses, r1.pose_index)?;
                    apply_pose_to_vertex_data(mode, pose, data, influence)?;
                }
                // Poses only in key 2, ramped up from 0
                for r2 in k2.pose_references() {
                    if k1.influence_of(r2.pose_index).is_some() {
                        continue;
                    }
                    let influence = t * r2.influence * weight;
                    let pose = lookup_pose(poses, r2.pose_index)?;
                    apply_pose_to_vertex_data(mode, pose, data, influence)?;
                }
            }
        }
        Ok(())
    }

    /// Applies to the vertex data this track is bound to, with the poses
    /// the resolver supplies for it.
    pub fn apply(
        &self,
        targets: &mut dyn AnimationTargets,
        params: &AnimationParams,
        time: f32,
        weight: f32,
    ) -> Result<()> {
        let handle = self
            .target
            .ok_or_else(|| TesseraError::invalid(format!("vertex track {} has no target data", self.handle)))?;
        let (data, poses) = targets
            .vertex_animation_mut(handle)
            .ok_or_else(|| TesseraError::not_found(format!("vertex data of vertex track {}", self.handle)))?;
        self.apply_to_vertex_data(data, params, time, weight, poses)
    }

    /// Morph tracks: any keyframe. Pose tracks: any positive influence.
    #[must_use]
    pub fn has_non_zero_key_frames(&self) -> bool {
        match &self.key_frames {
            VertexKeyFrames::Morph(list) => !list.is_empty(),
            VertexKeyFrames::Pose(list) => list
                .iter()
                .any(|kf| kf.pose_references().iter().any(|r| r.influence > 0.0)),
        }
    }
}

fn wrong_kind(handle: u16, wanted: &str) -> TesseraError {
    TesseraError::invalid(format!(
        "{wanted} keyframes are only valid on {wanted} vertex tracks (track {handle})"
    ))
}

fn lookup_pose(poses: &[Pose], index: u16) -> Result<&Pose> {
    poses
        .get(usize::from(index))
        .ok_or_else(|| TesseraError::out_of_bounds("pose", usize::from(index)))
}

fn apply_pose_to_vertex_data(mode: TargetMode, pose: &Pose, data: &mut VertexData, influence: f32) -> Result<()> {
    match mode {
        TargetMode::Hardware => {
            if data.hardware_animation_data().is_empty() {
                return Err(TesseraError::invalid(
                    "hardware vertex animation elements are not set up",
                ));
            }
            let Some(slot) = data.claim_hardware_slot() else {
                log::trace!("Pose '{}' dropped: hardware animation slots exhausted", pose.name());
                return Ok(());
            };
            let source = data.hardware_animation_data()[slot].target_source;
            data.set_binding(source, pose.hardware_vertex_buffer(data.vertex_count()));
            data.set_hardware_parametric(slot, influence);
        }
        TargetMode::Software => {
            software_vertex_pose_blend(influence, pose.vertex_offsets(), data.position_buffer_mut()?);
        }
    }
    Ok(())
}
