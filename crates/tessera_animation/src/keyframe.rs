//! Keyframe types.
//!
//! A keyframe is a snapshot of one track's target at a point in time. The
//! time is fixed at creation; tracks keep their keyframes sorted by it.

use std::sync::OnceLock;

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use crate::numeric::AnyNumeric;
use crate::vertex_data::VertexBuffer;

/// Common behaviour of every keyframe kind.
pub trait KeyFrame {
    /// Time of this keyframe in seconds from the start of the animation.
    fn time(&self) -> f32;
}

// ============================================================================
// Transform
// ============================================================================

/// Translation, rotation and scale of a node at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformKeyFrame {
    time: f32,
    translate: Vec3,
    scale: Vec3,
    rotate: Quat,
}

impl TransformKeyFrame {
    /// Identity transform at `time`.
    #[must_use]
    pub fn new(time: f32) -> Self {
        Self {
            time,
            translate: Vec3::ZERO,
            scale: Vec3::ONE,
            rotate: Quat::IDENTITY,
        }
    }

    #[inline]
    #[must_use]
    pub fn translate(&self) -> Vec3 {
        self.translate
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotate
    }

    pub fn set_translate(&mut self, translate: Vec3) -> &mut Self {
        self.translate = translate;
        self
    }

    pub fn set_scale(&mut self, scale: Vec3) -> &mut Self {
        self.scale = scale;
        self
    }

    pub fn set_rotation(&mut self, rotate: Quat) -> &mut Self {
        self.rotate = rotate;
        self
    }
}

impl KeyFrame for TransformKeyFrame {
    fn time(&self) -> f32 {
        self.time
    }
}

// ============================================================================
// Numeric
// ============================================================================

/// A single numeric value at one point in time.
///
/// The value is changed through the owning track so that all keyframes of a
/// track keep the same [`NumericKind`](crate::numeric::NumericKind).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericKeyFrame {
    time: f32,
    value: AnyNumeric,
}

impl NumericKeyFrame {
    #[must_use]
    pub fn new(time: f32, value: AnyNumeric) -> Self {
        Self { time, value }
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> AnyNumeric {
        self.value
    }

    pub(crate) fn set_value(&mut self, value: AnyNumeric) {
        self.value = value;
    }
}

impl KeyFrame for NumericKeyFrame {
    fn time(&self) -> f32 {
        self.time
    }
}

// ============================================================================
// Vertex morph
// ============================================================================

/// Complete vertex positions at one point in time.
#[derive(Debug, Clone)]
pub struct VertexMorphKeyFrame {
    time: f32,
    vertex_buffer: VertexBuffer,
}

impl VertexMorphKeyFrame {
    #[must_use]
    pub fn new(time: f32, vertex_buffer: VertexBuffer) -> Self {
        Self { time, vertex_buffer }
    }

    /// Packed xyz positions, one triple per vertex.
    #[inline]
    #[must_use]
    pub fn vertex_buffer(&self) -> &VertexBuffer {
        &self.vertex_buffer
    }

    pub fn set_vertex_buffer(&mut self, buffer: VertexBuffer) {
        self.vertex_buffer = buffer;
    }
}

impl KeyFrame for VertexMorphKeyFrame {
    fn time(&self) -> f32 {
        self.time
    }
}

// ============================================================================
// Vertex pose
// ============================================================================

/// Reference to a pose in the owning mesh's pose list, with its influence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseRef {
    pub pose_index: u16,
    pub influence: f32,
}

/// Set of pose influences at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexPoseKeyFrame {
    time: f32,
    pose_refs: SmallVec<[PoseRef; 4]>,
}

impl VertexPoseKeyFrame {
    #[must_use]
    pub fn new(time: f32) -> Self {
        Self {
            time,
            pose_refs: SmallVec::new(),
        }
    }

    /// Adds a reference. Duplicate pose indices are not merged.
    pub fn add_pose_reference(&mut self, pose_index: u16, influence: f32) {
        self.pose_refs.push(PoseRef {
            pose_index,
            influence,
        });
    }

    /// Sets the influence of `pose_index`, adding the reference if absent.
    pub fn update_pose_reference(&mut self, pose_index: u16, influence: f32) {
        match self.pose_refs.iter_mut().find(|r| r.pose_index == pose_index) {
            Some(existing) => existing.influence = influence,
            None => self.add_pose_reference(pose_index, influence),
        }
    }

    pub fn remove_pose_reference(&mut self, pose_index: u16) {
        self.pose_refs.retain(|r| r.pose_index != pose_index);
    }

    pub fn remove_all_pose_references(&mut self) {
        self.pose_refs.clear();
    }

    #[inline]
    #[must_use]
    pub fn pose_references(&self) -> &[PoseRef] {
        &self.pose_refs
    }

    pub(crate) fn influence_of(&self, pose_index: u16) -> Option<f32> {
        self.pose_refs
            .iter()
            .find(|r| r.pose_index == pose_index)
            .map(|r| r.influence)
    }
}

impl KeyFrame for VertexPoseKeyFrame {
    fn time(&self) -> f32 {
        self.time
    }
}

// ============================================================================
// Mutation guard
// ============================================================================

/// Mutable access to a keyframe that discards the owning track's derived
/// cache (`C`) when dropped.
pub struct KeyFrameMut<'a, K, C> {
    key_frame: &'a mut K,
    cache: &'a mut OnceLock<C>,
}

impl<'a, K, C> KeyFrameMut<'a, K, C> {
    pub(crate) fn new(key_frame: &'a mut K, cache: &'a mut OnceLock<C>) -> Self {
        Self { key_frame, cache }
    }
}

impl<K, C> std::ops::Deref for KeyFrameMut<'_, K, C> {
    type Target = K;

    fn deref(&self) -> &Self::Target {
        self.key_frame
    }
}

impl<K, C> std::ops::DerefMut for KeyFrameMut<'_, K, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.key_frame
    }
}

impl<K, C> Drop for KeyFrameMut<'_, K, C> {
    fn drop(&mut self) {
        self.cache.take();
    }
}
