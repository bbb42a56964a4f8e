//! Contracts between tracks and the objects they animate.
//!
//! Tracks never own their targets. Node and numeric tracks write through
//! the [`NodeTarget`] and [`AnimableValue`] traits; vertex tracks write into
//! a [`VertexData`]. Handle-bound application goes through an
//! [`AnimationTargets`] resolver, skeletal application through a
//! [`BoneResolver`], and entity vertex animation through a
//! [`VertexAnimationTarget`].

use glam::{Quat, Vec3};
use tessera_core::{AnimableHandle, NodeHandle, Result, VertexDataHandle};

use crate::numeric::{AnyNumeric, NumericKind};
use crate::pose::Pose;
use crate::vertex_data::VertexData;

/// A transformable node (scene node or bone).
pub trait NodeTarget {
    /// Moves the node by `delta` in its parent space.
    fn translate(&mut self, delta: Vec3);
    /// Rotates the node by `rotation` relative to its current orientation.
    fn rotate(&mut self, rotation: Quat);
    /// Multiplies the node's scale by `factor`.
    fn scale(&mut self, factor: Vec3);
    /// Blends a transform, relative to the initial state, into the
    /// transforms accumulated since the last reset.
    fn weighted_transform(&mut self, weight: f32, translate: Vec3, rotate: Quat, scale: Vec3);
    /// Restores the initial state and clears accumulated weight.
    fn reset_to_initial_state(&mut self);
}

/// A generic value that numeric tracks add deltas to.
///
/// Callers reset to the base value once per frame before any track adds its
/// contribution, so blended animations sum.
pub trait AnimableValue {
    fn value_kind(&self) -> NumericKind;
    fn apply_delta_value(&mut self, delta: &AnyNumeric) -> Result<()>;
    fn reset_to_base_value(&mut self);
    fn set_current_state_as_base_value(&mut self);
}

/// Resolves track target handles to mutable targets.
pub trait AnimationTargets {
    fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut dyn NodeTarget>;
    fn animable_mut(&mut self, handle: AnimableHandle) -> Option<&mut dyn AnimableValue>;
    fn vertex_data_mut(&mut self, handle: VertexDataHandle) -> Option<&mut VertexData>;

    /// Vertex data for `handle` together with the poses its pose keyframes
    /// index into. Resolvers without poses keep the default, an empty list.
    fn vertex_animation_mut(&mut self, handle: VertexDataHandle) -> Option<(&mut VertexData, &[Pose])> {
        let poses: &[Pose] = &[];
        self.vertex_data_mut(handle).map(|data| (data, poses))
    }
}

/// Maps node-track handles to bones.
pub trait BoneResolver {
    /// Fails with `ItemNotFound` when no bone has `handle`.
    fn bone_mut(&mut self, handle: u16) -> Result<&mut dyn NodeTarget>;
}

/// Buffers a vertex track writes to for one vertex data block of an entity.
pub struct VertexAnimationBuffers<'a> {
    /// Unanimated source data.
    pub original: &'a VertexData,
    /// Scratch copy blended on the CPU, when software animation is in use.
    pub software: Option<&'a mut VertexData>,
    /// Binding set for hardware blending, when hardware animation is in use.
    pub hardware: Option<&'a mut VertexData>,
    /// `true` when no other animation touched this block this frame.
    pub first_touch: bool,
    /// Pose list pose keyframes index into.
    pub poses: &'a [Pose],
}

/// An object owning per-instance vertex animation buffers.
pub trait VertexAnimationTarget {
    /// Buffers for vertex track `handle` (0 = shared data, `n` = sub-mesh
    /// `n - 1`). Marks them used for this frame.
    fn animation_buffers(&mut self, handle: u16) -> Result<VertexAnimationBuffers<'_>>;
}
