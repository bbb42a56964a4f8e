//! Tessera Animation
//!
//! Keyframe animation for scene nodes, numeric values and vertex data.
//!
//! # Structure
//!
//! - [`keyframe`]: transform, numeric, morph and pose keyframes
//! - [`tracks`]: per-target keyframe sequences and their interpolation
//! - [`animation`]: named collections of tracks applied as a unit
//! - [`state`]: playback state (time, weight, enabled) and state sets
//! - [`target`]: traits the animated objects implement
//! - [`vertex_data`] and [`pose`]: vertex buffers and pose offsets
//! - [`settings`]: construction and blending defaults
//!
//! # Blending model
//!
//! Each frame the owner of the targets resets them, then applies every
//! enabled animation state in enable order. Node tracks blend through a
//! weighted transform relative to the node's initial state, numeric tracks
//! add weighted deltas to a base value, and vertex tracks either write the
//! blended positions on the CPU or bind buffers to hardware slots.

pub mod animation;
pub mod keyframe;
pub mod numeric;
pub mod pose;
pub mod settings;
pub mod state;
pub mod target;
pub mod tracks;
pub mod vertex_data;

pub use animation::{Animation, AnimationParams};
pub use keyframe::{
    KeyFrame, KeyFrameMut, NumericKeyFrame, PoseRef, TransformKeyFrame, VertexMorphKeyFrame, VertexPoseKeyFrame,
};
pub use numeric::{AnyNumeric, NumericKind};
pub use pose::Pose;
pub use settings::{
    AnimationSettings, DuplicateTrackPolicy, InterpolationMode, RotationInterpolationMode, SkeletonAnimationBlendMode,
};
pub use state::{AnimationState, AnimationStateMut, AnimationStateSet, StateKey};
pub use target::{AnimableValue, AnimationTargets, BoneResolver, NodeTarget, VertexAnimationBuffers, VertexAnimationTarget};
pub use tracks::{NodeAnimationTrack, NumericAnimationTrack, TargetMode, VertexAnimationTrack, VertexAnimationType};
pub use vertex_data::{VertexBuffer, VertexData, VertexElementSemantic};
