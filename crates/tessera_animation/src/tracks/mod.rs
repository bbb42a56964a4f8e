//! Animation tracks.
//!
//! A track owns the keyframes for one target: a node ([`NodeAnimationTrack`]),
//! a numeric value ([`NumericAnimationTrack`]) or a vertex data block
//! ([`VertexAnimationTrack`]). Tracks are identified inside an animation by
//! a `u16` handle whose meaning depends on the consumer (bone handle for
//! skeletons, vertex data index for meshes).

mod key_frame_list;
mod node;
mod numeric;
mod vertex;

pub use key_frame_list::{KeyFrameList, KeyFrameLookup};
pub use node::{NodeAnimationTrack, TransformKeyFrameMut, TransformSplines};
pub use numeric::NumericAnimationTrack;
pub use vertex::{TargetMode, VertexAnimationTrack, VertexAnimationType};
