//! Tessera Core
//!
//! Foundation types shared by the Tessera animation and scene crates:
//!
//! - [`errors`]: [`TesseraError`] and the [`Result`] alias
//! - [`math`]: quaternion interpolation with an explicit shortest-path switch
//! - [`spline`]: Hermite and rotational splines used by keyframe tracks
//! - [`version_tracker`]: dirty-frame counters
//! - [`handles`]: slotmap keys naming animation targets

pub mod errors;
pub mod handles;
pub mod math;
pub mod spline;
pub mod version_tracker;

pub use errors::{Result, TesseraError};
pub use handles::{AnimableHandle, NodeHandle, VertexDataHandle};
pub use spline::{RotationalSpline, SimpleSpline};
pub use version_tracker::ChangeTracker;
