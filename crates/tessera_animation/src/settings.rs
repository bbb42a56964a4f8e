//! Animation Settings
//!
//! Defaults applied when meshes, skeletons and scene managers create
//! animations and tracks. Values are plain data; build one with
//! struct-update syntax:
//!
//! ```rust,ignore
//! use tessera_animation::settings::{AnimationSettings, InterpolationMode};
//!
//! let settings = AnimationSettings {
//!     interpolation_mode: InterpolationMode::Spline,
//!     ..Default::default()
//! };
//! let walk = settings.create_animation("walk", 2.0);
//! ```

use crate::animation::Animation;

/// How positions and scales are interpolated between keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    /// Straight lerp between the two surrounding keyframes.
    #[default]
    Linear,
    /// Catmull-Rom spline through every keyframe of the track.
    Spline,
}

/// How rotations are interpolated in [`InterpolationMode::Linear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationInterpolationMode {
    /// Normalised lerp. Cheaper, slightly uneven angular speed.
    #[default]
    Linear,
    /// Spherical lerp. Constant angular speed.
    Spherical,
}

/// How several skeletal animations combine on the same bones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkeletonAnimationBlendMode {
    /// Weighted average of the animations (weighted transform on bones).
    #[default]
    Average,
    /// Animations are added on top of each other.
    Cumulative,
}

/// What `Animation::create_*_track` does when the handle is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateTrackPolicy {
    /// Fail with `DuplicateItem`.
    #[default]
    Reject,
    /// Drop the existing track and install the new one.
    Replace,
}

/// Defaults for animation construction and blending.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSettings {
    /// Interpolation mode of newly created animations.
    pub interpolation_mode: InterpolationMode,
    /// Rotation interpolation mode of newly created animations.
    pub rotation_interpolation_mode: RotationInterpolationMode,
    /// Initial shortest-path flag for new node tracks.
    pub use_shortest_rotation_path: bool,
    /// Blend mode used by skeletons when applying animation states.
    pub skeleton_blend_mode: SkeletonAnimationBlendMode,
    /// Hardware animation slots reserved for pose-animated vertex data.
    ///
    /// Morph animation always needs exactly one slot.
    pub hardware_pose_count: u16,
    /// Behaviour of track creation on a handle that is already used.
    pub duplicate_track_policy: DuplicateTrackPolicy,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            interpolation_mode: InterpolationMode::default(),
            rotation_interpolation_mode: RotationInterpolationMode::default(),
            use_shortest_rotation_path: true,
            skeleton_blend_mode: SkeletonAnimationBlendMode::default(),
            hardware_pose_count: 4,
            duplicate_track_policy: DuplicateTrackPolicy::default(),
        }
    }
}

impl AnimationSettings {
    /// Creates an empty animation configured with these defaults.
    #[must_use]
    pub fn create_animation(&self, name: impl Into<String>, length: f32) -> Animation {
        let mut animation = Animation::new(name, length);
        animation.set_interpolation_mode(self.interpolation_mode);
        animation.set_rotation_interpolation_mode(self.rotation_interpolation_mode);
        animation.set_duplicate_track_policy(self.duplicate_track_policy);
        animation.set_default_shortest_rotation_path(self.use_shortest_rotation_path);
        animation
    }
}
