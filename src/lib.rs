//! # Tessera
//!
//! Scene animation core: keyframe interpolation with skeletal, morph and
//! pose blending, plus the scene objects those animations drive.
//!
//! The engine is split into crates that this umbrella re-exports:
//!
//! - [`core`]: errors, handles, quaternion and spline math
//! - [`animation`]: keyframes, tracks, animations and playback state
//! - [`scene`]: nodes, skeletons, meshes, entities and the scene manager
//!
//! ```rust,ignore
//! use tessera::prelude::*;
//!
//! let mut scene = SceneManager::new();
//! let node = scene.create_node(Node::with_name("door"));
//!
//! let open = scene.create_animation("open", 2.0)?;
//! let track = open.create_node_track_for(0, node)?;
//! track.create_node_key_frame(0.0);
//! track.create_node_key_frame(2.0).set_rotation(Quat::from_rotation_y(1.5));
//!
//! scene.create_animation_state("open")?.set_enabled(true);
//! scene.animation_state_mut("open")?.add_time(0.016);
//! scene.update_scene_graph()?;
//! ```

pub use tessera_animation as animation;
pub use tessera_core as core;
pub use tessera_scene as scene;

pub use tessera_core::{Result, TesseraError};

pub mod prelude {
    pub use glam::{Quat, Vec3};

    pub use tessera_animation::{
        AnimableValue, Animation, AnimationSettings, AnimationState, AnimationStateSet, AnyNumeric,
        InterpolationMode, NodeTarget, Pose, RotationInterpolationMode, SkeletonAnimationBlendMode, VertexAnimationType,
        VertexBuffer, VertexData,
    };
    pub use tessera_core::{AnimableHandle, NodeHandle, Result, TesseraError, VertexDataHandle};
    pub use tessera_scene::{Bone, Entity, EntityKey, Mesh, Node, NumericAnimable, SceneManager, Skeleton, SubMesh};
}
