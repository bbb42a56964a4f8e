//! Tessera Scene
//!
//! The objects animations drive and the per-frame driver that runs them.
//!
//! - [`node`], [`transform`] and [`transform_system`]: the node hierarchy
//! - [`animable`]: numeric values scene animations can target
//! - [`skeleton`]: bones and skeletal animations
//! - [`mesh`] and [`entity`]: shared mesh data and its animated instances
//! - [`manager`]: [`SceneManager`], owner of the scene and its animations

pub mod animable;
pub mod entity;
pub mod manager;
pub mod mesh;
pub mod node;
pub mod skeleton;
pub mod transform;
pub mod transform_system;

pub use animable::NumericAnimable;
pub use entity::Entity;
pub use manager::{EntityKey, SceneManager};
pub use mesh::{Mesh, SubMesh};
pub use node::Node;
pub use skeleton::{Bone, MAX_NUM_BONES, Skeleton};
pub use transform::Transform;
