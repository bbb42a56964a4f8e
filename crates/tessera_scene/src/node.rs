use glam::{Affine3A, Quat, Vec3};
use tessera_animation::NodeTarget;
use tessera_core::NodeHandle;

use crate::transform::Transform;

/// A scene node: hierarchy links plus a [`Transform`].
///
/// Scene animations drive nodes through [`NodeTarget`]; the node forwards
/// every call to its transform, which holds the initial state and the blend
/// accumulators.
#[derive(Debug, Clone)]
pub struct Node {
    /// Optional name, used in log messages.
    pub name: String,

    // === Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    pub transform: Transform,

    pub visible: bool,
}

impl Node {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            visible: true,
        }
    }

    #[must_use]
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new()
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Sets the parent link only. [`SceneManager::attach`](crate::SceneManager::attach)
    /// keeps both sides in sync.
    #[inline]
    pub fn set_parent(&mut self, parent: Option<NodeHandle>) {
        self.parent = parent;
    }

    /// Appends a child link only.
    #[inline]
    pub fn push_child(&mut self, child: NodeHandle) {
        self.children.push(child);
    }

    /// Records the current TRS as the state animations are relative to.
    pub fn set_initial_state(&mut self) {
        self.transform.set_initial_state();
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.transform.world_matrix
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTarget for Node {
    fn translate(&mut self, delta: Vec3) {
        self.transform.translate(delta);
    }

    fn rotate(&mut self, rotation: Quat) {
        self.transform.rotate(rotation);
    }

    fn scale(&mut self, factor: Vec3) {
        NodeTarget::scale(&mut self.transform, factor);
    }

    fn weighted_transform(&mut self, weight: f32, translate: Vec3, rotate: Quat, scale: Vec3) {
        self.transform.weighted_transform(weight, translate, rotate, scale);
    }

    fn reset_to_initial_state(&mut self) {
        self.transform.reset_to_initial_state();
    }
}
