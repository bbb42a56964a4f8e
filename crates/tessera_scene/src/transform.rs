use glam::{Affine3A, Mat4, Quat, Vec3};
use tessera_animation::NodeTarget;
use tessera_core::math::slerp;

/// Transform component
///
/// Position, rotation and scale (TRS) of a node relative to its parent,
/// with cached matrices and shadow-state dirty checking.
///
/// It also carries the animation blend state: the initial (bind) pose that
/// animation is expressed relative to, and the transform accumulated from
/// the weighted animations applied since the last reset.
#[derive(Debug, Clone)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    // === Matrix cache ===
    pub(crate) local_matrix: Affine3A,
    pub(crate) world_matrix: Affine3A,

    // === Dirty check shadow state ===
    last_position: Vec3,
    last_rotation: Quat,
    last_scale: Vec3,
    force_update: bool,

    // === Animation blend state ===
    initial_position: Vec3,
    initial_rotation: Quat,
    initial_scale: Vec3,
    accumulated_weight: f32,
    trans_from_initial: Vec3,
    rot_from_initial: Quat,
    scale_from_initial: Vec3,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,

            local_matrix: Affine3A::IDENTITY,
            world_matrix: Affine3A::IDENTITY,

            last_position: Vec3::ZERO,
            last_rotation: Quat::IDENTITY,
            last_scale: Vec3::ONE,
            force_update: true,

            initial_position: Vec3::ZERO,
            initial_rotation: Quat::IDENTITY,
            initial_scale: Vec3::ONE,
            accumulated_weight: 0.0,
            trans_from_initial: Vec3::ZERO,
            rot_from_initial: Quat::IDENTITY,
            scale_from_initial: Vec3::ONE,
        }
    }

    /// Transform with the given TRS, also recorded as the initial state.
    #[must_use]
    pub fn from_trs(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let mut transform = Self {
            position,
            rotation,
            scale,
            ..Self::new()
        };
        transform.set_initial_state();
        transform
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    /// Recomputes the local matrix if TRS changed since the last call.
    /// Returns whether it changed.
    pub fn update_local_matrix(&mut self) -> bool {
        let changed = self.position != self.last_position
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
            || self.force_update;

        if changed {
            self.local_matrix = Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position);

            self.last_position = self.position;
            self.last_rotation = self.rotation;
            self.last_scale = self.scale;
            self.force_update = false;
        }

        changed
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix_as_mat4(&self) -> Mat4 {
        Mat4::from(self.world_matrix)
    }

    /// Written by the transform system after propagation.
    pub fn set_world_matrix(&mut self, mat: Affine3A) {
        self.world_matrix = mat;
    }

    /// Forces the next [`update_local_matrix`](Self::update_local_matrix)
    /// to report a change.
    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }

    // ========================================================================
    // Initial state
    // ========================================================================

    /// Records the current TRS as the state animation is relative to.
    pub fn set_initial_state(&mut self) {
        self.initial_position = self.position;
        self.initial_rotation = self.rotation;
        self.initial_scale = self.scale;
    }

    #[inline]
    #[must_use]
    pub fn initial_position(&self) -> Vec3 {
        self.initial_position
    }

    #[inline]
    #[must_use]
    pub fn initial_rotation(&self) -> Quat {
        self.initial_rotation
    }

    #[inline]
    #[must_use]
    pub fn initial_scale(&self) -> Vec3 {
        self.initial_scale
    }

    /// Total weight blended through `weighted_transform` since the last reset.
    #[inline]
    #[must_use]
    pub fn accumulated_weight(&self) -> f32 {
        self.accumulated_weight
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTarget for Transform {
    fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    fn rotate(&mut self, rotation: Quat) {
        self.rotation = self.rotation * rotation.normalize();
    }

    fn scale(&mut self, factor: Vec3) {
        self.scale *= factor;
    }

    fn weighted_transform(&mut self, weight: f32, translate: Vec3, rotate: Quat, scale: Vec3) {
        if self.accumulated_weight == 0.0 {
            // First contribution this frame
            self.rot_from_initial = rotate;
            self.trans_from_initial = translate;
            self.scale_from_initial = scale;
            self.accumulated_weight = weight;
        } else {
            // Blend toward the new transform by its share of the total weight
            let factor = weight / (self.accumulated_weight + weight);
            self.trans_from_initial += (translate - self.trans_from_initial) * factor;
            self.rot_from_initial = slerp(factor, self.rot_from_initial, rotate, false);
            self.scale_from_initial *= (scale - Vec3::ONE) * factor + Vec3::ONE;
            self.accumulated_weight += weight;
        }

        self.rotation = self.initial_rotation * self.rot_from_initial;
        self.position = self.initial_position + self.trans_from_initial;
        self.scale = self.initial_scale * self.scale_from_initial;
    }

    fn reset_to_initial_state(&mut self) {
        self.position = self.initial_position;
        self.rotation = self.initial_rotation;
        self.scale = self.initial_scale;

        self.accumulated_weight = 0.0;
        self.trans_from_initial = Vec3::ZERO;
        self.rot_from_initial = Quat::IDENTITY;
        self.scale_from_initial = Vec3::ONE;
    }
}
