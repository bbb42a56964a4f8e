//! Entities: animated instances of a mesh.
//!
//! An entity shares its [`Mesh`] with other instances and owns everything
//! that differs per instance: the animation states, a posed copy of the
//! skeleton, and scratch vertex data that vertex animation writes into.
//!
//! Entities of the same skeleton can share one skeleton instance through
//! [`SceneManager::share_skeleton_instance_with`]: the sharer then mirrors
//! the source's animation states and bone pose instead of posing its own.
//!
//! [`SceneManager::share_skeleton_instance_with`]: crate::SceneManager::share_skeleton_instance_with

use std::sync::Arc;

use glam::Affine3A;
use smallvec::SmallVec;
use tessera_animation::{
    AnimationState, AnimationStateMut, AnimationStateSet, VertexAnimationBuffers, VertexAnimationTarget,
    VertexAnimationType, VertexData,
};
use tessera_core::{Result, TesseraError};

use crate::manager::EntityKey;
use crate::mesh::Mesh;
use crate::skeleton::Skeleton;

/// Per vertex-data scratch buffers of an entity.
#[derive(Debug, Clone, Default)]
struct AnimationScratch {
    /// Positions blended on the CPU.
    software: Option<VertexData>,
    /// Bindings and slot parametrics for hardware blending.
    hardware: Option<VertexData>,
    /// Touched by an animation during the current pass.
    used: bool,
}

/// An instance of a mesh with its own animation state.
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    mesh: Arc<Mesh>,
    skeleton: Option<Skeleton>,
    animation_state: AnimationStateSet,

    /// Indexed by vertex track handle: 0 shared data, `n` sub-mesh `n - 1`.
    scratch: Vec<AnimationScratch>,
    bone_matrices: Vec<Affine3A>,

    frame_animation_last_updated: u64,
    /// Entity whose skeleton instance this one mirrors.
    skeleton_source: Option<EntityKey>,
    /// Source update last mirrored.
    mirrored_frame: u64,
    hardware_animation: bool,
    software_animation_requests: u32,
    cast_shadows: bool,
    pub visible: bool,

    // Modes of the vertex animation pass in progress
    software_pass: bool,
    hardware_pass: bool,
}

impl Entity {
    /// Creates an entity with one disabled state per mesh and skeleton
    /// animation.
    pub fn new(name: impl Into<String>, mesh: Arc<Mesh>) -> Result<Self> {
        let mut animation_state = AnimationStateSet::new();
        mesh.init_animation_state(&mut animation_state)?;

        let mut skeleton = mesh.skeleton().cloned();
        let bone_matrices = match &mut skeleton {
            Some(skeleton) => {
                skeleton.update_transforms();
                skeleton.bone_matrices()
            }
            None => Vec::new(),
        };

        Ok(Self {
            name: name.into(),
            scratch: vec![AnimationScratch::default(); mesh.num_sub_meshes() + 1],
            mesh,
            skeleton,
            animation_state,
            bone_matrices,
            frame_animation_last_updated: u64::MAX,
            skeleton_source: None,
            mirrored_frame: u64::MAX,
            hardware_animation: false,
            software_animation_requests: 0,
            cast_shadows: true,
            visible: true,
            software_pass: false,
            hardware_pass: false,
        })
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.skeleton.as_ref()
    }

    /// The entity's own skeleton, for manual bone control. Call
    /// [`Skeleton::notify_manual_bones_dirty`] after moving manual bones.
    pub fn skeleton_mut(&mut self) -> Option<&mut Skeleton> {
        self.skeleton.as_mut()
    }

    #[must_use]
    pub fn has_skeleton(&self) -> bool {
        self.skeleton.is_some()
    }

    #[must_use]
    pub fn has_vertex_animation(&self) -> bool {
        self.mesh.has_vertex_animation()
    }

    // ========================================================================
    // Animation states
    // ========================================================================

    pub fn animation_state(&self, name: &str) -> Result<&AnimationState> {
        self.animation_state.animation_state(name)
    }

    pub fn animation_state_mut(&mut self, name: &str) -> Result<AnimationStateMut<'_>> {
        self.animation_state.animation_state_mut(name)
    }

    #[inline]
    #[must_use]
    pub fn all_animation_states(&self) -> &AnimationStateSet {
        &self.animation_state
    }

    pub fn all_animation_states_mut(&mut self) -> &mut AnimationStateSet {
        &mut self.animation_state
    }

    /// Adds states for animations the mesh or skeleton gained since the
    /// entity was created.
    pub fn refresh_available_animation_state(&mut self) -> Result<()> {
        self.mesh.refresh_animation_state(&mut self.animation_state)
    }

    /// `true` when any state is enabled.
    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.animation_state.has_enabled_animation_state()
    }

    // ========================================================================
    // Skeleton instance sharing
    // ========================================================================

    /// The entity whose skeleton instance this one shares, if any.
    #[inline]
    #[must_use]
    pub fn shared_skeleton_source(&self) -> Option<EntityKey> {
        self.skeleton_source
    }

    #[inline]
    #[must_use]
    pub fn shares_skeleton_instance(&self) -> bool {
        self.skeleton_source.is_some()
    }

    pub(crate) fn start_sharing_skeleton_instance(&mut self, source: EntityKey) {
        self.skeleton_source = Some(source);
        self.mirrored_frame = u64::MAX;
    }

    /// Goes back to an own skeleton instance in bind pose with a fresh set
    /// of disabled states.
    pub(crate) fn stop_sharing_skeleton_instance(&mut self) -> Result<()> {
        let mut animation_state = AnimationStateSet::new();
        self.mesh.init_animation_state(&mut animation_state)?;
        let mut skeleton = self.mesh.skeleton().cloned();
        self.bone_matrices = match &mut skeleton {
            Some(skeleton) => {
                skeleton.update_transforms();
                skeleton.bone_matrices()
            }
            None => Vec::new(),
        };
        self.skeleton = skeleton;
        self.animation_state = animation_state;
        self.skeleton_source = None;
        self.mirrored_frame = u64::MAX;
        self.frame_animation_last_updated = u64::MAX;
        Ok(())
    }

    /// Pulls the states and bone pose of `source` once per source update.
    /// States the source lacks keep their own values.
    pub(crate) fn mirror_skeleton_instance(&mut self, source: &Entity) {
        if self.mirrored_frame == source.frame_animation_last_updated {
            return;
        }
        for state in source.animation_state.animation_states() {
            if let Ok(mut own) = self.animation_state.animation_state_mut(state.animation_name()) {
                own.copy_state_from(state);
            }
        }
        if let (Some(own), Some(shared)) = (&mut self.skeleton, &source.skeleton) {
            own.clone_from(shared);
        }
        self.bone_matrices.clone_from(&source.bone_matrices);
        self.mirrored_frame = source.frame_animation_last_updated;
    }

    // ========================================================================
    // Animation modes
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn is_hardware_animation_enabled(&self) -> bool {
        self.hardware_animation
    }

    /// Switches between hardware slot binding and CPU blending. Forces the
    /// next update to re-apply animation.
    pub fn set_hardware_animation_enabled(&mut self, enabled: bool) {
        if self.hardware_animation != enabled {
            self.hardware_animation = enabled;
            self.animation_state.notify_dirty();
        }
    }

    /// Asks for CPU-blended positions even when hardware animation is on,
    /// for example to read back animated geometry.
    pub fn add_software_animation_request(&mut self) {
        self.software_animation_requests += 1;
    }

    pub fn remove_software_animation_request(&mut self) {
        self.software_animation_requests = self.software_animation_requests.saturating_sub(1);
    }

    #[inline]
    #[must_use]
    pub fn software_animation_requests(&self) -> u32 {
        self.software_animation_requests
    }

    #[inline]
    #[must_use]
    pub fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    pub fn set_cast_shadows(&mut self, cast: bool) {
        self.cast_shadows = cast;
    }

    // ========================================================================
    // Animation results
    // ========================================================================

    /// CPU-blended vertex data for track handle `handle`, once allocated.
    #[must_use]
    pub fn software_vertex_data(&self, handle: u16) -> Option<&VertexData> {
        self.scratch.get(usize::from(handle))?.software.as_ref()
    }

    /// Hardware binding set for track handle `handle`, once allocated.
    #[must_use]
    pub fn hardware_vertex_data(&self, handle: u16) -> Option<&VertexData> {
        self.scratch.get(usize::from(handle))?.hardware.as_ref()
    }

    /// Bone offset matrices from the last skeletal update.
    #[inline]
    #[must_use]
    pub fn bone_matrices(&self) -> &[Affine3A] {
        &self.bone_matrices
    }

    /// Dirty counter value of the last applied animation update.
    #[inline]
    #[must_use]
    pub fn frame_animation_last_updated(&self) -> u64 {
        self.frame_animation_last_updated
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Applies vertex and skeletal animation if anything changed since the
    /// last update. Returns whether work was done.
    ///
    /// `stencil_shadows` tells whether the scene renders stencil shadows,
    /// which need CPU-side positions of shadow casters.
    pub fn update_animation(&mut self, stencil_shadows: bool) -> Result<bool> {
        let has_vertex_animation = self.mesh.has_vertex_animation();
        if !has_vertex_animation && self.skeleton.is_none() {
            return Ok(false);
        }

        let hardware = self.hardware_animation;
        let stencil_shadows = stencil_shadows && self.cast_shadows;
        let software = !hardware || stencil_shadows || self.software_animation_requests > 0;

        let dirty_frame = self.animation_state.dirty_frame_number();
        let animation_dirty = self.frame_animation_last_updated != dirty_frame
            || self.skeleton.as_ref().is_some_and(Skeleton::manual_bones_dirty);
        let buffers_missing = software && has_vertex_animation && !self.software_buffers_allocated()?;

        if !animation_dirty && !buffers_missing {
            log::trace!("Entity '{}' animation unchanged, update skipped", self.name);
            return Ok(false);
        }

        if has_vertex_animation {
            self.apply_vertex_animation(hardware, software)?;
        }

        // A shared instance is posed by its source
        if let Some(skeleton) = &mut self.skeleton
            && self.skeleton_source.is_none()
        {
            skeleton.set_animation_state(&self.animation_state)?;
            skeleton.update_transforms();
            self.bone_matrices = skeleton.bone_matrices();
            skeleton.clear_manual_bones_dirty();
        }

        self.frame_animation_last_updated = dirty_frame;
        Ok(true)
    }

    /// Track handles of vertex data that is animated and owned by the mesh.
    fn animated_handles(mesh: &Mesh) -> Result<SmallVec<[(u16, VertexAnimationType); 4]>> {
        let mut handles = SmallVec::new();
        if mesh.shared_vertex_data().is_some() {
            let ty = mesh.shared_vertex_data_animation_type()?;
            if ty != VertexAnimationType::None {
                handles.push((0, ty));
            }
        }
        for (index, sub_mesh) in mesh.sub_meshes().enumerate() {
            if sub_mesh.use_shared_vertices || sub_mesh.vertex_data.is_none() {
                continue;
            }
            let ty = mesh.sub_mesh_vertex_animation_type(index)?;
            if ty != VertexAnimationType::None {
                handles.push((index as u16 + 1, ty));
            }
        }
        Ok(handles)
    }

    fn software_buffers_allocated(&self) -> Result<bool> {
        Ok(Self::animated_handles(&self.mesh)?
            .iter()
            .all(|&(handle, _)| self.software_vertex_data(handle).is_some()))
    }

    fn apply_vertex_animation(&mut self, hardware: bool, software: bool) -> Result<()> {
        let mesh = Arc::clone(&self.mesh);
        let animated = Self::animated_handles(&mesh)?;

        // Enough hardware slots for every animated block, all reset
        if hardware {
            let pose_count = usize::from(mesh.settings().hardware_pose_count);
            for &(handle, ty) in &animated {
                let original = mesh.vertex_data_by_track_handle(handle)?;
                let count = if ty == VertexAnimationType::Pose { pose_count } else { 1 };
                self.scratch[usize::from(handle)]
                    .hardware
                    .get_or_insert_with(|| original.clone())
                    .reset_hardware_animation(count);
            }
        }

        for scratch in &mut self.scratch {
            scratch.used = false;
        }
        self.software_pass = software;
        self.hardware_pass = hardware;

        let enabled: SmallVec<[(String, f32, f32); 4]> = self
            .animation_state
            .enabled_animation_states()
            .map(|s| (s.animation_name().to_owned(), s.time_position(), s.weight()))
            .collect();
        for (name, time, weight) in &enabled {
            // Skeletal animations share the state set
            if let Ok(animation) = mesh.animation(name) {
                animation.apply_to_vertex_target(self, *time, *weight, software, hardware)?;
            }
        }

        self.restore_buffers_for_unused_animation(&mesh, &animated, hardware)
    }

    /// Rebinds the original positions to blocks no animation touched this
    /// pass. Morph data needs it in both modes; pose data only in software,
    /// where the scratch positions would otherwise keep stale offsets.
    fn restore_buffers_for_unused_animation(
        &mut self,
        mesh: &Mesh,
        animated: &[(u16, VertexAnimationType)],
        hardware: bool,
    ) -> Result<()> {
        for &(handle, ty) in animated {
            let scratch = &mut self.scratch[usize::from(handle)];
            if scratch.used || (hardware && ty != VertexAnimationType::Morph) {
                continue;
            }
            let original = mesh.vertex_data_by_track_handle(handle)?;
            let positions = original.position_buffer()?.clone();
            let software = scratch.software.get_or_insert_with(|| original.clone());
            let source = software.position_source()?;
            software.set_binding(source, positions);
        }
        Ok(())
    }
}

impl VertexAnimationTarget for Entity {
    fn animation_buffers(&mut self, handle: u16) -> Result<VertexAnimationBuffers<'_>> {
        let original = self.mesh.vertex_data_by_track_handle(handle)?;
        let scratch = self
            .scratch
            .get_mut(usize::from(handle))
            .ok_or_else(|| TesseraError::out_of_bounds(format!("vertex data of entity '{}'", self.name), usize::from(handle)))?;

        let first_touch = !scratch.used;
        scratch.used = true;

        let AnimationScratch {
            software, hardware, ..
        } = scratch;
        let software = if self.software_pass {
            Some(software.get_or_insert_with(|| original.clone_for_animation()))
        } else {
            None
        };
        let hardware = if self.hardware_pass {
            Some(hardware.get_or_insert_with(|| original.clone()))
        } else {
            None
        };

        Ok(VertexAnimationBuffers {
            original,
            software,
            hardware,
            first_touch,
            poses: self.mesh.poses(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tessera_animation::VertexBuffer;

    fn morph_mesh() -> Arc<Mesh> {
        let mut mesh = Mesh::new("blob");
        mesh.set_shared_vertex_data(Some(VertexData::with_positions(&[Vec3::ZERO, Vec3::X])));
        let track = mesh
            .create_animation("wobble", 1.0)
            .unwrap()
            .create_vertex_track(0, VertexAnimationType::Morph)
            .unwrap();
        track
            .create_vertex_morph_key_frame(0.0, VertexBuffer::from_positions(&[Vec3::ZERO, Vec3::X]))
            .unwrap();
        track
            .create_vertex_morph_key_frame(1.0, VertexBuffer::from_positions(&[Vec3::Y, Vec3::ONE]))
            .unwrap();
        Arc::new(mesh)
    }

    #[test]
    fn update_is_skipped_until_state_changes() {
        let mut entity = Entity::new("e", morph_mesh()).unwrap();
        entity.animation_state_mut("wobble").unwrap().set_enabled(true);

        assert!(entity.update_animation(false).unwrap());
        assert!(!entity.update_animation(false).unwrap());

        entity.animation_state_mut("wobble").unwrap().set_time_position(0.5);
        assert!(entity.update_animation(false).unwrap());

        let positions = entity.software_vertex_data(0).unwrap().position_buffer().unwrap();
        assert!((positions.position(0).unwrap() - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn disabled_morph_restores_original_positions() {
        let mesh = morph_mesh();
        let mut entity = Entity::new("e", Arc::clone(&mesh)).unwrap();
        {
            let mut state = entity.animation_state_mut("wobble").unwrap();
            state.set_enabled(true);
            state.set_time_position(0.5);
        }
        entity.update_animation(false).unwrap();

        entity.animation_state_mut("wobble").unwrap().set_enabled(false);
        entity.update_animation(false).unwrap();

        let restored = entity.software_vertex_data(0).unwrap().position_buffer().unwrap();
        let original = mesh.shared_vertex_data().unwrap().position_buffer().unwrap();
        assert!(restored.ptr_eq(original));
    }
}
