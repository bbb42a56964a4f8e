//! Meshes: vertex data, poses, vertex animations and an optional skeleton.
//!
//! Vertex tracks of a mesh animation address vertex data by handle: 0 is
//! the shared vertex data, `n` the dedicated vertex data of sub-mesh
//! `n - 1`. Pose keyframes index into the mesh's pose list.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tessera_animation::{Animation, AnimationSettings, AnimationStateSet, Pose, VertexAnimationType, VertexData};
use tessera_core::{Result, TesseraError};

use crate::skeleton::Skeleton;

/// A part of a mesh, drawing either the mesh's shared vertices or its own.
#[derive(Debug, Clone, Default)]
pub struct SubMesh {
    pub vertex_data: Option<VertexData>,
    pub use_shared_vertices: bool,
}

impl SubMesh {
    /// Sub-mesh drawing the shared vertex data.
    #[must_use]
    pub fn shared() -> Self {
        Self {
            vertex_data: None,
            use_shared_vertices: true,
        }
    }

    /// Sub-mesh with dedicated vertex data.
    #[must_use]
    pub fn with_vertex_data(vertex_data: VertexData) -> Self {
        Self {
            vertex_data: Some(vertex_data),
            use_shared_vertices: false,
        }
    }
}

/// Vertex animation type of each vertex data block, derived from the tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AnimationTypes {
    shared: VertexAnimationType,
    sub_meshes: Vec<VertexAnimationType>,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    name: String,
    shared_vertex_data: Option<VertexData>,
    sub_meshes: Vec<SubMesh>,
    poses: Vec<Pose>,
    animations: BTreeMap<String, Animation>,
    skeleton: Option<Skeleton>,
    settings: AnimationSettings,
    animation_types: OnceLock<AnimationTypes>,
}

impl Mesh {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, AnimationSettings::default())
    }

    #[must_use]
    pub fn with_settings(name: impl Into<String>, settings: AnimationSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn shared_vertex_data(&self) -> Option<&VertexData> {
        self.shared_vertex_data.as_ref()
    }

    pub fn set_shared_vertex_data(&mut self, data: Option<VertexData>) {
        self.shared_vertex_data = data;
    }

    /// Appends a sub-mesh and returns its index.
    pub fn add_sub_mesh(&mut self, sub_mesh: SubMesh) -> usize {
        self.sub_meshes.push(sub_mesh);
        self.animation_types.take();
        self.sub_meshes.len() - 1
    }

    pub fn sub_mesh(&self, index: usize) -> Result<&SubMesh> {
        self.sub_meshes
            .get(index)
            .ok_or_else(|| TesseraError::out_of_bounds(format!("sub-mesh of mesh '{}'", self.name), index))
    }

    #[must_use]
    pub fn num_sub_meshes(&self) -> usize {
        self.sub_meshes.len()
    }

    pub fn sub_meshes(&self) -> impl Iterator<Item = &SubMesh> {
        self.sub_meshes.iter()
    }

    /// Vertex data a vertex track handle refers to.
    pub fn vertex_data_by_track_handle(&self, handle: u16) -> Result<&VertexData> {
        if handle == 0 {
            self.shared_vertex_data
                .as_ref()
                .ok_or_else(|| TesseraError::not_found(format!("shared vertex data of mesh '{}'", self.name)))
        } else {
            let sub_mesh = self.sub_mesh(usize::from(handle - 1))?;
            sub_mesh.vertex_data.as_ref().ok_or_else(|| {
                TesseraError::invalid(format!(
                    "sub-mesh {} of mesh '{}' has no dedicated vertex data",
                    handle - 1,
                    self.name
                ))
            })
        }
    }

    // ========================================================================
    // Skeleton
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.skeleton.as_ref()
    }

    pub fn skeleton_mut(&mut self) -> Option<&mut Skeleton> {
        self.skeleton.as_mut()
    }

    pub fn set_skeleton(&mut self, skeleton: Option<Skeleton>) {
        self.skeleton = skeleton;
    }

    #[must_use]
    pub fn has_skeleton(&self) -> bool {
        self.skeleton.is_some()
    }

    // ========================================================================
    // Poses
    // ========================================================================

    /// Appends a pose of vertex data `target` (0 = shared, `n` = sub-mesh
    /// `n - 1`). Its index is the current pose count.
    pub fn create_pose(&mut self, target: u16, name: impl Into<String>) -> &mut Pose {
        self.poses.push(Pose::new(target, name));
        let index = self.poses.len() - 1;
        &mut self.poses[index]
    }

    pub fn pose(&self, index: u16) -> Result<&Pose> {
        self.poses
            .get(usize::from(index))
            .ok_or_else(|| TesseraError::out_of_bounds(format!("pose of mesh '{}'", self.name), usize::from(index)))
    }

    pub fn pose_mut(&mut self, index: u16) -> Result<&mut Pose> {
        let name = &self.name;
        self.poses
            .get_mut(usize::from(index))
            .ok_or_else(|| TesseraError::out_of_bounds(format!("pose of mesh '{name}'"), usize::from(index)))
    }

    /// First pose called `name`.
    pub fn pose_by_name(&self, name: &str) -> Result<&Pose> {
        self.poses
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| TesseraError::not_found(format!("pose '{name}' in mesh '{}'", self.name)))
    }

    pub fn pose_by_name_mut(&mut self, name: &str) -> Result<&mut Pose> {
        let mesh = &self.name;
        self.poses
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| TesseraError::not_found(format!("pose '{name}' in mesh '{mesh}'")))
    }

    #[must_use]
    pub fn num_poses(&self) -> usize {
        self.poses.len()
    }

    #[inline]
    #[must_use]
    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    /// Removes the pose at `index`. Later poses move down one index, so
    /// pose keyframes referring to them must be updated by the caller.
    pub fn remove_pose(&mut self, index: u16) -> Result<()> {
        self.pose(index)?;
        self.poses.remove(usize::from(index));
        Ok(())
    }

    pub fn remove_pose_by_name(&mut self, name: &str) -> Result<()> {
        let index = self
            .poses
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| TesseraError::not_found(format!("pose '{name}' in mesh '{}'", self.name)))?;
        self.poses.remove(index);
        Ok(())
    }

    pub fn remove_all_poses(&mut self) {
        self.poses.clear();
    }

    // ========================================================================
    // Vertex animations
    // ========================================================================

    /// Creates an empty vertex animation using this mesh's settings.
    pub fn create_animation(&mut self, name: impl Into<String>, length: f32) -> Result<&mut Animation> {
        let name = name.into();
        if self.animations.contains_key(&name) {
            return Err(TesseraError::DuplicateItem(format!(
                "animation '{name}' in mesh '{}'",
                self.name
            )));
        }
        self.animation_types.take();
        let animation = self.settings.create_animation(name.clone(), length);
        Ok(self.animations.entry(name).or_insert(animation))
    }

    pub fn animation(&self, name: &str) -> Result<&Animation> {
        self.animations
            .get(name)
            .ok_or_else(|| TesseraError::not_found(format!("animation '{name}' in mesh '{}'", self.name)))
    }

    /// Mutable access to an animation. Animation types are re-derived on
    /// next query, since tracks may change.
    pub fn animation_mut(&mut self, name: &str) -> Result<&mut Animation> {
        self.animation_types.take();
        let mesh = &self.name;
        self.animations
            .get_mut(name)
            .ok_or_else(|| TesseraError::not_found(format!("animation '{name}' in mesh '{mesh}'")))
    }

    #[must_use]
    pub fn has_animation(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    #[must_use]
    pub fn num_animations(&self) -> usize {
        self.animations.len()
    }

    pub fn animations(&self) -> impl Iterator<Item = &Animation> {
        self.animations.values()
    }

    pub fn remove_animation(&mut self, name: &str) -> Result<()> {
        if self.animations.remove(name).is_none() {
            return Err(TesseraError::not_found(format!(
                "animation '{name}' in mesh '{}'",
                self.name
            )));
        }
        self.animation_types.take();
        Ok(())
    }

    pub fn remove_all_animations(&mut self) {
        self.animations.clear();
        self.animation_types.take();
    }

    /// `true` when the mesh has vertex animations of its own.
    #[must_use]
    pub fn has_vertex_animation(&self) -> bool {
        !self.animations.is_empty()
    }

    // ========================================================================
    // Animation types
    // ========================================================================

    /// Scans every vertex track to find how each vertex data block is
    /// animated.
    ///
    /// Fails with `InvalidParams` when morph and pose tracks target the same
    /// vertex data, and with `IndexOutOfBounds` when a track handle names a
    /// missing sub-mesh.
    fn determine_animation_types(&self) -> Result<AnimationTypes> {
        let mut types = AnimationTypes {
            shared: VertexAnimationType::None,
            sub_meshes: vec![VertexAnimationType::None; self.sub_meshes.len()],
        };

        for animation in self.animations.values() {
            for track in animation.vertex_tracks() {
                let handle = track.handle();
                let slot = if handle == 0 {
                    &mut types.shared
                } else {
                    let index = usize::from(handle - 1);
                    types.sub_meshes.get_mut(index).ok_or_else(|| {
                        TesseraError::out_of_bounds(format!("sub-mesh of mesh '{}'", self.name), index)
                    })?
                };

                if *slot != VertexAnimationType::None && *slot != track.animation_type() {
                    return Err(TesseraError::invalid(format!(
                        "vertex data {handle} of mesh '{}' mixes morph and pose animation",
                        self.name
                    )));
                }
                *slot = track.animation_type();
            }
        }
        Ok(types)
    }

    fn animation_types(&self) -> Result<&AnimationTypes> {
        if let Some(types) = self.animation_types.get() {
            return Ok(types);
        }
        let types = self.determine_animation_types()?;
        Ok(self.animation_types.get_or_init(|| types))
    }

    /// Re-derives the animation types, reporting mixing errors now rather
    /// than on first use.
    pub fn validate_animation_types(&mut self) -> Result<()> {
        self.animation_types.take();
        self.animation_types().map(|_| ())
    }

    pub fn shared_vertex_data_animation_type(&self) -> Result<VertexAnimationType> {
        Ok(self.animation_types()?.shared)
    }

    pub fn sub_mesh_vertex_animation_type(&self, index: usize) -> Result<VertexAnimationType> {
        self.animation_types()?
            .sub_meshes
            .get(index)
            .copied()
            .ok_or_else(|| TesseraError::out_of_bounds(format!("sub-mesh of mesh '{}'", self.name), index))
    }

    /// Animation type of the vertex data a track handle refers to.
    pub fn vertex_animation_type_by_track_handle(&self, handle: u16) -> Result<VertexAnimationType> {
        if handle == 0 {
            self.shared_vertex_data_animation_type()
        } else {
            self.sub_mesh_vertex_animation_type(usize::from(handle - 1))
        }
    }

    // ========================================================================
    // Animation state
    // ========================================================================

    /// Fills `set` with disabled states for the skeleton's animations (the
    /// set is cleared first when there is a skeleton) and the mesh's own.
    ///
    /// A vertex animation sharing its name with a skeletal one shares its
    /// state, so both play together.
    pub fn init_animation_state(&self, set: &mut AnimationStateSet) -> Result<()> {
        if let Some(skeleton) = &self.skeleton {
            skeleton.init_animation_state(set)?;
        }
        self.add_missing_states(set)
    }

    /// Adds states for animations created since `set` was initialised.
    pub fn refresh_animation_state(&self, set: &mut AnimationStateSet) -> Result<()> {
        if let Some(skeleton) = &self.skeleton {
            skeleton.refresh_animation_state(set)?;
        }
        self.add_missing_states(set)
    }

    fn add_missing_states(&self, set: &mut AnimationStateSet) -> Result<()> {
        for animation in self.animations.values() {
            if !set.has_animation_state(animation.name()) {
                set.create_animation_state(animation.name(), 0.0, animation.length(), 1.0, false)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tessera_animation::VertexBuffer;

    fn quad() -> VertexData {
        VertexData::with_positions(&[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE])
    }

    #[test]
    fn animation_types_follow_tracks() {
        let mut mesh = Mesh::new("face");
        mesh.set_shared_vertex_data(Some(quad()));
        mesh.add_sub_mesh(SubMesh::with_vertex_data(quad()));

        let anim = mesh.create_animation("smile", 1.0).unwrap();
        anim.create_vertex_track(0, VertexAnimationType::Pose).unwrap();
        anim.create_vertex_track(1, VertexAnimationType::Morph)
            .unwrap()
            .create_vertex_morph_key_frame(0.0, VertexBuffer::zeroed(4))
            .unwrap();

        assert_eq!(mesh.shared_vertex_data_animation_type().unwrap(), VertexAnimationType::Pose);
        assert_eq!(mesh.sub_mesh_vertex_animation_type(0).unwrap(), VertexAnimationType::Morph);
    }

    #[test]
    fn mixing_morph_and_pose_is_rejected() {
        let mut mesh = Mesh::new("face");
        mesh.set_shared_vertex_data(Some(quad()));
        mesh.create_animation("a", 1.0)
            .unwrap()
            .create_vertex_track(0, VertexAnimationType::Pose)
            .unwrap();
        mesh.create_animation("b", 1.0)
            .unwrap()
            .create_vertex_track(0, VertexAnimationType::Morph)
            .unwrap();

        assert!(matches!(
            mesh.shared_vertex_data_animation_type(),
            Err(TesseraError::InvalidParams(_))
        ));
        // Fixing the tracks clears the error
        mesh.remove_animation("b").unwrap();
        assert_eq!(mesh.shared_vertex_data_animation_type().unwrap(), VertexAnimationType::Pose);
    }

    #[test]
    fn pose_lookup_and_removal() {
        let mut mesh = Mesh::new("face");
        mesh.create_pose(0, "blink").add_vertex(0, Vec3::Y);
        mesh.create_pose(0, "frown");

        assert_eq!(mesh.pose_by_name("frown").unwrap().target(), 0);
        assert!(matches!(mesh.pose(2), Err(TesseraError::IndexOutOfBounds { .. })));

        mesh.remove_pose_by_name("blink").unwrap();
        assert_eq!(mesh.pose(0).unwrap().name(), "frown");
        assert!(matches!(mesh.remove_pose_by_name("blink"), Err(TesseraError::ItemNotFound(_))));
    }
}
