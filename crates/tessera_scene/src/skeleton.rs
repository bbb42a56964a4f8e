//! Skeletons and bones.
//!
//! A [`Skeleton`] owns a flat list of [`Bone`]s indexed by handle and the
//! skeletal animations that drive them. Node tracks of those animations
//! address bones by the same handle.
//!
//! Animations are held behind an `Arc`, so cloning a skeleton to give an
//! entity its own pose shares them until one side edits its animations.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Affine3A, Quat, Vec3};
use rustc_hash::FxHashMap;
use tessera_animation::{
    Animation, AnimationSettings, AnimationStateSet, BoneResolver, NodeTarget, SkeletonAnimationBlendMode,
};
use tessera_core::{Result, TesseraError};

use crate::transform::Transform;

/// Upper bound on bones per skeleton.
pub const MAX_NUM_BONES: usize = 256;

/// One joint of a skeleton.
#[derive(Debug, Clone)]
pub struct Bone {
    handle: u16,
    name: String,
    parent: Option<u16>,
    children: Vec<u16>,

    pub transform: Transform,

    manually_controlled: bool,
    /// Inverse of the world transform at binding time.
    bind_derived_inverse: Affine3A,
}

impl Bone {
    fn new(handle: u16, name: String) -> Self {
        Self {
            handle,
            name,
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            manually_controlled: false,
            bind_derived_inverse: Affine3A::IDENTITY,
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> u16 {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<u16> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[u16] {
        &self.children
    }

    /// Manually controlled bones are skipped by [`Skeleton::reset`] unless
    /// asked otherwise, so user edits survive animation.
    #[inline]
    #[must_use]
    pub fn is_manually_controlled(&self) -> bool {
        self.manually_controlled
    }

    pub fn set_manually_controlled(&mut self, manual: bool) {
        self.manually_controlled = manual;
    }

    /// Transform from binding pose space to the current pose, in skeleton space.
    #[must_use]
    pub fn offset_transform(&self) -> Affine3A {
        self.transform.world_matrix * self.bind_derived_inverse
    }
}

impl NodeTarget for Bone {
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

/// Resolves node track handles to bones of a bone list.
struct BoneTargets<'a> {
    bones: &'a mut [Bone],
}

impl BoneResolver for BoneTargets<'_> {
    fn bone_mut(&mut self, handle: u16) -> Result<&mut dyn NodeTarget> {
        bone_at(self.bones, handle).map(|bone| bone as &mut dyn NodeTarget)
    }
}

fn bone_at(bones: &mut [Bone], handle: u16) -> Result<&mut Bone> {
    bones
        .get_mut(usize::from(handle))
        .ok_or_else(|| TesseraError::not_found(format!("bone {handle}")))
}

/// A bone hierarchy plus the skeletal animations defined on it.
#[derive(Debug, Clone)]
pub struct Skeleton {
    name: String,
    bones: Vec<Bone>,
    bones_by_name: FxHashMap<String, u16>,
    animations: Arc<BTreeMap<String, Animation>>,
    settings: AnimationSettings,
    blend_mode: SkeletonAnimationBlendMode,
    manual_bones_dirty: bool,
}

impl Skeleton {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, AnimationSettings::default())
    }

    /// Skeleton whose animations and blend mode follow `settings`.
    #[must_use]
    pub fn with_settings(name: impl Into<String>, settings: AnimationSettings) -> Self {
        Self {
            name: name.into(),
            bones: Vec::new(),
            bones_by_name: FxHashMap::default(),
            animations: Arc::new(BTreeMap::new()),
            blend_mode: settings.skeleton_blend_mode,
            settings,
            manual_bones_dirty: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` when both are instances of the same skeleton definition.
    #[must_use]
    pub fn shares_definition_with(&self, other: &Skeleton) -> bool {
        self.name == other.name && self.bones.len() == other.bones.len() && Arc::ptr_eq(&self.animations, &other.animations)
    }

    #[inline]
    #[must_use]
    pub fn blend_mode(&self) -> SkeletonAnimationBlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, mode: SkeletonAnimationBlendMode) {
        self.blend_mode = mode;
    }

    // ========================================================================
    // Bones
    // ========================================================================

    /// Creates a root bone with the next free handle.
    pub fn create_bone(&mut self, name: impl Into<String>) -> Result<u16> {
        let name = name.into();
        if self.bones.len() >= MAX_NUM_BONES {
            return Err(TesseraError::invalid(format!(
                "skeleton '{}' exceeds {MAX_NUM_BONES} bones",
                self.name
            )));
        }
        if self.bones_by_name.contains_key(&name) {
            return Err(TesseraError::DuplicateItem(format!("bone '{name}'")));
        }

        let handle = self.bones.len() as u16;
        self.bones_by_name.insert(name.clone(), handle);
        self.bones.push(Bone::new(handle, name));
        Ok(handle)
    }

    pub fn bone(&self, handle: u16) -> Result<&Bone> {
        self.bones
            .get(usize::from(handle))
            .ok_or_else(|| TesseraError::not_found(format!("bone {handle}")))
    }

    pub fn bone_mut(&mut self, handle: u16) -> Result<&mut Bone> {
        bone_at(&mut self.bones, handle)
    }

    pub fn bone_by_name(&self, name: &str) -> Result<&Bone> {
        let handle = self
            .bones_by_name
            .get(name)
            .copied()
            .ok_or_else(|| TesseraError::not_found(format!("bone '{name}'")))?;
        self.bone(handle)
    }

    #[must_use]
    pub fn has_bone(&self, name: &str) -> bool {
        self.bones_by_name.contains_key(name)
    }

    #[must_use]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    /// Bones in handle order.
    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter()
    }

    pub fn root_bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(|b| b.parent.is_none())
    }

    /// Makes `child` a child of `parent`, detaching it from its old parent.
    ///
    /// Fails with `InvalidParams` when the link would create a cycle.
    pub fn set_parent(&mut self, child: u16, parent: u16) -> Result<()> {
        self.bone(child)?;
        self.bone(parent)?;

        // Walk up from the new parent; reaching the child means a cycle
        let mut cursor = Some(parent);
        while let Some(handle) = cursor {
            if handle == child {
                return Err(TesseraError::invalid(format!(
                    "bone {child} cannot be parented to its own descendant {parent}"
                )));
            }
            cursor = self.bones[usize::from(handle)].parent;
        }

        if let Some(old) = self.bones[usize::from(child)].parent {
            self.bones[usize::from(old)].children.retain(|&c| c != child);
        }
        self.bones[usize::from(parent)].children.push(child);

        let bone = &mut self.bones[usize::from(child)];
        bone.parent = Some(parent);
        bone.transform.mark_dirty();
        Ok(())
    }

    // ========================================================================
    // Pose
    // ========================================================================

    /// Recomputes every bone's world matrix from the bone hierarchy.
    pub fn update_transforms(&mut self) {
        let mut stack: Vec<(u16, Affine3A)> = self
            .bones
            .iter()
            .rev()
            .filter(|b| b.parent.is_none())
            .map(|b| (b.handle, Affine3A::IDENTITY))
            .collect();

        while let Some((handle, parent_world)) = stack.pop() {
            let bone = &mut self.bones[usize::from(handle)];
            bone.transform.update_local_matrix();
            let world = parent_world * *bone.transform.local_matrix();
            bone.transform.set_world_matrix(world);

            for &child in bone.children.iter().rev() {
                stack.push((child, world));
            }
        }
    }

    /// Takes the current pose as the binding pose: every bone's initial
    /// state, and the inverse world transforms bone matrices are relative to.
    pub fn set_binding_pose(&mut self) {
        self.update_transforms();
        for bone in &mut self.bones {
            bone.transform.set_initial_state();
            bone.bind_derived_inverse = bone.transform.world_matrix.inverse();
        }
    }

    /// Returns bones to their initial state. Manually controlled bones are
    /// left alone unless `reset_manual_bones` is set.
    pub fn reset(&mut self, reset_manual_bones: bool) {
        for bone in &mut self.bones {
            if !bone.manually_controlled || reset_manual_bones {
                bone.transform.reset_to_initial_state();
            }
        }
    }

    /// Per-bone offset matrices of the current pose, in handle order.
    ///
    /// Call [`update_transforms`](Self::update_transforms) first.
    #[must_use]
    pub fn bone_matrices(&self) -> Vec<Affine3A> {
        self.bones.iter().map(Bone::offset_transform).collect()
    }

    /// Flags that a manually controlled bone was moved, so animated
    /// entities refresh even without a state change.
    pub fn notify_manual_bones_dirty(&mut self) {
        self.manual_bones_dirty = true;
    }

    #[must_use]
    pub fn manual_bones_dirty(&self) -> bool {
        self.manual_bones_dirty
    }

    pub(crate) fn clear_manual_bones_dirty(&mut self) {
        self.manual_bones_dirty = false;
    }

    // ========================================================================
    // Animations
    // ========================================================================

    /// Creates an empty animation using this skeleton's settings.
    pub fn create_animation(&mut self, name: impl Into<String>, length: f32) -> Result<&mut Animation> {
        let name = name.into();
        if self.animations.contains_key(&name) {
            return Err(TesseraError::DuplicateItem(format!(
                "animation '{name}' in skeleton '{}'",
                self.name
            )));
        }
        let animation = self.settings.create_animation(name.clone(), length);
        Ok(Arc::make_mut(&mut self.animations).entry(name).or_insert(animation))
    }

    pub fn animation(&self, name: &str) -> Result<&Animation> {
        self.animations
            .get(name)
            .ok_or_else(|| TesseraError::not_found(format!("animation '{name}' in skeleton '{}'", self.name)))
    }

    pub fn animation_mut(&mut self, name: &str) -> Result<&mut Animation> {
        if !self.animations.contains_key(name) {
            return Err(TesseraError::not_found(format!(
                "animation '{name}' in skeleton '{}'",
                self.name
            )));
        }
        Arc::make_mut(&mut self.animations)
            .get_mut(name)
            .ok_or_else(|| TesseraError::not_found(format!("animation '{name}'")))
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
        if !self.animations.contains_key(name) {
            return Err(TesseraError::not_found(format!(
                "animation '{name}' in skeleton '{}'",
                self.name
            )));
        }
        Arc::make_mut(&mut self.animations).remove(name);
        Ok(())
    }

    /// Runs [`Animation::optimise`] on every animation.
    pub fn optimise_all_animations(&mut self) {
        for animation in Arc::make_mut(&mut self.animations).values_mut() {
            animation.optimise();
        }
    }

    // ========================================================================
    // Animation state
    // ========================================================================

    /// Replaces the contents of `set` with one disabled state per animation.
    pub fn init_animation_state(&self, set: &mut AnimationStateSet) -> Result<()> {
        set.remove_all_animation_states();
        for animation in self.animations.values() {
            set.create_animation_state(animation.name(), 0.0, animation.length(), 1.0, false)?;
        }
        Ok(())
    }

    /// Adds states for animations created since `set` was initialised.
    pub fn refresh_animation_state(&self, set: &mut AnimationStateSet) -> Result<()> {
        for animation in self.animations.values() {
            if !set.has_animation_state(animation.name()) {
                set.create_animation_state(animation.name(), 0.0, animation.length(), 1.0, false)?;
            }
        }
        Ok(())
    }

    /// Resets the bones, then applies every enabled state in enable order.
    ///
    /// States naming animations this skeleton does not have are skipped;
    /// they may belong to vertex animation on the same entity.
    pub fn set_animation_state(&mut self, set: &AnimationStateSet) -> Result<()> {
        self.reset(false);

        let accumulate = self.blend_mode == SkeletonAnimationBlendMode::Cumulative;
        let mut targets = BoneTargets { bones: &mut self.bones };
        for state in set.enabled_animation_states() {
            let Some(animation) = self.animations.get(state.animation_name()) else {
                log::debug!(
                    "Skeleton '{}' has no animation '{}', state skipped",
                    self.name,
                    state.animation_name()
                );
                continue;
            };
            animation.apply_to_skeleton(&mut targets, state.time_position(), state.weight(), accumulate, 1.0)?;
        }
        Ok(())
    }
}

impl BoneResolver for Skeleton {
    fn bone_mut(&mut self, handle: u16) -> Result<&mut dyn NodeTarget> {
        bone_at(&mut self.bones, handle).map(|bone| bone as &mut dyn NodeTarget)
    }
}
