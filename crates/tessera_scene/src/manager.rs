//! Scene Manager
//!
//! Owns the scene-level storage animations write into: the node hierarchy,
//! numeric animables, standalone vertex data and entities. It also owns the
//! named scene animations with their [`AnimationStateSet`] and drives them
//! once per frame:
//!
//! 1. [`SceneManager::apply_scene_animations`] resets every node and animable
//!    an enabled animation touches, then applies the enabled states in
//!    enable order.
//! 2. The transform system propagates world matrices.
//! 3. Each visible entity updates its own vertex and skeletal animation.
//!
//! Shadow casters are prepared separately by
//! [`SceneManager::prepare_shadow_casters`], which forces software vertex
//! animation where stencil shadows need CPU-side positions.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use slotmap::{SlotMap, new_key_type};
use tessera_animation::{
    AnimableValue, Animation, AnimationSettings, AnimationState, AnimationStateMut, AnimationStateSet,
    AnimationTargets, NodeTarget, Pose, VertexAnimationType, VertexBuffer, VertexData,
};
use tessera_core::{AnimableHandle, NodeHandle, Result, TesseraError, VertexDataHandle};

use crate::animable::NumericAnimable;
use crate::entity::Entity;
use crate::mesh::Mesh;
use crate::node::Node;
use crate::transform_system;

new_key_type! {
    /// Handle of an entity owned by a [`SceneManager`].
    pub struct EntityKey;
}

/// Standalone vertex data with the poses scene pose tracks index into.
struct SceneVertexData {
    data: VertexData,
    /// Positions pose blending starts from each frame.
    base_positions: Option<VertexBuffer>,
    poses: Vec<Pose>,
}

impl SceneVertexData {
    /// Drops last frame's pose offsets and hardware parametrics.
    fn reset_pose_animation(&mut self) -> Result<()> {
        if let Some(base) = &self.base_positions {
            let source = self.data.position_source()?;
            self.data.set_binding(source, base.clone());
        }
        let slots = self.data.hardware_animation_data().len();
        if slots > 0 {
            self.data.reset_hardware_animation(slots);
        }
        Ok(())
    }
}

/// Split borrow of the arenas scene animation tracks resolve into.
struct SceneTargets<'a> {
    nodes: &'a mut SlotMap<NodeHandle, Node>,
    animables: &'a mut SlotMap<AnimableHandle, NumericAnimable>,
    vertex_data: &'a mut SlotMap<VertexDataHandle, SceneVertexData>,
}

impl AnimationTargets for SceneTargets<'_> {
    fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut dyn NodeTarget> {
        self.nodes.get_mut(handle).map(|node| node as &mut dyn NodeTarget)
    }

    fn animable_mut(&mut self, handle: AnimableHandle) -> Option<&mut dyn AnimableValue> {
        self.animables
            .get_mut(handle)
            .map(|animable| animable as &mut dyn AnimableValue)
    }

    fn vertex_data_mut(&mut self, handle: VertexDataHandle) -> Option<&mut VertexData> {
        self.vertex_data.get_mut(handle).map(|entry| &mut entry.data)
    }

    fn vertex_animation_mut(&mut self, handle: VertexDataHandle) -> Option<(&mut VertexData, &[Pose])> {
        self.vertex_data
            .get_mut(handle)
            .map(|entry| (&mut entry.data, entry.poses.as_slice()))
    }
}

/// Scene storage plus the per-frame animation driver.
pub struct SceneManager {
    // === Scene graph ===
    nodes: SlotMap<NodeHandle, Node>,
    root_nodes: Vec<NodeHandle>,

    // === Animation targets ===
    animables: SlotMap<AnimableHandle, NumericAnimable>,
    vertex_data: SlotMap<VertexDataHandle, SceneVertexData>,
    entities: SlotMap<EntityKey, Entity>,

    // === Scene animations ===
    animations: BTreeMap<String, Animation>,
    animation_states: AnimationStateSet,
    settings: AnimationSettings,

    stencil_shadows: bool,
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(AnimationSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: AnimationSettings) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
            animables: SlotMap::with_key(),
            vertex_data: SlotMap::with_key(),
            entities: SlotMap::with_key(),
            animations: BTreeMap::new(),
            animation_states: AnimationStateSet::new(),
            settings,
            stencil_shadows: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    // ========================================================================
    // Node management
    // ========================================================================

    /// Adds a node at the root of the hierarchy.
    pub fn create_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Adds a node as a child of `parent`.
    pub fn create_child_node(&mut self, node: Node, parent: NodeHandle) -> Result<NodeHandle> {
        if !self.nodes.contains_key(parent) {
            return Err(TesseraError::not_found("parent node"));
        }
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        self.attach(handle, parent)?;
        Ok(handle)
    }

    /// Re-parents `child` under `parent`.
    ///
    /// The child leaves its previous parent (or the root list). Fails with
    /// `InvalidParams` when the attachment would create a cycle.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) -> Result<()> {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return Err(TesseraError::InvalidParams("a node cannot be its own parent".into()));
        }
        if !self.nodes.contains_key(child) {
            return Err(TesseraError::not_found("child node"));
        }
        if !self.nodes.contains_key(parent) {
            log::error!("Attach failed: parent node not found");
            return Err(TesseraError::not_found("parent node"));
        }

        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(TesseraError::InvalidParams(
                    "attaching a node below its own descendant".into(),
                ));
            }
            ancestor = self.nodes.get(current).and_then(Node::parent);
        }

        // Detach from the old parent, or from the root list
        let old_parent = self.nodes.get(child).and_then(Node::parent);
        if let Some(old) = old_parent {
            if let Some(node) = self.nodes.get_mut(old) {
                node.children.retain(|&c| c != child);
            }
        } else {
            self.root_nodes.retain(|&r| r != child);
        }

        if let Some(node) = self.nodes.get_mut(parent) {
            node.push_child(child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.set_parent(Some(parent));
            node.transform.mark_dirty();
        }
        Ok(())
    }

    /// Removes a node and its whole subtree.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        if let Some(parent) = node.parent() {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|&c| c != handle);
            }
        } else {
            self.root_nodes.retain(|&r| r != handle);
        }

        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(removed) = self.nodes.remove(current) {
                stack.extend(removed.children);
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn root_nodes(&self) -> &[NodeHandle] {
        &self.root_nodes
    }

    // ========================================================================
    // Animables, vertex data and entities
    // ========================================================================

    pub fn create_animable(&mut self, animable: NumericAnimable) -> AnimableHandle {
        self.animables.insert(animable)
    }

    #[must_use]
    pub fn animable(&self, handle: AnimableHandle) -> Option<&NumericAnimable> {
        self.animables.get(handle)
    }

    pub fn animable_mut(&mut self, handle: AnimableHandle) -> Option<&mut NumericAnimable> {
        self.animables.get_mut(handle)
    }

    /// Adds standalone vertex data. Its current positions become the base
    /// scene pose animation blends offsets onto.
    pub fn create_vertex_data(&mut self, data: VertexData) -> VertexDataHandle {
        let base_positions = data.position_buffer().ok().cloned();
        self.vertex_data.insert(SceneVertexData {
            data,
            base_positions,
            poses: Vec::new(),
        })
    }

    #[must_use]
    pub fn vertex_data(&self, handle: VertexDataHandle) -> Option<&VertexData> {
        self.vertex_data.get(handle).map(|entry| &entry.data)
    }

    pub fn vertex_data_mut(&mut self, handle: VertexDataHandle) -> Option<&mut VertexData> {
        self.vertex_data.get_mut(handle).map(|entry| &mut entry.data)
    }

    /// Records the current positions of `handle` as its pose animation base.
    pub fn set_vertex_data_base_positions(&mut self, handle: VertexDataHandle) -> Result<()> {
        let entry = self
            .vertex_data
            .get_mut(handle)
            .ok_or_else(|| TesseraError::not_found("vertex data"))?;
        entry.base_positions = Some(entry.data.position_buffer()?.clone());
        Ok(())
    }

    /// Adds a pose for the standalone vertex data `handle`. Pose keyframes
    /// of tracks bound to it refer to poses by creation order.
    pub fn create_vertex_pose(&mut self, handle: VertexDataHandle, name: impl Into<String>) -> Result<&mut Pose> {
        let entry = self
            .vertex_data
            .get_mut(handle)
            .ok_or_else(|| TesseraError::not_found("vertex data"))?;
        entry.poses.push(Pose::new(0, name));
        let index = entry.poses.len() - 1;
        Ok(&mut entry.poses[index])
    }

    #[must_use]
    pub fn vertex_poses(&self, handle: VertexDataHandle) -> &[Pose] {
        self.vertex_data
            .get(handle)
            .map(|entry| entry.poses.as_slice())
            .unwrap_or_default()
    }

    /// Creates an entity instancing `mesh`.
    pub fn create_entity(&mut self, name: impl Into<String>, mesh: Arc<Mesh>) -> Result<EntityKey> {
        let entity = Entity::new(name, mesh)?;
        Ok(self.entities.insert(entity))
    }

    #[must_use]
    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    pub fn entity_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(key)
    }

    /// Removes an entity. Entities sharing its skeleton instance go back to
    /// their own.
    pub fn destroy_entity(&mut self, key: EntityKey) -> Option<Entity> {
        let entity = self.entities.remove(key)?;
        for sharer in self.entities.values_mut() {
            if sharer.shared_skeleton_source() == Some(key)
                && let Err(error) = sharer.stop_sharing_skeleton_instance()
            {
                log::warn!("Entity '{}' lost its shared skeleton: {error}", sharer.name());
            }
        }
        Some(entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entities.iter()
    }

    /// Makes `entity` share the skeleton instance of `source`, so that it
    /// follows the source's skeletal animation and animation states.
    ///
    /// Sharing with an entity that itself shares joins that entity's
    /// source. Both entities need instances of the same skeleton, and
    /// `entity` must neither share already nor be shared by others.
    pub fn share_skeleton_instance_with(&mut self, entity: EntityKey, source: EntityKey) -> Result<()> {
        let source_entity = self
            .entities
            .get(source)
            .ok_or_else(|| TesseraError::not_found("entity"))?;
        let root = source_entity.shared_skeleton_source().unwrap_or(source);
        let root_entity = self
            .entities
            .get(root)
            .ok_or_else(|| TesseraError::not_found("entity"))?;
        let target = self
            .entities
            .get(entity)
            .ok_or_else(|| TesseraError::not_found("entity"))?;

        if root == entity {
            return Err(TesseraError::invalid(format!(
                "entity '{}' cannot share its own skeleton instance",
                target.name()
            )));
        }
        if target.shares_skeleton_instance() {
            return Err(TesseraError::invalid(format!(
                "entity '{}' already shares a skeleton instance",
                target.name()
            )));
        }
        if self.entities.values().any(|e| e.shared_skeleton_source() == Some(entity)) {
            return Err(TesseraError::invalid(format!(
                "skeleton instance of entity '{}' is shared by other entities",
                target.name()
            )));
        }
        match (target.skeleton(), root_entity.skeleton()) {
            (Some(own), Some(shared)) if own.shares_definition_with(shared) => {}
            _ => {
                return Err(TesseraError::invalid(format!(
                    "entities '{}' and '{}' do not use the same skeleton",
                    target.name(),
                    root_entity.name()
                )));
            }
        }

        log::debug!("Entity '{}' shares the skeleton instance of '{}'", target.name(), root_entity.name());
        if let Some(target) = self.entities.get_mut(entity) {
            target.start_sharing_skeleton_instance(root);
        }
        Ok(())
    }

    /// Gives `entity` its own skeleton instance again, in bind pose and
    /// with all states disabled. A no-op for entities that do not share.
    pub fn stop_sharing_skeleton_instance(&mut self, entity: EntityKey) -> Result<()> {
        let target = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| TesseraError::not_found("entity"))?;
        if target.shares_skeleton_instance() {
            target.stop_sharing_skeleton_instance()?;
        }
        Ok(())
    }

    /// Entities sharing the skeleton instance of `source`.
    pub fn skeleton_instance_sharers(&self, source: EntityKey) -> impl Iterator<Item = EntityKey> + '_ {
        self.entities
            .iter()
            .filter(move |(_, e)| e.shared_skeleton_source() == Some(source))
            .map(|(key, _)| key)
    }

    /// Updates `key`, mirroring its shared skeleton source first.
    fn update_entity_animation(&mut self, key: EntityKey, stencil: bool) -> Result<()> {
        let source = self.entities.get(key).and_then(Entity::shared_skeleton_source);
        match source {
            Some(source) => {
                if let Some([entity, source]) = self.entities.get_disjoint_mut([key, source]) {
                    entity.mirror_skeleton_instance(source);
                    entity.update_animation(stencil)?;
                }
            }
            None => {
                if let Some(entity) = self.entities.get_mut(key) {
                    entity.update_animation(stencil)?;
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Scene animations
    // ========================================================================

    /// Creates a scene animation using the manager's settings.
    ///
    /// Fails with `DuplicateItem` if the name is taken.
    pub fn create_animation(&mut self, name: impl Into<String>, length: f32) -> Result<&mut Animation> {
        let name = name.into();
        if self.animations.contains_key(&name) {
            return Err(TesseraError::DuplicateItem(format!("animation '{name}'")));
        }
        let animation = self.settings.create_animation(name.clone(), length);
        Ok(self.animations.entry(name).or_insert(animation))
    }

    pub fn animation(&self, name: &str) -> Result<&Animation> {
        self.animations
            .get(name)
            .ok_or_else(|| TesseraError::not_found(format!("animation '{name}'")))
    }

    pub fn animation_mut(&mut self, name: &str) -> Result<&mut Animation> {
        self.animations
            .get_mut(name)
            .ok_or_else(|| TesseraError::not_found(format!("animation '{name}'")))
    }

    #[must_use]
    pub fn has_animation(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    pub fn animations(&self) -> impl Iterator<Item = &Animation> {
        self.animations.values()
    }

    /// Destroys an animation and the state playing it.
    pub fn destroy_animation(&mut self, name: &str) -> Result<()> {
        if self.animations.remove(name).is_none() {
            return Err(TesseraError::not_found(format!("animation '{name}'")));
        }
        if self.animation_states.has_animation_state(name) {
            log::debug!("Removing animation state of destroyed animation '{name}'");
            self.animation_states.remove_animation_state(name);
        }
        Ok(())
    }

    pub fn destroy_all_animations(&mut self) {
        self.animation_states.remove_all_animation_states();
        self.animations.clear();
    }

    /// Creates a disabled state with weight 1 for an existing animation.
    pub fn create_animation_state(&mut self, name: &str) -> Result<AnimationStateMut<'_>> {
        let length = self.animation(name)?.length();
        self.animation_states
            .create_animation_state(name, 0.0, length, 1.0, false)
    }

    pub fn animation_state(&self, name: &str) -> Result<&AnimationState> {
        self.animation_states.animation_state(name)
    }

    pub fn animation_state_mut(&mut self, name: &str) -> Result<AnimationStateMut<'_>> {
        self.animation_states.animation_state_mut(name)
    }

    #[must_use]
    pub fn has_animation_state(&self, name: &str) -> bool {
        self.animation_states.has_animation_state(name)
    }

    pub fn destroy_animation_state(&mut self, name: &str) {
        self.animation_states.remove_animation_state(name);
    }

    pub fn destroy_all_animation_states(&mut self) {
        self.animation_states.remove_all_animation_states();
    }

    #[inline]
    #[must_use]
    pub fn animation_states(&self) -> &AnimationStateSet {
        &self.animation_states
    }

    /// Applies every enabled scene animation.
    ///
    /// All nodes and animables any enabled animation targets are reset
    /// first, each exactly once, so several states blending onto the same
    /// target accumulate instead of overwriting each other. States whose
    /// animation no longer exists are skipped.
    pub fn apply_scene_animations(&mut self) -> Result<()> {
        if !self.animation_states.has_enabled_animation_state() {
            return Ok(());
        }

        let mut reset_nodes: FxHashSet<NodeHandle> = FxHashSet::default();
        let mut reset_animables: FxHashSet<AnimableHandle> = FxHashSet::default();
        let mut reset_vertex_data: FxHashSet<VertexDataHandle> = FxHashSet::default();

        for state in self.animation_states.enabled_animation_states() {
            let Some(animation) = self.animations.get(state.animation_name()) else {
                continue;
            };
            for target in animation.node_tracks().filter_map(|track| track.target()) {
                if reset_nodes.insert(target)
                    && let Some(node) = self.nodes.get_mut(target)
                {
                    node.reset_to_initial_state();
                }
            }
            for target in animation.numeric_tracks().filter_map(|track| track.target()) {
                if reset_animables.insert(target)
                    && let Some(animable) = self.animables.get_mut(target)
                {
                    animable.reset_to_base_value();
                }
            }
            // Morph overwrites every position; pose offsets add up
            let pose_targets = animation
                .vertex_tracks()
                .filter(|track| track.animation_type() == VertexAnimationType::Pose)
                .filter_map(|track| track.target());
            for target in pose_targets {
                if reset_vertex_data.insert(target)
                    && let Some(entry) = self.vertex_data.get_mut(target)
                {
                    entry.reset_pose_animation()?;
                }
            }
        }

        let mut targets = SceneTargets {
            nodes: &mut self.nodes,
            animables: &mut self.animables,
            vertex_data: &mut self.vertex_data,
        };
        for state in self.animation_states.enabled_animation_states() {
            let Some(animation) = self.animations.get(state.animation_name()) else {
                log::debug!("Skipping state '{}': animation missing", state.animation_name());
                continue;
            };
            animation.apply(&mut targets, state.time_position(), state.weight(), false, 1.0)?;
        }
        Ok(())
    }

    // ========================================================================
    // Frame update
    // ========================================================================

    /// Runs one frame: scene animations, world matrices, entity animation.
    pub fn update_scene_graph(&mut self) -> Result<()> {
        self.apply_scene_animations()?;
        transform_system::update_hierarchy(&mut self.nodes, &self.root_nodes);

        // Shared instances are posed before the entities mirroring them
        let visible_sources: FxHashSet<EntityKey> = self
            .entities
            .values()
            .filter(|e| e.visible)
            .filter_map(Entity::shared_skeleton_source)
            .collect();
        let mut keys: Vec<EntityKey> = self
            .entities
            .iter()
            .filter(|(key, e)| e.visible || visible_sources.contains(key))
            .map(|(key, _)| key)
            .collect();
        keys.sort_by_key(|&key| self.entities.get(key).is_some_and(Entity::shares_skeleton_instance));

        let stencil = self.stencil_shadows;
        for key in keys {
            self.update_entity_animation(key, stencil)?;
        }
        Ok(())
    }

    #[inline]
    pub fn set_stencil_shadows(&mut self, enabled: bool) {
        self.stencil_shadows = enabled;
    }

    #[inline]
    #[must_use]
    pub fn stencil_shadows(&self) -> bool {
        self.stencil_shadows
    }

    /// Brings every shadow casting entity's animation up to date and
    /// returns their keys.
    ///
    /// With stencil shadows enabled this forces software vertex animation
    /// on the casters, since shadow volumes are built from CPU positions.
    pub fn prepare_shadow_casters(&mut self) -> Result<Vec<EntityKey>> {
        let stencil = self.stencil_shadows;
        let mut casters: Vec<EntityKey> = self
            .entities
            .iter()
            .filter(|(_, e)| e.cast_shadows())
            .map(|(key, _)| key)
            .collect();
        // Owners first so sharers mirror this frame's pose
        casters.sort_by_key(|&key| self.entities.get(key).is_some_and(Entity::shares_skeleton_instance));
        for &key in &casters {
            self.update_entity_animation(key, stencil)?;
        }
        Ok(casters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tessera_animation::AnyNumeric;

    fn slide(manager: &mut SceneManager, name: &str, node: NodeHandle, distance: f32) {
        let animation = manager.create_animation(name, 1.0).unwrap();
        let track = animation.create_node_track_for(0, node).unwrap();
        track.create_node_key_frame(0.0);
        track
            .create_node_key_frame(1.0)
            .set_translate(Vec3::new(distance, 0.0, 0.0));
    }

    #[test]
    fn duplicate_animation_is_rejected() {
        let mut manager = SceneManager::new();
        manager.create_animation("spin", 1.0).unwrap();
        assert!(matches!(
            manager.create_animation("spin", 2.0),
            Err(TesseraError::DuplicateItem(_))
        ));
    }

    #[test]
    fn state_requires_animation() {
        let mut manager = SceneManager::new();
        assert!(manager.create_animation_state("missing").is_err());

        manager.create_animation("spin", 3.0).unwrap();
        let state = manager.create_animation_state("spin").unwrap();
        assert!(!state.enabled());
        assert_eq!(state.length(), 3.0);
    }

    #[test]
    fn destroying_animation_removes_its_state() {
        let mut manager = SceneManager::new();
        manager.create_animation("spin", 1.0).unwrap();
        manager.create_animation_state("spin").unwrap();

        manager.destroy_animation("spin").unwrap();
        assert!(!manager.has_animation_state("spin"));
        assert!(manager.destroy_animation("spin").is_err());
    }

    #[test]
    fn scene_animation_is_not_cumulative_across_frames() {
        let mut manager = SceneManager::new();
        let node = manager.create_node(Node::new());
        slide(&mut manager, "slide", node, 4.0);
        {
            let mut state = manager.create_animation_state("slide").unwrap();
            state.set_enabled(true);
            state.set_time_position(0.5);
        }

        manager.update_scene_graph().unwrap();
        manager.update_scene_graph().unwrap();

        let position = manager.node(node).unwrap().transform.position;
        assert!((position.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn two_states_on_one_node_blend() {
        let mut manager = SceneManager::new();
        let node = manager.create_node(Node::new());
        slide(&mut manager, "left", node, -2.0);
        slide(&mut manager, "right", node, 6.0);
        for name in ["left", "right"] {
            let mut state = manager.create_animation_state(name).unwrap();
            state.set_time_position(0.5);
            state.set_weight(0.5);
            state.set_enabled(true);
        }

        manager.apply_scene_animations().unwrap();

        // Equal weights average -1 and 3
        let position = manager.node(node).unwrap().transform.position;
        assert!((position.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn numeric_animables_reset_each_frame() {
        let mut manager = SceneManager::new();
        let light = manager.create_animable(NumericAnimable::new("intensity", 1.0_f32));
        {
            let animation = manager.create_animation("flicker", 1.0).unwrap();
            let track = animation.create_numeric_track_for(0, light).unwrap();
            track.create_numeric_key_frame(0.0, 0.0_f32).unwrap();
            track.create_numeric_key_frame(1.0, 2.0_f32).unwrap();
        }
        {
            let mut state = manager.create_animation_state("flicker").unwrap();
            state.set_time_position(0.5);
            state.set_enabled(true);
        }

        manager.apply_scene_animations().unwrap();
        manager.apply_scene_animations().unwrap();

        assert_eq!(manager.animable(light).unwrap().value(), AnyNumeric::Real(2.0));
    }

    #[test]
    fn attach_rejects_cycles() {
        let mut manager = SceneManager::new();
        let parent = manager.create_node(Node::new());
        let child = manager.create_child_node(Node::new(), parent).unwrap();

        assert!(manager.attach(parent, child).is_err());
        assert_eq!(manager.root_nodes(), &[parent]);
        assert_eq!(manager.node(parent).unwrap().children(), &[child]);
    }

    #[test]
    fn remove_node_drops_subtree() {
        let mut manager = SceneManager::new();
        let parent = manager.create_node(Node::new());
        let child = manager.create_child_node(Node::new(), parent).unwrap();

        manager.remove_node(parent);
        assert!(manager.node(child).is_none());
        assert!(manager.root_nodes().is_empty());
    }
}
