//! Scene Tests
//!
//! Tests for:
//! - Skeletal blending (average and cumulative) and bone matrices
//! - Manually controlled bones surviving animation
//! - Entities sharing one state between skeletal and vertex animation
//! - Entities sharing one skeleton instance
//! - Scene manager frame updates through the node hierarchy

use std::sync::Arc;

use glam::{Quat, Vec3};

use tessera::animation::{SkeletonAnimationBlendMode, VertexAnimationType, VertexBuffer, VertexData};
use tessera::core::TesseraError;
use tessera::scene::{Entity, Mesh, Node, SceneManager, Skeleton};

const EPSILON: f32 = 1e-4;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One root bone with a "left" and an "up" animation on it.
fn single_bone_skeleton() -> Skeleton {
    let mut skeleton = Skeleton::new("rig");
    let root = skeleton.create_bone("root").unwrap();
    skeleton.set_binding_pose();

    for (name, offset) in [("left", Vec3::new(-2.0, 0.0, 0.0)), ("up", Vec3::new(0.0, 2.0, 0.0))] {
        let track = skeleton
            .create_animation(name, 1.0)
            .unwrap()
            .create_node_track(root)
            .unwrap();
        track.create_node_key_frame(0.0).set_translate(offset);
    }
    skeleton
}

fn enable(entity: &mut Entity, name: &str) {
    entity.animation_state_mut(name).unwrap().set_enabled(true);
}

fn rigged_mesh(skeleton: Skeleton) -> Arc<Mesh> {
    let mut mesh = Mesh::new("body");
    mesh.set_skeleton(Some(skeleton));
    Arc::new(mesh)
}

// ============================================================================
// Skeletal blending
// ============================================================================

#[test]
fn average_blend_mode_averages_animations() {
    let mut entity = Entity::new("hero", rigged_mesh(single_bone_skeleton())).unwrap();
    enable(&mut entity, "left");
    enable(&mut entity, "up");
    entity.update_animation(false).unwrap();

    let root = entity.skeleton().unwrap().bone(0).unwrap();
    assert!(approx_vec3(root.transform.position, Vec3::new(-1.0, 1.0, 0.0)));
}

#[test]
fn cumulative_blend_mode_adds_animations() {
    let mut skeleton = single_bone_skeleton();
    skeleton.set_blend_mode(SkeletonAnimationBlendMode::Cumulative);
    let mut entity = Entity::new("hero", rigged_mesh(skeleton)).unwrap();
    enable(&mut entity, "left");
    enable(&mut entity, "up");
    entity.update_animation(false).unwrap();

    let root = entity.skeleton().unwrap().bone(0).unwrap();
    assert!(approx_vec3(root.transform.position, Vec3::new(-2.0, 2.0, 0.0)));
}

#[test]
fn bone_matrices_follow_the_pose() {
    let mut entity = Entity::new("hero", rigged_mesh(single_bone_skeleton())).unwrap();
    enable(&mut entity, "up");
    entity.update_animation(false).unwrap();

    let matrices = entity.bone_matrices();
    assert_eq!(matrices.len(), 1);
    assert!(approx_vec3(Vec3::from(matrices[0].translation), Vec3::new(0.0, 2.0, 0.0)));

    // Disabling returns to the binding pose
    entity.animation_state_mut("up").unwrap().set_enabled(false);
    entity.update_animation(false).unwrap();
    assert!(approx_vec3(Vec3::from(entity.bone_matrices()[0].translation), Vec3::ZERO));
}

#[test]
fn child_bones_inherit_parent_animation() {
    let mut skeleton = Skeleton::new("arm");
    let shoulder = skeleton.create_bone("shoulder").unwrap();
    let hand = skeleton.create_bone("hand").unwrap();
    skeleton.set_parent(hand, shoulder).unwrap();
    skeleton.bone_mut(hand).unwrap().transform.position = Vec3::X;
    skeleton.set_binding_pose();
    skeleton
        .create_animation("raise", 1.0)
        .unwrap()
        .create_node_track(shoulder)
        .unwrap()
        .create_node_key_frame(0.0)
        .set_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));

    let mut entity = Entity::new("arm", rigged_mesh(skeleton)).unwrap();
    enable(&mut entity, "raise");
    entity.update_animation(false).unwrap();

    let hand = entity.skeleton().unwrap().bone(hand).unwrap();
    assert!(approx_vec3(Vec3::from(hand.transform.world_matrix().translation), Vec3::Y));
}

#[test]
fn instances_animate_independently() {
    let mesh = rigged_mesh(single_bone_skeleton());
    let mut a = Entity::new("a", Arc::clone(&mesh)).unwrap();
    let mut b = Entity::new("b", mesh).unwrap();
    enable(&mut a, "left");
    a.update_animation(false).unwrap();
    b.update_animation(false).unwrap();

    let a_root = a.skeleton().unwrap().bone(0).unwrap().transform.position;
    let b_root = b.skeleton().unwrap().bone(0).unwrap().transform.position;
    assert!(approx_vec3(a_root, Vec3::new(-2.0, 0.0, 0.0)));
    assert!(approx_vec3(b_root, Vec3::ZERO));
}

// ============================================================================
// Manual bones
// ============================================================================

#[test]
fn manual_bone_edits_trigger_update_and_survive_reset() {
    let mut entity = Entity::new("hero", rigged_mesh(single_bone_skeleton())).unwrap();
    entity.update_animation(false).unwrap();
    assert!(!entity.update_animation(false).unwrap());

    {
        let skeleton = entity.skeleton_mut().unwrap();
        let root = skeleton.bone_mut(0).unwrap();
        root.set_manually_controlled(true);
        root.transform.position = Vec3::Z;
        skeleton.notify_manual_bones_dirty();
    }

    assert!(entity.update_animation(false).unwrap());
    assert!(approx_vec3(Vec3::from(entity.bone_matrices()[0].translation), Vec3::Z));
    assert!(!entity.skeleton().unwrap().manual_bones_dirty());
}

// ============================================================================
// Shared states
// ============================================================================

#[test]
fn skeletal_and_vertex_animation_share_a_state() {
    let mut skeleton = single_bone_skeleton();
    skeleton.create_animation("talk", 1.0).unwrap();

    let mut mesh = Mesh::new("head");
    mesh.set_skeleton(Some(skeleton));
    mesh.set_shared_vertex_data(Some(VertexData::with_positions(&[Vec3::ZERO])));
    let track = mesh
        .create_animation("talk", 1.0)
        .unwrap()
        .create_vertex_track(0, VertexAnimationType::Morph)
        .unwrap();
    track
        .create_vertex_morph_key_frame(0.0, VertexBuffer::from_positions(&[Vec3::X]))
        .unwrap();

    let mut entity = Entity::new("head", Arc::new(mesh)).unwrap();
    // left, up and talk: one state each, talk shared by both animations
    assert_eq!(entity.all_animation_states().len(), 3);

    enable(&mut entity, "talk");
    entity.update_animation(false).unwrap();
    let data = entity.software_vertex_data(0).unwrap();
    assert_eq!(data.position_buffer().unwrap().position(0), Some(Vec3::X));
}

#[test]
fn refresh_restores_missing_states() {
    let mut entity = Entity::new("hero", rigged_mesh(single_bone_skeleton())).unwrap();
    entity.all_animation_states_mut().remove_animation_state("up");
    assert!(entity.animation_state("up").is_err());

    entity.refresh_available_animation_state().unwrap();
    assert!(entity.animation_state("up").is_ok());
    assert_eq!(entity.all_animation_states().len(), 2);
}

// ============================================================================
// Scene manager
// ============================================================================

#[test]
fn animated_parent_moves_child_in_world_space() -> anyhow::Result<()> {
    init_logger();
    let mut scene = SceneManager::new();
    let parent = scene.create_node(Node::with_name("turntable"));
    let mut child = Node::with_name("cup");
    child.transform.position = Vec3::X;
    child.set_initial_state();
    let child = scene.create_child_node(child, parent)?;

    scene
        .create_animation("spin", 4.0)?
        .create_node_track_for(0, parent)?
        .create_node_key_frame(0.0)
        .set_rotation(Quat::from_rotation_y(std::f32::consts::PI));
    scene.create_animation_state("spin")?.set_enabled(true);

    scene.update_scene_graph()?;

    let world = scene.node(child).map(|n| n.world_matrix().translation);
    let world = world.ok_or_else(|| anyhow::anyhow!("child node vanished"))?;
    assert!(approx_vec3(Vec3::from(world), Vec3::new(-1.0, 0.0, 0.0)));
    Ok(())
}

#[test]
fn update_scene_graph_skips_hidden_entities() {
    let mut scene = SceneManager::new();
    let key = scene
        .create_entity("hero", rigged_mesh(single_bone_skeleton()))
        .unwrap();
    {
        let entity = scene.entity_mut(key).unwrap();
        enable(entity, "up");
        entity.visible = false;
    }

    scene.update_scene_graph().unwrap();
    let entity = scene.entity(key).unwrap();
    assert_eq!(entity.frame_animation_last_updated(), u64::MAX);

    scene.entity_mut(key).unwrap().visible = true;
    scene.update_scene_graph().unwrap();
    let entity = scene.entity(key).unwrap();
    assert_eq!(
        entity.frame_animation_last_updated(),
        entity.all_animation_states().dirty_frame_number()
    );
}

#[test]
fn destroy_all_animations_clears_states() -> anyhow::Result<()> {
    init_logger();
    let mut scene = SceneManager::new();
    scene.create_animation("a", 1.0)?;
    scene.create_animation("b", 1.0)?;
    scene.create_animation_state("a")?;

    scene.destroy_all_animations();
    assert!(!scene.has_animation("b"));
    assert!(scene.animation_states().is_empty());
    Ok(())
}

// ============================================================================
// Skeleton instance sharing
// ============================================================================

fn root_position(scene: &SceneManager, key: tessera::scene::EntityKey) -> Vec3 {
    scene.entity(key).unwrap().skeleton().unwrap().bone(0).unwrap().transform.position
}

#[test]
fn sharer_follows_the_source_skeleton() -> anyhow::Result<()> {
    init_logger();
    let mesh = rigged_mesh(single_bone_skeleton());
    let mut scene = SceneManager::new();
    let leader = scene.create_entity("leader", Arc::clone(&mesh))?;
    let follower = scene.create_entity("follower", mesh)?;
    scene.share_skeleton_instance_with(follower, leader)?;
    assert_eq!(scene.entity(follower).unwrap().shared_skeleton_source(), Some(leader));
    assert_eq!(scene.skeleton_instance_sharers(leader).collect::<Vec<_>>(), [follower]);

    enable(scene.entity_mut(leader).unwrap(), "left");
    scene.update_scene_graph()?;
    assert!(approx_vec3(root_position(&scene, follower), Vec3::new(-2.0, 0.0, 0.0)));
    assert_eq!(
        scene.entity(follower).unwrap().bone_matrices(),
        scene.entity(leader).unwrap().bone_matrices()
    );
    assert!(scene.entity(follower).unwrap().animation_state("left")?.enabled());

    // The follower's own states do not pose the shared skeleton
    enable(scene.entity_mut(follower).unwrap(), "up");
    scene.update_scene_graph()?;
    assert!(approx_vec3(root_position(&scene, follower), Vec3::new(-2.0, 0.0, 0.0)));
    Ok(())
}

#[test]
fn hidden_source_still_poses_visible_sharers() -> anyhow::Result<()> {
    let mesh = rigged_mesh(single_bone_skeleton());
    let mut scene = SceneManager::new();
    let leader = scene.create_entity("leader", Arc::clone(&mesh))?;
    let follower = scene.create_entity("follower", mesh)?;
    scene.share_skeleton_instance_with(follower, leader)?;

    let entity = scene.entity_mut(leader).unwrap();
    enable(entity, "up");
    entity.visible = false;
    scene.update_scene_graph()?;
    assert!(approx_vec3(root_position(&scene, follower), Vec3::new(0.0, 2.0, 0.0)));
    Ok(())
}

#[test]
fn stop_sharing_restores_an_own_instance() -> anyhow::Result<()> {
    let mesh = rigged_mesh(single_bone_skeleton());
    let mut scene = SceneManager::new();
    let leader = scene.create_entity("leader", Arc::clone(&mesh))?;
    let follower = scene.create_entity("follower", mesh)?;
    scene.share_skeleton_instance_with(follower, leader)?;
    enable(scene.entity_mut(leader).unwrap(), "left");
    scene.update_scene_graph()?;

    scene.stop_sharing_skeleton_instance(follower)?;
    let entity = scene.entity(follower).unwrap();
    assert!(!entity.shares_skeleton_instance());
    assert!(!entity.is_animated());
    assert!(approx_vec3(root_position(&scene, follower), Vec3::ZERO));

    enable(scene.entity_mut(follower).unwrap(), "up");
    scene.update_scene_graph()?;
    assert!(approx_vec3(root_position(&scene, follower), Vec3::new(0.0, 2.0, 0.0)));
    assert!(approx_vec3(root_position(&scene, leader), Vec3::new(-2.0, 0.0, 0.0)));
    Ok(())
}

#[test]
fn sharing_joins_the_source_of_a_sharer() -> anyhow::Result<()> {
    let mesh = rigged_mesh(single_bone_skeleton());
    let mut scene = SceneManager::new();
    let leader = scene.create_entity("leader", Arc::clone(&mesh))?;
    let second = scene.create_entity("second", Arc::clone(&mesh))?;
    let third = scene.create_entity("third", mesh)?;
    scene.share_skeleton_instance_with(second, leader)?;
    scene.share_skeleton_instance_with(third, second)?;
    assert_eq!(scene.entity(third).unwrap().shared_skeleton_source(), Some(leader));

    // Destroying the source hands every sharer its own instance
    scene.destroy_entity(leader);
    assert!(!scene.entity(second).unwrap().shares_skeleton_instance());
    assert!(!scene.entity(third).unwrap().shares_skeleton_instance());
    Ok(())
}

#[test]
fn invalid_sharing_is_rejected() {
    let mesh = rigged_mesh(single_bone_skeleton());
    let mut scene = SceneManager::new();
    let leader = scene.create_entity("leader", Arc::clone(&mesh)).unwrap();
    let follower = scene.create_entity("follower", mesh).unwrap();
    let stranger = scene
        .create_entity("stranger", rigged_mesh(single_bone_skeleton()))
        .unwrap();
    let plain = scene.create_entity("plain", Arc::new(Mesh::new("rock"))).unwrap();

    let invalid = |result: tessera::core::Result<()>| matches!(result, Err(TesseraError::InvalidParams(_)));
    assert!(invalid(scene.share_skeleton_instance_with(leader, leader)));
    assert!(invalid(scene.share_skeleton_instance_with(stranger, leader)));
    assert!(invalid(scene.share_skeleton_instance_with(plain, leader)));

    scene.share_skeleton_instance_with(follower, leader).unwrap();
    assert!(invalid(scene.share_skeleton_instance_with(follower, leader)));
    assert!(invalid(scene.share_skeleton_instance_with(leader, follower)));
}
