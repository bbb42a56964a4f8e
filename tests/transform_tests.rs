//! Transform and hierarchy tests
//!
//! Tests for:
//! - Transform TRS operations and dirty checking
//! - Initial state and weighted blending used by node animation
//! - Hierarchical matrix propagation through the scene manager

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec3};
use tessera::animation::NodeTarget;
use tessera::core::{NodeHandle, TesseraError};
use tessera::scene::{Node, SceneManager, Transform};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

fn world_position(scene: &SceneManager, handle: NodeHandle) -> Vec3 {
    Vec3::from(scene.node(handle).unwrap().world_matrix().translation)
}

// ============================================================================
// Transform Unit Tests
// ============================================================================

#[test]
fn transform_default_is_identity() {
    let t = Transform::new();
    assert_eq!(t.position, Vec3::ZERO);
    assert_eq!(t.rotation, Quat::IDENTITY);
    assert_eq!(t.scale, Vec3::ONE);
    assert_eq!(t.accumulated_weight(), 0.0);
}

#[test]
fn transform_update_local_matrix_dirty_check() {
    let mut t = Transform::new();

    // First call always reports a change
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.rotation = Quat::from_rotation_z(0.25);
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.scale = Vec3::splat(3.0);
    assert!(t.update_local_matrix());
}

#[test]
fn transform_local_matrix_reflects_trs() {
    let mut t = Transform::new();
    t.position = Vec3::new(10.0, 20.0, 30.0);
    t.update_local_matrix();

    let mat = Mat4::from(*t.local_matrix());
    let translation = mat.w_axis.truncate();
    assert!(vec3_approx(translation, Vec3::new(10.0, 20.0, 30.0)));
}

#[test]
fn transform_mark_dirty_forces_update() {
    let mut t = Transform::new();
    t.update_local_matrix();
    assert!(!t.update_local_matrix());

    t.mark_dirty();
    assert!(t.update_local_matrix());
}

#[test]
fn from_trs_records_initial_state() {
    let rotation = Quat::from_rotation_x(FRAC_PI_2);
    let t = Transform::from_trs(Vec3::Y, rotation, Vec3::splat(2.0));
    assert_eq!(t.initial_position(), Vec3::Y);
    assert_eq!(t.initial_rotation(), rotation);
    assert_eq!(t.initial_scale(), Vec3::splat(2.0));
}

// ============================================================================
// Animation Blending
// ============================================================================

#[test]
fn weighted_transform_is_relative_to_initial_state() {
    let mut t = Transform::from_trs(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0));
    t.weighted_transform(1.0, Vec3::Y, Quat::from_rotation_z(FRAC_PI_2), Vec3::splat(1.5));

    assert!(vec3_approx(t.position, Vec3::new(1.0, 1.0, 0.0)));
    assert!(vec3_approx(t.scale, Vec3::splat(3.0)));
    assert!(t.rotation.abs_diff_eq(Quat::from_rotation_z(FRAC_PI_2), EPSILON));
}

#[test]
fn weighted_transform_blends_by_weight_share() {
    let mut t = Transform::new();
    t.weighted_transform(3.0, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
    t.weighted_transform(1.0, Vec3::new(4.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);

    // The second contribution holds a quarter of the total weight
    assert!(vec3_approx(t.position, Vec3::new(1.0, 0.0, 0.0)));
    assert_eq!(t.accumulated_weight(), 4.0);
}

#[test]
fn reset_discards_animation_but_keeps_initial_state() {
    let mut t = Transform::from_trs(Vec3::Z, Quat::IDENTITY, Vec3::ONE);
    t.weighted_transform(1.0, Vec3::X, Quat::from_rotation_y(0.3), Vec3::splat(2.0));
    t.reset_to_initial_state();

    assert_eq!(t.position, Vec3::Z);
    assert_eq!(t.rotation, Quat::IDENTITY);
    assert_eq!(t.scale, Vec3::ONE);

    // A fresh frame starts blending from scratch
    t.weighted_transform(0.5, Vec3::X, Quat::IDENTITY, Vec3::ONE);
    assert!(vec3_approx(t.position, Vec3::new(1.0, 0.0, 1.0)));
}

// ============================================================================
// Hierarchy
// ============================================================================

fn create_chain(scene: &mut SceneManager, length: usize) -> Vec<NodeHandle> {
    let mut handles = Vec::with_capacity(length);
    for i in 0..length {
        let mut node = Node::with_name(format!("link{i}"));
        node.transform.position = Vec3::new(1.0, 0.0, 0.0);
        let handle = match handles.last() {
            Some(&parent) => scene.create_child_node(node, parent).unwrap(),
            None => scene.create_node(node),
        };
        handles.push(handle);
    }
    handles
}

#[test]
fn hierarchy_chain_world_positions() {
    let mut scene = SceneManager::new();
    let handles = create_chain(&mut scene, 5);
    scene.update_scene_graph().unwrap();

    for (i, &handle) in handles.iter().enumerate() {
        let expected_x = (i + 1) as f32;
        let world = world_position(&scene, handle);
        assert!(approx_eq(world.x, expected_x), "Node {i}: expected x={expected_x}, got x={}", world.x);
    }
}

#[test]
fn hierarchy_with_rotation_and_scale() {
    let mut scene = SceneManager::new();
    let mut parent = Node::with_name("parent");
    parent.transform.rotation = Quat::from_rotation_z(FRAC_PI_2);
    parent.transform.scale = Vec3::splat(2.0);
    let parent = scene.create_node(parent);

    let mut child = Node::with_name("child");
    child.transform.position = Vec3::X;
    let child = scene.create_child_node(child, parent).unwrap();

    scene.update_scene_graph().unwrap();
    assert!(vec3_approx(world_position(&scene, child), Vec3::new(0.0, 2.0, 0.0)));
}

#[test]
fn reattaching_moves_world_position() {
    let mut scene = SceneManager::new();
    let mut left = Node::with_name("left");
    left.transform.position = Vec3::new(-5.0, 0.0, 0.0);
    let left = scene.create_node(left);
    let mut right = Node::with_name("right");
    right.transform.position = Vec3::new(5.0, 0.0, 0.0);
    let right = scene.create_node(right);

    let item = scene.create_child_node(Node::with_name("item"), left).unwrap();
    scene.update_scene_graph().unwrap();
    assert!(vec3_approx(world_position(&scene, item), Vec3::new(-5.0, 0.0, 0.0)));

    scene.attach(item, right).unwrap();
    scene.update_scene_graph().unwrap();
    assert!(vec3_approx(world_position(&scene, item), Vec3::new(5.0, 0.0, 0.0)));
    assert_eq!(scene.node(item).unwrap().parent(), Some(right));
    assert!(scene.node(left).unwrap().children().is_empty());
}

#[test]
fn attach_to_descendant_is_rejected() {
    let mut scene = SceneManager::new();
    let handles = create_chain(&mut scene, 3);
    assert!(matches!(
        scene.attach(handles[0], handles[2]),
        Err(TesseraError::InvalidParams(_))
    ));
}

#[test]
fn deeply_nested_hierarchy_no_stack_overflow() {
    let mut scene = SceneManager::new();
    let handles = create_chain(&mut scene, 10_000);
    scene.update_scene_graph().unwrap();

    let last = handles[handles.len() - 1];
    assert!((world_position(&scene, last).x - 10_000.0).abs() < 1.0);
}
