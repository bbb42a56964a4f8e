//! Transform System
//!
//! Propagates local matrices down the node hierarchy into world matrices.
//! It only borrows the node arena and the root list, so callers can run it
//! while other scene storage is borrowed elsewhere.

use glam::Affine3A;
use slotmap::SlotMap;
use tessera_core::NodeHandle;

use crate::node::Node;

/// Updates the world matrices of every node reachable from `roots`.
///
/// A node's world matrix is only recomputed when its local transform or an
/// ancestor's world matrix changed. Uses an explicit stack, so deep
/// hierarchies cannot overflow the call stack.
pub fn update_hierarchy(nodes: &mut SlotMap<NodeHandle, Node>, roots: &[NodeHandle]) {
    // (node, parent world matrix, parent changed)
    let mut stack: Vec<(NodeHandle, Affine3A, bool)> = Vec::with_capacity(64);

    for &root in roots.iter().rev() {
        stack.push((root, Affine3A::IDENTITY, false));
    }

    while let Some((handle, parent_world, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(handle) else {
            continue;
        };

        let local_changed = node.transform.update_local_matrix();
        let world_needs_update = local_changed || parent_changed;

        if world_needs_update {
            let world = parent_world * *node.transform.local_matrix();
            node.transform.set_world_matrix(world);
        }

        let current_world = node.transform.world_matrix;
        // Reverse so children are visited in insertion order
        for &child in node.children.iter().rev() {
            stack.push((child, current_world, world_needs_update));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_hierarchy_update() {
        let mut nodes: SlotMap<NodeHandle, Node> = SlotMap::with_key();

        let mut parent = Node::new();
        parent.transform.position = Vec3::new(1.0, 0.0, 0.0);
        let parent_handle = nodes.insert(parent);

        let mut child = Node::new();
        child.transform.position = Vec3::new(0.0, 1.0, 0.0);
        child.parent = Some(parent_handle);
        let child_handle = nodes.insert(child);

        nodes.get_mut(parent_handle).unwrap().children.push(child_handle);

        update_hierarchy(&mut nodes, &[parent_handle]);

        let child_world_pos = nodes.get(child_handle).unwrap().transform.world_matrix.translation;
        assert!((child_world_pos.x - 1.0).abs() < 1e-5);
        assert!((child_world_pos.y - 1.0).abs() < 1e-5);

        // Moving the parent moves the child on the next pass
        nodes.get_mut(parent_handle).unwrap().transform.position = Vec3::new(5.0, 0.0, 0.0);
        update_hierarchy(&mut nodes, &[parent_handle]);
        let child_world_pos = nodes.get(child_handle).unwrap().transform.world_matrix.translation;
        assert!((child_world_pos.x - 5.0).abs() < 1e-5);
    }
}
