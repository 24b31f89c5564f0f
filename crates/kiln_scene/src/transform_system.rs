//! Transform System
//!
//! Propagates local transforms into world matrices. Decoupled from [`Scene`]
//! so it only borrows the node storage and the root list.
//!
//! A node's world matrix is rebuilt when its own transform is dirty or when
//! any ancestor's world matrix was rebuilt in the same pass. Transforms written
//! through the silent setters stay invisible to this pass until the owner
//! marks them dirty.
//!
//! [`Scene`]: crate::Scene

use glam::Affine3A;
use slotmap::SlotMap;

use crate::NodeHandle;
use crate::node::Node;

/// Updates the world matrices of every tree under `roots`.
///
/// Uses an explicit stack instead of recursion so deep hierarchies (long bone
/// chains) cannot overflow the call stack.
pub fn update_hierarchy_iterative(nodes: &mut SlotMap<NodeHandle, Node>, roots: &[NodeHandle]) {
    // Work stack: (node, parent world matrix, parent changed)
    let mut stack: Vec<(NodeHandle, Affine3A, bool)> = Vec::with_capacity(64);

    for &root_handle in roots.iter().rev() {
        stack.push((root_handle, Affine3A::IDENTITY, false));
    }

    drain_stack(nodes, &mut stack);
}

/// Updates the subtree rooted at `root_handle`, always rebuilding its world
/// matrices from the parent's current world matrix.
pub fn update_subtree(nodes: &mut SlotMap<NodeHandle, Node>, root_handle: NodeHandle) {
    let Some(node) = nodes.get(root_handle) else {
        return;
    };

    let parent_world = node
        .parent
        .and_then(|p| nodes.get(p))
        .map_or(Affine3A::IDENTITY, |p| p.transform.world_matrix);

    let mut stack = vec![(root_handle, parent_world, true)];
    drain_stack(nodes, &mut stack);
}

fn drain_stack(
    nodes: &mut SlotMap<NodeHandle, Node>,
    stack: &mut Vec<(NodeHandle, Affine3A, bool)>,
) {
    while let Some((node_handle, parent_world_matrix, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(node_handle) else {
            continue;
        };

        let local_changed = node.transform.update_local_matrix();
        let world_needs_update = local_changed || parent_changed;

        if world_needs_update {
            let new_world = parent_world_matrix * *node.transform.local_matrix();
            node.transform.set_world_matrix(new_world);
        }

        let current_world = node.transform.world_matrix;

        // Reverse order keeps children processed in insertion order
        for &child_handle in node.children.iter().rev() {
            stack.push((child_handle, current_world, world_needs_update));
        }
    }
}
