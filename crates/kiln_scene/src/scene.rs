use glam::{Affine3A, Quat, Vec3};
use kiln_core::StringHash;
use slotmap::SlotMap;

use crate::node::Node;
use crate::skeleton::Skeleton;
use crate::transform_system;
use crate::{NodeHandle, SkeletonKey};

/// Scene graph container.
///
/// Owns every node and skeleton. Handles handed out by the scene are
/// generational: once an entry is removed, lookups through stale handles
/// return `None`.
#[derive(Debug, Default)]
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    pub skeletons: SlotMap<SkeletonKey, Skeleton>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Starts building a node.
    pub fn build_node(&mut self, name: &str) -> NodeBuilder<'_> {
        NodeBuilder::new(self, name)
    }

    /// Creates a named node at the scene root.
    pub fn create_node(&mut self, name: &str) -> NodeHandle {
        self.add_node(Node::new(name))
    }

    /// Adds a node at the scene root.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Adds a node under `parent`. Falls back to the root list if the parent
    /// does not exist.
    pub fn add_to_parent(&mut self, child: Node, parent: NodeHandle) -> NodeHandle {
        let handle = self.nodes.insert(child);
        self.root_nodes.push(handle);
        self.attach(handle, parent);
        handle
    }

    /// Removes a node and its whole subtree.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        let children = if let Some(node) = self.nodes.get(handle) {
            node.children.clone()
        } else {
            return;
        };

        for child in children {
            self.remove_node(child);
        }

        let parent_opt = self.nodes.get(handle).and_then(|n| n.parent);

        if let Some(parent_handle) = parent_opt {
            if let Some(parent) = self.nodes.get_mut(parent_handle)
                && let Some(pos) = parent.children.iter().position(|&x| x == handle)
            {
                parent.children.remove(pos);
            }
        } else if let Some(pos) = self.root_nodes.iter().position(|&x| x == handle) {
            self.root_nodes.remove(pos);
        }

        self.nodes.remove(handle);
    }

    /// Makes `child` a child of `parent`, detaching it from its old parent.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            log::error!("Node not found during attach!");
            return;
        }
        if self.is_ancestor_of(child, parent) {
            log::warn!("Cannot attach a node below its own descendant!");
            return;
        }

        // 1. Detach from old
        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(p) = old_parent {
            if let Some(n) = self.nodes.get_mut(p)
                && let Some(i) = n.children.iter().position(|&x| x == child)
            {
                n.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&x| x == child) {
            self.root_nodes.remove(i);
        }

        // 2. Attach to new
        self.nodes[parent].children.push(child);

        // 3. Update child
        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.transform.mark_dirty();
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn get_name(&self, handle: NodeHandle) -> Option<&str> {
        self.nodes.get(handle).map(Node::name)
    }

    /// Finds a child of `parent` by name hash, optionally searching the whole
    /// subtree (depth-first, children in insertion order).
    #[must_use]
    pub fn find_child(
        &self,
        parent: NodeHandle,
        name_hash: StringHash,
        recursive: bool,
    ) -> Option<NodeHandle> {
        let node = self.nodes.get(parent)?;

        for &child in &node.children {
            if self.nodes.get(child).is_some_and(|c| c.name_hash() == name_hash) {
                return Some(child);
            }
            if recursive && let Some(found) = self.find_child(child, name_hash, true) {
                return Some(found);
            }
        }
        None
    }

    #[must_use]
    pub fn find_child_by_name(
        &self,
        parent: NodeHandle,
        name: &str,
        recursive: bool,
    ) -> Option<NodeHandle> {
        self.find_child(parent, StringHash::new(name), recursive)
    }

    /// Returns true if `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).and_then(|n| n.parent);
        }
        false
    }

    // ========================================================================
    // Matrix update pipeline
    // ========================================================================

    /// Flags a node and every descendant so the next matrix pass rebuilds
    /// their local and world matrices.
    ///
    /// This is the commit step after silent transform writes.
    pub fn mark_dirty(&mut self, handle: NodeHandle) {
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current) {
                node.transform.mark_dirty();
                stack.extend_from_slice(&node.children);
            }
        }
    }

    /// Updates world matrices for the whole scene.
    pub fn update_matrix_world(&mut self) {
        transform_system::update_hierarchy_iterative(&mut self.nodes, &self.root_nodes);
    }

    /// Updates world matrices for one subtree.
    pub fn update_subtree(&mut self, handle: NodeHandle) {
        transform_system::update_subtree(&mut self.nodes, handle);
    }

    // ========================================================================
    // Skeletons
    // ========================================================================

    pub fn add_skeleton(&mut self, skeleton: Skeleton) -> SkeletonKey {
        self.skeletons.insert(skeleton)
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self, key: SkeletonKey) -> Option<&Skeleton> {
        self.skeletons.get(key)
    }

    #[inline]
    pub fn skeleton_mut(&mut self, key: SkeletonKey) -> Option<&mut Skeleton> {
        self.skeletons.get_mut(key)
    }

    pub fn remove_skeleton(&mut self, key: SkeletonKey) -> Option<Skeleton> {
        self.skeletons.remove(key)
    }

    /// Creates one node per bone, placed in bind pose and linked following the
    /// bone hierarchy, then registers the skeleton.
    ///
    /// The root bone's node is attached under `parent` when given.
    pub fn instantiate_skeleton(
        &mut self,
        mut skeleton: Skeleton,
        parent: Option<NodeHandle>,
    ) -> SkeletonKey {
        let handles: Vec<NodeHandle> = skeleton
            .bones()
            .iter()
            .map(|bone| {
                let mut node = Node::new(&bone.name);
                node.transform.set_position(bone.initial_position);
                node.transform.set_rotation(bone.initial_rotation);
                node.transform.set_scale(bone.initial_scale);
                self.add_node(node)
            })
            .collect();

        for (i, &handle) in handles.iter().enumerate() {
            match skeleton.bones()[i].parent_index {
                Some(p) => self.attach(handle, handles[p]),
                None => {
                    if let Some(parent) = parent {
                        self.attach(handle, parent);
                    }
                }
            }
            if let Some(bone) = skeleton.bone_mut(i) {
                bone.node = Some(handle);
            }
        }

        log::debug!(
            "Instantiated skeleton '{}' with {} bones",
            skeleton.name,
            handles.len()
        );

        self.add_skeleton(skeleton)
    }

    /// Silently writes the bind pose to every animated bone of a skeleton.
    pub fn reset_skeleton_pose(&mut self, key: SkeletonKey) {
        if let Some(skeleton) = self.skeletons.get(key) {
            skeleton.reset_silent(&mut self.nodes);
        }
    }

    /// Recomputes a skeleton's joint matrices from current bone world matrices.
    pub fn update_skeleton(&mut self, key: SkeletonKey, root_matrix_inv: Affine3A) {
        if let Some(skeleton) = self.skeletons.get_mut(key) {
            skeleton.compute_joint_matrices(&self.nodes, root_matrix_inv);
        }
    }
}

pub struct NodeBuilder<'a> {
    scene: &'a mut Scene,
    node: Node,
    parent: Option<NodeHandle>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(scene: &'a mut Scene, name: &str) -> Self {
        Self {
            scene,
            node: Node::new(name),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.node.transform.set_position(Vec3::new(x, y, z));
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.node.transform.set_rotation(rotation);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, s: f32) -> Self {
        self.node.transform.set_scale(Vec3::splat(s));
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: NodeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Inserts the node into the scene and returns its handle.
    pub fn build(self) -> NodeHandle {
        match self.parent {
            Some(parent) => self.scene.add_to_parent(self.node, parent),
            None => self.scene.add_node(self.node),
        }
    }
}
