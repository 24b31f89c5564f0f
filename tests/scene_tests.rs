//! Scene Integration Tests
//!
//! Tests for:
//! - Scene: create/remove nodes, attach/detach hierarchy
//! - Node query: names, recursive child lookup by name and hash
//! - Transform: dirty tracking, silent writes, world matrix propagation
//! - Skeleton: validation, instantiation, bind pose reset, joint matrices

use glam::{Affine3A, Mat4, Quat, Vec3};

use kiln::core::{KilnError, StringHash};
use kiln::scene::{Bone, Node, Scene, Skeleton};

const EPSILON: f32 = 1e-5;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn arm_skeleton() -> Skeleton {
    Skeleton::new(
        "arm",
        vec![
            Bone::new("shoulder", None).with_bind_pose(Vec3::Y * 2.0, Quat::IDENTITY, Vec3::ONE),
            Bone::new("elbow", Some(0)).with_bind_pose(Vec3::X, Quat::IDENTITY, Vec3::ONE),
            Bone::new("wrist", Some(1)).with_bind_pose(Vec3::X, Quat::IDENTITY, Vec3::ONE),
        ],
    )
    .unwrap()
}

// ============================================================================
// Node Creation & Removal
// ============================================================================

#[test]
fn scene_create_node_with_name() {
    let mut scene = Scene::new();
    let handle = scene.create_node("TestNode");
    assert_eq!(scene.get_name(handle), Some("TestNode"));
    assert!(scene.root_nodes.contains(&handle));
}

#[test]
fn scene_set_name_updates_hash() {
    let mut scene = Scene::new();
    let handle = scene.create_node("before");
    scene.get_node_mut(handle).unwrap().set_name("after");
    let node = scene.get_node(handle).unwrap();
    assert_eq!(node.name_hash(), StringHash::new("after"));
}

#[test]
fn scene_remove_node_removes_subtree() {
    let mut scene = Scene::new();
    let root = scene.create_node("root");
    let child = scene.build_node("child").with_parent(root).build();
    let grandchild = scene.build_node("grandchild").with_parent(child).build();

    scene.remove_node(child);

    assert!(scene.get_node(child).is_none());
    assert!(scene.get_node(grandchild).is_none());
    assert!(scene.get_node(root).unwrap().children().is_empty());
}

#[test]
fn stale_handles_resolve_to_none() {
    let mut scene = Scene::new();
    let old = scene.create_node("old");
    scene.remove_node(old);
    let new = scene.create_node("new");

    assert!(scene.get_node(old).is_none());
    assert_eq!(scene.get_name(new), Some("new"));
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn attach_moves_node_between_parents() {
    let mut scene = Scene::new();
    let a = scene.create_node("a");
    let b = scene.create_node("b");
    let child = scene.build_node("child").with_parent(a).build();

    scene.attach(child, b);

    assert!(scene.get_node(a).unwrap().children().is_empty());
    assert_eq!(scene.get_node(b).unwrap().children(), &[child]);
    assert_eq!(scene.get_node(child).unwrap().parent(), Some(b));
    assert!(!scene.root_nodes.contains(&child));
}

#[test]
fn attach_to_self_is_rejected() {
    let mut scene = Scene::new();
    let a = scene.create_node("a");
    scene.attach(a, a);
    assert_eq!(scene.get_node(a).unwrap().parent(), None);
}

#[test]
fn find_child_by_hash_matches_by_name() {
    let mut scene = Scene::new();
    let root = scene.create_node("root");
    let mid = scene.build_node("mid").with_parent(root).build();
    let leaf = scene.build_node("leaf").with_parent(mid).build();

    assert_eq!(scene.find_child(root, StringHash::new("leaf"), true), Some(leaf));
    assert_eq!(scene.find_child_by_name(root, "leaf", true), Some(leaf));
    assert_eq!(scene.find_child_by_name(root, "leaf", false), None);
    assert!(scene.is_ancestor_of(root, leaf));
    assert!(!scene.is_ancestor_of(leaf, root));
}

// ============================================================================
// Transform Propagation
// ============================================================================

#[test]
fn world_matrix_composes_parent_chain() {
    let mut scene = Scene::new();
    let parent = scene
        .build_node("parent")
        .with_position(1.0, 0.0, 0.0)
        .with_scale(2.0)
        .build();
    let child = scene
        .build_node("child")
        .with_position(0.0, 1.0, 0.0)
        .with_parent(parent)
        .build();

    scene.update_matrix_world();

    let pos = scene.get_node(child).unwrap().transform.world_position();
    assert!(approx_vec3(pos, Vec3::new(1.0, 2.0, 0.0)));
}

#[test]
fn mark_dirty_refreshes_silent_subtree_writes() {
    let mut scene = Scene::new();
    let parent = scene.create_node("parent");
    let child = scene.build_node("child").with_parent(parent).build();
    scene.update_matrix_world();

    scene.get_node_mut(child).unwrap().transform.set_position_silent(Vec3::Z);
    scene.update_matrix_world();
    assert!(approx_vec3(scene.get_node(child).unwrap().transform.world_position(), Vec3::ZERO));

    scene.mark_dirty(parent);
    scene.update_matrix_world();
    assert!(approx_vec3(scene.get_node(child).unwrap().transform.world_position(), Vec3::Z));
}

#[test]
fn update_subtree_uses_parent_world() {
    let mut scene = Scene::new();
    let parent = scene.build_node("parent").with_position(0.0, 5.0, 0.0).build();
    let child = scene.build_node("child").with_parent(parent).build();
    scene.update_matrix_world();

    scene.get_node_mut(child).unwrap().transform.set_position(Vec3::X);
    scene.update_subtree(child);
    assert!(approx_vec3(
        scene.get_node(child).unwrap().transform.world_position(),
        Vec3::new(1.0, 5.0, 0.0)
    ));
}

#[test]
fn node_default_is_unnamed_identity() {
    let node = Node::default();
    assert_eq!(node.name(), "");
    assert_eq!(node.transform.position(), Vec3::ZERO);
    assert_eq!(node.transform.rotation(), Quat::IDENTITY);
    assert_eq!(node.transform.scale(), Vec3::ONE);
}

// ============================================================================
// Skeleton
// ============================================================================

#[test]
fn skeleton_rejects_out_of_range_parent() {
    let err = Skeleton::new("bad", vec![Bone::new("a", None), Bone::new("b", Some(3))]).unwrap_err();
    assert!(matches!(err, KilnError::InvalidBoneParent { bone: 1, parent: 3 }));
}

#[test]
fn instantiate_places_bones_in_bind_pose() {
    let mut scene = Scene::new();
    let anchor = scene.build_node("anchor").with_position(0.0, 0.0, 1.0).build();
    let key = scene.instantiate_skeleton(arm_skeleton(), Some(anchor));
    scene.update_matrix_world();

    let skeleton = scene.skeleton(key).unwrap();
    let wrist = skeleton.bone_by_name("wrist").unwrap().node.unwrap();
    assert!(approx_vec3(
        scene.get_node(wrist).unwrap().transform.world_position(),
        Vec3::new(2.0, 2.0, 1.0)
    ));
    assert_eq!(
        scene.get_node(skeleton.root_node().unwrap()).unwrap().parent(),
        Some(anchor)
    );
}

#[test]
fn reset_skeleton_pose_skips_unanimated_bones() {
    let mut scene = Scene::new();
    let key = scene.instantiate_skeleton(arm_skeleton(), None);
    scene.skeleton_mut(key).unwrap().set_animated(2, false);

    let (elbow, wrist) = {
        let s = scene.skeleton(key).unwrap();
        (s.bone(1).unwrap().node.unwrap(), s.bone(2).unwrap().node.unwrap())
    };
    for node in [elbow, wrist] {
        scene.get_node_mut(node).unwrap().transform.set_position(Vec3::splat(9.0));
    }

    scene.reset_skeleton_pose(key);
    assert_eq!(scene.get_node(elbow).unwrap().transform.position(), Vec3::X);
    assert_eq!(scene.get_node(wrist).unwrap().transform.position(), Vec3::splat(9.0));
}

#[test]
fn joint_matrices_are_identity_in_bind_pose() {
    let mut scene = Scene::new();
    let key = scene.instantiate_skeleton(arm_skeleton(), None);
    scene.update_matrix_world();
    scene.update_skeleton(key, Affine3A::IDENTITY);

    for m in scene.skeleton(key).unwrap().joint_matrices() {
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }
}
