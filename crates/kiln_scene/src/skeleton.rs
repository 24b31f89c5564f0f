use std::sync::Arc;

use glam::{Affine3A, Mat4, Quat, Vec3};
use kiln_core::{KilnError, Result, StringHash};
use slotmap::SlotMap;

use crate::NodeHandle;
use crate::node::Node;

/// A skeleton bone.
///
/// Bones are addressed by their index in [`Skeleton::bones`]. The hierarchy
/// is expressed through `parent_index`; `node` is the scene node the bone
/// drives, assigned when the skeleton is instantiated into a scene.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub name_hash: StringHash,
    pub parent_index: Option<usize>,
    pub node: Option<NodeHandle>,

    // Bind pose
    pub initial_position: Vec3,
    pub initial_rotation: Quat,
    pub initial_scale: Vec3,

    /// Animation enabled. Disabled bones are left to manual control.
    pub animated: bool,
}

impl Bone {
    #[must_use]
    pub fn new(name: &str, parent_index: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            name_hash: StringHash::new(name),
            parent_index,
            node: None,
            initial_position: Vec3::ZERO,
            initial_rotation: Quat::IDENTITY,
            initial_scale: Vec3::ONE,
            animated: true,
        }
    }

    #[must_use]
    pub fn with_bind_pose(mut self, position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        self.initial_position = position;
        self.initial_rotation = rotation;
        self.initial_scale = scale;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    pub name: String,

    bones: Vec<Bone>,
    /// Immutable copy of every bone's parent index, shared with animation
    /// states so they can walk descendants without holding the skeleton.
    parent_indices: Arc<[Option<usize>]>,
    root_bone_index: usize,

    inverse_bind_matrices: Vec<Affine3A>,
    joint_matrices: Vec<Mat4>,
}

impl Skeleton {
    /// Builds a skeleton, validating its hierarchy.
    ///
    /// The first bone without a parent becomes the root bone.
    pub fn new(name: &str, bones: Vec<Bone>) -> Result<Self> {
        let count = bones.len();

        for (i, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent_index
                && (parent >= count || parent == i)
            {
                return Err(KilnError::InvalidBoneParent { bone: i, parent });
            }
        }

        // A chain longer than the bone count can only be a cycle
        for start in 0..count {
            let mut current = bones[start].parent_index;
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if steps > count {
                    return Err(KilnError::BoneHierarchyCycle { bone: start });
                }
                current = bones[parent].parent_index;
            }
        }

        let root_bone_index = bones
            .iter()
            .position(|b| b.parent_index.is_none())
            .ok_or(KilnError::NoRootBone)?;

        let parent_indices: Arc<[Option<usize>]> = bones.iter().map(|b| b.parent_index).collect();
        let inverse_bind_matrices = compute_inverse_bind_matrices(&bones);

        Ok(Self {
            name: name.to_string(),
            bones,
            parent_indices,
            root_bone_index,
            inverse_bind_matrices,
            joint_matrices: vec![Mat4::IDENTITY; count],
        })
    }

    // ========================================================================
    // Bone lookup
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    #[must_use]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    #[inline]
    pub(crate) fn bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }

    #[must_use]
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bone_index_by_hash(StringHash::new(name))
    }

    #[must_use]
    pub fn bone_index_by_hash(&self, name_hash: StringHash) -> Option<usize> {
        self.bones.iter().position(|b| b.name_hash == name_hash)
    }

    #[must_use]
    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bone_index(name).map(|i| &self.bones[i])
    }

    #[inline]
    #[must_use]
    pub fn root_bone_index(&self) -> usize {
        self.root_bone_index
    }

    #[inline]
    #[must_use]
    pub fn root_bone(&self) -> Option<&Bone> {
        self.bones.get(self.root_bone_index)
    }

    /// Scene node of the root bone, if the skeleton has been instantiated.
    #[inline]
    #[must_use]
    pub fn root_node(&self) -> Option<NodeHandle> {
        self.root_bone().and_then(|b| b.node)
    }

    /// Enables or disables animation for a bone.
    pub fn set_animated(&mut self, index: usize, animated: bool) {
        if let Some(bone) = self.bones.get_mut(index) {
            bone.animated = animated;
        }
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Parent index of every bone, index-aligned with [`bones`](Self::bones).
    #[inline]
    #[must_use]
    pub fn parent_indices(&self) -> &Arc<[Option<usize>]> {
        &self.parent_indices
    }

    /// Direct children of a bone.
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.parent_indices
            .iter()
            .enumerate()
            .filter_map(move |(i, p)| (*p == Some(index)).then_some(i))
    }

    /// All transitive descendants of a bone, excluding the bone itself.
    #[must_use]
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        descendants_of(&self.parent_indices, index)
    }

    /// Returns true if `bone` is `ancestor` or lies below it.
    #[must_use]
    pub fn is_descendant_of(&self, bone: usize, ancestor: usize) -> bool {
        is_descendant(&self.parent_indices, bone, ancestor)
    }

    // ========================================================================
    // Pose & skinning
    // ========================================================================

    /// Writes the bind pose into every animated bone's node without marking
    /// the nodes dirty.
    pub fn reset_silent(&self, nodes: &mut SlotMap<NodeHandle, Node>) {
        for bone in &self.bones {
            if !bone.animated {
                continue;
            }
            let Some(node) = bone.node.and_then(|h| nodes.get_mut(h)) else {
                continue;
            };
            node.transform.set_position_silent(bone.initial_position);
            node.transform.set_rotation_silent(bone.initial_rotation);
            node.transform.set_scale_silent(bone.initial_scale);
        }
    }

    #[inline]
    #[must_use]
    pub fn joint_matrices(&self) -> &[Mat4] {
        &self.joint_matrices
    }

    /// Updates the skinning matrices from the bones' current world matrices.
    ///
    /// `root_matrix_inv` is the inverse world matrix of the skinned mesh's
    /// node, bringing bone transforms back into mesh space.
    pub fn compute_joint_matrices(
        &mut self,
        nodes: &SlotMap<NodeHandle, Node>,
        root_matrix_inv: Affine3A,
    ) {
        for (i, bone) in self.bones.iter().enumerate() {
            let Some(bone_node) = bone.node.and_then(|h| nodes.get(h)) else {
                continue;
            };
            let bone_world_matrix = bone_node.transform.world_matrix;
            let ibm = self.inverse_bind_matrices[i];
            self.joint_matrices[i] = (root_matrix_inv * bone_world_matrix * ibm).into();
        }
    }
}

/// Transitive descendants of `index` in a parent-index array.
#[must_use]
pub fn descendants_of(parent_indices: &[Option<usize>], index: usize) -> Vec<usize> {
    let mut result = Vec::new();
    let mut frontier = vec![index];

    while let Some(current) = frontier.pop() {
        for (i, parent) in parent_indices.iter().enumerate() {
            if *parent == Some(current) {
                result.push(i);
                frontier.push(i);
            }
        }
    }

    result
}

/// Returns true if `bone` is `ancestor` or one of its descendants.
#[must_use]
pub fn is_descendant(parent_indices: &[Option<usize>], bone: usize, ancestor: usize) -> bool {
    let mut current = Some(bone);
    let mut steps = 0;
    while let Some(i) = current {
        if i == ancestor {
            return true;
        }
        steps += 1;
        if steps > parent_indices.len() {
            return false;
        }
        current = parent_indices.get(i).copied().flatten();
    }
    false
}

fn compute_inverse_bind_matrices(bones: &[Bone]) -> Vec<Affine3A> {
    fn resolve(bones: &[Bone], world: &mut [Option<Affine3A>], i: usize) -> Affine3A {
        if let Some(m) = world[i] {
            return m;
        }
        let bone = &bones[i];
        let local = Affine3A::from_scale_rotation_translation(
            bone.initial_scale,
            bone.initial_rotation,
            bone.initial_position,
        );
        let m = match bone.parent_index {
            Some(p) => resolve(bones, world, p) * local,
            None => local,
        };
        world[i] = Some(m);
        m
    }

    let mut world: Vec<Option<Affine3A>> = vec![None; bones.len()];
    (0..bones.len())
        .map(|i| resolve(bones, &mut world, i).inverse())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<Bone> {
        vec![
            Bone::new("root", None),
            Bone::new("spine", Some(0)),
            Bone::new("head", Some(1)),
            Bone::new("arm", Some(1)),
        ]
    }

    #[test]
    fn test_root_and_lookup() {
        let skeleton = Skeleton::new("rig", chain()).unwrap();
        assert_eq!(skeleton.root_bone_index(), 0);
        assert_eq!(skeleton.bone_index("head"), Some(2));
        assert_eq!(skeleton.bone_index_by_hash(StringHash::new("arm")), Some(3));
        assert_eq!(skeleton.bone_index("tail"), None);
    }

    #[test]
    fn test_descendants() {
        let skeleton = Skeleton::new("rig", chain()).unwrap();
        let mut d = skeleton.descendants(1);
        d.sort_unstable();
        assert_eq!(d, vec![2, 3]);
        assert!(skeleton.descendants(2).is_empty());
        assert!(skeleton.is_descendant_of(3, 0));
        assert!(skeleton.is_descendant_of(1, 1));
        assert!(!skeleton.is_descendant_of(0, 1));
        assert_eq!(skeleton.children_of(1).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_invalid_parent_rejected() {
        let bones = vec![Bone::new("root", None), Bone::new("bad", Some(5))];
        assert!(matches!(
            Skeleton::new("rig", bones),
            Err(KilnError::InvalidBoneParent { bone: 1, parent: 5 })
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let bones = vec![
            Bone::new("root", None),
            Bone::new("a", Some(2)),
            Bone::new("b", Some(1)),
        ];
        assert!(matches!(
            Skeleton::new("rig", bones),
            Err(KilnError::BoneHierarchyCycle { .. })
        ));
    }

    #[test]
    fn test_no_root_rejected() {
        assert!(matches!(Skeleton::new("rig", Vec::new()), Err(KilnError::NoRootBone)));
    }
}
