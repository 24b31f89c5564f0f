use std::sync::Arc;

use kiln_scene::{NodeHandle, SkeletonKey};

use crate::tracks::KeyframeCursor;
use crate::values::Pose;

/// Skeleton side of an [`AnimationTarget`].
///
/// Carries a snapshot of the skeleton's parent-index array taken at bind
/// time, used for start-bone filtering and recursive bone weights.
#[derive(Debug, Clone)]
pub struct SkeletonTarget {
    pub key: SkeletonKey,
    pub root_bone: usize,
    pub parent_indices: Arc<[Option<usize>]>,
}

/// Node-hierarchy side of an [`AnimationTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTarget {
    pub root: NodeHandle,
}

/// What an animation state drives. Fixed when the state is created.
#[derive(Debug, Clone)]
pub enum AnimationTarget {
    Skeleton(SkeletonTarget),
    Nodes(NodeTarget),
}

impl AnimationTarget {
    #[inline]
    #[must_use]
    pub fn is_skeleton(&self) -> bool {
        matches!(self, Self::Skeleton(_))
    }

    #[must_use]
    pub fn skeleton_key(&self) -> Option<SkeletonKey> {
        match self {
            Self::Skeleton(t) => Some(t.key),
            Self::Nodes(_) => None,
        }
    }

    #[must_use]
    pub fn root_node(&self) -> Option<NodeHandle> {
        match self {
            Self::Skeleton(_) => None,
            Self::Nodes(t) => Some(t.root),
        }
    }
}

/// The bone or node a track resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundTarget {
    Bone { bone_index: usize, node: NodeHandle },
    Node(NodeHandle),
}

impl BoundTarget {
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeHandle {
        match *self {
            Self::Bone { node, .. } | Self::Node(node) => node,
        }
    }

    #[inline]
    #[must_use]
    pub fn bone_index(&self) -> Option<usize> {
        match *self {
            Self::Bone { bone_index, .. } => Some(bone_index),
            Self::Node(_) => None,
        }
    }
}

/// Binding of one clip track, index-aligned with the clip's tracks.
#[derive(Debug, Clone)]
pub struct TrackBinding {
    pub track_index: usize,
    /// `None` when the track name matched nothing in the target.
    pub target: Option<BoundTarget>,
    /// Bind pose of the bone, or the node's local pose at bind time.
    pub rest: Pose,
    /// Cleared for tracks outside the start bone's subtree.
    pub active: bool,
    pub weight: f32,
    pub cursor: KeyframeCursor,
}

impl TrackBinding {
    #[must_use]
    pub fn unresolved(track_index: usize) -> Self {
        Self {
            track_index,
            target: None,
            rest: Pose::IDENTITY,
            active: false,
            weight: 1.0,
            cursor: KeyframeCursor::default(),
        }
    }

    #[must_use]
    pub fn resolved(track_index: usize, target: BoundTarget, rest: Pose, active: bool) -> Self {
        Self {
            track_index,
            target: Some(target),
            rest,
            active,
            weight: 1.0,
            cursor: KeyframeCursor::default(),
        }
    }

    /// Active and bound to something.
    #[inline]
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        self.active && self.target.is_some()
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<NodeHandle> {
        self.target.map(|t| t.node())
    }

    #[inline]
    #[must_use]
    pub fn bone_index(&self) -> Option<usize> {
        self.target.and_then(|t| t.bone_index())
    }
}
