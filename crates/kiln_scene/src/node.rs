use glam::Affine3A;
use kiln_core::StringHash;

use crate::NodeHandle;
use crate::transform::Transform;

/// A scene node.
///
/// Only keeps the data traversed every frame: name (and its hash, used for
/// animation track matching), hierarchy links and the transform.
///
/// # Hierarchy
///
/// Nodes form a tree through parent-child relationships:
/// - `parent`: handle to the parent node (`None` for root nodes)
/// - `children`: child node handles in insertion order
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    name_hash: StringHash,

    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    /// Transform component (hot data accessed every frame)
    pub transform: Transform,
}

impl Node {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            name_hash: StringHash::new(name),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn name_hash(&self) -> StringHash {
        self.name_hash
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.name_hash = StringHash::new(name);
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Returns the world matrix computed by the last transform pass.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.transform.world_matrix
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("")
    }
}
