//! Scene Graph
//!
//! Manages the scene hierarchy and the data animation writes into:
//! - [`Node`]: named scene node with parent/child links and a transform
//! - [`Transform`]: local position, rotation, scale with cached matrices
//! - [`Scene`]: node and skeleton storage
//! - [`Skeleton`]: ordered bones with bind pose and a parent-index array
//! - [`transform_system`]: world-matrix propagation, decoupled from `Scene`
//!
//! Nodes and skeletons are addressed through generational handles
//! ([`NodeHandle`], [`SkeletonKey`]). A handle to a removed entry resolves to
//! `None` instead of dangling.

pub mod node;
pub mod scene;
pub mod skeleton;
pub mod transform;
pub mod transform_system;

pub use node::Node;
pub use scene::{NodeBuilder, Scene};
pub use skeleton::{Bone, Skeleton};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct SkeletonKey;
}
