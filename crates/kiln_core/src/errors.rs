//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`KilnError`] covers configuration-time failures:
//! - Scene handles that no longer resolve (removed nodes or skeletons)
//! - Malformed skeleton hierarchies
//! - Out-of-range edits on key frames and trigger points
//! - Invalid settings
//!
//! Per-frame operations (time stepping, blending, weight lookups) never
//! return errors. They degrade to no-ops or `None` instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use kiln_core::errors::{KilnError, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the Kiln engine.
#[derive(Error, Debug)]
pub enum KilnError {
    // ========================================================================
    // Scene Errors
    // ========================================================================
    /// The skeleton handle does not resolve in the scene.
    #[error("Skeleton not found")]
    SkeletonNotFound,

    /// The node handle does not resolve in the scene.
    #[error("Node not found")]
    NodeNotFound,

    // ========================================================================
    // Skeleton Errors
    // ========================================================================
    /// A bone references a parent outside the bone list, or itself.
    #[error("Bone {bone} has invalid parent index {parent}")]
    InvalidBoneParent {
        /// Index of the offending bone
        bone: usize,
        /// The parent index it declared
        parent: usize,
    },

    /// Following parent links from this bone never reaches a root.
    #[error("Bone hierarchy contains a cycle through bone {bone}")]
    BoneHierarchyCycle {
        /// A bone on the cycle
        bone: usize,
    },

    /// The skeleton has no parentless bone.
    #[error("Skeleton has no root bone")]
    NoRootBone,

    // ========================================================================
    // Animation Data Errors
    // ========================================================================
    /// Key frame index out of bounds.
    #[error("Key frame index out of bounds: track '{track}' (index: {index})")]
    KeyFrameIndexOutOfBounds {
        /// Name of the track being edited
        track: String,
        /// The invalid index
        index: usize,
    },

    /// Trigger point index out of bounds.
    #[error("Trigger index out of bounds (index: {index})")]
    TriggerIndexOutOfBounds {
        /// The invalid index
        index: usize,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Alias for `Result<T, KilnError>`.
pub type Result<T> = std::result::Result<T, KilnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = KilnError::KeyFrameIndexOutOfBounds {
            track: "Bip01_Spine".to_string(),
            index: 7,
        };
        assert_eq!(
            err.to_string(),
            "Key frame index out of bounds: track 'Bip01_Spine' (index: 7)"
        );

        let err = KilnError::InvalidBoneParent { bone: 2, parent: 9 };
        assert_eq!(err.to_string(), "Bone 2 has invalid parent index 9");
    }

    #[test]
    fn json_errors_convert() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: KilnError = parse.unwrap_err().into();
        assert!(matches!(err, KilnError::JsonError(_)));
    }
}
