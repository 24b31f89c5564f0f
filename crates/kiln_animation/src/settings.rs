use kiln_core::{KilnError, Result};
use serde::{Deserialize, Serialize};

/// Tuning knobs for animation states and the mixer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Effective track weights at or below this magnitude are skipped.
    pub weight_epsilon: f32,
    /// The mixer writes the bind or rest pose before applying states.
    pub reset_to_bind_pose: bool,
    /// The mixer runs the world-matrix pass after committing.
    pub update_world_transforms: bool,
    /// Log node-mode tracks that match no node.
    pub warn_unresolved_tracks: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            weight_epsilon: 1e-4,
            reset_to_bind_pose: true,
            update_world_transforms: false,
            warn_unresolved_tracks: true,
        }
    }
}

impl AnimationSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.weight_epsilon.is_finite() || self.weight_epsilon < 0.0 {
            return Err(KilnError::InvalidSettings(format!(
                "weight_epsilon must be finite and non-negative, got {}",
                self.weight_epsilon
            )));
        }
        Ok(())
    }
}
