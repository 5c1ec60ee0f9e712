//! Per-scene motion summary.

use serde::{Deserialize, Serialize};

/// Motion statistics of one scene.
///
/// `velocities` and `redundancy_scores` hold one entry per consecutive
/// sample pair, so a scene of N samples carries N-1 of each. Split
/// artifacts written without the per-step sequences still load; the
/// sequences then default to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub scene_token: String,
    pub scene_name: String,
    /// Sample tokens in chain order.
    pub sample_tokens: Vec<String>,
    /// Ego speed per step, in m/s.
    #[serde(default)]
    pub velocities: Vec<f64>,
    /// Redundancy score per step, in [0, 1].
    #[serde(default)]
    pub redundancy_scores: Vec<f64>,
    pub avg_velocity: f64,
    pub avg_redundancy: f64,
    pub num_samples: usize,
}

impl SceneSummary {
    /// Assembles a summary from the traversed chain and its per-step values.
    ///
    /// Scenes with fewer than two samples have no steps; both averages are
    /// then 0.0.
    pub fn from_steps(
        scene_token: impl Into<String>,
        scene_name: impl Into<String>,
        sample_tokens: Vec<String>,
        velocities: Vec<f64>,
        redundancy_scores: Vec<f64>,
    ) -> Self {
        let num_samples = sample_tokens.len();
        Self {
            scene_token: scene_token.into(),
            scene_name: scene_name.into(),
            avg_velocity: mean(&velocities),
            avg_redundancy: mean(&redundancy_scores),
            sample_tokens,
            velocities,
            redundancy_scores,
            num_samples,
        }
    }

    /// Number of velocity steps.
    pub fn step_count(&self) -> usize {
        self.velocities.len()
    }
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
