//! Scene chain traversal and per-step velocity scoring.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::{SplitError, TableError};
use crate::tables::{EgoPose, Sample, TableStore};

use super::summary::SceneSummary;

/// Sensor channel whose ego pose locates a sample by default.
pub const DEFAULT_REFERENCE_CHANNEL: &str = "LIDAR_TOP";

/// Scenes between two progress log lines in [`MotionAnalyzer::analyze_all`].
const PROGRESS_INTERVAL: usize = 50;

/// Velocity band that maps ego speed onto a redundancy score.
///
/// At or below `low` a step scores 1.0 (near-stationary, fully redundant);
/// at or above `high` it scores 0.0. In between the score falls linearly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityThresholds {
    /// Speed in m/s at or below which a step is fully redundant.
    pub low: f64,
    /// Speed in m/s at or above which a step carries no redundancy.
    pub high: f64,
}

impl Default for VelocityThresholds {
    fn default() -> Self {
        Self {
            low: 1.0,
            high: 5.0,
        }
    }
}

impl VelocityThresholds {
    /// Builds a validated threshold pair.
    ///
    /// # Errors
    ///
    /// Returns `SplitError::InvalidThresholds` when `low` is negative or not
    /// strictly below `high`.
    pub fn new(low: f64, high: f64) -> Result<Self, SplitError> {
        let thresholds = Self { low, high };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), SplitError> {
        if !(self.low >= 0.0 && self.low < self.high) {
            return Err(SplitError::InvalidThresholds {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    /// Clamped linear redundancy score of a velocity.
    pub fn redundancy_score(&self, velocity: f64) -> f64 {
        if velocity <= self.low {
            1.0
        } else if velocity >= self.high {
            0.0
        } else {
            1.0 - (velocity - self.low) / (self.high - self.low)
        }
    }
}

/// Walks scene sample chains and scores the ego motion between samples.
///
/// The analyzer only reads the store; every lookup failure is a corrupt or
/// mismatched table and is propagated.
#[derive(Debug, Clone)]
pub struct MotionAnalyzer<'a> {
    store: &'a TableStore,
    thresholds: VelocityThresholds,
    reference_channel: String,
}

impl<'a> MotionAnalyzer<'a> {
    pub fn new(store: &'a TableStore, thresholds: VelocityThresholds) -> Self {
        Self {
            store,
            thresholds,
            reference_channel: DEFAULT_REFERENCE_CHANNEL.to_string(),
        }
    }

    /// Uses another sensor channel to locate samples.
    pub fn with_reference_channel(mut self, channel: impl Into<String>) -> Self {
        self.reference_channel = channel.into();
        self
    }

    pub fn thresholds(&self) -> VelocityThresholds {
        self.thresholds
    }

    pub fn reference_channel(&self) -> &str {
        &self.reference_channel
    }

    /// Sample tokens of a scene in chain order.
    ///
    /// Follows `next` from the scene's first sample until the link is empty.
    ///
    /// # Errors
    ///
    /// `TableError::MissingToken` when the scene or a linked sample does not
    /// exist, `TableError::CorruptChain` when the chain loops back on itself.
    pub fn sample_chain(&self, scene_token: &str) -> Result<Vec<&'a Sample>, TableError> {
        let scene = self.store.scene.require(scene_token)?;

        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = scene.first_sample_token.as_str();

        while !cursor.is_empty() {
            if !visited.insert(cursor) {
                return Err(TableError::CorruptChain {
                    scene: scene_token.to_string(),
                    token: cursor.to_string(),
                });
            }
            let sample = self.store.sample.require(cursor)?;
            chain.push(sample);
            cursor = sample.next.as_str();
        }

        Ok(chain)
    }

    /// Ego pose recorded by the reference channel of a sample.
    pub fn ego_pose_of(&self, sample: &Sample) -> Result<&'a EgoPose, TableError> {
        let data_token =
            sample
                .data
                .get(&self.reference_channel)
                .ok_or_else(|| TableError::MissingChannel {
                    sample: sample.token.clone(),
                    channel: self.reference_channel.clone(),
                })?;
        let sample_data = self.store.sample_data.require(data_token)?;
        self.store.ego_pose.require(&sample_data.ego_pose_token)
    }

    /// Ego speed in m/s between two consecutive samples.
    ///
    /// Identical timestamps give 0.0. A step that goes back in time yields a
    /// negative speed, which scores as fully redundant.
    pub fn step_velocity(&self, from: &Sample, to: &Sample) -> Result<f64, TableError> {
        let distance = self.ego_pose_of(from)?.distance_to(self.ego_pose_of(to)?);
        let dt = (to.timestamp - from.timestamp) as f64 / 1e6;
        if dt == 0.0 {
            return Ok(0.0);
        }
        Ok(distance / dt)
    }

    /// Analyzes one scene.
    pub fn analyze_scene(&self, scene_token: &str) -> Result<SceneSummary, TableError> {
        let scene = self.store.scene.require(scene_token)?;
        let chain = self.sample_chain(scene_token)?;

        let mut velocities = Vec::with_capacity(chain.len().saturating_sub(1));
        for pair in chain.windows(2) {
            velocities.push(self.step_velocity(pair[0], pair[1])?);
        }
        let scores = velocities
            .iter()
            .map(|&velocity| self.thresholds.redundancy_score(velocity))
            .collect();

        let sample_tokens = chain.iter().map(|sample| sample.token.clone()).collect();
        let summary =
            SceneSummary::from_steps(&scene.token, &scene.name, sample_tokens, velocities, scores);

        debug!(
            scene = %summary.scene_name,
            samples = summary.num_samples,
            avg_velocity = summary.avg_velocity,
            avg_redundancy = summary.avg_redundancy,
            "Analyzed scene"
        );
        Ok(summary)
    }

    /// Analyzes every scene in table order.
    pub fn analyze_all(&self) -> Result<Vec<SceneSummary>, TableError> {
        let total = self.store.scene.len();
        info!(
            scenes = total,
            low_velocity = self.thresholds.low,
            high_velocity = self.thresholds.high,
            channel = %self.reference_channel,
            "Analyzing scene motion"
        );

        let mut summaries = Vec::with_capacity(total);
        for (position, scene) in self.store.scene.rows().iter().enumerate() {
            summaries.push(self.analyze_scene(&scene.token)?);
            if (position + 1) % PROGRESS_INTERVAL == 0 {
                info!(done = position + 1, total, "Scene analysis progress");
            }
        }

        info!(scenes = summaries.len(), "Scene analysis complete");
        Ok(summaries)
    }
}
