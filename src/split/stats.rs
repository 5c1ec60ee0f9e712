//! Per-category descriptive statistics.

use serde::{Deserialize, Serialize};

use crate::motion::{mean, SceneSummary};

use super::category::RedundancyCategory;

/// Location and spread of a set of per-scene values.
///
/// `std` is the population standard deviation. Every field is 0.0 for an
/// empty set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStats {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        let mean = mean(values);
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

        Self {
            mean,
            median,
            std: variance.sqrt(),
            min: sorted[0],
            max: sorted[n - 1],
        }
    }
}

/// Statistics of one category of a split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStatistics {
    pub category: RedundancyCategory,
    pub num_scenes: usize,
    pub num_samples: usize,
    /// Over the scenes' mean velocities.
    pub velocity: SummaryStats,
    /// Over the scenes' mean redundancy scores.
    pub redundancy: SummaryStats,
}

impl CategoryStatistics {
    pub fn from_scenes(category: RedundancyCategory, scenes: &[SceneSummary]) -> Self {
        let velocities: Vec<f64> = scenes.iter().map(|s| s.avg_velocity).collect();
        let redundancies: Vec<f64> = scenes.iter().map(|s| s.avg_redundancy).collect();
        Self {
            category,
            num_scenes: scenes.len(),
            num_samples: scenes.iter().map(|s| s.sample_tokens.len()).sum(),
            velocity: SummaryStats::from_values(&velocities),
            redundancy: SummaryStats::from_values(&redundancies),
        }
    }
}
