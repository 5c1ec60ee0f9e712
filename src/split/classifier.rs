//! Threshold classification of scene summaries.

use tracing::info;

use crate::error::SplitError;
use crate::motion::SceneSummary;

use super::artifact::RedundancySplit;
use super::category::RedundancyCategory;

/// Score cut points separating the three categories.
///
/// `high` is expected to be at least `low`. Inverted cuts are rejected by
/// [`RedundancyCuts::new`]; a hand-built inverted pair classifies without
/// complaint and leaves the medium band empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedundancyCuts {
    pub high: f64,
    pub low: f64,
}

impl Default for RedundancyCuts {
    fn default() -> Self {
        Self {
            high: 0.6,
            low: 0.3,
        }
    }
}

impl RedundancyCuts {
    /// Builds a validated cut pair.
    pub fn new(high: f64, low: f64) -> Result<Self, SplitError> {
        let cuts = Self { high, low };
        cuts.validate()?;
        Ok(cuts)
    }

    /// Checks that both cuts lie in `[0, 1]` and `high >= low`.
    pub fn validate(&self) -> Result<(), SplitError> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_range(self.high) && in_range(self.low) && self.high >= self.low) {
            return Err(SplitError::InvalidCuts {
                high: self.high,
                low: self.low,
            });
        }
        Ok(())
    }

    /// Category of a mean redundancy score. The high cut is tested first.
    pub fn categorize(&self, avg_redundancy: f64) -> RedundancyCategory {
        if avg_redundancy >= self.high {
            RedundancyCategory::High
        } else if avg_redundancy <= self.low {
            RedundancyCategory::Low
        } else {
            RedundancyCategory::Medium
        }
    }
}

/// Partitions summaries into the three categories, keeping input order
/// within each category.
pub fn classify(summaries: Vec<SceneSummary>, cuts: &RedundancyCuts) -> RedundancySplit {
    let mut split = RedundancySplit::default();
    for summary in summaries {
        let category = cuts.categorize(summary.avg_redundancy);
        split.scenes_mut(category).push(summary);
    }

    for category in RedundancyCategory::ALL {
        let scenes = split.scenes(category);
        info!(
            category = %category,
            scenes = scenes.len(),
            samples = scenes.iter().map(|s| s.sample_tokens.len()).sum::<usize>(),
            "Classified scenes"
        );
    }
    split
}
