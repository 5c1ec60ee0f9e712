//! Stratified train/val/test partitioning.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SplitError;
use crate::sampling::TokenSampler;

use super::artifact::write_token_list;
use super::category::RedundancyCategory;
use super::index::SplitIndex;

/// Allowed deviation of the ratio sum from 1.
const RATIO_TOLERANCE: f64 = 1e-6;

/// Fractions of each category assigned to train, val and test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.7,
            val: 0.15,
            test: 0.15,
        }
    }
}

impl SplitRatios {
    pub fn new(train: f64, val: f64, test: f64) -> Result<Self, SplitError> {
        let ratios = Self { train, val, test };
        ratios.validate()?;
        Ok(ratios)
    }

    /// Each ratio must lie in `[0, 1]` and the three must sum to 1 within
    /// `1e-6`.
    pub fn validate(&self) -> Result<(), SplitError> {
        let sum = self.train + self.val + self.test;
        let in_range = [self.train, self.val, self.test]
            .iter()
            .all(|r| (0.0..=1.0).contains(r));
        if !in_range || (sum - 1.0).abs() >= RATIO_TOLERANCE {
            return Err(SplitError::InvalidRatios {
                train: self.train,
                val: self.val,
                test: self.test,
                sum,
            });
        }
        Ok(())
    }

    /// Cut points `(train_end, val_end)` for a pool of `n` items.
    fn cut_points(&self, n: usize) -> (usize, usize) {
        let train = (n as f64 * self.train).floor() as usize;
        let val = (n as f64 * self.val).floor() as usize;
        let train_end = train.min(n);
        (train_end, (train_end + val).min(n))
    }
}

/// Unit that is shuffled and assigned to a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitGranularity {
    /// Whole scenes; no scene contributes to more than one split.
    #[default]
    Scene,
    /// Individual samples.
    Sample,
}

/// Sample tokens assigned to each split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSplit {
    pub train: Vec<String>,
    pub val: Vec<String>,
    pub test: Vec<String>,
}

impl DatasetSplit {
    pub fn total(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    /// Writes `train.txt`, `val.txt` and `test.txt`, one token per line.
    pub fn save_token_lists(&self, dir: &Path) -> Result<(), SplitError> {
        fs::create_dir_all(dir)?;
        for (name, tokens) in [("train", &self.train), ("val", &self.val), ("test", &self.test)] {
            let path = dir.join(format!("{name}.txt"));
            write_token_list(&path, tokens)?;
            info!(path = %path.display(), samples = tokens.len(), "Saved split tokens");
        }
        Ok(())
    }
}

impl SplitIndex {
    /// Partitions every category independently and unions the results.
    ///
    /// Per category the units are shuffled, then cut at `floor(n * train)`
    /// and `floor(n * train) + floor(n * val)`; the remainder goes to test.
    /// One sampler seeded once serves all three categories.
    ///
    /// # Errors
    ///
    /// `SplitError::InvalidRatios` before any shuffling when the ratios are
    /// out of range or do not sum to 1.
    pub fn scene_train_val_test_split(
        &self,
        ratios: &SplitRatios,
        seed: u64,
        granularity: SplitGranularity,
    ) -> Result<DatasetSplit, SplitError> {
        ratios.validate()?;

        let mut sampler = TokenSampler::new(seed);
        let mut result = DatasetSplit::default();

        for category in RedundancyCategory::ALL {
            match granularity {
                SplitGranularity::Scene => {
                    let scenes = self.scenes_in(category);
                    let positions: Vec<usize> = (0..scenes.len()).collect();
                    let order = sampler.shuffled(&positions);
                    let (train_end, val_end) = ratios.cut_points(order.len());
                    let tokens_of = |positions: &[usize]| -> Vec<String> {
                        positions
                            .iter()
                            .flat_map(|&p| scenes[p].sample_tokens.iter().cloned())
                            .collect()
                    };
                    result.train.extend(tokens_of(&order[..train_end]));
                    result.val.extend(tokens_of(&order[train_end..val_end]));
                    result.test.extend(tokens_of(&order[val_end..]));
                }
                SplitGranularity::Sample => {
                    let order = sampler.shuffled(&self.samples_in(category));
                    let (train_end, val_end) = ratios.cut_points(order.len());
                    result.train.extend_from_slice(&order[..train_end]);
                    result.val.extend_from_slice(&order[train_end..val_end]);
                    result.test.extend_from_slice(&order[val_end..]);
                }
            }
        }

        info!(
            train = result.train.len(),
            val = result.val.len(),
            test = result.test.len(),
            granularity = ?granularity,
            "Partitioned split"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::index::tests::index_from;
    use std::collections::HashSet;

    fn ten_scene_index() -> SplitIndex {
        use crate::split::category::RedundancyCategory::{High, Low, Medium};
        let names: Vec<String> = (0..10).map(|i| format!("sc{i}")).collect();
        let mut scenes = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let category = [High, Medium, Low][i % 3];
            scenes.push((category, name.as_str(), 4));
        }
        index_from(&scenes)
    }

    #[test]
    fn test_ratio_validation() {
        assert!(SplitRatios::new(0.7, 0.15, 0.15).is_ok());
        let err = SplitRatios::new(0.5, 0.25, 0.5).unwrap_err();
        assert!(err.to_string().contains("sum=1.25"));
        assert!(SplitRatios::new(1.2, -0.1, -0.1).is_err());
    }

    #[test]
    fn test_invalid_ratios_fail_before_split() {
        let index = ten_scene_index();
        let ratios = SplitRatios {
            train: 0.5,
            val: 0.5,
            test: 0.5,
        };
        assert!(index
            .scene_train_val_test_split(&ratios, 42, SplitGranularity::Scene)
            .is_err());
    }

    #[test]
    fn test_scene_split_has_no_leakage() {
        let index = ten_scene_index();
        let split = index
            .scene_train_val_test_split(&SplitRatios::default(), 42, SplitGranularity::Scene)
            .expect("split succeeds");

        assert_eq!(split.total(), 40);
        let scene_of = |token: &String| token.split("-s").next().map(str::to_string);
        let sets: Vec<HashSet<Option<String>>> = [&split.train, &split.val, &split.test]
            .iter()
            .map(|tokens| tokens.iter().map(scene_of).collect())
            .collect();
        assert!(sets[0].is_disjoint(&sets[1]));
        assert!(sets[0].is_disjoint(&sets[2]));
        assert!(sets[1].is_disjoint(&sets[2]));
    }

    #[test]
    fn test_cut_points_floor_each_ratio() {
        let ratios = SplitRatios::default();
        // 4 scenes: floor(2.8) = 2 train, floor(0.6) = 0 val, 2 test.
        assert_eq!(ratios.cut_points(4), (2, 2));
        assert_eq!(ratios.cut_points(9), (6, 7));
        assert_eq!(ratios.cut_points(0), (0, 0));
    }

    #[test]
    fn test_sample_split_counts() {
        let index = ten_scene_index();
        let split = index
            .scene_train_val_test_split(&SplitRatios::default(), 3, SplitGranularity::Sample)
            .expect("split succeeds");
        // Categories hold 16, 12 and 12 samples.
        assert_eq!(split.train.len(), 11 + 8 + 8);
        assert_eq!(split.val.len(), 2 + 1 + 1);
        assert_eq!(split.total(), 40);
        let unique: HashSet<&String> = split
            .train
            .iter()
            .chain(&split.val)
            .chain(&split.test)
            .collect();
        assert_eq!(unique.len(), 40);
    }

    #[test]
    fn test_split_is_deterministic() {
        let index = ten_scene_index();
        let ratios = SplitRatios::default();
        let a = index
            .scene_train_val_test_split(&ratios, 9, SplitGranularity::Scene)
            .expect("split");
        let b = index
            .scene_train_val_test_split(&ratios, 9, SplitGranularity::Scene)
            .expect("split");
        assert_eq!(a, b);
    }

    #[test]
    fn test_save_token_lists() {
        let index = ten_scene_index();
        let split = index
            .scene_train_val_test_split(&SplitRatios::default(), 1, SplitGranularity::Scene)
            .expect("split");
        let dir = tempfile::tempdir().expect("tempdir");
        split.save_token_lists(dir.path()).expect("save");
        let train = fs::read_to_string(dir.path().join("train.txt")).expect("read");
        assert_eq!(train.lines().count(), split.train.len());
    }
}
