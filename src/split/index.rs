//! Read-only query layer over a redundancy split.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::debug;

use crate::error::SplitError;
use crate::motion::SceneSummary;
use crate::sampling::TokenSampler;

use super::artifact::RedundancySplit;
use super::category::RedundancyCategory;
use super::stats::CategoryStatistics;

/// A redundancy split plus reverse lookups from sample and scene tokens to
/// their category.
///
/// Built once, then shared by reference with every policy and extraction.
/// The reverse maps are filled at construction so lookups are O(1).
#[derive(Debug, Clone)]
pub struct SplitIndex {
    split: RedundancySplit,
    sample_category: HashMap<String, RedundancyCategory>,
    scene_position: HashMap<String, (RedundancyCategory, usize)>,
}

impl SplitIndex {
    pub fn new(split: RedundancySplit) -> Self {
        let mut sample_category = HashMap::with_capacity(split.total_samples());
        let mut scene_position = HashMap::with_capacity(split.total_scenes());

        for category in RedundancyCategory::ALL {
            for (position, scene) in split.scenes(category).iter().enumerate() {
                scene_position.insert(scene.scene_token.clone(), (category, position));
                for token in &scene.sample_tokens {
                    sample_category.insert(token.clone(), category);
                }
            }
        }

        debug!(
            scenes = scene_position.len(),
            samples = sample_category.len(),
            "Built split index"
        );
        Self {
            split,
            sample_category,
            scene_position,
        }
    }

    /// Loads a split artifact (`.json` or `.bin`) and indexes it.
    pub fn load(path: &Path) -> Result<Self, SplitError> {
        Ok(Self::new(RedundancySplit::load(path)?))
    }

    pub fn split(&self) -> &RedundancySplit {
        &self.split
    }

    pub fn into_split(self) -> RedundancySplit {
        self.split
    }

    /// Every sample token of a category, scene order then chain order.
    pub fn samples_in(&self, category: RedundancyCategory) -> Vec<String> {
        self.split.sample_tokens(category)
    }

    pub fn sample_count(&self, category: RedundancyCategory) -> usize {
        self.split
            .scenes(category)
            .iter()
            .map(|scene| scene.sample_tokens.len())
            .sum()
    }

    pub fn scenes_in(&self, category: RedundancyCategory) -> &[SceneSummary] {
        self.split.scenes(category)
    }

    pub fn category_of_sample(&self, token: &str) -> Option<RedundancyCategory> {
        self.sample_category.get(token).copied()
    }

    pub fn category_of_scene(&self, token: &str) -> Option<RedundancyCategory> {
        self.scene_position.get(token).map(|&(category, _)| category)
    }

    pub fn scene_summary(&self, token: &str) -> Option<&SceneSummary> {
        self.scene_position
            .get(token)
            .and_then(|&(category, position)| self.split.scenes(category).get(position))
    }

    pub fn statistics(&self) -> Vec<CategoryStatistics> {
        self.split.statistics()
    }

    /// Per-category statistics restricted to `tokens`.
    ///
    /// A scene counts when at least one of its samples is selected, and
    /// `num_samples` counts only the selected samples. Tokens outside the
    /// split are ignored.
    pub fn selection_statistics<'a, I>(&self, tokens: I) -> Vec<CategoryStatistics>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let selected: HashSet<&str> = tokens
            .into_iter()
            .filter(|token| self.sample_category.contains_key(*token))
            .collect();

        RedundancyCategory::ALL
            .iter()
            .map(|&category| {
                let touched: Vec<SceneSummary> = self
                    .scenes_in(category)
                    .iter()
                    .filter(|scene| scene.sample_tokens.iter().any(|t| selected.contains(t.as_str())))
                    .cloned()
                    .collect();
                let mut stats = CategoryStatistics::from_scenes(category, &touched);
                stats.num_samples = touched
                    .iter()
                    .flat_map(|scene| &scene.sample_tokens)
                    .filter(|t| selected.contains(t.as_str()))
                    .count();
                stats
            })
            .collect()
    }

    /// Draws `min(n, |category|)` sample tokens without replacement.
    pub fn sample_n(&self, category: RedundancyCategory, n: usize, seed: u64) -> Vec<String> {
        TokenSampler::new(seed).draw(&self.samples_in(category), n)
    }

    /// Equal-size draw from each category.
    ///
    /// Takes `m = min` of the three category sizes and draws `m` tokens from
    /// each with one sampler seeded once. An empty category makes the
    /// result empty.
    pub fn balanced_subset(&self, seed: u64) -> HashSet<String> {
        let per_category = RedundancyCategory::ALL
            .iter()
            .map(|&category| self.sample_count(category))
            .min()
            .unwrap_or(0);

        let mut sampler = TokenSampler::new(seed);
        let mut selected = HashSet::with_capacity(per_category * 3);
        for category in RedundancyCategory::ALL {
            selected.extend(sampler.draw(&self.samples_in(category), per_category));
        }
        debug!(per_category, total = selected.len(), "Drew balanced subset");
        selected
    }
}
