//! Sampling policies that turn a split index into a target token set.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sampling::TokenSampler;

use super::category::RedundancyCategory;
use super::index::SplitIndex;

/// Per-category sampling ratios for [`SplitIndex::custom_mix`].
///
/// A ratio of 1 or more keeps the whole category, a ratio in `(0, 1)`
/// keeps `floor(n * ratio)` samples, anything else keeps none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixRatios {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for MixRatios {
    /// Low redundancy only.
    fn default() -> Self {
        Self {
            high: 0.0,
            medium: 0.0,
            low: 1.0,
        }
    }
}

impl MixRatios {
    pub fn get(&self, category: RedundancyCategory) -> f64 {
        match category {
            RedundancyCategory::High => self.high,
            RedundancyCategory::Medium => self.medium,
            RedundancyCategory::Low => self.low,
        }
    }

    fn take_count(ratio: f64, available: usize) -> usize {
        if ratio >= 1.0 {
            available
        } else if ratio > 0.0 {
            (available as f64 * ratio).floor() as usize
        } else {
            0
        }
    }
}

impl SplitIndex {
    /// Every low-redundancy sample plus a partial draw from medium.
    ///
    /// The medium share is `floor(|low| * (1 - ratio))` samples, truncated
    /// to what the medium category holds.
    pub fn low_redundancy_subset(&self, ratio: f64, seed: u64) -> Vec<String> {
        let mut selected = self.samples_in(RedundancyCategory::Low);
        let wanted = (selected.len() as f64 * (1.0 - ratio)).floor().max(0.0) as usize;

        let medium = self.samples_in(RedundancyCategory::Medium);
        let drawn = TokenSampler::new(seed).draw(&medium, wanted);
        info!(
            low = selected.len(),
            medium_wanted = wanted,
            medium_drawn = drawn.len(),
            "Selected low-redundancy subset"
        );
        selected.extend(drawn);
        selected
    }

    /// Draws from each category by its own ratio, high to low, with one
    /// sampler seeded once.
    pub fn custom_mix(&self, ratios: &MixRatios, seed: u64) -> Vec<String> {
        let mut sampler = TokenSampler::new(seed);
        let mut selected = Vec::new();

        for category in RedundancyCategory::ALL {
            let tokens = self.samples_in(category);
            let ratio = ratios.get(category);
            let count = MixRatios::take_count(ratio, tokens.len());
            let chosen = if count == tokens.len() {
                tokens
            } else {
                sampler.draw(&tokens, count)
            };
            info!(category = %category, ratio, selected = chosen.len(), "Mixed category");
            selected.extend(chosen);
        }
        selected
    }

    /// Every sample of the named categories, in the order given.
    pub fn categories_union(&self, categories: &[RedundancyCategory]) -> Vec<String> {
        let mut seen = Vec::with_capacity(categories.len());
        let mut selected = Vec::new();
        for &category in categories {
            if seen.contains(&category) {
                continue;
            }
            seen.push(category);
            selected.extend(self.samples_in(category));
        }
        selected
    }
}

/// How a target token set is chosen from a split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Every sample of the listed categories.
    Categories { categories: Vec<RedundancyCategory> },
    /// All low samples plus part of medium.
    LowRedundancy { ratio: f64 },
    /// Independent per-category ratios.
    CustomMix { ratios: MixRatios },
    /// Equal counts from each category.
    Balanced,
}

impl SelectionPolicy {
    pub fn select(&self, index: &SplitIndex, seed: u64) -> Vec<String> {
        match self {
            SelectionPolicy::Categories { categories } => index.categories_union(categories),
            SelectionPolicy::LowRedundancy { ratio } => index.low_redundancy_subset(*ratio, seed),
            SelectionPolicy::CustomMix { ratios } => index.custom_mix(ratios, seed),
            SelectionPolicy::Balanced => {
                // Hash order is arbitrary; keep the index order instead.
                let chosen = index.balanced_subset(seed);
                RedundancyCategory::ALL
                    .iter()
                    .flat_map(|&category| index.samples_in(category))
                    .filter(|token| chosen.contains(token))
                    .collect()
            }
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::Categories { categories } => {
                let names: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
                write!(f, "categories [{}]", names.join(", "))
            }
            SelectionPolicy::LowRedundancy { ratio } => {
                write!(f, "low redundancy (ratio {ratio:.2})")
            }
            SelectionPolicy::CustomMix { ratios } => write!(
                f,
                "custom mix (high {:.1}%, medium {:.1}%, low {:.1}%)",
                ratios.high * 100.0,
                ratios.medium * 100.0,
                ratios.low * 100.0
            ),
            SelectionPolicy::Balanced => f.write_str("balanced"),
        }
    }
}
