//! Redundancy categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SplitError;

/// Bucket a scene falls into by its mean redundancy score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RedundancyCategory {
    #[serde(rename = "high_redundancy")]
    High,
    #[serde(rename = "medium_redundancy")]
    Medium,
    #[serde(rename = "low_redundancy")]
    Low,
}

impl RedundancyCategory {
    /// Every category, high to low.
    pub const ALL: [RedundancyCategory; 3] = [
        RedundancyCategory::High,
        RedundancyCategory::Medium,
        RedundancyCategory::Low,
    ];

    /// Key used in split artifacts and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            RedundancyCategory::High => "high_redundancy",
            RedundancyCategory::Medium => "medium_redundancy",
            RedundancyCategory::Low => "low_redundancy",
        }
    }

    /// One-word label (`high`, `medium`, `low`).
    pub fn short_name(&self) -> &'static str {
        match self {
            RedundancyCategory::High => "high",
            RedundancyCategory::Medium => "medium",
            RedundancyCategory::Low => "low",
        }
    }
}

impl fmt::Display for RedundancyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedundancyCategory {
    type Err = SplitError;

    /// Accepts either the artifact key or the short label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high_redundancy" | "high" => Ok(RedundancyCategory::High),
            "medium_redundancy" | "medium" => Ok(RedundancyCategory::Medium),
            "low_redundancy" | "low" => Ok(RedundancyCategory::Low),
            _ => Err(SplitError::UnknownCategory(s.to_string())),
        }
    }
}
