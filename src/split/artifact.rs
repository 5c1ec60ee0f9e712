//! The persisted redundancy split.
//!
//! A split is stored as a structure with exactly three keys, one per
//! category, each holding the scene summaries of that category. It is
//! written both as pretty JSON and as a compact bincode file; [`RedundancySplit::load`]
//! picks the decoder from the file extension.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SplitError;
use crate::motion::SceneSummary;
use crate::report;

use super::category::RedundancyCategory;
use super::stats::CategoryStatistics;

/// File name of the JSON form written by [`RedundancySplit::save_all`].
pub const SPLIT_JSON_FILE: &str = "redundancy_split.json";
/// File name of the binary form written by [`RedundancySplit::save_all`].
pub const SPLIT_BINARY_FILE: &str = "redundancy_split.bin";
/// File name of the text report written by [`RedundancySplit::save_all`].
pub const SPLIT_REPORT_FILE: &str = "redundancy_report.txt";

/// Scenes grouped by redundancy category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedundancySplit {
    pub high_redundancy: Vec<SceneSummary>,
    pub medium_redundancy: Vec<SceneSummary>,
    pub low_redundancy: Vec<SceneSummary>,
}

/// Paths produced by [`RedundancySplit::save_all`].
#[derive(Debug, Clone, Serialize)]
pub struct SavedSplit {
    pub json: PathBuf,
    pub binary: PathBuf,
    pub token_lists: Vec<PathBuf>,
    pub report: PathBuf,
}

impl RedundancySplit {
    pub fn scenes(&self, category: RedundancyCategory) -> &[SceneSummary] {
        match category {
            RedundancyCategory::High => &self.high_redundancy,
            RedundancyCategory::Medium => &self.medium_redundancy,
            RedundancyCategory::Low => &self.low_redundancy,
        }
    }

    pub(crate) fn scenes_mut(&mut self, category: RedundancyCategory) -> &mut Vec<SceneSummary> {
        match category {
            RedundancyCategory::High => &mut self.high_redundancy,
            RedundancyCategory::Medium => &mut self.medium_redundancy,
            RedundancyCategory::Low => &mut self.low_redundancy,
        }
    }

    /// Sample tokens of a category in scene order, then chain order.
    pub fn sample_tokens(&self, category: RedundancyCategory) -> Vec<String> {
        self.scenes(category)
            .iter()
            .flat_map(|scene| scene.sample_tokens.iter().cloned())
            .collect()
    }

    pub fn total_scenes(&self) -> usize {
        RedundancyCategory::ALL
            .iter()
            .map(|&category| self.scenes(category).len())
            .sum()
    }

    pub fn total_samples(&self) -> usize {
        RedundancyCategory::ALL
            .iter()
            .flat_map(|&category| self.scenes(category))
            .map(|scene| scene.sample_tokens.len())
            .sum()
    }

    /// Statistics for each category, high to low.
    pub fn statistics(&self) -> Vec<CategoryStatistics> {
        RedundancyCategory::ALL
            .iter()
            .map(|&category| CategoryStatistics::from_scenes(category, self.scenes(category)))
            .collect()
    }

    pub fn save_json(&self, path: &Path) -> Result<(), SplitError> {
        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!(path = %path.display(), "Saved split (JSON)");
        Ok(())
    }

    pub fn save_binary(&self, path: &Path) -> Result<(), SplitError> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        fs::write(path, bytes)?;
        info!(path = %path.display(), "Saved split (binary)");
        Ok(())
    }

    /// Loads a split from a `.json` or `.bin` file.
    ///
    /// # Errors
    ///
    /// `SplitError::UnsupportedFormat` for any other extension. A JSON file
    /// missing one of the three category keys fails with a JSON error naming
    /// the field.
    pub fn load(path: &Path) -> Result<Self, SplitError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let split: Self = match extension.as_deref() {
            Some("json") => {
                let reader = BufReader::new(fs::File::open(path)?);
                serde_json::from_reader(reader)?
            }
            Some("bin") => {
                let bytes = fs::read(path)?;
                let (split, _) =
                    bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
                split
            }
            _ => return Err(SplitError::UnsupportedFormat(path.to_path_buf())),
        };

        info!(
            path = %path.display(),
            scenes = split.total_scenes(),
            samples = split.total_samples(),
            "Loaded split"
        );
        Ok(split)
    }

    /// Writes both artifact forms, one token list per category and a text
    /// report into `dir`.
    pub fn save_all(&self, dir: &Path) -> Result<SavedSplit, SplitError> {
        fs::create_dir_all(dir)?;

        let json = dir.join(SPLIT_JSON_FILE);
        self.save_json(&json)?;
        let binary = dir.join(SPLIT_BINARY_FILE);
        self.save_binary(&binary)?;

        let mut token_lists = Vec::with_capacity(RedundancyCategory::ALL.len());
        for category in RedundancyCategory::ALL {
            let path = dir.join(format!("{}_sample_tokens.txt", category.as_str()));
            let tokens = self.sample_tokens(category);
            write_token_list(&path, &tokens)?;
            info!(path = %path.display(), samples = tokens.len(), "Saved sample tokens");
            token_lists.push(path);
        }

        let report_path = dir.join(SPLIT_REPORT_FILE);
        fs::write(&report_path, report::redundancy_report(self))?;
        info!(path = %report_path.display(), "Saved redundancy report");

        Ok(SavedSplit {
            json,
            binary,
            token_lists,
            report: report_path,
        })
    }
}

/// Writes one token per line.
pub fn write_token_list(path: &Path, tokens: &[String]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for token in tokens {
        writeln!(writer, "{token}")?;
    }
    writer.flush()
}
