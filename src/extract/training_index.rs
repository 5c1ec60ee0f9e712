//! Filtering of training-index artifacts.
//!
//! A training index is a JSON object with an `infos` array, one record per
//! training sample carrying the sample's `token`, and a free-form
//! `metadata` value. Files ending in `.gz` are gzip-compressed JSON.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::ExtractError;
use crate::split::{MixRatios, RedundancyCategory, SelectionPolicy, SplitIndex};

/// Per-sample training records plus passthrough metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingIndex {
    pub infos: Vec<Value>,
    #[serde(default)]
    pub metadata: Value,
}

impl TrainingIndex {
    /// Loads a `.json` or `.json.gz` index.
    ///
    /// # Errors
    ///
    /// `ExtractError::MalformedIndex` when the file is not an object with an
    /// `infos` array.
    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        let file = BufReader::new(File::open(path)?);
        let value: Value = if is_gzip(path) {
            let mut decoder = GzDecoder::new(file);
            let mut raw = String::new();
            decoder.read_to_string(&mut raw)?;
            serde_json::from_str(&raw)?
        } else {
            serde_json::from_reader(file)?
        };

        let malformed = |reason: &str| ExtractError::MalformedIndex {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        let Value::Object(mut object) = value else {
            return Err(malformed("top level is not an object"));
        };
        let infos = match object.remove("infos") {
            Some(Value::Array(infos)) => infos,
            Some(_) => return Err(malformed("'infos' is not an array")),
            None => return Err(malformed("missing 'infos'")),
        };
        let metadata = object
            .remove("metadata")
            .unwrap_or_else(|| Value::Object(Default::default()));

        info!(path = %path.display(), infos = infos.len(), "Loaded training index");
        Ok(Self { infos, metadata })
    }

    pub fn save(&self, path: &Path) -> Result<(), ExtractError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        if is_gzip(path) {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            serde_json::to_writer(&mut encoder, self)?;
            encoder.finish()?.flush()?;
        } else {
            let mut writer = writer;
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        info!(path = %path.display(), infos = self.infos.len(), "Saved training index");
        Ok(())
    }

    /// Keeps the records whose `token` is in `target`. Metadata passes
    /// through unchanged; records without a string `token` are dropped.
    pub fn filter(&self, target: &HashSet<&str>) -> Self {
        let infos: Vec<Value> = self
            .infos
            .iter()
            .filter(|info| {
                info.get("token")
                    .and_then(Value::as_str)
                    .is_some_and(|token| target.contains(token))
            })
            .cloned()
            .collect();
        info!(kept = infos.len(), total = self.infos.len(), "Filtered training index");
        Self {
            infos,
            metadata: self.metadata.clone(),
        }
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// How the target set for a training index is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainingIndexMode {
    /// Low-redundancy samples only.
    LowOnly,
    /// Per-category ratios.
    Custom(MixRatios),
    /// Equal counts from each category.
    Balanced,
}

impl TrainingIndexMode {
    pub fn policy(&self) -> SelectionPolicy {
        match self {
            TrainingIndexMode::LowOnly => SelectionPolicy::Categories {
                categories: vec![RedundancyCategory::Low],
            },
            TrainingIndexMode::Custom(ratios) => SelectionPolicy::CustomMix { ratios: *ratios },
            TrainingIndexMode::Balanced => SelectionPolicy::Balanced,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrainingIndexMode::LowOnly => "low_only",
            TrainingIndexMode::Custom(_) => "custom",
            TrainingIndexMode::Balanced => "balanced",
        }
    }
}

/// Result of [`filter_training_indices`].
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSplitOutcome {
    pub mode: &'static str,
    pub policy: String,
    pub target_tokens: usize,
    pub train_path: PathBuf,
    pub val_path: PathBuf,
    pub train_count: usize,
    pub val_count: usize,
    pub report_path: PathBuf,
}

/// Filters a train and a val index by the target set of `mode` and writes
/// both plus `training_split_report.txt` into `output_dir`.
///
/// Outputs are named `infos_train` and `infos_val` and keep the gzip
/// compression of their input.
pub fn filter_training_indices(
    index: &SplitIndex,
    mode: TrainingIndexMode,
    seed: u64,
    train: &Path,
    val: &Path,
    output_dir: &Path,
) -> Result<TrainingSplitOutcome, ExtractError> {
    let policy = mode.policy();
    let selected = policy.select(index, seed);
    let target: HashSet<&str> = selected.iter().map(String::as_str).collect();
    info!(mode = mode.name(), targets = target.len(), "Filtering training indices");

    fs::create_dir_all(output_dir)?;
    let train_path = output_dir.join(output_name("infos_train", train));
    let val_path = output_dir.join(output_name("infos_val", val));

    let train_index = TrainingIndex::load(train)?.filter(&target);
    train_index.save(&train_path)?;
    let val_index = TrainingIndex::load(val)?.filter(&target);
    val_index.save(&val_path)?;

    let outcome = TrainingSplitOutcome {
        mode: mode.name(),
        policy: policy.to_string(),
        target_tokens: target.len(),
        train_path,
        val_path,
        train_count: train_index.infos.len(),
        val_count: val_index.infos.len(),
        report_path: output_dir.join(crate::report::TRAINING_REPORT_FILE),
    };
    fs::write(&outcome.report_path, crate::report::training_report(index, &outcome))?;
    info!(path = %outcome.report_path.display(), "Saved training split report");
    Ok(outcome)
}

fn output_name(stem: &str, input: &Path) -> String {
    if is_gzip(input) {
        format!("{stem}.json.gz")
    } else {
        format!("{stem}.json")
    }
}
