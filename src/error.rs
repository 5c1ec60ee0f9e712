//! Error types for scene-forge operations.
//!
//! Defines error types for the major subsystems:
//! - Table loading and token lookup
//! - Redundancy split validation, sampling and artifact persistence
//! - Subset extraction and training-index filtering

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or navigating dataset tables.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Required table '{file}' not found in {}", .dir.display())]
    MissingTable { file: String, dir: PathBuf },

    #[error("Token '{token}' not found in table '{table}'")]
    MissingToken { table: String, token: String },

    #[error("Sample '{sample}' has no '{channel}' entry in its data map")]
    MissingChannel { sample: String, channel: String },

    #[error("Sample chain of scene '{scene}' revisits sample '{token}'")]
    CorruptChain { scene: String, token: String },

    #[error("Failed to parse table file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TableError {
    /// Shorthand for a missing-token error.
    pub fn missing_token(table: impl Into<String>, token: impl Into<String>) -> Self {
        Self::MissingToken {
            table: table.into(),
            token: token.into(),
        }
    }
}

/// Errors that can occur while building, querying or persisting a redundancy split.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Ratios must each lie in [0, 1] and sum to 1 (train={train}, val={val}, test={test}, sum={sum})")]
    InvalidRatios {
        train: f64,
        val: f64,
        test: f64,
        sum: f64,
    },

    #[error("Invalid redundancy cuts: high_cut ({high}) must be >= low_cut ({low}) and both in [0, 1]")]
    InvalidCuts { high: f64, low: f64 },

    #[error("Invalid velocity thresholds: low ({low}) must be non-negative and below high ({high})")]
    InvalidThresholds { low: f64, high: f64 },

    #[error("Unknown redundancy category '{0}': expected high_redundancy, medium_redundancy or low_redundancy")]
    UnknownCategory(String),

    #[error("Unsupported split artifact '{}': expected a .json or .bin file", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Binary encoding error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Binary decoding error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while writing subsets or filtering training indices.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Training index '{}' is malformed: {reason}", .path.display())]
    MalformedIndex { path: PathBuf, reason: String },

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
