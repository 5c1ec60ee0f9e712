//! scene_forge: motion-redundancy curation of driving datasets.
//!
//! This library scores every scene of a dataset version by how much the ego
//! vehicle moves between consecutive samples, classifies scenes into high,
//! medium and low redundancy, and extracts referentially closed dataset
//! versions and training-index subsets from the classification.

// Core modules
pub mod cli;
pub mod config;
pub mod diagnose;
pub mod error;
pub mod extract;
pub mod motion;
pub mod report;
pub mod sampling;
pub mod split;
pub mod tables;

// Re-export commonly used error types
pub use config::{ConfigError, CurationConfig};
pub use error::{ExtractError, SplitError, TableError};
