//! Subset extraction and the artifacts derived from a target token set.
//!
//! [`SubsetExtractor`] cascades a sample-token filter across every table of
//! a [`TableStore`](crate::tables::TableStore); [`dangling_references`]
//! checks that the result is closed; [`VersionWriter`] persists it.
//! Training indices are filtered by the same target sets.

pub mod closure;
pub mod extractor;
pub mod training_index;
pub mod writer;

pub use closure::{dangling_references, DanglingReference};
pub use extractor::{fingerprint, ExtractionReport, Subset, SubsetExtractor, TableCount};
pub use training_index::{
    filter_training_indices, TrainingIndex, TrainingIndexMode, TrainingSplitOutcome,
};
pub use writer::{VersionWriter, WrittenVersion};
