//! Redundancy classification and the split built from it.
//!
//! [`classify`] buckets scene summaries by their mean redundancy score into
//! a [`RedundancySplit`]. A [`SplitIndex`] wraps the split with reverse
//! lookups and the sampling policies that turn it into target token sets.

pub mod artifact;
pub mod category;
pub mod classifier;
pub mod index;
pub mod partition;
pub mod policy;
pub mod stats;

pub use artifact::{RedundancySplit, SavedSplit, SPLIT_BINARY_FILE, SPLIT_JSON_FILE};
pub use category::RedundancyCategory;
pub use classifier::{classify, RedundancyCuts};
pub use index::SplitIndex;
pub use partition::{DatasetSplit, SplitGranularity, SplitRatios};
pub use policy::{MixRatios, SelectionPolicy};
pub use stats::{CategoryStatistics, SummaryStats};
