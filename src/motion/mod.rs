//! Ego-motion analysis of scene sample chains.
//!
//! Each scene is walked from its first sample along the `next` links. For
//! every consecutive pair of samples the ego displacement over the time step
//! gives a velocity, and the velocity maps onto a redundancy score in
//! `[0, 1]` through [`VelocityThresholds`]. A [`SceneSummary`] carries the
//! per-step sequences and their means.

pub mod analyzer;
pub mod summary;

pub use analyzer::{MotionAnalyzer, VelocityThresholds, DEFAULT_REFERENCE_CHANNEL};
pub use summary::{mean, SceneSummary};
