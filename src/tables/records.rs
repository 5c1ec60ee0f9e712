//! Typed records for every dataset table.
//!
//! Each record names the fields the curation core reads and keeps the rest
//! in a flattened `extra` map, so a filtered table is written back with
//! every original field intact.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields a record carries that the core does not interpret.
pub type ExtraFields = Map<String, Value>;

/// A row addressable by its unique token.
pub trait Keyed {
    /// The row's primary key.
    fn token(&self) -> &str;
}

macro_rules! impl_keyed {
    ($($record:ty),+ $(,)?) => {
        $(
            impl Keyed for $record {
                fn token(&self) -> &str {
                    &self.token
                }
            }
        )+
    };
}

/// A recorded driving segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub token: String,
    #[serde(default)]
    pub name: String,
    pub log_token: String,
    pub first_sample_token: String,
    #[serde(default)]
    pub last_sample_token: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// One synchronized capture instant within a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub token: String,
    /// Capture time in microseconds.
    pub timestamp: i64,
    pub scene_token: String,
    /// Next sample in the scene chain; empty at the tail.
    #[serde(default)]
    pub next: String,
    /// Previous sample in the scene chain; empty at the head.
    #[serde(default)]
    pub prev: String,
    /// Sensor channel name to sample-data token.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A single sensor capture belonging to a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleData {
    pub token: String,
    #[serde(default)]
    pub sample_token: String,
    #[serde(default)]
    pub ego_pose_token: String,
    #[serde(default)]
    pub calibrated_sensor_token: String,
    #[serde(default)]
    pub filename: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Vehicle pose at a capture instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgoPose {
    pub token: String,
    pub translation: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 4],
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl EgoPose {
    /// Euclidean distance between two pose translations.
    pub fn distance_to(&self, other: &EgoPose) -> f64 {
        self.translation
            .iter()
            .zip(other.translation.iter())
            .map(|(a, b)| (b - a).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Sensor calibration for one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedSensor {
    pub token: String,
    pub sensor_token: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A physical sensor (channel and modality live in `extra`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub token: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Recording provenance for a set of scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub token: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A tracked object aggregating annotations across samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub token: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A per-sample annotation of one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleAnnotation {
    pub token: String,
    #[serde(default)]
    pub sample_token: String,
    #[serde(default)]
    pub instance_token: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A row of a closed vocabulary table (category, attribute, visibility).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub token: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl_keyed!(
    Scene,
    Sample,
    SampleData,
    EgoPose,
    CalibratedSensor,
    Sensor,
    Log,
    Instance,
    SampleAnnotation,
    VocabularyEntry,
);
