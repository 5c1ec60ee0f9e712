//! Relational tables of a driving-dataset version.
//!
//! A version is a directory of JSON arrays, one per table (`scene.json`,
//! `sample.json`, `sample_data.json`, ...). Rows reference each other by
//! token strings; [`Table`] keeps rows in file order and indexes them by
//! token so every foreign key resolves with a single hash lookup.
//!
//! The sample chain of a scene is such a token-linked list: the scene
//! points at its first sample and each sample names its `next`.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod records;
pub mod store;
pub mod table;

pub use records::{
    CalibratedSensor, EgoPose, ExtraFields, Instance, Keyed, Log, Sample, SampleAnnotation,
    SampleData, Scene, Sensor, VocabularyEntry,
};
pub use store::TableStore;
pub use table::{Table, TableKind};
