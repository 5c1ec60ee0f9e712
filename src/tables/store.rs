//! In-memory dataset version: every table, loaded from and written to a
//! directory of JSON arrays.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::TableError;

use super::records::{
    CalibratedSensor, EgoPose, Instance, Keyed, Log, Sample, SampleAnnotation, SampleData, Scene,
    Sensor, VocabularyEntry,
};
use super::table::{Table, TableKind};

/// Raw records of one dataset version.
#[derive(Debug, Clone)]
pub struct TableStore {
    pub scene: Table<Scene>,
    pub sample: Table<Sample>,
    pub sample_data: Table<SampleData>,
    pub ego_pose: Table<EgoPose>,
    pub calibrated_sensor: Table<CalibratedSensor>,
    pub sensor: Table<Sensor>,
    pub log: Table<Log>,
    pub category: Table<VocabularyEntry>,
    pub attribute: Table<VocabularyEntry>,
    pub visibility: Table<VocabularyEntry>,
    pub instance: Table<Instance>,
    pub sample_annotation: Table<SampleAnnotation>,
    /// Set when the version ships `sample_annotation.json`, even an empty one.
    pub annotations_present: bool,
}

impl TableStore {
    /// A store with every table empty.
    pub fn empty() -> Self {
        Self {
            scene: Table::empty(TableKind::Scene),
            sample: Table::empty(TableKind::Sample),
            sample_data: Table::empty(TableKind::SampleData),
            ego_pose: Table::empty(TableKind::EgoPose),
            calibrated_sensor: Table::empty(TableKind::CalibratedSensor),
            sensor: Table::empty(TableKind::Sensor),
            log: Table::empty(TableKind::Log),
            category: Table::empty(TableKind::Category),
            attribute: Table::empty(TableKind::Attribute),
            visibility: Table::empty(TableKind::Visibility),
            instance: Table::empty(TableKind::Instance),
            sample_annotation: Table::empty(TableKind::SampleAnnotation),
            annotations_present: false,
        }
    }

    /// Loads a full dataset version.
    ///
    /// The seven structural tables must exist; the vocabulary and
    /// annotation tables are optional and load as empty when absent.
    ///
    /// # Errors
    ///
    /// Returns `TableError::MissingTable` when a required file is absent and
    /// `TableError::Parse` when a file is not a JSON array of records.
    pub fn load(dir: &Path) -> Result<Self, TableError> {
        info!(path = %dir.display(), "Loading dataset tables");

        let store = Self {
            scene: load_table(dir, TableKind::Scene)?,
            sample: load_table(dir, TableKind::Sample)?,
            sample_data: load_table(dir, TableKind::SampleData)?,
            ego_pose: load_table(dir, TableKind::EgoPose)?,
            calibrated_sensor: load_table(dir, TableKind::CalibratedSensor)?,
            sensor: load_table(dir, TableKind::Sensor)?,
            log: load_table(dir, TableKind::Log)?,
            category: load_table(dir, TableKind::Category)?,
            attribute: load_table(dir, TableKind::Attribute)?,
            visibility: load_table(dir, TableKind::Visibility)?,
            instance: load_table(dir, TableKind::Instance)?,
            sample_annotation: load_table(dir, TableKind::SampleAnnotation)?,
            annotations_present: dir.join(TableKind::SampleAnnotation.file_name()).is_file(),
        };

        info!(
            scenes = store.scene.len(),
            samples = store.sample.len(),
            sample_data = store.sample_data.len(),
            annotations = store.sample_annotation.len(),
            annotated = store.annotations_present,
            "Dataset tables loaded"
        );
        Ok(store)
    }

    /// Loads only the four tables motion analysis reads (sample, scene,
    /// sample_data, ego_pose); all other tables are left empty.
    pub fn load_motion_tables(dir: &Path) -> Result<Self, TableError> {
        info!(path = %dir.display(), "Loading motion tables");

        let mut store = Self::empty();
        store.sample = load_required(dir, TableKind::Sample)?;
        store.scene = load_required(dir, TableKind::Scene)?;
        store.sample_data = load_required(dir, TableKind::SampleData)?;
        store.ego_pose = load_required(dir, TableKind::EgoPose)?;

        info!(
            scenes = store.scene.len(),
            samples = store.sample.len(),
            ego_poses = store.ego_pose.len(),
            "Motion tables loaded"
        );
        Ok(store)
    }

    /// Whether the version carries annotations: the annotation file was
    /// present at load, or rows were added in memory.
    pub fn has_annotations(&self) -> bool {
        self.annotations_present || !self.sample_annotation.is_empty()
    }

    /// Row count for a table.
    pub fn row_count(&self, kind: TableKind) -> usize {
        match kind {
            TableKind::Scene => self.scene.len(),
            TableKind::Sample => self.sample.len(),
            TableKind::SampleData => self.sample_data.len(),
            TableKind::EgoPose => self.ego_pose.len(),
            TableKind::CalibratedSensor => self.calibrated_sensor.len(),
            TableKind::Sensor => self.sensor.len(),
            TableKind::Log => self.log.len(),
            TableKind::Category => self.category.len(),
            TableKind::Attribute => self.attribute.len(),
            TableKind::Visibility => self.visibility.len(),
            TableKind::Instance => self.instance.len(),
            TableKind::SampleAnnotation => self.sample_annotation.len(),
        }
    }

    /// Writes the version as one JSON array per table.
    ///
    /// Required tables are always written, even when empty; optional tables
    /// are written only when they have rows. An annotated version always
    /// gets its annotation file.
    pub fn write(&self, dir: &Path) -> Result<(), TableError> {
        fs::create_dir_all(dir)?;

        write_table(dir, &self.sample, false)?;
        write_table(dir, &self.scene, false)?;
        write_table(dir, &self.sample_data, false)?;
        write_table(dir, &self.ego_pose, false)?;
        write_table(dir, &self.calibrated_sensor, false)?;
        write_table(dir, &self.sensor, false)?;
        write_table(dir, &self.log, false)?;
        write_table(dir, &self.category, false)?;
        write_table(dir, &self.attribute, false)?;
        write_table(dir, &self.visibility, false)?;
        write_table(dir, &self.instance, false)?;
        write_table(dir, &self.sample_annotation, self.has_annotations())?;

        Ok(())
    }
}

fn load_required<T>(dir: &Path, kind: TableKind) -> Result<Table<T>, TableError>
where
    T: DeserializeOwned + Keyed,
{
    let path = dir.join(kind.file_name());
    if !path.exists() {
        return Err(TableError::MissingTable {
            file: kind.file_name(),
            dir: dir.to_path_buf(),
        });
    }
    read_table(&path, kind)
}

fn load_table<T>(dir: &Path, kind: TableKind) -> Result<Table<T>, TableError>
where
    T: DeserializeOwned + Keyed,
{
    if kind.is_required() {
        return load_required(dir, kind);
    }

    let path = dir.join(kind.file_name());
    if !path.exists() {
        debug!(table = %kind, "Optional table absent, using empty table");
        return Ok(Table::empty(kind));
    }
    read_table(&path, kind)
}

fn read_table<T>(path: &Path, kind: TableKind) -> Result<Table<T>, TableError>
where
    T: DeserializeOwned + Keyed,
{
    let reader = BufReader::new(fs::File::open(path)?);
    let rows: Vec<T> = serde_json::from_reader(reader).map_err(|source| TableError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(table = %kind, rows = rows.len(), "Loaded table");
    Ok(Table::new(kind, rows))
}

fn write_table<T>(dir: &Path, table: &Table<T>, keep_empty: bool) -> Result<(), TableError>
where
    T: Serialize + Keyed,
{
    if table.is_empty() && !table.kind().is_required() && !keep_empty {
        return Ok(());
    }

    let path = dir.join(table.kind().file_name());
    let mut writer = BufWriter::new(fs::File::create(&path)?);
    serde_json::to_writer(&mut writer, table.rows())?;
    writer.flush()?;

    info!(table = %table.kind(), rows = table.len(), "Saved table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::fixtures::DatasetBuilder;

    #[test]
    fn test_write_then_load_preserves_rows() {
        let store = DatasetBuilder::new()
            .scene("scene-a", &[(0, 0.0), (500_000, 1.0)])
            .with_annotations()
            .build();
        let dir = tempfile::tempdir().expect("tempdir");

        store.write(dir.path()).expect("write succeeds");
        let loaded = TableStore::load(dir.path()).expect("load succeeds");

        for kind in TableKind::ALL {
            assert_eq!(loaded.row_count(kind), store.row_count(kind), "{kind}");
        }
        assert_eq!(loaded.sample.rows(), store.sample.rows());
        assert!(loaded.has_annotations());
    }

    #[test]
    fn test_missing_required_table_is_fatal() {
        let store = DatasetBuilder::new().scene("scene-a", &[(0, 0.0)]).build();
        let dir = tempfile::tempdir().expect("tempdir");
        store.write(dir.path()).expect("write succeeds");
        std::fs::remove_file(dir.path().join("log.json")).expect("remove log");

        let err = TableStore::load(dir.path()).unwrap_err();
        match err {
            TableError::MissingTable { file, .. } => assert_eq!(file, "log.json"),
            other => panic!("expected MissingTable, got {other:?}"),
        }
    }

    #[test]
    fn test_optional_tables_default_to_empty() {
        let store = DatasetBuilder::new().scene("scene-a", &[(0, 0.0)]).build();
        let dir = tempfile::tempdir().expect("tempdir");
        store.write(dir.path()).expect("write succeeds");

        std::fs::remove_file(dir.path().join("category.json")).expect("remove category");

        assert!(!dir.path().join("sample_annotation.json").exists());
        let loaded = TableStore::load(dir.path()).expect("load succeeds");
        assert!(!loaded.has_annotations());
        assert!(loaded.category.is_empty());
        assert_eq!(loaded.attribute.len(), 1);
        assert!(loaded.instance.is_empty());
    }

    #[test]
    fn test_empty_annotation_file_counts_as_annotated() {
        let store = DatasetBuilder::new().scene("scene-a", &[(0, 0.0)]).build();
        let dir = tempfile::tempdir().expect("tempdir");
        store.write(dir.path()).expect("write succeeds");
        std::fs::write(dir.path().join("sample_annotation.json"), "[]").expect("write");

        let loaded = TableStore::load(dir.path()).expect("load succeeds");
        assert!(loaded.sample_annotation.is_empty());
        assert!(loaded.has_annotations());

        // The empty file survives a rewrite.
        let copy = tempfile::tempdir().expect("tempdir");
        loaded.write(copy.path()).expect("write succeeds");
        assert!(copy.path().join("sample_annotation.json").is_file());
        assert!(TableStore::load(copy.path()).expect("reload").has_annotations());
    }

    #[test]
    fn test_motion_tables_only_needs_four_files() {
        let store = DatasetBuilder::new()
            .scene("scene-a", &[(0, 0.0), (1_000_000, 2.0)])
            .build();
        let dir = tempfile::tempdir().expect("tempdir");
        store.write(dir.path()).expect("write succeeds");
        std::fs::remove_file(dir.path().join("sensor.json")).expect("remove sensor");

        let loaded = TableStore::load_motion_tables(dir.path()).expect("load succeeds");
        assert_eq!(loaded.sample.len(), 2);
        assert!(loaded.sensor.is_empty());
    }

    #[test]
    fn test_malformed_table_names_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("sample.json"), "{not json").expect("write");

        let err = TableStore::load_motion_tables(dir.path()).unwrap_err();
        assert!(err.to_string().contains("sample.json"));
    }
}
