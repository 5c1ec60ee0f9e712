//! Token-indexed table container.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TableError;

use super::records::Keyed;

/// Every table a dataset version can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Scene,
    Sample,
    SampleData,
    EgoPose,
    CalibratedSensor,
    Sensor,
    Log,
    Category,
    Attribute,
    Visibility,
    Instance,
    SampleAnnotation,
}

impl TableKind {
    /// All tables in the order they are loaded and reported.
    pub const ALL: [TableKind; 12] = [
        TableKind::Sample,
        TableKind::Scene,
        TableKind::SampleData,
        TableKind::EgoPose,
        TableKind::CalibratedSensor,
        TableKind::Sensor,
        TableKind::Log,
        TableKind::Category,
        TableKind::Attribute,
        TableKind::Visibility,
        TableKind::Instance,
        TableKind::SampleAnnotation,
    ];

    /// Table name as used in file names and foreign-key fields.
    pub fn name(&self) -> &'static str {
        match self {
            TableKind::Scene => "scene",
            TableKind::Sample => "sample",
            TableKind::SampleData => "sample_data",
            TableKind::EgoPose => "ego_pose",
            TableKind::CalibratedSensor => "calibrated_sensor",
            TableKind::Sensor => "sensor",
            TableKind::Log => "log",
            TableKind::Category => "category",
            TableKind::Attribute => "attribute",
            TableKind::Visibility => "visibility",
            TableKind::Instance => "instance",
            TableKind::SampleAnnotation => "sample_annotation",
        }
    }

    /// File the table is stored in.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.name())
    }

    /// Whether a dataset version is unusable without this table.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            TableKind::Scene
                | TableKind::Sample
                | TableKind::SampleData
                | TableKind::EgoPose
                | TableKind::CalibratedSensor
                | TableKind::Sensor
                | TableKind::Log
        )
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rows of one table in file order, indexed by token.
#[derive(Debug, Clone)]
pub struct Table<T> {
    kind: TableKind,
    rows: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Keyed> Table<T> {
    /// Builds a table and its token index. When a token repeats, lookups
    /// resolve to its first row.
    pub fn new(kind: TableKind, rows: Vec<T>) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            index.entry(row.token().to_string()).or_insert(position);
        }
        Self { kind, rows, index }
    }

    /// An empty table of the given kind.
    pub fn empty(kind: TableKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    pub fn get(&self, token: &str) -> Option<&T> {
        self.index.get(token).map(|&position| &self.rows[position])
    }

    /// Looks up a row, failing with a lookup error that names this table.
    pub fn require(&self, token: &str) -> Result<&T, TableError> {
        self.get(token)
            .ok_or_else(|| TableError::missing_token(self.kind.name(), token))
    }

    /// Set of tokens present in the table.
    pub fn token_set(&self) -> HashSet<&str> {
        self.rows.iter().map(Keyed::token).collect()
    }
}

impl<T: Keyed + Clone> Table<T> {
    /// Clones the rows that satisfy `keep` into a new table.
    pub fn filtered<F>(&self, mut keep: F) -> Table<T>
    where
        F: FnMut(&T) -> bool,
    {
        let rows = self.rows.iter().filter(|row| keep(row)).cloned().collect();
        Table::new(self.kind, rows)
    }
}
