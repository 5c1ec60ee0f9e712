//! Foreign-key closure check over a table set.

use std::fmt;

use serde::Serialize;

use crate::tables::{Keyed, Table, TableKind, TableStore};

/// A foreign key whose target row is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    /// Table holding the referencing row.
    pub table: TableKind,
    /// Token of the referencing row.
    pub row: String,
    pub field: &'static str,
    /// Table the field points into.
    pub target: TableKind,
    /// The unresolved token.
    pub token: String,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}].{} -> {} '{}' not found",
            self.table, self.row, self.field, self.target, self.token
        )
    }
}

/// Every foreign key in `store` that does not resolve.
///
/// Checks `scene_token`, `log_token`, `sample_token`, `ego_pose_token`,
/// `calibrated_sensor_token`, `sensor_token`, `instance_token` and every
/// capture in a sample's `data` map. Chain pointers between rows of the
/// same table are navigation links and are not checked.
pub fn dangling_references(store: &TableStore) -> Vec<DanglingReference> {
    let mut found = Vec::new();

    check(&mut found, &store.sample, "scene_token", &store.scene, |s| &s.scene_token);
    for sample in store.sample.rows() {
        for capture in sample.data.values() {
            if !store.sample_data.contains(capture) {
                found.push(DanglingReference {
                    table: TableKind::Sample,
                    row: sample.token.clone(),
                    field: "data",
                    target: TableKind::SampleData,
                    token: capture.clone(),
                });
            }
        }
    }
    check(&mut found, &store.scene, "log_token", &store.log, |s| &s.log_token);
    check(&mut found, &store.sample_data, "sample_token", &store.sample, |sd| &sd.sample_token);
    check(&mut found, &store.sample_data, "ego_pose_token", &store.ego_pose, |sd| {
        &sd.ego_pose_token
    });
    check(
        &mut found,
        &store.sample_data,
        "calibrated_sensor_token",
        &store.calibrated_sensor,
        |sd| &sd.calibrated_sensor_token,
    );
    check(&mut found, &store.calibrated_sensor, "sensor_token", &store.sensor, |cs| {
        &cs.sensor_token
    });
    check(&mut found, &store.sample_annotation, "sample_token", &store.sample, |a| {
        &a.sample_token
    });
    check(&mut found, &store.sample_annotation, "instance_token", &store.instance, |a| {
        &a.instance_token
    });

    found
}

fn check<R, T, F>(
    found: &mut Vec<DanglingReference>,
    rows: &Table<R>,
    field: &'static str,
    target: &Table<T>,
    key: F,
) where
    R: Keyed,
    T: Keyed,
    F: Fn(&R) -> &String,
{
    for row in rows.rows() {
        let token = key(row);
        if !target.contains(token) {
            found.push(DanglingReference {
                table: rows.kind(),
                row: row.token().to_string(),
                field,
                target: target.kind(),
                token: token.clone(),
            });
        }
    }
}
