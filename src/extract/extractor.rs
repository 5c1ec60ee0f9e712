//! Referentially-closed subset extraction.
//!
//! Starting from a set of target sample tokens, the filter walks the
//! foreign-key graph in dependency order: each step derives the token set
//! the next table is filtered by. Derived tokens with no source row are
//! counted, never fatal. A backward pruning pass then drops every emitted
//! row whose foreign key did not resolve and detaches sample channels whose
//! capture was dropped, so the result never dangles.
//!
//! Each step is one linear pass over a table with hash-set membership
//! tests.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::tables::{Keyed, Sample, SampleData, Table, TableKind, TableStore};

/// Rows kept out of the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCount {
    pub kept: usize,
    pub total: usize,
}

/// What an extraction kept, skipped and dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Distinct target sample tokens.
    pub target_tokens: usize,
    /// Target tokens absent from the sample table.
    pub unknown_targets: usize,
    /// SHA-256 over the sorted target tokens, hex-encoded.
    pub fingerprint: String,
    pub tables: BTreeMap<TableKind, TableCount>,
    /// Derived foreign-key tokens with no row in the referenced table.
    pub unresolved: BTreeMap<TableKind, usize>,
    /// Rows dropped because a foreign key they carry did not resolve.
    pub pruned: BTreeMap<TableKind, usize>,
    /// Sample `data` entries removed because their capture was dropped.
    #[serde(default)]
    pub detached_channels: usize,
}

impl ExtractionReport {
    pub fn kept(&self, kind: TableKind) -> usize {
        self.tables.get(&kind).map_or(0, |count| count.kept)
    }

    pub fn unresolved(&self, kind: TableKind) -> usize {
        self.unresolved.get(&kind).copied().unwrap_or(0)
    }

    pub fn pruned(&self, kind: TableKind) -> usize {
        self.pruned.get(&kind).copied().unwrap_or(0)
    }

    /// Total of every skipped or dropped item.
    pub fn total_skipped(&self) -> usize {
        self.unknown_targets
            + self.unresolved.values().sum::<usize>()
            + self.pruned.values().sum::<usize>()
            + self.detached_channels
    }

    fn record_unresolved(&mut self, kind: TableKind, missing: usize) {
        if missing > 0 {
            warn!(table = %kind, missing, "Derived tokens with no source row skipped");
            *self.unresolved.entry(kind).or_default() += missing;
        }
    }

    fn record_pruned(&mut self, kind: TableKind, dropped: usize) {
        if dropped > 0 {
            warn!(table = %kind, dropped, "Rows with unresolved references dropped");
            *self.pruned.entry(kind).or_default() += dropped;
        }
    }
}

/// An extracted table set and its report.
#[derive(Debug, Clone)]
pub struct Subset {
    pub tables: TableStore,
    pub report: ExtractionReport,
}

/// Cuts referentially-closed subsets out of a table store.
#[derive(Debug, Clone, Copy)]
pub struct SubsetExtractor<'a> {
    store: &'a TableStore,
}

impl<'a> SubsetExtractor<'a> {
    pub fn new(store: &'a TableStore) -> Self {
        Self { store }
    }

    /// Extracts every row reachable from the target samples.
    ///
    /// Target tokens missing from the sample table are dropped silently and
    /// counted. The source store is never modified.
    pub fn extract<S: AsRef<str>>(&self, target: &[S]) -> Subset {
        let store = self.store;
        let target: HashSet<&str> = target.iter().map(AsRef::as_ref).collect();
        let mut report = ExtractionReport {
            target_tokens: target.len(),
            unknown_targets: target.iter().filter(|t| !store.sample.contains(t)).count(),
            fingerprint: fingerprint(&target),
            ..ExtractionReport::default()
        };
        if report.unknown_targets > 0 {
            warn!(
                unknown = report.unknown_targets,
                "Target tokens not found in sample table"
            );
        }

        // Samples, then the scenes and logs they hang from.
        let mut samples = store.sample.filtered(|s| target.contains(s.token.as_str()));
        let scene_tokens: HashSet<&str> = samples.rows().iter().map(|s| s.scene_token.as_str()).collect();
        report.record_unresolved(TableKind::Scene, missing_from(&scene_tokens, &store.scene));
        let mut scenes = store.scene.filtered(|s| scene_tokens.contains(s.token.as_str()));

        let log_tokens: HashSet<&str> = scenes.rows().iter().map(|s| s.log_token.as_str()).collect();
        report.record_unresolved(TableKind::Log, missing_from(&log_tokens, &store.log));
        let logs = store.log.filtered(|l| log_tokens.contains(l.token.as_str()));

        scenes = prune(&mut report, &scenes, |s| logs.contains(&s.log_token));
        samples = prune(&mut report, &samples, |s| scenes.contains(&s.scene_token));

        // Sensor captures and their calibration chain.
        let sample_data = store
            .sample_data
            .filtered(|sd| samples.contains(&sd.sample_token));

        let cs_tokens: HashSet<&str> = sample_data
            .rows()
            .iter()
            .map(|sd| sd.calibrated_sensor_token.as_str())
            .collect();
        report.record_unresolved(
            TableKind::CalibratedSensor,
            missing_from(&cs_tokens, &store.calibrated_sensor),
        );
        let calibrated = store
            .calibrated_sensor
            .filtered(|cs| cs_tokens.contains(cs.token.as_str()));

        let sensor_tokens: HashSet<&str> = calibrated
            .rows()
            .iter()
            .map(|cs| cs.sensor_token.as_str())
            .collect();
        report.record_unresolved(TableKind::Sensor, missing_from(&sensor_tokens, &store.sensor));
        let sensors = store.sensor.filtered(|s| sensor_tokens.contains(s.token.as_str()));
        let calibrated = prune(&mut report, &calibrated, |cs| sensors.contains(&cs.sensor_token));

        let pose_tokens: HashSet<&str> = sample_data
            .rows()
            .iter()
            .map(|sd| sd.ego_pose_token.as_str())
            .collect();
        report.record_unresolved(TableKind::EgoPose, missing_from(&pose_tokens, &store.ego_pose));
        let ego_poses = store.ego_pose.filtered(|p| pose_tokens.contains(p.token.as_str()));

        let sample_data = prune(&mut report, &sample_data, |sd| {
            ego_poses.contains(&sd.ego_pose_token) && calibrated.contains(&sd.calibrated_sensor_token)
        });

        // Drop rows the pruned captures no longer reference.
        let pose_tokens: HashSet<&str> = sample_data
            .rows()
            .iter()
            .map(|sd| sd.ego_pose_token.as_str())
            .collect();
        let ego_poses = prune(&mut report, &ego_poses, |p| pose_tokens.contains(p.token.as_str()));
        let cs_tokens: HashSet<&str> = sample_data
            .rows()
            .iter()
            .map(|sd| sd.calibrated_sensor_token.as_str())
            .collect();
        let calibrated = prune(&mut report, &calibrated, |cs| cs_tokens.contains(cs.token.as_str()));
        let sensor_tokens: HashSet<&str> = calibrated
            .rows()
            .iter()
            .map(|cs| cs.sensor_token.as_str())
            .collect();
        let sensors = prune(&mut report, &sensors, |s| sensor_tokens.contains(s.token.as_str()));

        // Samples keep only the channels whose capture survived.
        let samples = detach_missing_captures(&mut report, &samples, &sample_data);

        // Annotations and the instances they track.
        let annotations = store
            .sample_annotation
            .filtered(|a| samples.contains(&a.sample_token));
        let instance_tokens: HashSet<&str> = annotations
            .rows()
            .iter()
            .map(|a| a.instance_token.as_str())
            .collect();
        report.record_unresolved(
            TableKind::Instance,
            missing_from(&instance_tokens, &store.instance),
        );
        let instances = store
            .instance
            .filtered(|i| instance_tokens.contains(i.token.as_str()));
        let annotations = prune(&mut report, &annotations, |a| instances.contains(&a.instance_token));

        let tables = TableStore {
            scene: scenes,
            sample: samples,
            sample_data,
            ego_pose: ego_poses,
            calibrated_sensor: calibrated,
            sensor: sensors,
            log: logs,
            category: store.category.clone(),
            attribute: store.attribute.clone(),
            visibility: store.visibility.clone(),
            instance: instances,
            sample_annotation: annotations,
            annotations_present: store.has_annotations(),
        };

        for kind in TableKind::ALL {
            let count = TableCount {
                kept: tables.row_count(kind),
                total: store.row_count(kind),
            };
            debug!(table = %kind, kept = count.kept, total = count.total, "Filtered table");
            report.tables.insert(kind, count);
        }
        info!(
            targets = report.target_tokens,
            samples = report.kept(TableKind::Sample),
            scenes = report.kept(TableKind::Scene),
            sample_data = report.kept(TableKind::SampleData),
            skipped = report.total_skipped(),
            "Subset extracted"
        );

        Subset { tables, report }
    }
}

/// Keeps the rows satisfying `keep` and records how many were dropped.
fn prune<T, F>(report: &mut ExtractionReport, table: &Table<T>, keep: F) -> Table<T>
where
    T: Keyed + Clone,
    F: FnMut(&T) -> bool,
{
    let kept = table.filtered(keep);
    report.record_pruned(table.kind(), table.len() - kept.len());
    kept
}

/// Removes `data` entries that point at captures absent from `sample_data`.
fn detach_missing_captures(
    report: &mut ExtractionReport,
    samples: &Table<Sample>,
    sample_data: &Table<SampleData>,
) -> Table<Sample> {
    let mut detached = 0;
    let rows = samples
        .rows()
        .iter()
        .map(|sample| {
            let mut sample = sample.clone();
            let before = sample.data.len();
            sample.data.retain(|_, capture| sample_data.contains(capture));
            detached += before - sample.data.len();
            sample
        })
        .collect();
    if detached > 0 {
        warn!(detached, "Sample channels with dropped captures removed");
        report.detached_channels += detached;
    }
    Table::new(TableKind::Sample, rows)
}

fn missing_from<T: Keyed>(tokens: &HashSet<&str>, table: &Table<T>) -> usize {
    tokens.iter().filter(|t| !table.contains(t)).count()
}

/// Order-independent digest of a token set.
pub fn fingerprint(tokens: &HashSet<&str>) -> String {
    let mut sorted: Vec<&str> = tokens.iter().copied().collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for token in sorted {
        hasher.update(token.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
