//! Structural checks of a dataset directory before analysis.
//!
//! Diagnosis never fails: unreadable or malformed files become error
//! findings so that one run reports every problem at once.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::tables::TableKind;

/// Tables motion analysis cannot run without.
const MOTION_TABLES: [TableKind; 4] = [
    TableKind::Sample,
    TableKind::Scene,
    TableKind::SampleData,
    TableKind::EgoPose,
];

const SAMPLE_FIELDS: [&str; 6] = ["token", "timestamp", "scene_token", "next", "prev", "data"];
const EGO_POSE_FIELDS: [&str; 3] = ["token", "translation", "rotation"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// File or table the finding is about.
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisReport {
    pub dir: PathBuf,
    pub findings: Vec<Finding>,
}

impl DiagnosisReport {
    fn push(&mut self, severity: Severity, subject: &str, message: impl Into<String>) {
        let finding = Finding {
            severity,
            subject: subject.to_string(),
            message: message.into(),
        };
        debug!(severity = %finding.severity, subject, message = %finding.message, "Diagnosis finding");
        self.findings.push(finding);
    }

    /// True when no finding is an error.
    pub fn is_healthy(&self) -> bool {
        self.count(Severity::Error) == 0
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }
}

impl fmt::Display for DiagnosisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset diagnosis: {}", self.dir.display())?;
        for finding in &self.findings {
            writeln!(
                f,
                "  [{:<7}] {}: {}",
                finding.severity, finding.subject, finding.message
            )?;
        }
        write!(
            f,
            "{} error(s), {} warning(s)",
            self.count(Severity::Error),
            self.count(Severity::Warning)
        )
    }
}

/// Inspects the table files of `dir`.
///
/// Checks that the required tables exist, that `sample.json` is non-empty
/// and its first record carries the chain fields and the reference channel,
/// and that capture and pose records carry the fields analysis reads.
pub fn diagnose(dir: &Path, reference_channel: &str) -> DiagnosisReport {
    let mut report = DiagnosisReport {
        dir: dir.to_path_buf(),
        findings: Vec::new(),
    };

    if !dir.is_dir() {
        report.push(Severity::Error, &dir.display().to_string(), "directory does not exist");
        return report;
    }

    let mut motion_tables_present = true;
    for kind in TableKind::ALL.into_iter().filter(TableKind::is_required) {
        let file = kind.file_name();
        match fs::metadata(dir.join(&file)) {
            Ok(meta) => {
                let size_mb = meta.len() as f64 / (1024.0 * 1024.0);
                report.push(Severity::Ok, &file, format!("present ({size_mb:.2} MB)"));
            }
            Err(_) if MOTION_TABLES.contains(&kind) => {
                motion_tables_present = false;
                report.push(Severity::Error, &file, "missing; motion analysis needs it");
            }
            Err(_) => {
                report.push(Severity::Warning, &file, "missing; subset extraction needs it");
            }
        }
    }
    if !motion_tables_present {
        return report;
    }

    if let Some(samples) = read_records(&mut report, dir, TableKind::Sample) {
        check_first_sample(&mut report, &samples, reference_channel);
    }
    if let Some(sample_data) = read_records(&mut report, dir, TableKind::SampleData) {
        check_first_fields(
            &mut report,
            TableKind::SampleData,
            &sample_data,
            &["ego_pose_token"],
            Severity::Warning,
        );
    }
    if let Some(poses) = read_records(&mut report, dir, TableKind::EgoPose) {
        check_first_fields(&mut report, TableKind::EgoPose, &poses, &EGO_POSE_FIELDS, Severity::Error);
    }

    info!(
        errors = report.count(Severity::Error),
        warnings = report.count(Severity::Warning),
        "Diagnosis complete"
    );
    report
}

fn read_records(report: &mut DiagnosisReport, dir: &Path, kind: TableKind) -> Option<Vec<Value>> {
    let file = kind.file_name();
    let raw = match fs::read_to_string(dir.join(&file)) {
        Ok(raw) => raw,
        Err(err) => {
            report.push(Severity::Error, &file, format!("unreadable: {err}"));
            return None;
        }
    };
    match serde_json::from_str::<Vec<Value>>(&raw) {
        Ok(records) => {
            report.push(Severity::Ok, &file, format!("{} records", records.len()));
            Some(records)
        }
        Err(err) => {
            report.push(Severity::Error, &file, format!("not a JSON array of records: {err}"));
            None
        }
    }
}

fn check_first_sample(report: &mut DiagnosisReport, samples: &[Value], reference_channel: &str) {
    let subject = TableKind::Sample.file_name();
    let Some(first) = samples.first() else {
        report.push(Severity::Error, &subject, "table is empty");
        return;
    };

    if !check_first_fields(report, TableKind::Sample, samples, &SAMPLE_FIELDS, Severity::Error) {
        return;
    }

    let channels: Vec<&str> = first
        .get("data")
        .and_then(Value::as_object)
        .map(|data| data.keys().map(String::as_str).collect())
        .unwrap_or_default();
    if channels.contains(&reference_channel) {
        report.push(
            Severity::Ok,
            &subject,
            format!("reference channel {reference_channel} present"),
        );
    } else {
        report.push(
            Severity::Warning,
            &subject,
            format!(
                "first sample has no {reference_channel} channel (available: {})",
                channels.join(", ")
            ),
        );
    }
}

/// Reports fields missing from the first record at `severity`; true when
/// none are.
fn check_first_fields(
    report: &mut DiagnosisReport,
    kind: TableKind,
    records: &[Value],
    fields: &[&str],
    severity: Severity,
) -> bool {
    let subject = kind.file_name();
    let Some(first) = records.first() else {
        report.push(Severity::Warning, &subject, "table is empty");
        return false;
    };

    let missing: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|field| first.get(field).is_none())
        .collect();
    if missing.is_empty() {
        report.push(Severity::Ok, &subject, "first record has the expected fields");
        true
    } else {
        report.push(
            severity,
            &subject,
            format!("first record is missing fields: {}", missing.join(", ")),
        );
        false
    }
}
