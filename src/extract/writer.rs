//! Persists an extracted subset as a new dataset version.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ExtractError;
use crate::report;
use crate::split::CategoryStatistics;

use super::extractor::Subset;

/// Paths of a written version.
#[derive(Debug, Clone)]
pub struct WrittenVersion {
    pub name: String,
    pub tables_dir: PathBuf,
    pub report_path: PathBuf,
}

/// Writes versions under a common output root.
///
/// A version named `v1.0-low-redundancy` lands in
/// `<root>/v1.0-low-redundancy/` with its report next to it as
/// `<root>/v1.0-low-redundancy_report.txt`.
#[derive(Debug, Clone)]
pub struct VersionWriter {
    output_root: PathBuf,
}

impl VersionWriter {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Writes every table of `subset` and the version report.
    ///
    /// `selection` describes how the target samples were chosen and
    /// `statistics` the category makeup of the kept samples; both are
    /// copied into the report.
    pub fn write(
        &self,
        name: &str,
        selection: &str,
        statistics: &[CategoryStatistics],
        subset: &Subset,
    ) -> Result<WrittenVersion, ExtractError> {
        let tables_dir = self.output_root.join(name);
        info!(version = name, path = %tables_dir.display(), "Writing version");
        subset.tables.write(&tables_dir)?;

        let report_path = self.output_root.join(format!("{name}_report.txt"));
        fs::write(
            &report_path,
            report::version_report(name, selection, statistics, &subset.report),
        )?;
        info!(path = %report_path.display(), "Saved version report");

        Ok(WrittenVersion {
            name: name.to_string(),
            tables_dir,
            report_path,
        })
    }
}
