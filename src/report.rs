//! Plain-text reports written next to every batch artifact.

use std::fmt::Write as _;

use chrono::Utc;

use crate::extract::{ExtractionReport, TrainingSplitOutcome};
use crate::split::{CategoryStatistics, RedundancyCategory, RedundancySplit, SplitIndex};
use crate::tables::TableKind;

/// File name of the report written by training-index filtering.
pub const TRAINING_REPORT_FILE: &str = "training_split_report.txt";

/// Scenes listed per category in the redundancy report.
const LISTED_SCENES: usize = 10;

const RULE_WIDTH: usize = 80;

fn header(out: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "Generated: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "{rule}");
    out.push('\n');
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Category counts, mean velocity and redundancy, and the first scenes of
/// each category.
pub fn redundancy_report(split: &RedundancySplit) -> String {
    let mut out = String::new();
    header(&mut out, "Redundancy analysis report");

    let total_scenes = split.total_scenes();
    let total_samples = split.total_samples();
    let _ = writeln!(out, "Total: {total_scenes} scenes, {total_samples} samples");

    for stats in split.statistics() {
        let _ = writeln!(out, "\n{}:", stats.category);
        let _ = writeln!(
            out,
            "  Scenes: {} ({:.1}%)",
            stats.num_scenes,
            percent(stats.num_scenes, total_scenes)
        );
        let _ = writeln!(
            out,
            "  Samples: {} ({:.1}%)",
            stats.num_samples,
            percent(stats.num_samples, total_samples)
        );
        let _ = writeln!(out, "  Mean velocity: {:.2} m/s", stats.velocity.mean);
        let _ = writeln!(out, "  Mean redundancy: {:.3}", stats.redundancy.mean);

        let scenes = split.scenes(stats.category);
        if !scenes.is_empty() {
            let _ = writeln!(out, "\n  First {} scenes:", scenes.len().min(LISTED_SCENES));
            for (position, scene) in scenes.iter().take(LISTED_SCENES).enumerate() {
                let _ = writeln!(
                    out,
                    "    {}. {}: velocity={:.2} m/s, redundancy={:.3}, samples={}",
                    position + 1,
                    scene.scene_name,
                    scene.avg_velocity,
                    scene.avg_redundancy,
                    scene.num_samples
                );
            }
        }
    }
    out
}

/// Fixed-width statistics table for terminal output.
pub fn statistics_table(stats: &[CategoryStatistics]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:>8} {:>9} {:>10} {:>10} {:>10} {:>10}",
        "category", "scenes", "samples", "vel_mean", "vel_std", "red_mean", "red_std"
    );
    for s in stats {
        let _ = writeln!(
            out,
            "{:<20} {:>8} {:>9} {:>10.2} {:>10.2} {:>10.3} {:>10.3}",
            s.category.as_str(),
            s.num_scenes,
            s.num_samples,
            s.velocity.mean,
            s.velocity.std,
            s.redundancy.mean,
            s.redundancy.std
        );
    }
    out
}

/// Category makeup, per-table counts and skipped references of an
/// extracted version.
///
/// `statistics` describes the samples the version kept, one entry per
/// category.
pub fn version_report(
    name: &str,
    selection: &str,
    statistics: &[CategoryStatistics],
    report: &ExtractionReport,
) -> String {
    let mut out = String::new();
    header(&mut out, &format!("Dataset version report: {name}"));

    let _ = writeln!(out, "Selection: {selection}");
    let _ = writeln!(out, "Target samples: {}", report.target_tokens);
    let _ = writeln!(out, "Target fingerprint (sha256): {}", report.fingerprint);
    out.push('\n');

    let kept_samples: usize = statistics.iter().map(|s| s.num_samples).sum();
    let _ = writeln!(out, "Categories:");
    for stats in statistics {
        let _ = writeln!(
            out,
            "  {:<20} scenes={:<5} samples={:<7} ({:.1}%) mean velocity={:.2} m/s mean redundancy={:.3}",
            stats.category.as_str(),
            stats.num_scenes,
            stats.num_samples,
            percent(stats.num_samples, kept_samples),
            stats.velocity.mean,
            stats.redundancy.mean
        );
    }
    out.push('\n');

    let _ = writeln!(out, "Tables (kept / source):");
    for (kind, count) in &report.tables {
        if !kind.is_required() && count.total == 0 {
            continue;
        }
        let _ = writeln!(out, "  {:<20} {:>8} / {}", kind.name(), count.kept, count.total);
    }

    out.push('\n');
    if report.total_skipped() == 0 {
        let _ = writeln!(out, "Skipped references: none");
    } else {
        let _ = writeln!(out, "Skipped references:");
        if report.unknown_targets > 0 {
            let _ = writeln!(out, "  target tokens not in sample: {}", report.unknown_targets);
        }
        for (kind, missing) in &report.unresolved {
            let _ = writeln!(out, "  unresolved {} tokens: {missing}", kind.name());
        }
        for (kind, dropped) in &report.pruned {
            let _ = writeln!(out, "  dropped {} rows: {dropped}", kind.name());
        }
        if report.detached_channels > 0 {
            let _ = writeln!(
                out,
                "  sample channels without a capture: {}",
                report.detached_channels
            );
        }
    }
    out
}

/// Category sizes and the resulting train/val counts of a training-index
/// filter run.
pub fn training_report(index: &SplitIndex, outcome: &TrainingSplitOutcome) -> String {
    let mut out = String::new();
    header(&mut out, "Training index split report");

    let _ = writeln!(out, "Mode: {}", outcome.mode);
    let _ = writeln!(out, "Selection: {}", outcome.policy);
    out.push('\n');
    let _ = writeln!(out, "Category sizes:");
    for category in RedundancyCategory::ALL {
        let _ = writeln!(
            out,
            "  - {}: {} samples",
            category,
            index.sample_count(category)
        );
    }
    let _ = writeln!(out, "\nTarget samples: {}", outcome.target_tokens);
    let _ = writeln!(out, "Train samples: {}", outcome.train_count);
    let _ = writeln!(out, "Val samples: {}", outcome.val_count);
    let _ = writeln!(out, "Total: {}", outcome.train_count + outcome.val_count);
    out
}

/// One line per table, used by the CLI summaries.
pub fn table_counts_line(report: &ExtractionReport) -> String {
    TableKind::ALL
        .iter()
        .filter(|kind| kind.is_required() || report.kept(**kind) > 0)
        .map(|kind| format!("{}={}", kind.name(), report.kept(*kind)))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::SceneSummary;

    fn split() -> RedundancySplit {
        RedundancySplit {
            high_redundancy: vec![SceneSummary::from_steps(
                "h",
                "scene-0001",
                vec!["a".into(), "b".into()],
                vec![0.2],
                vec![1.0],
            )],
            medium_redundancy: vec![],
            low_redundancy: vec![SceneSummary::from_steps(
                "l",
                "scene-0002",
                vec!["c".into(), "d".into()],
                vec![9.0],
                vec![0.0],
            )],
        }
    }

    #[test]
    fn test_redundancy_report_lists_categories() {
        let report = redundancy_report(&split());
        assert!(report.contains("Total: 2 scenes, 4 samples"));
        assert!(report.contains("high_redundancy:"));
        assert!(report.contains("medium_redundancy:"));
        assert!(report.contains("Scenes: 1 (50.0%)"));
        assert!(report.contains("1. scene-0002: velocity=9.00 m/s"));
    }

    #[test]
    fn test_empty_split_report_has_no_nan() {
        let report = redundancy_report(&RedundancySplit::default());
        assert!(report.contains("Scenes: 0 (0.0%)"));
        assert!(!report.contains("NaN"));
    }

    #[test]
    fn test_version_report_lists_skips() {
        let mut extraction = ExtractionReport {
            target_tokens: 5,
            unknown_targets: 1,
            fingerprint: "abc".to_string(),
            ..ExtractionReport::default()
        };
        extraction.unresolved.insert(TableKind::EgoPose, 2);
        extraction.detached_channels = 1;
        let report = version_report("v1.0-low-redundancy", "balanced", &[], &extraction);
        assert!(report.contains("Selection: balanced"));
        assert!(report.contains("target tokens not in sample: 1"));
        assert!(report.contains("unresolved ego_pose tokens: 2"));
        assert!(report.contains("sample channels without a capture: 1"));
    }

    #[test]
    fn test_version_report_lists_category_makeup() {
        let stats = split().statistics();
        let report = version_report("v1.0-mix", "balanced", &stats, &ExtractionReport::default());
        assert!(report.contains("Categories:"));
        assert!(report.contains("high_redundancy"));
        assert!(report.contains("scenes=1     samples=2       (50.0%)"));
        assert!(report.contains("mean velocity=9.00 m/s mean redundancy=0.000"));
        assert!(report.contains("Skipped references: none"));
    }

    #[test]
    fn test_statistics_table_has_row_per_category() {
        let table = statistics_table(&split().statistics());
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("low_redundancy"));
    }
}
