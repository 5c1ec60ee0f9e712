//! CLI command definitions for scene-forge.
//!
//! Each subcommand is a thin layer over the library: it resolves the
//! configuration, calls into the core and prints a summary (human-readable,
//! or JSON with `--json`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Parser, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CurationConfig;
use crate::diagnose::diagnose;
use crate::extract::{
    dangling_references, filter_training_indices, DanglingReference, ExtractionReport,
    SubsetExtractor, TrainingIndexMode, VersionWriter,
};
use crate::motion::MotionAnalyzer;
use crate::report;
use crate::split::{
    classify, CategoryStatistics, MixRatios, RedundancyCategory, SavedSplit, SelectionPolicy,
    SplitGranularity, SplitIndex,
};
use crate::tables::{TableKind, TableStore};

/// Default output directory for the redundancy analysis.
const DEFAULT_ANALYSIS_DIR: &str = "./redundancy_analysis";
const DEFAULT_VERSIONS_DIR: &str = "./versions";
const DEFAULT_TRAINING_DIR: &str = "./training_indices";
const DEFAULT_SPLITS_DIR: &str = "./splits";

/// Prefix of generated version names.
const DEFAULT_VERSION_PREFIX: &str = "v1.0";

/// Driving-dataset curation by motion redundancy.
#[derive(Parser)]
#[command(name = "scene-forge")]
#[command(about = "Score driving scenes by motion redundancy and cut closed dataset versions")]
#[command(version)]
#[command(
    long_about = "scene-forge measures ego motion along every scene's sample chain, classifies scenes into high, medium and low redundancy, and extracts referentially closed dataset versions from the result.\n\nExample usage:\n  scene-forge analyze --dataroot ./v1.0-trainval --output ./redundancy_analysis\n  scene-forge create-version --dataroot ./v1.0-trainval --split ./redundancy_analysis/redundancy_split.bin --low"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// YAML configuration file; SCENE_FORGE_* variables and flags override it.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output JSON to stdout instead of a text summary.
    #[arg(short = 'j', long, global = true)]
    pub json: bool,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Analyze ego motion, classify scenes and save the redundancy split.
    Analyze(AnalyzeArgs),

    /// Print per-category statistics of a saved split.
    Summary(SummaryArgs),

    /// Extract dataset versions from redundancy categories.
    CreateVersion(CreateVersionArgs),

    /// Filter train and val training indices by redundancy.
    TrainingIndex(TrainingIndexArgs),

    /// Write train/val/test sample token lists balanced across categories.
    Split(SplitArgs),

    /// Check a dataset directory for the files and fields analysis reads.
    Diagnose(DiagnoseArgs),

    /// Report foreign keys of a table set that do not resolve.
    Verify(VerifyArgs),
}

/// Arguments for `scene-forge analyze`.
#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Directory holding the dataset tables.
    #[arg(short, long)]
    pub dataroot: PathBuf,

    /// Output directory for the split artifacts and report.
    #[arg(short, long, default_value = DEFAULT_ANALYSIS_DIR)]
    pub output: PathBuf,

    /// Velocity (m/s) at or below which a step is fully redundant.
    #[arg(long)]
    pub low_velocity: Option<f64>,

    /// Velocity (m/s) at or above which a step is not redundant.
    #[arg(long)]
    pub high_velocity: Option<f64>,

    /// Mean redundancy above which a scene is high redundancy.
    #[arg(long)]
    pub high_cut: Option<f64>,

    /// Mean redundancy below which a scene is low redundancy.
    #[arg(long)]
    pub low_cut: Option<f64>,

    /// Capture channel whose ego poses define motion.
    #[arg(long)]
    pub reference_channel: Option<String>,
}

/// Arguments for `scene-forge summary`.
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Split artifact (.json or .bin).
    #[arg(short, long)]
    pub split: PathBuf,
}

/// Arguments for `scene-forge create-version`.
#[derive(Parser, Debug)]
#[command(group(
    ArgGroup::new("selection")
        .required(true)
        .multiple(true)
        .args(["high", "low", "both", "categories"])
))]
pub struct CreateVersionArgs {
    /// Directory holding the source dataset tables.
    #[arg(short, long)]
    pub dataroot: PathBuf,

    /// Split artifact (.json or .bin).
    #[arg(short, long)]
    pub split: PathBuf,

    /// Directory receiving one subdirectory per version.
    #[arg(short, long, default_value = DEFAULT_VERSIONS_DIR)]
    pub output_root: PathBuf,

    /// Create the high-redundancy version.
    #[arg(long)]
    pub high: bool,

    /// Create the low-redundancy version.
    #[arg(long)]
    pub low: bool,

    /// Create both the high- and low-redundancy versions.
    #[arg(long)]
    pub both: bool,

    /// Create one version from a comma-separated category list
    /// (e.g. low_redundancy,medium_redundancy).
    #[arg(long, value_delimiter = ',')]
    pub categories: Option<Vec<RedundancyCategory>>,

    /// Add floor(|low| * (1 - ratio)) medium samples to the low version.
    #[arg(long)]
    pub low_ratio: Option<f64>,

    /// Version name prefix.
    #[arg(long, default_value = DEFAULT_VERSION_PREFIX)]
    pub prefix: String,

    /// Sampling seed for partial category draws.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Training-index selection modes.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainingMode {
    /// Low-redundancy samples only.
    #[value(name = "low_only")]
    LowOnly,
    /// Per-category ratios from --low-ratio, --medium-ratio, --high-ratio.
    Custom,
    /// Equal counts from each category.
    Balanced,
}

/// Arguments for `scene-forge training-index`.
#[derive(Parser, Debug)]
pub struct TrainingIndexArgs {
    /// Split artifact (.json or .bin).
    #[arg(short, long)]
    pub split: PathBuf,

    /// Training index of the train split (.json or .json.gz).
    #[arg(long)]
    pub train: PathBuf,

    /// Training index of the val split (.json or .json.gz).
    #[arg(long)]
    pub val: PathBuf,

    /// Output directory for the filtered indices and report.
    #[arg(short, long, default_value = DEFAULT_TRAINING_DIR)]
    pub output: PathBuf,

    /// Selection mode.
    #[arg(short, long, value_enum, default_value = "low_only")]
    pub mode: TrainingMode,

    /// Share of low-redundancy samples kept in custom mode.
    #[arg(long, default_value = "1.0")]
    pub low_ratio: f64,

    /// Share of medium-redundancy samples kept in custom mode.
    #[arg(long, default_value = "0.0")]
    pub medium_ratio: f64,

    /// Share of high-redundancy samples kept in custom mode.
    #[arg(long, default_value = "0.0")]
    pub high_ratio: f64,

    /// Sampling seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for `scene-forge split`.
#[derive(Parser, Debug)]
pub struct SplitArgs {
    /// Split artifact (.json or .bin).
    #[arg(short, long)]
    pub split: PathBuf,

    /// Output directory for train.txt, val.txt and test.txt.
    #[arg(short, long, default_value = DEFAULT_SPLITS_DIR)]
    pub output: PathBuf,

    #[arg(long)]
    pub train_ratio: Option<f64>,

    #[arg(long)]
    pub val_ratio: Option<f64>,

    #[arg(long)]
    pub test_ratio: Option<f64>,

    /// Sampling seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Shuffle individual samples instead of whole scenes.
    #[arg(long)]
    pub by_sample: bool,
}

/// Arguments for `scene-forge diagnose`.
#[derive(Parser, Debug)]
pub struct DiagnoseArgs {
    /// Directory holding the dataset tables.
    #[arg(short, long)]
    pub dataroot: PathBuf,

    /// Channel expected in every sample's data map.
    #[arg(long)]
    pub reference_channel: Option<String>,
}

/// Arguments for `scene-forge verify`.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Directory holding the tables to check.
    #[arg(short, long)]
    pub dataroot: PathBuf,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli())
}

/// Run the CLI with the parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref())?;
    let json = cli.json;
    match cli.command {
        Commands::Analyze(args) => run_analyze_command(args, config, json),
        Commands::Summary(args) => run_summary_command(args, json),
        Commands::CreateVersion(args) => run_create_version_command(args, config, json),
        Commands::TrainingIndex(args) => run_training_index_command(args, config, json),
        Commands::Split(args) => run_split_command(args, config, json),
        Commands::Diagnose(args) => run_diagnose_command(args, config, json),
        Commands::Verify(args) => run_verify_command(args, json),
    }
}

/// Defaults, then the YAML file, then `SCENE_FORGE_*` variables.
fn resolve_config(path: Option<&Path>) -> anyhow::Result<CurationConfig> {
    let config = match path {
        Some(path) => CurationConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => CurationConfig::default(),
    };
    config
        .overlay_env()
        .context("Failed to read SCENE_FORGE_* environment variables")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json_output = serde_json::to_string_pretty(value)
        .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
    println!("{}", json_output);
    Ok(())
}

// ============================================================================
// analyze / summary
// ============================================================================

#[derive(Debug, Serialize)]
struct AnalyzeOutput {
    dataroot: PathBuf,
    total_scenes: usize,
    total_samples: usize,
    categories: Vec<CategoryStatistics>,
    artifacts: SavedSplit,
}

fn run_analyze_command(
    args: AnalyzeArgs,
    mut config: CurationConfig,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(low) = args.low_velocity {
        config.low_velocity_threshold = low;
    }
    if let Some(high) = args.high_velocity {
        config.high_velocity_threshold = high;
    }
    if let Some(cut) = args.high_cut {
        config.high_redundancy_cut = cut;
    }
    if let Some(cut) = args.low_cut {
        config.low_redundancy_cut = cut;
    }
    if let Some(channel) = args.reference_channel {
        config.reference_channel = channel;
    }
    config.validate().context("Invalid analysis settings")?;

    let store = TableStore::load_motion_tables(&args.dataroot)
        .with_context(|| format!("Failed to load tables from {}", args.dataroot.display()))?;
    let summaries = MotionAnalyzer::new(&store, config.thresholds())
        .with_reference_channel(config.reference_channel.clone())
        .analyze_all()
        .context("Motion analysis failed")?;

    let split = classify(summaries, &config.cuts());
    let artifacts = split
        .save_all(&args.output)
        .with_context(|| format!("Failed to save split to {}", args.output.display()))?;

    let output = AnalyzeOutput {
        dataroot: args.dataroot,
        total_scenes: split.total_scenes(),
        total_samples: split.total_samples(),
        categories: split.statistics(),
        artifacts,
    };
    if json {
        return print_json(&output);
    }

    println!(
        "Analyzed {} scenes ({} samples)\n",
        output.total_scenes, output.total_samples
    );
    print!("{}", report::statistics_table(&output.categories));
    println!("\nSplit:  {}", output.artifacts.binary.display());
    println!("Report: {}", output.artifacts.report.display());
    Ok(())
}

fn run_summary_command(args: SummaryArgs, json: bool) -> anyhow::Result<()> {
    let index = SplitIndex::load(&args.split)
        .with_context(|| format!("Failed to load split {}", args.split.display()))?;
    let stats = index.statistics();
    if json {
        return print_json(&stats);
    }
    print!("{}", report::statistics_table(&stats));
    Ok(())
}

// ============================================================================
// create-version
// ============================================================================

#[derive(Debug, Serialize)]
struct VersionOutput {
    name: String,
    selection: String,
    tables_dir: PathBuf,
    report_path: PathBuf,
    statistics: Vec<CategoryStatistics>,
    extraction: ExtractionReport,
}

/// Versions requested by the flags, in a stable order without duplicates.
fn requested_versions(args: &CreateVersionArgs) -> Vec<(String, SelectionPolicy)> {
    let mut versions: Vec<(String, SelectionPolicy)> = Vec::new();
    let prefix = &args.prefix;

    if args.high || args.both {
        versions.push((
            format!("{prefix}-high-redundancy"),
            SelectionPolicy::Categories {
                categories: vec![RedundancyCategory::High],
            },
        ));
    }
    if args.low || args.both {
        let policy = match args.low_ratio {
            Some(ratio) => SelectionPolicy::LowRedundancy { ratio },
            None => SelectionPolicy::Categories {
                categories: vec![RedundancyCategory::Low],
            },
        };
        versions.push((format!("{prefix}-low-redundancy"), policy));
    }
    if let Some(categories) = &args.categories {
        let names: Vec<&str> = categories.iter().map(|c| c.short_name()).collect();
        let name = format!("{prefix}-{}-redundancy", names.join("-"));
        if !versions.iter().any(|(existing, _)| *existing == name) {
            versions.push((
                name,
                SelectionPolicy::Categories {
                    categories: categories.clone(),
                },
            ));
        }
    }
    versions
}

fn run_create_version_command(
    args: CreateVersionArgs,
    config: CurationConfig,
    json: bool,
) -> anyhow::Result<()> {
    let seed = args.seed.unwrap_or(config.seed);
    let index = SplitIndex::load(&args.split)
        .with_context(|| format!("Failed to load split {}", args.split.display()))?;
    let store = TableStore::load(&args.dataroot)
        .with_context(|| format!("Failed to load tables from {}", args.dataroot.display()))?;
    let extractor = SubsetExtractor::new(&store);
    let writer = VersionWriter::new(&args.output_root);

    let mut outputs = Vec::new();
    for (name, policy) in requested_versions(&args) {
        let target = policy.select(&index, seed);
        info!(version = %name, selection = %policy, targets = target.len(), "Creating version");
        if target.is_empty() {
            warn!(version = %name, "Selection is empty; the version will hold no samples");
        }

        let subset = extractor.extract(&target);
        let selection = policy.to_string();
        let statistics = index
            .selection_statistics(subset.tables.sample.rows().iter().map(|s| s.token.as_str()));
        let written = writer
            .write(&name, &selection, &statistics, &subset)
            .with_context(|| format!("Failed to write version {name}"))?;
        outputs.push(VersionOutput {
            name: written.name,
            selection,
            tables_dir: written.tables_dir,
            report_path: written.report_path,
            statistics,
            extraction: subset.report,
        });
    }

    if json {
        return print_json(&outputs);
    }
    for output in &outputs {
        println!("{} ({})", output.name, output.selection);
        println!("  {}", report::table_counts_line(&output.extraction));
        for stats in output.statistics.iter().filter(|s| s.num_samples > 0) {
            println!(
                "  {}: {} scenes, {} samples",
                stats.category, stats.num_scenes, stats.num_samples
            );
        }
        println!(
            "  skipped references: {}",
            output.extraction.total_skipped()
        );
        println!("  tables: {}", output.tables_dir.display());
    }
    Ok(())
}

// ============================================================================
// training-index / split
// ============================================================================

fn run_training_index_command(
    args: TrainingIndexArgs,
    config: CurationConfig,
    json: bool,
) -> anyhow::Result<()> {
    let seed = args.seed.unwrap_or(config.seed);
    let mode = match args.mode {
        TrainingMode::LowOnly => TrainingIndexMode::LowOnly,
        TrainingMode::Custom => TrainingIndexMode::Custom(MixRatios {
            high: args.high_ratio,
            medium: args.medium_ratio,
            low: args.low_ratio,
        }),
        TrainingMode::Balanced => TrainingIndexMode::Balanced,
    };

    let index = SplitIndex::load(&args.split)
        .with_context(|| format!("Failed to load split {}", args.split.display()))?;
    let outcome = filter_training_indices(
        &index,
        mode,
        seed,
        &args.train,
        &args.val,
        &args.output,
    )
    .context("Failed to filter training indices")?;

    if json {
        return print_json(&outcome);
    }
    println!("Mode: {} ({})", outcome.mode, outcome.policy);
    println!("Target samples: {}", outcome.target_tokens);
    println!("train: {} -> {}", outcome.train_count, outcome.train_path.display());
    println!("val:   {} -> {}", outcome.val_count, outcome.val_path.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct SplitOutput {
    output: PathBuf,
    granularity: SplitGranularity,
    seed: u64,
    train: usize,
    val: usize,
    test: usize,
}

fn run_split_command(args: SplitArgs, mut config: CurationConfig, json: bool) -> anyhow::Result<()> {
    if let Some(ratio) = args.train_ratio {
        config.train_ratio = ratio;
    }
    if let Some(ratio) = args.val_ratio {
        config.val_ratio = ratio;
    }
    if let Some(ratio) = args.test_ratio {
        config.test_ratio = ratio;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate().context("Invalid split settings")?;

    let granularity = if args.by_sample {
        SplitGranularity::Sample
    } else {
        SplitGranularity::Scene
    };
    let index = SplitIndex::load(&args.split)
        .with_context(|| format!("Failed to load split {}", args.split.display()))?;
    let split = index.scene_train_val_test_split(&config.ratios(), config.seed, granularity)?;
    split
        .save_token_lists(&args.output)
        .with_context(|| format!("Failed to write token lists to {}", args.output.display()))?;

    let output = SplitOutput {
        output: args.output,
        granularity,
        seed: config.seed,
        train: split.train.len(),
        val: split.val.len(),
        test: split.test.len(),
    };
    if json {
        return print_json(&output);
    }
    println!("train: {} samples", output.train);
    println!("val:   {} samples", output.val);
    println!("test:  {} samples", output.test);
    println!("Token lists: {}", output.output.display());
    Ok(())
}

// ============================================================================
// diagnose / verify
// ============================================================================

fn run_diagnose_command(
    args: DiagnoseArgs,
    config: CurationConfig,
    json: bool,
) -> anyhow::Result<()> {
    let channel = args.reference_channel.unwrap_or(config.reference_channel);
    let report = diagnose(&args.dataroot, &channel);
    if json {
        print_json(&report)?;
    } else {
        println!("{report}");
    }

    if !report.is_healthy() {
        anyhow::bail!(
            "Dataset at {} has {} error(s)",
            args.dataroot.display(),
            report.count(crate::diagnose::Severity::Error)
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct VerifyOutput {
    dataroot: PathBuf,
    tables: BTreeMap<TableKind, usize>,
    dangling: Vec<DanglingReference>,
}

fn run_verify_command(args: VerifyArgs, json: bool) -> anyhow::Result<()> {
    let store = TableStore::load(&args.dataroot)
        .with_context(|| format!("Failed to load tables from {}", args.dataroot.display()))?;
    let dangling = dangling_references(&store);
    let output = VerifyOutput {
        tables: TableKind::ALL
            .into_iter()
            .map(|kind| (kind, store.row_count(kind)))
            .collect(),
        dataroot: args.dataroot,
        dangling,
    };

    if json {
        print_json(&output)?;
    } else {
        for (kind, rows) in &output.tables {
            println!("{:<20} {:>8}", kind.name(), rows);
        }
        for reference in &output.dangling {
            println!("dangling: {reference}");
        }
        println!("{} dangling reference(s)", output.dangling.len());
    }

    if !output.dangling.is_empty() {
        anyhow::bail!(
            "{} foreign key(s) in {} do not resolve",
            output.dangling.len(),
            output.dataroot.display()
        );
    }
    Ok(())
}
