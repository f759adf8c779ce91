//! Labelcheck: geometry and consistency checks for YOLO annotations.
//!
//! Labelcheck finds boxes that overlap too much and boxes whose class id
//! falls outside the label catalog, either one file at a time or across a
//! whole dataset on a background thread. It also provides the state
//! machine behind an interactive box editor, independent of any GUI.
//!
//! # Modules
//!
//! - [`ir`]: Box model (YOLO boxes, IoU, label files, label catalog)
//! - [`check`]: Overlap and label-range checks for one image
//! - [`edit`]: Editable boxes and the per-image edit session
//! - [`scan`]: Batch scanning with progress events
//! - [`dataset`]: Dataset directory discovery
//! - [`export`]: CSV and JSON export of scan results
//! - [`config`]: Optional `labelcheck.yaml` settings
//! - [`error`]: Error types for labelcheck operations

pub mod check;
pub mod color;
pub mod config;
pub mod dataset;
pub mod edit;
pub mod error;
pub mod export;
pub mod ir;
pub mod scan;

use std::io;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::check::check_annotation;
use crate::config::{Config, LogLevel};
use crate::export::ScanReport;
use crate::ir::{LabelCatalog, YoloBox};
use crate::scan::{ScanEvent, ScanRequest, Scanner};

pub use error::LabelCheckError;

/// The labelcheck CLI application.
#[derive(Parser)]
#[command(name = "labelcheck")]
#[command(version, author, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Scan a dataset directory for overlapping boxes and invalid labels.
    Check(CheckArgs),
    /// Report the issues of a single label file.
    Inspect(InspectArgs),
    /// Print the IoU of two boxes given as "cx cy w h".
    Iou(IouArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Arguments for the check subcommand.
#[derive(clap::Args)]
struct CheckArgs {
    /// Directory holding images and same-stem .txt label files.
    dir: PathBuf,

    /// Overlap threshold; box pairs with IoU above it are reported.
    #[arg(long)]
    threshold: Option<f64>,

    /// Label catalog (classes.txt or data.yaml).
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Config file (defaults to <dir>/labelcheck.yaml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Also write the results table to a CSV file.
    #[arg(long)]
    export_csv: Option<PathBuf>,

    /// Exit non-zero if any file has an issue.
    #[arg(long)]
    strict: bool,
}

/// Arguments for the inspect subcommand.
#[derive(clap::Args)]
struct InspectArgs {
    /// Label file to inspect.
    input: PathBuf,

    /// Overlap threshold; box pairs with IoU above it are reported.
    #[arg(long)]
    threshold: Option<f64>,

    /// Label catalog (classes.txt or data.yaml).
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Config file (defaults to labelcheck.yaml next to the label file).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Exit non-zero if the file has an issue.
    #[arg(long)]
    strict: bool,
}

/// Arguments for the iou subcommand.
#[derive(clap::Args)]
struct IouArgs {
    /// First box, "cx cy w h" or "class cx cy w h".
    first: String,
    /// Second box, in the same layout.
    second: String,
}

impl Cli {
    /// Loads the config file the chosen subcommand would use.
    pub fn load_config(&self) -> Result<Config, LabelCheckError> {
        match &self.command {
            Some(Commands::Check(args)) => Config::resolve(&args.dir, args.config.as_deref()),
            Some(Commands::Inspect(args)) => {
                let dir = args.input.parent().unwrap_or(Path::new("."));
                Config::resolve(dir, args.config.as_deref())
            }
            Some(Commands::Iou(_)) | None => Ok(Config::default()),
        }
    }

    /// Log filter from the flags, falling back to the config's level.
    pub fn log_filter(&self, configured: LogLevel) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => configured.to_level_filter(),
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Run the labelcheck CLI.
///
/// This is the main entry point for the CLI, called from `main.rs` once
/// logging is set up.
pub fn run(cli: Cli, config: Config) -> Result<(), LabelCheckError> {
    match cli.command {
        Some(Commands::Check(args)) => run_check(args, config),
        Some(Commands::Inspect(args)) => run_inspect(args, config),
        Some(Commands::Iou(args)) => run_iou(args),
        None => {
            println!("labelcheck {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Overlap and label checks for YOLO annotations.");
            println!();
            println!("Run 'labelcheck --help' for usage information.");
            Ok(())
        }
    }
}

/// Picks the catalog in order: command line, config file, then a catalog
/// file in `dir`.
fn resolve_catalog(
    explicit: Option<&Path>,
    config: &Config,
    dir: &Path,
) -> Result<Option<LabelCatalog>, LabelCheckError> {
    match explicit.or(config.labels.as_deref()) {
        Some(path) => LabelCatalog::load(path).map(Some),
        None => Ok(dataset::discover_catalog(dir)),
    }
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs, mut config: Config) -> Result<(), LabelCheckError> {
    if let Some(threshold) = args.threshold {
        config.overlap_threshold = threshold;
    }

    let mut dataset = dataset::discover_dataset(&args.dir)?;
    if let Some(path) = args.labels.as_deref().or(config.labels.as_deref()) {
        dataset.set_catalog(LabelCatalog::load(path)?);
    }
    let options = config.check_options(dataset.catalog());
    options.validate()?;

    let mut scanner = Scanner::new();
    let events = scanner.start(ScanRequest::from_dataset(&dataset, options))?;

    let mut collected = Vec::new();
    for event in events {
        if args.output == OutputFormat::Text {
            if let ScanEvent::Progress(progress) = &event {
                let name = progress
                    .image
                    .file_name()
                    .map(|name| name.to_string_lossy())
                    .unwrap_or_default();
                if progress.detail.is_empty() {
                    println!("{:<14} {}", progress.status, name);
                } else {
                    println!("{:<14} {} ({})", progress.status, name, progress.detail);
                }
            }
        }
        collected.push(event);
    }
    scanner.join();

    let report = ScanReport::from_events(&collected);
    match args.output {
        OutputFormat::Json => {
            export::write_report_json(io::stdout().lock(), &report)?;
            println!();
        }
        OutputFormat::Text => {
            println!();
            println!("{}", report.summary);
        }
    }

    if let Some(path) = &args.export_csv {
        export::write_results_csv(path, &report.rows)?;
    }

    if args.strict && !report.summary.is_clean() {
        return Err(LabelCheckError::CheckFailed {
            overlap_files: report.summary.overlap_files,
            invalid_label_files: report.summary.invalid_label_files,
        });
    }
    Ok(())
}

/// Execute the inspect subcommand.
fn run_inspect(args: InspectArgs, mut config: Config) -> Result<(), LabelCheckError> {
    if let Some(threshold) = args.threshold {
        config.overlap_threshold = threshold;
    }

    let dir = args.input.parent().unwrap_or(Path::new("."));
    let catalog = resolve_catalog(args.labels.as_deref(), &config, dir)?;
    let options = config.check_options(catalog.as_ref());
    options.validate()?;

    let loaded = ir::load_annotation(&args.input)?;
    for line in &loaded.skipped {
        log::warn!(
            "{}:{}: skipped line ({})",
            args.input.display(),
            line.line,
            line.reason
        );
    }
    let issues = check_annotation(&loaded.annotation, &options);

    match args.output {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(io::stdout().lock(), &issues)?;
            println!();
        }
        OutputFormat::Text => {
            for (index, b) in loaded.annotation.boxes.iter().enumerate() {
                let name = catalog
                    .as_ref()
                    .and_then(|c| c.name(b.class_id))
                    .unwrap_or("?");
                println!(
                    "  box {index}: class {} ({name}) cx {:.6} cy {:.6} w {:.6} h {:.6} [{}]",
                    b.class_id,
                    b.cx,
                    b.cy,
                    b.w,
                    b.h,
                    issues.classify_box(index)
                );
            }
            println!();
            print!("{issues}");
        }
    }

    if args.strict && !issues.is_clean() {
        let status = issues.status();
        return Err(LabelCheckError::CheckFailed {
            overlap_files: usize::from(status.has_overlaps()),
            invalid_label_files: usize::from(status.has_invalid_labels()),
        });
    }
    Ok(())
}

/// Execute the iou subcommand.
fn run_iou(args: IouArgs) -> Result<(), LabelCheckError> {
    let first: YoloBox = ir::parse_box(&args.first)?;
    let second: YoloBox = ir::parse_box(&args.second)?;
    println!("{:.6}", ir::iou(&first, &second));
    Ok(())
}
