//! Command-line interface for the normalizer.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use crate::processors::subject::{self, NormalizeOptions};
use crate::NormalizerConfig;

#[derive(Parser)]
#[command(name = "bids-normalizer")]
#[command(about = "In-place normalizer for single-session BIDS datasets", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten session directories and repair fieldmap sidecars
    Normalize {
        /// BIDS dataset root directory
        root: PathBuf,
        /// Subject identifier (e.g., 00123), or ALL for every subject
        subject: String,
        /// Disambiguate fieldmap/magnitude pairs by sidecar content
        #[arg(long)]
        rename_magnitude: bool,
        /// Preview changes without moving or rewriting files
        #[arg(long)]
        dry_run: bool,
        /// Path for the plain-text run log
        #[arg(long, default_value = "./bids_normalizer.txt")]
        log: PathBuf,
    },

    /// List subjects without a derivatives entry yet
    Pending {
        /// BIDS dataset root directory
        root: PathBuf,
        /// Derivatives pipeline name to check against
        #[arg(long, default_value = "fmriprep")]
        derivatives: String,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Truncate a summary value to fit its column, on a char boundary.
fn truncate_value(value: &str) -> String {
    if value.len() <= 39 {
        return value.to_string();
    }

    let mut cut = 36;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &value[..cut])
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        println!("║ {:<20}: {:<39} ║", key, truncate_value(value));
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match NormalizerConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                NormalizerConfig::default()
            }
        },
        None => NormalizerConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Normalize {
            root,
            subject,
            rename_magnitude,
            dry_run,
            log,
        } => {
            cmd_normalize(&root, &subject, rename_magnitude, dry_run, &log, &config);
        }
        Commands::Pending { root, derivatives } => {
            cmd_pending(&root, &derivatives, &config);
        }
    }
}

fn cmd_normalize(
    root: &PathBuf,
    subject: &str,
    rename_magnitude: bool,
    dry_run: bool,
    log_path: &PathBuf,
    config: &NormalizerConfig,
) {
    let start = Instant::now();

    if dry_run {
        println!("DRY RUN: No files will be moved or rewritten");
    }

    // ALL sentinel means every subject under the root
    let single_subject = if subject.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(subject)
    };

    let options = NormalizeOptions {
        rename_magnitude,
        dry_run,
    };

    let spinner = create_spinner("Normalizing subject trees...");

    let batch = match subject::normalize_dataset(root, single_subject, config, &options) {
        Ok(batch) => batch,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Normalization failed: {:#}", e);
            std::process::exit(1);
        }
    };

    spinner.finish_and_clear();

    // Write the per-subject run log
    match File::create(log_path) {
        Ok(mut log_file) => {
            if let Err(e) = batch.write_log(&mut log_file) {
                warn!("Failed to write run log {}: {}", log_path.display(), e);
            }
        }
        Err(e) => {
            warn!("Failed to create run log {}: {}", log_path.display(), e);
        }
    }

    print_summary(
        "Normalization Complete",
        &[
            ("Dataset root", root.display().to_string()),
            ("Subjects", batch.subjects.len().to_string()),
            ("Succeeded", batch.succeeded_count().to_string()),
            ("Failed", batch.failed_count().to_string()),
            ("Magnitude rename", rename_magnitude.to_string()),
            ("Dry run", dry_run.to_string()),
            ("Run log", log_path.display().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    for subject_report in &batch.subjects {
        if !subject_report.succeeded() {
            eprintln!(
                "sub-{}: failed stages: {}",
                subject_report.subject,
                subject_report.failed_stages().join(", ")
            );
        }
    }
}

fn cmd_pending(root: &PathBuf, derivatives: &str, config: &NormalizerConfig) {
    use crate::core::layout::DatasetLayout;

    let start = Instant::now();

    let layout = match DatasetLayout::new(root, &config.layout) {
        Ok(layout) => layout,
        Err(e) => {
            error!("Failed to open dataset root: {}", e);
            std::process::exit(1);
        }
    };

    let pending = match layout.pending_subjects(derivatives) {
        Ok(pending) => pending,
        Err(e) => {
            error!("Failed to enumerate subjects: {}", e);
            std::process::exit(1);
        }
    };

    if pending.is_empty() {
        println!("No subjects pending for {}", derivatives);
    } else {
        println!("({})", pending.join(" "));
    }

    print_summary(
        "Pending Subjects",
        &[
            ("Dataset root", root.display().to_string()),
            ("Derivatives", derivatives.to_string()),
            ("Pending", pending.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}
