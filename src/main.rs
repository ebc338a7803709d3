//! Data Analyzer - command-line analysis of tabular data
//!
//! Loads a CSV or Excel file, optionally cleans, renames and filters it,
//! then writes grouped data, summary statistics, charts and an
//! accumulating PDF report.
//!
//! Exit codes:
//!   0 - Success (including runs where individual stages failed)
//!   1 - Invalid arguments or configuration, or the input could not be loaded

mod analysis;
mod cli;
mod config;
mod data;
mod error;
mod models;
mod pipeline;
mod report;
mod visualize;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE};
use error::LoadError;
use indicatif::{ProgressBar, ProgressStyle};
use models::Dataset;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("Data Analyzer v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    let start_time = Instant::now();
    let input = args.input();

    let dataset = match load_with_spinner(&input, args.quiet) {
        Ok(dataset) => dataset,
        Err(e) => {
            error!("Failed to load {}: {}", input.display(), e);
            eprintln!("Error loading dataset: {}", e);
            std::process::exit(1);
        }
    };
    println!(
        "📥 Loaded {} ({} rows x {} columns)",
        input.display(),
        dataset.height(),
        dataset.width()
    );
    debug!("Columns: {:?}", dataset.column_names());
    if dataset.is_empty() {
        warn!("{} has no data rows", input.display());
    }

    let outcome = pipeline::run(&args, &config, dataset);

    if outcome.failures > 0 {
        println!(
            "\n⚠️  Finished with {} failed stage(s) in {:.1}s",
            outcome.failures,
            start_time.elapsed().as_secs_f64()
        );
    } else {
        info!("Done in {:.1}s", start_time.elapsed().as_secs_f64());
    }
    Ok(())
}

/// Handle --init-config: generate a default .data-analyzer.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the reports directory, chart style and PDF report.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    Ok(Config::load_default()?.unwrap_or_default())
}

/// Load the input file behind a spinner (hidden in quiet mode).
fn load_with_spinner(path: &Path, quiet: bool) -> Result<Dataset, LoadError> {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("Loading {}", path.display()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = data::load_dataset(path);

    pb.finish_and_clear();
    result
}
