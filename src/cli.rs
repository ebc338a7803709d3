//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

use crate::visualize::MAX_FONT_SIZE;

/// Data Analyzer - load, clean, analyze and chart tabular data
///
/// Reads a CSV or Excel file, applies the requested stages in a fixed
/// order and writes CSV exports, PNG charts and a PDF report.
///
/// Examples:
///   data-analyzer sales.csv --head --clean --stats
///   data-analyzer sales.csv --groupby region --export
///   data-analyzer sales.csv --filter "amount > 100 and region == 'EU'"
///   data-analyzer sales.csv --chart bar --x region --y amount --pdf
///   data-analyzer --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to a CSV or Excel file
    #[arg(value_name = "FILE", required_unless_present = "init_config")]
    pub file: Option<PathBuf>,

    /// Show the first rows of the dataset
    #[arg(long)]
    pub head: bool,

    /// Number of rows shown by --head
    ///
    /// Default: from config or 5.
    #[arg(long, value_name = "N")]
    pub rows: Option<usize>,

    /// Clean data (drop empty and duplicate rows, convert numeric columns)
    #[arg(long)]
    pub clean: bool,

    /// Rename a column
    #[arg(long, num_args = 2, value_names = ["OLD", "NEW"])]
    pub rename: Option<Vec<String>>,

    /// Show summary statistics
    #[arg(long)]
    pub stats: bool,

    /// Group by a column and show the mean of every numeric column
    #[arg(long, value_name = "COL")]
    pub groupby: Option<String>,

    /// Keep only rows matching an expression
    ///
    /// Example: --filter "price > 5 and `unit name` != 'box'"
    #[arg(long, value_name = "EXPR")]
    pub filter: Option<String>,

    /// Chart type
    #[arg(long, value_name = "TYPE")]
    pub chart: Option<ChartKind>,

    /// X column for line/bar charts
    #[arg(long, value_name = "COL")]
    pub x: Option<String>,

    /// Y column for line/bar charts
    #[arg(long, value_name = "COL")]
    pub y: Option<String>,

    /// Column for histogram/pie charts
    #[arg(long, value_name = "COL")]
    pub col: Option<String>,

    /// Export cleaned data, grouped data, statistics and correlations as CSV
    #[arg(long)]
    pub export: bool,

    /// Append the summary and this run's charts to the PDF report
    #[arg(long)]
    pub pdf: bool,

    /// Chart title
    #[arg(long, value_name = "TEXT")]
    pub chart_title: Option<String>,

    /// Chart description shown under the chart in the PDF report
    #[arg(long, value_name = "TEXT")]
    pub chart_desc: Option<String>,

    /// Chart color (#rrggbb or a color name)
    #[arg(long, value_name = "VALUE")]
    pub color: Option<String>,

    /// Base font size for charts
    #[arg(long, value_name = "INT")]
    pub fontsize: Option<u32>,

    /// Figure size in inches, as "W,H"
    #[arg(long, value_name = "W,H", value_parser = parse_figsize)]
    pub figsize: Option<(f64, f64)>,

    /// Draw horizontal bars
    #[arg(long)]
    pub horizontal: bool,

    /// Draw grid lines
    #[arg(long)]
    pub grid: bool,

    /// Compute the correlation matrix and render it as a heatmap
    #[arg(long)]
    pub correlation: bool,

    /// Directory for exports, charts and the PDF report
    ///
    /// Default: from config or ./reports
    #[arg(long, value_name = "DIR", env = "DATA_ANALYZER_REPORTS_DIR")]
    pub reports_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .data-analyzer.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .data-analyzer.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Chart type for --chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ChartKind {
    Line,
    Bar,
    Hist,
    Pie,
}

impl ChartKind {
    /// File stem of the rendered chart.
    pub fn chart_name(self) -> &'static str {
        match self {
            ChartKind::Line => "line_chart",
            ChartKind::Bar => "bar_chart",
            ChartKind::Hist => "histogram",
            ChartKind::Pie => "pie_chart",
        }
    }
}

/// Parse "W,H" into a figure size in inches.
fn parse_figsize(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"W,H\", got '{}'", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid figure dimension '{}'", v.trim()))
    };
    let (w, h) = (parse(w)?, parse(h)?);
    if !(w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite()) {
        return Err("figure dimensions must be positive".to_string());
    }
    Ok((w, h))
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The input file (validated to be present unless --init-config).
    pub fn input(&self) -> PathBuf {
        self.file.clone().unwrap_or_default()
    }

    /// The rename pair, if given.
    pub fn rename_pair(&self) -> Option<(&str, &str)> {
        match self.rename.as_deref() {
            Some([old, new]) => Some((old.as_str(), new.as_str())),
            _ => None,
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.file.is_none() {
            return Err("An input file is required".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(rows) = self.rows {
            if rows == 0 {
                return Err("--rows must be at least 1".to_string());
            }
        }

        if let Some(size) = self.fontsize {
            if size == 0 || size > MAX_FONT_SIZE {
                return Err(format!("--fontsize must be between 1 and {}", MAX_FONT_SIZE));
            }
        }

        if let Some((old, new)) = self.rename_pair() {
            if new.trim().is_empty() {
                return Err(format!("Cannot rename '{}' to an empty name", old));
            }
        }

        if let Some(ref expr) = self.filter {
            if expr.trim().is_empty() {
                return Err("--filter expression is empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
