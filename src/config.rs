//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.data-analyzer.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::report::DEFAULT_SUMMARY_MAX_ROWS;
use crate::visualize::{ChartStyle, DEFAULT_COLOR};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".data-analyzer.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Chart styling.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory for exports, charts and the PDF report.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Rows shown by --head.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            preview_rows: default_preview_rows(),
            verbose: false,
        }
    }
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_preview_rows() -> usize {
    5
}

/// Chart styling defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Series color.
    #[serde(default = "default_color")]
    pub color: String,

    /// Heatmap color map (coolwarm, viridis, greys).
    #[serde(default = "default_colormap")]
    pub colormap: String,

    /// Base font size.
    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Figure size in inches, [width, height].
    #[serde(default = "default_figsize")]
    pub figsize: [f64; 2],

    /// Pixels per inch.
    #[serde(default = "default_dpi")]
    pub dpi: u32,

    /// Draw grid lines.
    #[serde(default)]
    pub grid: bool,

    /// Horizontal bar charts.
    #[serde(default)]
    pub horizontal: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
            colormap: default_colormap(),
            font_size: default_font_size(),
            figsize: default_figsize(),
            dpi: default_dpi(),
            grid: false,
            horizontal: false,
        }
    }
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_colormap() -> String {
    "coolwarm".to_string()
}

fn default_font_size() -> u32 {
    12
}

fn default_figsize() -> [f64; 2] {
    [6.4, 4.8]
}

fn default_dpi() -> u32 {
    100
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// File name of the PDF report inside the reports directory.
    #[serde(default = "default_pdf_name")]
    pub pdf_name: String,

    /// Summary rows drawn on the PDF summary page.
    #[serde(default = "default_summary_max_rows")]
    pub summary_max_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            pdf_name: default_pdf_name(),
            summary_max_rows: default_summary_max_rows(),
        }
    }
}

fn default_pdf_name() -> String {
    "report.pdf".to_string()
}

fn default_summary_max_rows() -> usize {
    DEFAULT_SUMMARY_MAX_ROWS
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.reports_dir {
            self.general.reports_dir = dir.clone();
        }
        if let Some(rows) = args.rows {
            self.general.preview_rows = rows;
        }

        if let Some(ref color) = args.color {
            self.chart.color = color.clone();
        }
        if let Some(size) = args.fontsize {
            self.chart.font_size = size;
        }
        if let Some((w, h)) = args.figsize {
            self.chart.figsize = [w, h];
        }

        // Flags always override
        if args.grid {
            self.chart.grid = true;
        }
        if args.horizontal {
            self.chart.horizontal = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Chart style built from the `[chart]` section.
    pub fn chart_style(&self) -> ChartStyle {
        ChartStyle {
            title: None,
            color: self.chart.color.clone(),
            colormap: self.chart.colormap.clone(),
            font_size: self.chart.font_size,
            figsize: (self.chart.figsize[0], self.chart.figsize[1]),
            dpi: self.chart.dpi,
            grid: self.chart.grid,
            horizontal: self.chart.horizontal,
        }
    }

    /// Path of the PDF report.
    pub fn pdf_path(&self) -> PathBuf {
        self.general.reports_dir.join(&self.report.pdf_name)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.reports_dir, PathBuf::from("reports"));
        assert_eq!(config.general.preview_rows, 5);
        assert_eq!(config.chart.color, "#1f77b4");
        assert_eq!(config.report.pdf_name, "report.pdf");
        assert_eq!(config.pdf_path(), PathBuf::from("reports").join("report.pdf"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
reports_dir = "out"
verbose = true

[chart]
color = "red"
figsize = [10.0, 5.0]
grid = true

[report]
summary_max_rows = 12
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.reports_dir, PathBuf::from("out"));
        assert!(config.general.verbose);
        assert_eq!(config.general.preview_rows, 5);
        assert_eq!(config.chart.color, "red");
        assert_eq!(config.chart.figsize, [10.0, 5.0]);
        assert!(config.chart.grid);
        assert_eq!(config.chart.dpi, 100);
        assert_eq!(config.report.summary_max_rows, 12);
        assert_eq!(config.report.pdf_name, "report.pdf");
    }

    #[test]
    fn test_merge_with_args() {
        let mut config: Config = toml::from_str("[chart]\ncolor = \"red\"\nfont_size = 9\n").unwrap();
        let args = Args::try_parse_from([
            "data-analyzer",
            "a.csv",
            "--fontsize",
            "20",
            "--figsize",
            "3,2",
            "--grid",
            "--reports-dir",
            "elsewhere",
        ])
        .unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.chart.color, "red");
        assert_eq!(config.chart.font_size, 20);
        assert_eq!(config.chart.figsize, [3.0, 2.0]);
        assert!(config.chart.grid);
        assert_eq!(config.general.reports_dir, PathBuf::from("elsewhere"));

        let style = config.chart_style();
        assert_eq!(style.pixel_size().unwrap(), (300, 200));
        assert_eq!(style.font_size, 20);
    }

    #[test]
    fn test_load_reports_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[chart\ncolor = 1").unwrap();
        assert!(Config::load(&path).is_err());
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[chart]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.chart.figsize, [6.4, 4.8]);
    }
}
