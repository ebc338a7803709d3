//! Stage-by-stage orchestration of one run.
//!
//! Stages run in a fixed order and each is enabled by its flag. A failing
//! stage is reported and counted; the remaining stages still run against
//! the dataset as it stood before the failure.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::analysis;
use crate::cli::{Args, ChartKind};
use crate::config::Config;
use crate::data;
use crate::models::{ChartArtifact, Dataset, Tabular};
use crate::report;
use crate::visualize;

const CLEANED_CSV: &str = "cleaned_data.csv";
const SUMMARY_CSV: &str = "summary_statistics.csv";
const CORRELATION_CSV: &str = "correlation.csv";
const HEATMAP_NAME: &str = "correlation_heatmap";

/// What a run produced.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Number of stages that failed.
    pub failures: usize,
    /// Files written, in order.
    pub written: Vec<PathBuf>,
}

struct Pipeline<'a> {
    args: &'a Args,
    config: &'a Config,
    dataset: Dataset,
    artifacts: Vec<ChartArtifact>,
    outcome: Outcome,
}

/// Run every stage requested by `args` on a loaded dataset.
pub fn run(args: &Args, config: &Config, dataset: Dataset) -> Outcome {
    let mut p = Pipeline {
        args,
        config,
        dataset,
        artifacts: Vec::new(),
        outcome: Outcome::default(),
    };

    if args.head {
        p.preview();
    }
    if args.clean {
        p.stage("cleaning data", Pipeline::clean);
    }
    if args.rename.is_some() {
        p.stage("renaming column", Pipeline::rename);
    }
    if args.filter.is_some() {
        p.stage("filtering rows", Pipeline::filter);
    }
    if args.export {
        p.stage("exporting cleaned data", Pipeline::export_cleaned);
    }
    if args.groupby.is_some() {
        p.stage("in group by", Pipeline::group_by);
    }
    if args.stats {
        p.stage("computing statistics", Pipeline::statistics);
    }
    if let Some(kind) = args.chart {
        p.stage("creating chart", |p| p.chart(kind));
    }
    if args.correlation {
        p.stage("computing correlation", Pipeline::correlation);
    }
    if args.pdf {
        p.stage("building PDF report", Pipeline::pdf);
    }

    info!(
        "Run finished: {} file(s) written, {} stage failure(s)",
        p.outcome.written.len(),
        p.outcome.failures
    );
    p.outcome
}

impl Pipeline<'_> {
    fn stage(&mut self, name: &str, step: impl FnOnce(&mut Self) -> Result<()>) {
        debug!("Stage: {}", name);
        if let Err(e) = step(self) {
            self.outcome.failures += 1;
            error!("Error {}: {:#}", name, e);
            eprintln!("❌ Error {}: {:#}", name, e);
        }
    }

    fn reports_dir(&self) -> &Path {
        &self.config.general.reports_dir
    }

    fn export(&mut self, table: &dyn Tabular, filename: &str) -> Result<PathBuf> {
        let path = report::export_csv(table, filename, &self.config.general.reports_dir)
            .with_context(|| format!("Failed to export {}", filename))?;
        self.outcome.written.push(path.clone());
        Ok(path)
    }

    fn preview(&self) {
        let n = self.config.general.preview_rows;
        println!("\nFirst {} rows:", n);
        println!("{}", data::preview(&self.dataset, n));
    }

    fn clean(&mut self) -> Result<()> {
        let before = self.dataset.height();
        let cleaned = data::remove_fully_null_rows(&self.dataset);
        let cleaned = data::remove_duplicate_rows(&cleaned);
        let cleaned = data::coerce_numeric(&cleaned, None)?;
        info!("Cleaning removed {} row(s)", before - cleaned.height());
        self.dataset = cleaned;

        println!("\nData cleaned (nulls and duplicates removed).");
        println!("Data types after cleaning:");
        for (name, dtype) in self.dataset.dtypes() {
            println!("  {:<20} {}", name, dtype);
        }
        Ok(())
    }

    fn rename(&mut self) -> Result<()> {
        let Some((old, new)) = self.args.rename_pair() else {
            return Ok(());
        };
        self.dataset = data::rename_column(&self.dataset, old, new)?;
        println!("\nRenamed column {} to {}.", old, new);
        Ok(())
    }

    fn filter(&mut self) -> Result<()> {
        let Some(expr) = self.args.filter.as_deref() else {
            return Ok(());
        };
        let filtered = analysis::filter_rows(&self.dataset, expr)?;
        info!("Filter kept {} of {} rows", filtered.height(), self.dataset.height());
        self.dataset = filtered;
        println!("\nFiltered rows with condition: {}", expr);
        Ok(())
    }

    fn export_cleaned(&mut self) -> Result<()> {
        let path = report::export_csv(&self.dataset, CLEANED_CSV, self.reports_dir())
            .context("Failed to export cleaned data")?;
        self.outcome.written.push(path.clone());
        println!("Cleaned data exported to {}", path.display());
        Ok(())
    }

    fn group_by(&mut self) -> Result<()> {
        let Some(column) = self.args.groupby.as_deref() else {
            return Ok(());
        };
        let grouped = analysis::group_by(&self.dataset, column)?;
        println!("\nGrouped by {}:", column);
        println!("{}", grouped);

        if self.args.export {
            let path = self.export(&grouped, &format!("groupby_{}.csv", column))?;
            println!("Grouped data exported to {}", path.display());
        }
        Ok(())
    }

    fn statistics(&mut self) -> Result<()> {
        let summary = analysis::summary_statistics(&self.dataset);
        println!("\nSummary statistics:");
        println!("{}", summary);

        // The PDF summary page is rendered from this file.
        if self.args.export || self.args.pdf {
            let path = self.export(&summary, SUMMARY_CSV)?;
            println!("Summary statistics exported to {}", path.display());
        }
        Ok(())
    }

    fn chart(&mut self, kind: ChartKind) -> Result<()> {
        let style = self
            .config
            .chart_style()
            .with_title(self.args.chart_title.clone());
        let name = kind.chart_name();
        let dir = self.reports_dir();
        let ds = &self.dataset;

        let path = match (kind, &self.args.x, &self.args.y, &self.args.col) {
            (ChartKind::Line, Some(x), Some(y), _) => {
                visualize::line_chart(ds, x, y, name, &style, dir)?
            }
            (ChartKind::Bar, Some(x), Some(y), _) => {
                visualize::bar_chart(ds, x, y, name, &style, dir)?
            }
            (ChartKind::Hist, _, _, Some(col)) => visualize::histogram(ds, col, name, &style, dir)?,
            (ChartKind::Pie, _, _, Some(col)) => visualize::pie_chart(ds, col, name, &style, dir)?,
            _ => {
                println!("Please specify --x and --y for line/bar, or --col for hist/pie.");
                return Ok(());
            }
        };

        println!("Chart saved to: {}", path.display());
        self.artifacts.push(
            ChartArtifact::new(path.clone())
                .with_title(self.args.chart_title.clone())
                .with_description(self.args.chart_desc.clone()),
        );
        self.outcome.written.push(path);
        Ok(())
    }

    fn correlation(&mut self) -> Result<()> {
        let matrix = analysis::correlation_matrix(&self.dataset);
        if matrix.is_empty() {
            println!("\nCorrelation needs at least two numeric columns.");
            return Ok(());
        }
        println!("\nCorrelation matrix:");
        println!("{}", matrix);

        if self.args.export {
            let path = self.export(&matrix, CORRELATION_CSV)?;
            println!("Correlation matrix exported to {}", path.display());
        }

        let style = self
            .config
            .chart_style()
            .with_title(Some("Correlation Matrix".to_string()));
        let path = visualize::heatmap(&matrix, HEATMAP_NAME, &style, self.reports_dir())?;
        println!("Heatmap saved to: {}", path.display());
        self.artifacts.push(
            ChartArtifact::new(path.clone()).with_title(Some("Correlation Heatmap".to_string())),
        );
        self.outcome.written.push(path);
        Ok(())
    }

    fn pdf(&mut self) -> Result<()> {
        let summary = self.reports_dir().join(SUMMARY_CSV);
        let pdf_path = self.config.pdf_path();
        let path = report::append_to_pdf_report(
            &summary,
            &self.artifacts,
            &pdf_path,
            self.config.report.summary_max_rows,
        )
        .with_context(|| format!("Failed to update {}", pdf_path.display()))?;

        if path.exists() {
            println!("PDF report updated: {}", path.display());
            self.outcome.written.push(path);
        } else {
            println!("Nothing to add to the PDF report (no charts or summary statistics).");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, Value};
    use clap::Parser;
    use tempfile::TempDir;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn sales() -> Dataset {
        Dataset::new(vec![
            Column::new("region", vec![text("A"), text("A"), text("B"), text("A")]),
            Column::new("v", vec![text("10"), text("20"), text("5"), text("10")]),
            Column::new("w", vec![text("1"), text("3"), text("2"), text("1")]),
        ])
    }

    fn setup(flags: &[&str]) -> (TempDir, Args, Config) {
        let dir = TempDir::new().unwrap();
        let mut argv = vec!["data-analyzer", "sales.csv"];
        argv.extend_from_slice(flags);
        let args = Args::try_parse_from(argv).unwrap();
        let mut config = Config::default();
        config.merge_with_args(&args);
        config.general.reports_dir = dir.path().join("reports");
        (dir, args, config)
    }

    #[test]
    fn test_clean_groupby_stats_export() {
        let (dir, args, config) = setup(&["--clean", "--groupby", "region", "--stats", "--export"]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 0);

        let reports = dir.path().join("reports");
        let cleaned = std::fs::read_to_string(reports.join("cleaned_data.csv")).unwrap();
        // The duplicate fourth row is gone and values were coerced.
        assert_eq!(cleaned, ",region,v,w\n0,A,10,1\n1,A,20,3\n2,B,5,2\n");

        let grouped = std::fs::read_to_string(reports.join("groupby_region.csv")).unwrap();
        assert_eq!(grouped, "region,v,w\nA,15.0,2.0\nB,5.0,2.0\n");

        assert!(reports.join("summary_statistics.csv").exists());
        assert_eq!(outcome.written.len(), 3);
    }

    #[test]
    fn test_failed_stage_does_not_stop_later_stages() {
        let (dir, args, config) = setup(&["--clean", "--filter", "nope > 1", "--export"]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 1);
        assert!(dir.path().join("reports/cleaned_data.csv").exists());
    }

    #[test]
    fn test_filter_then_export() {
        let (dir, args, config) = setup(&["--clean", "--filter", "v>15", "--export"]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 0);
        let cleaned = std::fs::read_to_string(dir.path().join("reports/cleaned_data.csv")).unwrap();
        assert_eq!(cleaned, ",region,v,w\n1,A,20,3\n");
    }

    #[test]
    fn test_rename_missing_column_is_reported() {
        let (_dir, args, config) = setup(&["--rename", "nope", "other"]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 1);
    }

    #[test]
    fn test_chart_without_selectors_is_not_a_failure() {
        let (dir, args, config) = setup(&["--chart", "line", "--x", "region"]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 0);
        assert!(outcome.written.is_empty());
        assert!(!dir.path().join("reports/line_chart.png").exists());
    }

    #[test]
    fn test_chart_with_missing_column_fails_stage() {
        let (_dir, args, config) = setup(&["--chart", "hist", "--col", "nope"]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 1);
    }

    #[test]
    fn test_stats_and_pdf_write_summary_page() {
        let (dir, args, config) = setup(&["--clean", "--stats", "--pdf"]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 0);

        let pdf = dir.path().join("reports/report.pdf");
        let doc = lopdf::Document::load(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_pdf_with_nothing_to_add_writes_nothing() {
        let (dir, args, config) = setup(&["--pdf"]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 0);
        assert!(outcome.written.is_empty());
        assert!(!dir.path().join("reports/report.pdf").exists());
    }

    #[test]
    fn test_charts_and_heatmap_accumulate_in_pdf() {
        let (dir, args, config) = setup(&[
            "--clean",
            "--stats",
            "--chart",
            "bar",
            "--x",
            "region",
            "--y",
            "v",
            "--correlation",
            "--pdf",
        ]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 0);

        let reports = dir.path().join("reports");
        assert!(reports.join("bar_chart.png").exists());
        assert!(reports.join("correlation_heatmap.png").exists());
        let pdf = reports.join("report.pdf");
        // Summary page, bar chart, heatmap.
        assert_eq!(lopdf::Document::load(&pdf).unwrap().get_pages().len(), 3);

        // A second run appends its charts but no second summary page.
        let (_other, args, _) = setup(&[
            "--clean", "--stats", "--chart", "pie", "--col", "region", "--pdf",
        ]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 0);
        assert_eq!(lopdf::Document::load(&pdf).unwrap().get_pages().len(), 4);
    }

    #[test]
    fn test_oversized_figure_fails_only_the_chart_stage() {
        let (dir, args, config) = setup(&[
            "--clean",
            "--stats",
            "--chart",
            "hist",
            "--col",
            "v",
            "--figsize",
            "700,700",
            "--pdf",
        ]);
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 1);

        let reports = dir.path().join("reports");
        assert!(!reports.join("histogram.png").exists());
        let doc = lopdf::Document::load(reports.join("report.pdf")).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_correlation_needs_two_numeric_columns() {
        let (dir, args, config) = setup(&["--correlation", "--export"]);
        // Nothing is numeric before cleaning.
        let outcome = run(&args, &config, sales());
        assert_eq!(outcome.failures, 0);
        assert!(!dir.path().join("reports/correlation.csv").exists());
    }
}
