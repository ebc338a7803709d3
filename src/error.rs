//! Error types for each pipeline component.
//!
//! Load errors are fatal to a run; everything else is caught at the
//! stage boundary in the pipeline and reported to the user.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn an input file into a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported file format '{0}'. Please provide a CSV or Excel file.")]
    UnsupportedFormat(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {line} has {found} fields but the header has {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("No columns to parse from file")]
    Empty,
}

/// Failure of a cleaning or analysis operation on a dataset.
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("Column not found: '{0}'")]
    ColumnNotFound(String),

    #[error("Invalid filter expression: {0}")]
    InvalidExpression(String),
}

/// Failure to render a chart.
#[derive(Debug, Error)]
pub enum VisualizeError {
    #[error("Missing column: '{0}'")]
    MissingColumn(String),

    #[error("Failed to render chart: {0}")]
    Render(String),

    #[error("Failed to prepare chart output: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to write a CSV or PDF report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Failed to embed image {path}: {message}")]
    Image { path: PathBuf, message: String },
}
