//! Report output.
//!
//! CSV exports of derived tables and the accumulating PDF report.

pub mod csv_export;
pub mod pdf;

pub use csv_export::export_csv;
pub use pdf::{append_to_pdf_report, DEFAULT_SUMMARY_MAX_ROWS};
