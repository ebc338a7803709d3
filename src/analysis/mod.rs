//! Analysis modules.
//!
//! Read-only computations over a dataset: descriptive statistics,
//! grouping, correlation and expression filtering.

pub mod aggregator;
pub mod filter;
pub mod stats;

pub use aggregator::*;
pub use filter::filter_rows;
