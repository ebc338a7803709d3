//! Data layer: loading and cleaning.
//!
//! ```text
//!  .csv / .xls / .xlsx
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse file → Dataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ cleaner  │  drop nulls/duplicates, rename, coerce → Dataset
//!   └──────────┘
//! ```

pub mod cleaner;
pub mod loader;

pub use cleaner::{coerce_numeric, remove_duplicate_rows, remove_fully_null_rows, rename_column};
pub use loader::{load_dataset, preview};
