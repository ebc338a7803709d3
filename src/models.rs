//! Data models for the analyzer.
//!
//! This module contains the core data structures used throughout
//! the application: cells, columns, the dataset itself, and the
//! derived tables produced by analysis.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// A single cell of a dataset.
#[derive(Debug, Clone)]
pub enum Value {
    /// Missing value
    Null,
    /// Numeric value (integers are stored as floats)
    Number(f64),
    /// Anything that is not a number
    Text(String),
}

impl Value {
    /// Returns the numeric value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Formats the value as a CSV field. Missing values become empty fields.
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(v) => v.to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::Text(_) => 2,
        }
    }
}

// Total order so values can be used as sorted group keys: Null < Number < Text.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// `-0.0` compares equal to `0.0` and all NaNs compare equal to each other.
fn canonical(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Number(v) => canonical(*v).to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NaN"),
            Value::Number(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Parse a string as a number, the way the loader and coercion do.
///
/// Surrounding whitespace is ignored; `NaN` results are rejected.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Format a derived floating point value (statistics, means, correlations).
///
/// Integral values keep a trailing `.0`; NaN becomes an empty field.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

/// Derived type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Every non-null value is a number
    Numeric,
    /// Every non-null value is text
    Text,
    /// Numbers and text side by side (e.g. after a failed coercion)
    Mixed,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Mixed => write!(f, "mixed"),
        }
    }
}

/// A named column of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Returns the derived type of the column.
    ///
    /// An all-null column counts as numeric.
    pub fn dtype(&self) -> ColumnType {
        let mut numbers = false;
        let mut texts = false;
        for value in &self.values {
            match value {
                Value::Number(_) => numbers = true,
                Value::Text(_) => texts = true,
                Value::Null => {}
            }
        }
        match (numbers, texts) {
            (_, false) => ColumnType::Numeric,
            (false, true) => ColumnType::Text,
            (true, true) => ColumnType::Mixed,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.dtype() == ColumnType::Numeric
    }

    /// Non-null numeric values in row order.
    pub fn numbers(&self) -> Vec<f64> {
        self.values.iter().filter_map(Value::as_f64).collect()
    }
}

/// An in-memory table of named, typed columns.
///
/// Every column has one value per row. `index` holds the original
/// 0-based row label of each row so that filtered or de-duplicated
/// datasets still refer back to the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    index: Vec<usize>,
}

impl Dataset {
    /// Creates a dataset with a fresh `0..n` row index.
    pub fn new(columns: Vec<Column>) -> Self {
        let height = columns.first().map_or(0, |c| c.values.len());
        Self::with_index(columns, (0..height).collect())
    }

    /// Creates a dataset with an explicit row index.
    pub fn with_index(columns: Vec<Column>, index: Vec<usize>) -> Self {
        debug_assert!(columns.iter().all(|c| c.values.len() == index.len()));
        Self { columns, index }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.index.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the values of row `position` (not the row label).
    pub fn row(&self, position: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[position]).collect()
    }

    /// Columns whose derived type is numeric.
    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_numeric()).collect()
    }

    /// Builds a new dataset from the rows at `positions`, keeping their labels.
    pub fn take_rows(&self, positions: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: positions.iter().map(|&p| c.values[p].clone()).collect(),
            })
            .collect();
        let index = positions.iter().map(|&p| self.index[p]).collect();
        Dataset::with_index(columns, index)
    }

    /// Column names paired with their derived types.
    pub fn dtypes(&self) -> Vec<(&str, ColumnType)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.dtype()))
            .collect()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_table(self))
    }
}

/// Anything that can be written out as a table with a leading index column.
pub trait Tabular {
    /// Header row; the first entry labels the index column.
    fn header(&self) -> Vec<String>;

    /// Data rows; the first field of each is the row's index label.
    fn records(&self) -> Vec<Vec<String>>;
}

impl Tabular for Dataset {
    fn header(&self) -> Vec<String> {
        std::iter::once(String::new())
            .chain(self.columns.iter().map(|c| c.name.clone()))
            .collect()
    }

    fn records(&self) -> Vec<Vec<String>> {
        (0..self.height())
            .map(|row| {
                std::iter::once(self.index[row].to_string())
                    .chain(self.columns.iter().map(|c| c.values[row].to_field()))
                    .collect()
            })
            .collect()
    }
}

/// Render a table as aligned plain text for the terminal.
pub fn render_table(table: &dyn Tabular) -> String {
    let header = table.header();
    let records = table.records();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for record in &records {
        for (i, field) in record.iter().enumerate() {
            let len = display_field(field).chars().count();
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(len);
            }
        }
    }

    let mut out = String::new();
    let line = |fields: Vec<&str>, out: &mut String| {
        let cells: Vec<String> = fields
            .iter()
            .zip(&widths)
            .map(|(f, w)| format!("{:>width$}", f, width = w))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    };

    line(header.iter().map(String::as_str).collect(), &mut out);
    for record in &records {
        line(record.iter().map(|f| display_field(f)).collect(), &mut out);
    }
    out
}

fn display_field(field: &str) -> &str {
    if field.is_empty() {
        "NaN"
    } else {
        field
    }
}

/// Per-column summary statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub column: String,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Summary statistics for every numeric column of a dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    #[allow(dead_code)] // lookup helper for callers and tests
    pub fn get(&self, column: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.column == column)
    }
}

impl Tabular for SummaryTable {
    fn header(&self) -> Vec<String> {
        ["", "mean", "median", "std", "min", "max"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    r.column.clone(),
                    format_float(r.mean),
                    format_float(r.median),
                    format_float(r.std),
                    format_float(r.min),
                    format_float(r.max),
                ]
            })
            .collect()
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_table(self))
    }
}

/// One group of a [`GroupedTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: Value,
    pub means: Vec<f64>,
}

/// Numeric-column means per distinct value of a grouping column.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedTable {
    /// Name of the grouping column.
    pub key: String,
    /// Names of the aggregated numeric columns.
    pub columns: Vec<String>,
    /// Groups in sorted key order.
    pub rows: Vec<GroupRow>,
}

impl GroupedTable {
    /// Mean of `column` for the group with `key`.
    #[allow(dead_code)] // lookup helper for callers and tests
    pub fn mean(&self, key: &Value, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|r| &r.key == key)
            .map(|r| r.means[col])
    }
}

impl Tabular for GroupedTable {
    fn header(&self) -> Vec<String> {
        std::iter::once(self.key.clone())
            .chain(self.columns.iter().cloned())
            .collect()
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| {
                std::iter::once(r.key.to_field())
                    .chain(r.means.iter().map(|m| format_float(*m)))
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for GroupedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_table(self))
    }
}

/// Square Pearson correlation table over the numeric columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major values, `columns.len()` squared.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[allow(dead_code)] // lookup helper for callers and tests
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.columns.iter().position(|c| c == row)?;
        let c = self.columns.iter().position(|c| c == column)?;
        Some(self.values[r][c])
    }
}

impl Tabular for CorrelationMatrix {
    fn header(&self) -> Vec<String> {
        std::iter::once(String::new())
            .chain(self.columns.iter().cloned())
            .collect()
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(name, row)| {
                std::iter::once(name.clone())
                    .chain(row.iter().map(|v| format_float(*v)))
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for CorrelationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_table(self))
    }
}

/// A rendered chart destined for the PDF report.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    /// Path to the image file.
    pub path: PathBuf,
    /// Caption shown above the image.
    pub title: Option<String>,
    /// Caption shown below the image.
    pub description: Option<String>,
}

impl ChartArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            title: None,
            description: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}
