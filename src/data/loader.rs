//! Dataset loading from CSV and spreadsheet files.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use encoding_rs::WINDOWS_1252;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::models::{parse_number, Column, Dataset, Value};

/// Cell contents treated as missing in CSV input.
const NA_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Load a dataset from a file. Dispatch by extension (case-insensitive).
///
/// Supported formats:
/// * `.csv`          – UTF-8, falling back to Windows-1252 on invalid bytes
/// * `.xls` / `.xlsx` – first worksheet, first row is the header
pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path)?,
        "xls" | "xlsx" => load_spreadsheet(path)?,
        other => return Err(LoadError::UnsupportedFormat(format!(".{other}"))),
    };

    info!(
        "Loaded {} rows x {} columns from {}",
        dataset.height(),
        dataset.width(),
        path.display()
    );
    Ok(dataset)
}

/// Return the first `n` rows.
pub fn preview(dataset: &Dataset, n: usize) -> Dataset {
    let n = n.min(dataset.height());
    dataset.take_rows(&(0..n).collect::<Vec<_>>())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Dataset, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(&decode(&bytes))
}

/// Decode CSV bytes as UTF-8, or as Windows-1252 when that fails.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(e) => {
            debug!("Input is not valid UTF-8 ({}); decoding as Windows-1252", e);
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text
        }
    }
}

fn parse_csv(text: &str) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(LoadError::Empty);
    }
    let headers = dedupe_headers(headers);

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() > headers.len() {
            return Err(LoadError::RaggedRow {
                line: row_no + 2,
                expected: headers.len(),
                found: record.len(),
            });
        }
        // An empty line inside the file yields one empty field; skip it.
        if record.len() == 1 && record[0].is_empty() && headers.len() > 1 {
            continue;
        }
        for (col, column_cells) in cells.iter_mut().enumerate() {
            let cell = record
                .get(col)
                .filter(|s| !NA_TOKENS.contains(s))
                .map(String::from);
            column_cells.push(cell);
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| infer_column(name, cells))
        .collect();

    Ok(Dataset::new(columns))
}

/// Type a column: numeric if every present cell parses as a number,
/// otherwise every present cell stays text.
fn infer_column(name: String, cells: Vec<Option<String>>) -> Column {
    let numeric = cells
        .iter()
        .flatten()
        .all(|s| parse_number(s).is_some());

    let values = cells
        .into_iter()
        .map(|cell| match cell {
            None => Value::Null,
            Some(s) if numeric => parse_number(&s).map_or(Value::Null, Value::Number),
            Some(s) => Value::Text(s),
        })
        .collect();

    Column::new(name, values)
}

/// Name blank headers `Unnamed: <i>` and suffix repeated names `.1`, `.2`, ...
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, header)| {
            let base = if header.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                header
            };
            let mut name = base.clone();
            let mut suffix = 1;
            while seen.contains(&name) {
                name = format!("{base}.{suffix}");
                suffix += 1;
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path) -> Result<Dataset, LoadError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| LoadError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(LoadError::Empty)?;
    let headers = dedupe_headers(
        header_row
            .iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                other => other.to_string(),
            })
            .collect(),
    );

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (col, column_values) in values.iter_mut().enumerate() {
            column_values.push(row.get(col).map_or(Value::Null, cell_value));
        }
    }

    let columns = headers
        .into_iter()
        .zip(values)
        .map(|(name, values)| Column::new(name, values))
        .collect();

    Ok(Dataset::new(columns))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) if f.is_nan() => Value::Null,
        Data::Float(f) => Value::Number(*f),
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}
