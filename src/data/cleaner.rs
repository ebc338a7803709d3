//! Row and column cleaning operations.
//!
//! Every operation takes the dataset by reference and returns a new one.

use std::collections::HashSet;

use tracing::debug;

use crate::error::DataError;
use crate::models::{parse_number, Column, Dataset, Value};

/// Drop rows where every column is null.
pub fn remove_fully_null_rows(ds: &Dataset) -> Dataset {
    let keep: Vec<usize> = (0..ds.height())
        .filter(|&row| !ds.row(row).iter().all(|v| v.is_null()))
        .collect();
    debug!("Dropping {} fully-null rows", ds.height() - keep.len());
    ds.take_rows(&keep)
}

/// Drop rows that repeat an earlier row exactly, keeping the first occurrence.
pub fn remove_duplicate_rows(ds: &Dataset) -> Dataset {
    let mut seen: HashSet<Vec<&Value>> = HashSet::new();
    let keep: Vec<usize> = (0..ds.height())
        .filter(|&row| seen.insert(ds.row(row)))
        .collect();
    debug!("Dropping {} duplicate rows", ds.height() - keep.len());
    ds.take_rows(&keep)
}

/// Rename column `old` to `new`.
pub fn rename_column(ds: &Dataset, old: &str, new: &str) -> Result<Dataset, DataError> {
    if !ds.has_column(old) {
        return Err(DataError::ColumnNotFound(old.to_string()));
    }

    let index = ds.index().to_vec();
    let columns = ds
        .columns()
        .iter()
        .map(|c| {
            if c.name == old {
                Column::new(new, c.values.clone())
            } else {
                c.clone()
            }
        })
        .collect();

    Ok(Dataset::with_index(columns, index))
}

/// Convert columns to numeric where every value allows it.
///
/// Coercion is all-or-nothing per column: if any non-null value fails to
/// parse, the column is kept exactly as it was. With `columns == None`
/// every column is attempted.
pub fn coerce_numeric(ds: &Dataset, columns: Option<&[String]>) -> Result<Dataset, DataError> {
    if let Some(targets) = columns {
        if let Some(missing) = targets.iter().find(|name| !ds.has_column(name)) {
            return Err(DataError::ColumnNotFound(missing.clone()));
        }
    }

    let is_target = |name: &str| columns.map_or(true, |t| t.iter().any(|c| c == name));

    let index = ds.index().to_vec();
    let coerced = ds
        .columns()
        .iter()
        .map(|c| {
            if !is_target(&c.name) {
                return c.clone();
            }
            match try_coerce(&c.values) {
                Some(values) => Column::new(c.name.clone(), values),
                None => {
                    debug!("Column '{}' left unchanged: not entirely numeric", c.name);
                    c.clone()
                }
            }
        })
        .collect();

    Ok(Dataset::with_index(coerced, index))
}

fn try_coerce(values: &[Value]) -> Option<Vec<Value>> {
    values
        .iter()
        .map(|v| match v {
            Value::Null => Some(Value::Null),
            Value::Number(n) => Some(Value::Number(*n)),
            Value::Text(s) => parse_number(s).map(Value::Number),
        })
        .collect()
}
