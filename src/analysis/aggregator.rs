//! Summary statistics, grouping and correlation.
//!
//! This module provides the read-only computations over a dataset that
//! produce the derived tables written to reports.

use std::collections::BTreeMap;

use tracing::debug;

use super::stats;
use crate::error::DataError;
use crate::models::{
    CorrelationMatrix, Dataset, GroupRow, GroupedTable, SummaryRow, SummaryTable, Value,
};

/// Mean, median, sample std, min and max of every numeric column.
///
/// Missing values are ignored.
pub fn summary_statistics(ds: &Dataset) -> SummaryTable {
    let rows = ds
        .numeric_columns()
        .into_iter()
        .map(|column| {
            let values = column.numbers();
            SummaryRow {
                column: column.name.clone(),
                mean: stats::mean(&values),
                median: stats::median(&values),
                std: stats::std_dev(&values),
                min: stats::min(&values),
                max: stats::max(&values),
            }
        })
        .collect();

    SummaryTable { rows }
}

/// Mean of every other numeric column per distinct value of `column`.
///
/// Groups come out in sorted key order; rows with a missing key are dropped.
pub fn group_by(ds: &Dataset, column: &str) -> Result<GroupedTable, DataError> {
    let key_column = ds
        .column(column)
        .ok_or_else(|| DataError::ColumnNotFound(column.to_string()))?;

    let value_columns: Vec<_> = ds
        .numeric_columns()
        .into_iter()
        .filter(|c| c.name != column)
        .collect();

    // key -> per value column, the non-null numbers in that group
    let mut groups: BTreeMap<&Value, Vec<Vec<f64>>> = BTreeMap::new();
    for (row, key) in key_column.values.iter().enumerate() {
        if key.is_null() {
            continue;
        }
        let buckets = groups
            .entry(key)
            .or_insert_with(|| vec![Vec::new(); value_columns.len()]);
        for (bucket, value_column) in buckets.iter_mut().zip(&value_columns) {
            if let Some(v) = value_column.values[row].as_f64() {
                bucket.push(v);
            }
        }
    }

    debug!("Grouped by '{}' into {} groups", column, groups.len());

    let rows = groups
        .into_iter()
        .map(|(key, buckets)| GroupRow {
            key: key.clone(),
            means: buckets.iter().map(|b| stats::mean(b)).collect(),
        })
        .collect();

    Ok(GroupedTable {
        key: column.to_string(),
        columns: value_columns.iter().map(|c| c.name.clone()).collect(),
        rows,
    })
}

/// Pearson correlation between every pair of numeric columns.
///
/// Returns an empty matrix when fewer than two numeric columns exist.
pub fn correlation_matrix(ds: &Dataset) -> CorrelationMatrix {
    let numeric = ds.numeric_columns();
    if numeric.len() < 2 {
        debug!("Skipping correlation: {} numeric column(s)", numeric.len());
        return CorrelationMatrix::default();
    }

    let series: Vec<Vec<Option<f64>>> = numeric
        .iter()
        .map(|c| c.values.iter().map(Value::as_f64).collect())
        .collect();

    let n = series.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = stats::pearson(&series[i], &series[j]);
            // Self-correlation is exactly 1 whenever the column varies.
            let r = if i == j && !r.is_nan() { 1.0 } else { r };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        columns: numeric.iter().map(|c| c.name.clone()).collect(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;
    use proptest::prelude::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn regions() -> Dataset {
        Dataset::new(vec![
            Column::new("region", vec![text("A"), text("A"), text("B")]),
            Column::new(
                "v",
                vec![Value::Number(10.0), Value::Number(20.0), Value::Number(5.0)],
            ),
        ])
    }

    #[test]
    fn test_group_by_region() {
        let grouped = group_by(&regions(), "region").unwrap();
        assert_eq!(grouped.columns, vec!["v"]);
        assert_eq!(grouped.rows.len(), 2);
        assert_eq!(grouped.mean(&text("A"), "v"), Some(15.0));
        assert_eq!(grouped.mean(&text("B"), "v"), Some(5.0));
        assert_eq!(grouped.rows[0].key, text("A"));
    }

    #[test]
    fn test_group_by_missing_column() {
        let err = group_by(&regions(), "nope").unwrap_err();
        assert_eq!(err, DataError::ColumnNotFound("nope".to_string()));
    }

    #[test]
    fn test_group_by_drops_null_keys_and_sorts() {
        let ds = Dataset::new(vec![
            Column::new("k", vec![Value::Number(2.0), Value::Null, Value::Number(1.0)]),
            Column::new("v", vec![Value::Number(1.0), Value::Number(9.0), Value::Null]),
        ]);
        let grouped = group_by(&ds, "k").unwrap();
        assert_eq!(grouped.rows.len(), 2);
        assert_eq!(grouped.rows[0].key, Value::Number(1.0));
        assert!(grouped.rows[0].means[0].is_nan());
        assert_eq!(grouped.rows[1].means[0], 1.0);
    }

    #[test]
    fn test_summary_statistics() {
        let summary = summary_statistics(&regions());
        assert_eq!(summary.rows.len(), 1);
        let v = summary.get("v").unwrap();
        assert!((v.mean - 35.0 / 3.0).abs() < 1e-12);
        assert_eq!(v.median, 10.0);
        assert_eq!(v.min, 5.0);
        assert_eq!(v.max, 20.0);
        assert!((v.std - 7.637626158259733).abs() < 1e-9);
        assert!(summary.get("region").is_none());
    }

    #[test]
    fn test_correlation_empty_with_one_numeric_column() {
        assert!(correlation_matrix(&regions()).is_empty());
    }

    #[test]
    fn test_correlation_matrix_values() {
        let ds = Dataset::new(vec![
            Column::new("a", vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]),
            Column::new("b", vec![Value::Number(3.0), Value::Number(2.0), Value::Number(1.0)]),
            Column::new("c", vec![Value::Number(7.0), Value::Number(7.0), Value::Number(7.0)]),
        ]);
        let corr = correlation_matrix(&ds);
        assert_eq!(corr.len(), 3);
        assert_eq!(corr.get("a", "a"), Some(1.0));
        assert!((corr.get("a", "b").unwrap() + 1.0).abs() < 1e-12);
        assert!(corr.get("c", "c").unwrap().is_nan());
    }

    proptest! {
        #[test]
        fn correlation_is_symmetric_with_unit_diagonal(
            cols in proptest::collection::vec(
                proptest::collection::vec(-100.0f64..100.0, 6),
                2..5,
            )
        ) {
            let ds = Dataset::new(
                cols.iter()
                    .enumerate()
                    .map(|(i, c)| Column::new(
                        format!("c{i}"),
                        c.iter().map(|v| Value::Number(*v)).collect(),
                    ))
                    .collect(),
            );
            let corr = correlation_matrix(&ds);
            let n = corr.len();
            prop_assert_eq!(n, cols.len());
            for i in 0..n {
                if stats::std_dev(&cols[i]) > 0.0 {
                    prop_assert_eq!(corr.values[i][i], 1.0);
                }
                for j in 0..n {
                    let (a, b) = (corr.values[i][j], corr.values[j][i]);
                    prop_assert!(a.to_bits() == b.to_bits());
                    prop_assert!(a.is_nan() || (-1.0..=1.0).contains(&a));
                }
            }
        }
    }
}
