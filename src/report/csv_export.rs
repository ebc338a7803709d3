//! CSV export of tabular results.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ReportError;
use crate::models::Tabular;

/// Write `table` to `<reports_dir>/<filename>`, creating the directory and
/// replacing any previous file. Returns the written path.
pub fn export_csv(
    table: &dyn Tabular,
    filename: &str,
    reports_dir: &Path,
) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(reports_dir)?;
    let path = reports_dir.join(filename);

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(table.header())?;
    for record in table.records() {
        writer.write_record(record)?;
    }
    writer.flush()?;

    info!("Exported {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, Dataset, SummaryRow, SummaryTable, Value};
    use tempfile::TempDir;

    fn dataset(v: f64) -> Dataset {
        Dataset::new(vec![
            Column::new("name", vec![Value::Text("a, b".to_string()), Value::Null]),
            Column::new("v", vec![Value::Number(v), Value::Number(2.5)]),
        ])
    }

    #[test]
    fn test_export_dataset_with_index() {
        let dir = TempDir::new().unwrap();
        let path = export_csv(&dataset(1.0), "cleaned_data.csv", dir.path()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, ",name,v\n0,\"a, b\",1\n1,,2.5\n");
    }

    #[test]
    fn test_export_overwrites() {
        let dir = TempDir::new().unwrap();
        export_csv(&dataset(1.0), "out.csv", dir.path()).unwrap();
        let path = export_csv(&dataset(7.0), "out.csv", dir.path()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("0,\"a, b\",7\n"));
        assert!(!content.contains(",1\n"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_export_creates_directory() {
        let dir = TempDir::new().unwrap();
        let reports = dir.path().join("reports");
        let summary = SummaryTable {
            rows: vec![SummaryRow {
                column: "v".to_string(),
                mean: 15.0,
                median: 15.0,
                std: f64::NAN,
                min: 10.0,
                max: 20.0,
            }],
        };
        let path = export_csv(&summary, "summary_statistics.csv", &reports).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, ",mean,median,std,min,max\nv,15.0,15.0,,10.0,20.0\n");
    }
}
