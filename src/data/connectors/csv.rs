use super::validator::DataValidator;
use crate::data::dataset::Dataset;
use crate::error::{Result, TypedGpError};
use crate::types::Value;
use polars::prelude::*;
use std::path::Path;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| TypedGpError::Dataset(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load a CSV file and turn it into a dataset with `target` as the label.
    pub fn load_dataset<P: AsRef<Path>>(path: P, target: &str, classification: bool) -> Result<Dataset> {
        let df = Self::load(&path)?;
        log::debug!(
            "Loaded {} rows x {} columns from {}",
            df.height(),
            df.width(),
            path.as_ref().display()
        );
        Self::to_dataset(&df, target, classification)
    }

    /// Converts every supported column except `target` into a feature.
    /// Booleans map to ArrayB, integer columns to ArrayI, floats to ArrayF.
    pub fn to_dataset(df: &DataFrame, target: &str, classification: bool) -> Result<Dataset> {
        DataValidator::validate_target(df, target)?;
        DataValidator::validate_minimum_rows(df, 1)?;

        let null_report = DataValidator::check_nulls(df)?;
        if !null_report.is_empty() {
            log::warn!("Null values detected, filling with zeros: {:?}", null_report);
        }

        let y_col = df.column(target)?.cast(&DataType::Float64)?;
        let y: Vec<f64> = y_col.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect();

        let mut features = Vec::new();
        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == target {
                continue;
            }
            match Self::column_value(column)? {
                Some(value) => features.push((name, value)),
                None => log::warn!("Skipping column '{}' of unsupported type {:?}", name, column.dtype()),
            }
        }

        Dataset::new(features, y, classification)
    }

    fn column_value(column: &Column) -> Result<Option<Value>> {
        let dtype = column.dtype();
        let value = if matches!(dtype, DataType::Boolean) {
            let values = column.bool()?;
            Value::ArrayB(values.into_iter().map(|v| v.unwrap_or(false)).collect())
        } else if dtype.is_integer() {
            let cast = column.cast(&DataType::Int64)?;
            Value::ArrayI(cast.i64()?.into_iter().map(|v| v.unwrap_or(0)).collect())
        } else if dtype.is_float() {
            let cast = column.cast(&DataType::Float64)?;
            Value::ArrayF(cast.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
        } else {
            return Ok(None);
        };
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueKind;
    use polars::df;
    use std::io::Write;

    #[test]
    fn test_to_dataset_maps_column_types() {
        let df = df! {
            "x1" => &[0.5, 1.5, 2.5],
            "x2" => &[1i64, 2, 3],
            "flag" => &[true, false, true],
            "name" => &["a", "b", "c"],
            "y" => &[1.0, 2.0, 3.0],
        }
        .unwrap();

        let d = CsvConnector::to_dataset(&df, "y", false).unwrap();
        assert_eq!(d.n_features(), 3);
        assert_eq!(d.get("x1").unwrap().kind(), ValueKind::ArrayF);
        assert_eq!(d.get("x2").unwrap().kind(), ValueKind::ArrayI);
        assert_eq!(d.get("flag").unwrap().kind(), ValueKind::ArrayB);
        assert!(d.get("name").is_err());
        assert_eq!(d.y, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_load_dataset_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b,label").unwrap();
        writeln!(file, "0.1,3,0").unwrap();
        writeln!(file, "0.7,4,1").unwrap();
        writeln!(file, "0.2,5,0").unwrap();
        file.flush().unwrap();

        let d = CsvConnector::load_dataset(file.path(), "label", true).unwrap();
        assert_eq!(d.n_samples(), 3);
        assert!(d.classification);
        assert_eq!(d.get("a").unwrap().kind(), ValueKind::ArrayF);
        assert_eq!(d.get("b").unwrap().kind(), ValueKind::ArrayI);
        assert_eq!(d.classes(), vec![0.0, 1.0]);
    }
}
