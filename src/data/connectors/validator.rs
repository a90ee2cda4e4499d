use crate::error::{Result, TypedGpError};
use polars::prelude::*;

pub struct DataValidator;

impl DataValidator {
    /// The target column must exist and be numeric or boolean.
    pub fn validate_target(df: &DataFrame, target: &str) -> Result<()> {
        let column = df
            .column(target)
            .map_err(|_| TypedGpError::FeatureNotFound(target.to_string()))?;
        if !Self::is_supported(column.dtype()) {
            return Err(TypedGpError::Dataset(format!(
                "Target column '{}' must be numeric, found {:?}",
                target,
                column.dtype()
            )));
        }
        Ok(())
    }

    pub fn is_supported(dtype: &DataType) -> bool {
        dtype.is_float() || dtype.is_integer() || matches!(dtype, DataType::Boolean)
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(TypedGpError::Dataset(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Columns holding nulls, with their null counts.
    pub fn check_nulls(df: &DataFrame) -> Result<Vec<(String, usize)>> {
        let mut null_report = Vec::new();

        for col_name in df.get_column_names() {
            let series = df.column(col_name)?;
            let null_count = series.null_count();
            if null_count > 0 {
                null_report.push((col_name.to_string(), null_count));
            }
        }

        Ok(null_report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_validate_target() {
        let df = df! {
            "x" => &[1.0, 2.0],
            "label" => &[0i64, 1],
            "name" => &["a", "b"],
        }
        .unwrap();

        assert!(DataValidator::validate_target(&df, "label").is_ok());
        assert!(DataValidator::validate_target(&df, "name").is_err());
        assert!(matches!(
            DataValidator::validate_target(&df, "missing"),
            Err(TypedGpError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_minimum_rows() {
        let df = df! { "x" => &[1.0, 2.0] }.unwrap();
        assert!(DataValidator::validate_minimum_rows(&df, 2).is_ok());
        assert!(DataValidator::validate_minimum_rows(&df, 3).is_err());
    }

    #[test]
    fn test_check_nulls() {
        let df = df! {
            "x" => &[Some(1.0), None, Some(3.0)],
            "y" => &[1.0, 2.0, 3.0],
        }
        .unwrap();
        let report = DataValidator::check_nulls(&df).unwrap();
        assert_eq!(report, vec![("x".to_string(), 1)]);
    }
}
