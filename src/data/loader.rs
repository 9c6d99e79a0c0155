//! Loading and matrix extraction

use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;

use crate::error::{Result, StackcastError};

/// One side (train or test) of the input boundary, already sanitized.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

impl Dataset {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }
}

/// Load a flat table from CSV or Parquet, by extension.
pub fn load_table(path: &Path) -> Result<DataFrame> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let df = match ext {
        "csv" => CsvReadOptions::default()
            .with_infer_schema_length(Some(1000))
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        "parquet" => ParquetReader::new(std::fs::File::open(path)?).finish()?,
        _ => {
            return Err(StackcastError::DataError(format!(
                "unsupported table format: {}",
                path.display()
            )))
        }
    };

    Ok(df)
}

/// Read the newline-delimited feature-name list. Order matters: it must
/// match the column order replayed at inference time.
pub fn read_feature_names(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    let names: Vec<String> = raw
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect();

    if names.is_empty() {
        return Err(StackcastError::DataError(format!(
            "feature list {} is empty",
            path.display()
        )));
    }

    Ok(names)
}

/// Extract the named feature columns into a row-major matrix.
///
/// Nulls and non-finite values become exact zero, not row drops. Lossy on
/// purpose: the upstream warehouse emits NaN for unjoined rows and a zero
/// cell keeps the tables row-aligned.
pub fn extract_features(df: &DataFrame, feature_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = feature_names.len();

    let col_data: Vec<Vec<f64>> = feature_names
        .iter()
        .map(|col_name| column_as_f64(df, col_name))
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

/// Extract features and label from one table.
pub fn load_dataset(
    df: &DataFrame,
    feature_names: &[String],
    label_column: &str,
) -> Result<Dataset> {
    let x = extract_features(df, feature_names)?;
    let y = Array1::from_vec(column_as_f64(df, label_column)?);

    if x.nrows() != y.len() {
        return Err(StackcastError::ShapeError {
            expected: format!("label length = {}", x.nrows()),
            actual: format!("label length = {}", y.len()),
        });
    }

    Ok(Dataset { x, y })
}

fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .map_err(|_| StackcastError::FeatureNotFound(name.to_string()))?;
    let series_f64 = series
        .cast(&DataType::Float64)
        .map_err(|e| StackcastError::DataError(e.to_string()))?;
    let values: Vec<f64> = series_f64
        .f64()
        .map_err(|e| StackcastError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| sanitize(v.unwrap_or(0.0)))
        .collect();
    Ok(values)
}

#[inline]
fn sanitize(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
