//! CSV loading and feature extraction

use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::features::{FeatureColumn, FeatureSchema, FeatureType};
use crate::config::DataConfig;
use crate::error::{HousingError, Result};

/// Rows sampled when inferring column dtypes
const INFER_SCHEMA_ROWS: usize = 1000;

/// Reads housing CSV files into DataFrames
#[derive(Debug, Default)]
pub struct DataLoader;

impl DataLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path).map_err(|e| {
            HousingError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| HousingError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Load the configured CSV and pull out features and target
    pub fn load_housing(&self, config: &DataConfig) -> Result<HousingData> {
        let df = self.load_csv(&config.csv_path)?;
        debug!(
            path = %config.csv_path.display(),
            rows = df.height(),
            cols = df.width(),
            "Loaded CSV"
        );
        HousingData::from_frame(&df, &config.feature_columns, Some(&config.target_column))
            .map(|data| data.with_source(config.csv_path.clone()))
    }
}

/// Feature matrix (and optional target) in schema order
#[derive(Debug, Clone)]
pub struct HousingData {
    pub schema: FeatureSchema,
    pub x: Array2<f64>,
    pub y: Option<Array1<f64>>,
    pub source: Option<PathBuf>,
}

impl HousingData {
    /// Select `features` (in that order) and optionally `target` from a DataFrame
    pub fn from_frame(df: &DataFrame, features: &[String], target: Option<&str>) -> Result<Self> {
        let mut columns = Vec::with_capacity(features.len());
        let mut col_data = Vec::with_capacity(features.len());

        for name in features {
            let (dtype, values) = numeric_column(df, name)?;
            columns.push(FeatureColumn {
                name: name.clone(),
                dtype,
            });
            col_data.push(values);
        }

        let n_rows = df.height();
        let x = Array2::from_shape_fn((n_rows, features.len()), |(r, c)| col_data[c][r]);

        let y = match target {
            Some(name) => Some(Array1::from_vec(numeric_column(df, name)?.1)),
            None => None,
        };

        Ok(Self {
            schema: FeatureSchema::new(columns),
            x,
            y,
            source: None,
        })
    }

    fn with_source(mut self, path: PathBuf) -> Self {
        self.source = Some(path);
        self
    }

    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    /// Target vector, or an error when the data was loaded without one
    pub fn target(&self) -> Result<&Array1<f64>> {
        self.y
            .as_ref()
            .ok_or_else(|| HousingError::DataError("no target column loaded".to_string()))
    }

    /// One feature row by position
    pub fn row(&self, index: usize) -> Result<Vec<f64>> {
        if index >= self.x.nrows() {
            return Err(HousingError::InvalidParameter {
                name: "row".to_string(),
                value: index.to_string(),
                reason: format!("data has {} rows", self.x.nrows()),
            });
        }
        Ok(self.x.row(index).to_vec())
    }
}

fn feature_type(dtype: &DataType) -> Option<FeatureType> {
    match dtype {
        DataType::Boolean => Some(FeatureType::Boolean),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::UInt8 | DataType::UInt16 => {
            Some(FeatureType::Integer)
        }
        DataType::Int64 | DataType::UInt32 | DataType::UInt64 => Some(FeatureType::Long),
        DataType::Float32 => Some(FeatureType::Float),
        DataType::Float64 => Some(FeatureType::Double),
        _ => None,
    }
}

/// Extract a numeric column as f64, rejecting text columns and nulls
fn numeric_column(df: &DataFrame, name: &str) -> Result<(FeatureType, Vec<f64>)> {
    let column = df
        .column(name)
        .map_err(|_| HousingError::FeatureNotFound(name.to_string()))?;

    let dtype = feature_type(column.dtype()).ok_or_else(|| {
        HousingError::DataError(format!(
            "column '{}' has non-numeric type {:?}",
            name,
            column.dtype()
        ))
    })?;

    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| HousingError::DataError(e.to_string()))?;

    let values = series
        .f64()
        .map_err(|e| HousingError::DataError(e.to_string()))?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                HousingError::DataError(format!("column '{}' has a missing value at row {}", name, row))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok((dtype, values))
}
