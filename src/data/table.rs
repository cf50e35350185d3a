//! CSV table helpers shared by the ledger and the feature store

use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;

use crate::error::PipelineError;

/// Read a CSV file, inferring the schema from every row so that a late
/// non-numeric cell (e.g. a DNF marker) does not break the read
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame, PipelineError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Write a DataFrame to CSV, creating parent directories
pub(crate) fn write_csv(mut df: DataFrame, path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Numeric column coerced to f64; unparsable cells become null
pub(crate) fn f64_column(df: &DataFrame, name: &str) -> Result<Float64Chunked, PipelineError> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;
    Ok(column.cast(&DataType::Float64)?.f64()?.clone())
}

/// Column coerced to strings (numeric ids are rendered as text)
pub(crate) fn str_column(df: &DataFrame, name: &str) -> Result<StringChunked, PipelineError> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;
    Ok(column.cast(&DataType::String)?.str()?.clone())
}

pub(crate) fn optional_f64_column(
    df: &DataFrame,
    name: &str,
) -> Result<Option<Float64Chunked>, PipelineError> {
    if has_column(df, name) {
        f64_column(df, name).map(Some)
    } else {
        Ok(None)
    }
}

pub(crate) fn optional_str_column(
    df: &DataFrame,
    name: &str,
) -> Result<Option<StringChunked>, PipelineError> {
    if has_column(df, name) {
        str_column(df, name).map(Some)
    } else {
        Ok(None)
    }
}

/// Non-empty, trimmed string cell
pub(crate) fn text_cell(col: &StringChunked, i: usize) -> Option<String> {
    col.get(i)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
