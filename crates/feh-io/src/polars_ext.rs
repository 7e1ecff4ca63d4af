//! Polars DataFrame integration.
//!
//! Record batches map to frames with one `Int32` column per field, in schema
//! order. Long-form batches map to `year`, `pernum`, then one column per
//! base variable.

use std::sync::Arc;

use feh_model::{FieldSpec, LongBatch, ModelError, RecordBatch, RecordSchema};
use polars::prelude::{Column, DataFrame, DataType};

use crate::error::{FehError, Result};
use crate::sink::RowSink;

/// Convert a record batch to a DataFrame.
pub fn batch_to_dataframe(batch: &RecordBatch) -> Result<DataFrame> {
    let columns: Vec<Column> = batch
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let values: Vec<i32> = batch.records().map(|record| record.values()[idx]).collect();
            Column::new(field.name.as_str().into(), values)
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Convert a DataFrame to a record batch with one scalar field per column.
///
/// Every column is cast to `Int32`; nulls are rejected.
pub fn dataframe_to_batch(df: &DataFrame) -> Result<RecordBatch> {
    let fields = df
        .get_column_names()
        .into_iter()
        .map(|name| FieldSpec::scalar(name.as_str()))
        .collect();
    let schema = Arc::new(RecordSchema::new(fields)?);
    dataframe_to_batch_with_schema(df, schema)
}

/// Convert a DataFrame to a record batch laid out by `schema`.
///
/// Columns are looked up by field name; extra columns are ignored.
pub fn dataframe_to_batch_with_schema(
    df: &DataFrame,
    schema: Arc<RecordSchema>,
) -> Result<RecordBatch> {
    let missing: Vec<String> = schema
        .names()
        .filter(|name| df.column(name).is_err())
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ModelError::MissingFields {
            missing,
            available: df
                .get_column_names()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        }
        .into());
    }

    let height = df.height();
    let width = schema.len();
    let mut values = vec![0i32; height * width];
    for (field_idx, name) in schema.names().enumerate() {
        let column = df.column(name)?.cast(&DataType::Int32)?;
        let ints = column.i32()?;
        if ints.null_count() > 0 {
            return Err(FehError::DataFrame {
                message: format!(
                    "column {name} has {} null values after Int32 cast",
                    ints.null_count()
                ),
            });
        }
        for (row, value) in ints.into_iter().flatten().enumerate() {
            values[row * width + field_idx] = value;
        }
    }
    Ok(RecordBatch::from_values(schema, values)?)
}

/// Convert a long-form batch to a DataFrame.
pub fn long_to_dataframe(long: &LongBatch) -> Result<DataFrame> {
    let rows = long.rows();
    let mut columns = Vec::with_capacity(long.variables().len() + 2);
    columns.push(Column::new(
        "year".into(),
        rows.iter().map(|row| row.year).collect::<Vec<i32>>(),
    ));
    columns.push(Column::new(
        "pernum".into(),
        rows.iter().map(|row| row.pernum).collect::<Vec<i32>>(),
    ));
    for (idx, variable) in long.variables().iter().enumerate() {
        columns.push(Column::new(
            variable.as_str().into(),
            rows.iter().map(|row| row.values[idx]).collect::<Vec<i32>>(),
        ));
    }
    Ok(DataFrame::new(columns)?)
}

/// Sink that stacks batches into a single DataFrame.
#[derive(Debug, Default)]
pub struct DataFrameSink {
    frame: Option<DataFrame>,
}

impl DataFrameSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame collected so far, if any batch was written.
    #[must_use]
    pub fn frame(&self) -> Option<&DataFrame> {
        self.frame.as_ref()
    }

    /// Take the collected frame, empty if nothing was written.
    #[must_use]
    pub fn into_frame(self) -> DataFrame {
        self.frame.unwrap_or_else(DataFrame::empty)
    }
}

impl RowSink for DataFrameSink {
    fn write_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        let df = batch_to_dataframe(batch)?;
        match self.frame.as_mut() {
            Some(existing) => {
                existing.vstack_mut(&df)?;
            }
            None => self.frame = Some(df),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
