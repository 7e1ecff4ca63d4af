//! Fixed-width record batches.
//!
//! A batch stores its records row-major as one dense `Vec<i32>`, so the
//! per-record layout always matches the schema exactly: projecting a batch
//! repacks the selected fields with no gaps.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::schema::RecordSchema;

/// An ordered collection of records sharing one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BatchRepr", into = "BatchRepr")]
pub struct RecordBatch {
    schema: Arc<RecordSchema>,
    values: Vec<i32>,
}

#[derive(Serialize, Deserialize)]
struct BatchRepr {
    schema: RecordSchema,
    values: Vec<i32>,
}

impl TryFrom<BatchRepr> for RecordBatch {
    type Error = ModelError;

    fn try_from(repr: BatchRepr) -> Result<Self> {
        Self::from_values(Arc::new(repr.schema), repr.values)
    }
}

impl From<RecordBatch> for BatchRepr {
    fn from(batch: RecordBatch) -> Self {
        Self {
            schema: Arc::unwrap_or_clone(batch.schema),
            values: batch.values,
        }
    }
}

impl RecordBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            schema,
            values: Vec::new(),
        }
    }

    /// Create an empty batch with room for `records` records.
    #[must_use]
    pub fn with_capacity(schema: Arc<RecordSchema>, records: usize) -> Self {
        let values = Vec::with_capacity(records.saturating_mul(schema.len()));
        Self { schema, values }
    }

    /// Wrap row-major values. The length must be a whole number of records.
    pub fn from_values(schema: Arc<RecordSchema>, values: Vec<i32>) -> Result<Self> {
        let width = schema.len();
        let whole = if width == 0 {
            values.is_empty()
        } else {
            values.len().is_multiple_of(width)
        };
        if !whole {
            return Err(ModelError::RowLengthMismatch {
                expected: width,
                actual: if width == 0 {
                    values.len()
                } else {
                    values.len() % width
                },
            });
        }
        Ok(Self { schema, values })
    }

    /// Append one record.
    pub fn push_record(&mut self, record: &[i32]) -> Result<()> {
        if record.len() != self.schema.len() {
            return Err(ModelError::RowLengthMismatch {
                expected: self.schema.len(),
                actual: record.len(),
            });
        }
        self.values.extend_from_slice(record);
        Ok(())
    }

    /// Append every record of another batch with the same layout.
    pub fn append(&mut self, other: &Self) -> Result<()> {
        if self.schema != other.schema {
            return Err(ModelError::SchemaMismatch {
                expected: self.schema.field_names(),
                actual: other.schema.field_names(),
            });
        }
        self.values.extend_from_slice(&other.values);
        Ok(())
    }

    /// The batch layout.
    #[must_use]
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Shared handle to the batch layout.
    #[must_use]
    pub fn schema_ref(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.schema.len() {
            0 => 0,
            width => self.values.len() / width,
        }
    }

    /// Whether the batch holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the records in their on-disk encoding.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.len() * self.schema.record_width()
    }

    /// Row-major values.
    #[must_use]
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Consume the batch, returning its row-major values.
    #[must_use]
    pub fn into_values(self) -> Vec<i32> {
        self.values
    }

    /// Record at `index`.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        let width = self.schema.len();
        let start = index.checked_mul(width)?;
        let end = start.checked_add(width)?;
        let values = self.values.get(start..end)?;
        (index < self.len()).then_some(Record {
            schema: &self.schema,
            values,
        })
    }

    /// Iterate records in order.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        let schema: &RecordSchema = &self.schema;
        self.values
            .chunks_exact(schema.len().max(1))
            .map(move |values| Record { schema, values })
    }

    /// Value of `name` in record `index`.
    #[must_use]
    pub fn value(&self, index: usize, name: &str) -> Option<i32> {
        self.record(index)?.get(name)
    }

    /// Copy one field out as a column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<i32>> {
        let idx = self.schema.position(name)?;
        Some(self.records().map(|record| record.values[idx]).collect())
    }

    /// Keep only the named fields, repacked densely in the requested order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let (projected, positions) = self.schema.project(names)?;
        let mut values = Vec::with_capacity(self.len() * positions.len());
        for record in self.records() {
            values.extend(positions.iter().map(|&idx| record.values[idx]));
        }
        Ok(Self {
            schema: Arc::new(projected),
            values,
        })
    }
}

/// Borrowed view of one record.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    schema: &'a RecordSchema,
    values: &'a [i32],
}

impl<'a> Record<'a> {
    /// Value of a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<i32> {
        self.schema.position(name).map(|idx| self.values[idx])
    }

    /// Values in schema order.
    #[must_use]
    pub fn values(&self) -> &'a [i32] {
        self.values
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, i32)> + 'a {
        self.schema.names().zip(self.values.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawHeaderSection;

    fn schema(names: &[&str]) -> Arc<RecordSchema> {
        let raw = RawHeaderSection::new(names.iter().map(|n| (*n).to_string()).collect(), vec![]);
        Arc::new(raw.schema().unwrap())
    }

    #[test]
    fn test_from_values_counts_records() {
        let batch = RecordBatch::from_values(schema(&["A", "B"]), vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.byte_len(), 24);
        assert_eq!(batch.value(1, "B"), Some(4));
        assert_eq!(batch.column("A"), Some(vec![1, 3, 5]));
    }

    #[test]
    fn test_from_values_rejects_partial_record() {
        let err = RecordBatch::from_values(schema(&["A", "B"]), vec![1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            ModelError::RowLengthMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_push_record_checks_arity() {
        let mut batch = RecordBatch::new(schema(&["A", "B"]));
        batch.push_record(&[7, 8]).unwrap();
        assert!(batch.push_record(&[9]).is_err());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_select_repacks_densely() {
        let batch =
            RecordBatch::from_values(schema(&["A", "B", "C"]), vec![1, 2, 3, 4, 5, 6]).unwrap();
        let selected = batch.select(&["C", "A"]).unwrap();

        assert_eq!(selected.schema().field_names(), vec!["C", "A"]);
        assert_eq!(selected.values(), &[3, 1, 6, 4]);
        assert_eq!(selected.byte_len(), 16);
    }

    #[test]
    fn test_select_missing_field() {
        let batch = RecordBatch::from_values(schema(&["A"]), vec![1]).unwrap();
        assert!(matches!(
            batch.select(&["Z"]),
            Err(ModelError::MissingFields { .. })
        ));
    }

    #[test]
    fn test_append_requires_same_layout() {
        let mut left = RecordBatch::from_values(schema(&["A"]), vec![1]).unwrap();
        let right = RecordBatch::from_values(schema(&["A"]), vec![2, 3]).unwrap();
        left.append(&right).unwrap();
        assert_eq!(left.column("A"), Some(vec![1, 2, 3]));

        let other = RecordBatch::from_values(schema(&["B"]), vec![4]).unwrap();
        assert!(matches!(
            left.append(&other),
            Err(ModelError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_record_iteration() {
        let batch = RecordBatch::from_values(schema(&["A", "B"]), vec![1, 2, 3, 4]).unwrap();
        let pairs: Vec<(&str, i32)> = batch.record(1).unwrap().iter().collect();
        assert_eq!(pairs, vec![("A", 3), ("B", 4)]);
        assert!(batch.record(2).is_none());
        assert_eq!(batch.records().count(), 2);
    }

    #[test]
    fn test_out_of_range_index_is_none() {
        let batch = RecordBatch::from_values(schema(&["A", "B"]), vec![1, 2]).unwrap();
        assert!(batch.record(usize::MAX / 2).is_none());
        assert_eq!(batch.value(usize::MAX / 2, "A"), None);
        assert_eq!(batch.value(usize::MAX, "B"), None);
    }
}
