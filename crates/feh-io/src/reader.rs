//! FEH data file reader.
//!
//! A data file is a flat run of fixed-width records with no delimiters:
//!
//! | Offset                     | Content                               |
//! |----------------------------|---------------------------------------|
//! | `r * width + 4 * f`        | field `f` of record `r`, LE `i32`     |
//!
//! where `width = 4 * field_count`. Reads past the end of the file are
//! truncated to the bytes available; a short read is not an error.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use feh_model::{FIELD_WIDTH, FileType, RecordBatch, RecordSchema};

use crate::error::{FehError, Result};
use crate::header::read_header;
use crate::types::{ReaderOptions, RecordCount};

/// Reader for fixed-width records described by a [`RecordSchema`].
pub struct RecordReader<R: Read + Seek> {
    source: R,
    schema: Arc<RecordSchema>,
}

impl<R: Read + Seek> RecordReader<R> {
    /// Create a reader over any seekable source.
    pub fn new(source: R, schema: Arc<RecordSchema>) -> Self {
        Self { source, schema }
    }

    /// Schema used to decode records.
    #[must_use]
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Read records as described by `options`.
    ///
    /// The projection is validated before any I/O, so a bad field list
    /// leaves the source untouched.
    pub fn read(&mut self, options: &ReaderOptions) -> Result<RecordBatch> {
        if let Some(fields) = &options.fields {
            self.schema.check_fields(fields)?;
        }
        let (batch, trailing) = self.read_span(options.offset, options.count)?;
        if trailing > 0 {
            tracing::warn!(
                offset = options.offset,
                record_width = self.schema.record_width(),
                trailing,
                "ignoring partial record at end of data"
            );
        }
        match &options.fields {
            Some(fields) => Ok(batch.select(fields)?),
            None => Ok(batch),
        }
    }

    /// Read up to `count` whole records starting at `offset`, unprojected.
    ///
    /// Also returns the number of trailing bytes that did not form a whole
    /// record.
    pub(crate) fn read_span(
        &mut self,
        offset: u64,
        count: RecordCount,
    ) -> Result<(RecordBatch, usize)> {
        let width = self.schema.record_width();
        if width == 0 {
            return Ok((RecordBatch::new(Arc::clone(&self.schema)), 0));
        }

        self.source.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::new();
        match count.byte_span(width) {
            Some(span) => {
                (&mut self.source).take(span).read_to_end(&mut buf)?;
            }
            None => {
                self.source.read_to_end(&mut buf)?;
            }
        }

        let whole = buf.len() - buf.len() % width;

        let values: Vec<i32> = buf[..whole]
            .chunks_exact(FIELD_WIDTH)
            .map(|word| i32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect();
        let batch = RecordBatch::from_values(Arc::clone(&self.schema), values)?;

        tracing::debug!(offset, records = batch.len(), "read records");
        Ok((batch, buf.len() - whole))
    }
}

impl RecordReader<BufReader<File>> {
    /// Open a data file for reading.
    pub fn open(path: &Path, schema: Arc<RecordSchema>) -> Result<Self> {
        let file = File::open(path).map_err(|e| FehError::from_open(path, e))?;
        Ok(Self::new(BufReader::new(file), schema))
    }
}

/// Read records from a data file using an already decoded schema.
pub fn read_records(
    schema: &Arc<RecordSchema>,
    path: &Path,
    options: &ReaderOptions,
) -> Result<RecordBatch> {
    RecordReader::open(path, Arc::clone(schema))?.read(options)
}

/// Decode a header, then read the matching family or person data file.
pub fn read_feh_data_file(
    header_path: &Path,
    data_path: &Path,
    file_type: FileType,
    options: &ReaderOptions,
) -> Result<RecordBatch> {
    let header = read_header(header_path)?;
    read_records(header.schema(file_type), data_path, options)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use feh_model::ModelError;

    use super::*;

    fn schema() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::builder()
                .scalar("PERNUM")
                .scalar("AGE")
                .scalar("SEX")
                .build()
                .unwrap(),
        )
    }

    fn encode(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_read_all() {
        let data = encode(&[1, 30, 1, 2, 45, 2]);
        let mut reader = RecordReader::new(Cursor::new(data), schema());
        let batch = reader.read(&ReaderOptions::new()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.value(1, "AGE"), Some(45));
    }

    #[test]
    fn test_read_with_offset_and_count() {
        let data = encode(&[1, 30, 1, 2, 45, 2, 3, -7, 1]);
        let mut reader = RecordReader::new(Cursor::new(data), schema());
        let options = ReaderOptions::new()
            .with_offset(12)
            .with_count(RecordCount::Records(1));
        let batch = reader.read(&options).unwrap();
        assert_eq!(batch.values(), &[2, 45, 2]);
    }

    #[test]
    fn test_short_read_is_truncated() {
        let data = encode(&[1, 30, 1, 2, 45, 2]);
        let mut reader = RecordReader::new(Cursor::new(data), schema());
        let batch = reader
            .read(&ReaderOptions::new().with_count(RecordCount::Records(10)))
            .unwrap();
        assert_eq!(batch.len(), 2);

        let past_end = reader
            .read(&ReaderOptions::new().with_offset(1000))
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_partial_record_dropped() {
        let mut data = encode(&[1, 30, 1]);
        data.extend_from_slice(&[9, 9]);
        let mut reader = RecordReader::new(Cursor::new(data), schema());
        let batch = reader.read(&ReaderOptions::new()).unwrap();
        assert_eq!(batch.values(), &[1, 30, 1]);

        let (batch, trailing) = reader.read_span(0, RecordCount::All).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(trailing, 2);
    }

    #[test]
    fn test_projection_repacks() {
        let data = encode(&[1, 30, 1, 2, 45, 2]);
        let mut reader = RecordReader::new(Cursor::new(data), schema());
        let batch = reader
            .read(&ReaderOptions::new().with_fields(["SEX", "PERNUM"]))
            .unwrap();
        assert_eq!(batch.schema().field_names(), vec!["SEX", "PERNUM"]);
        assert_eq!(batch.values(), &[1, 1, 2, 2]);
        assert_eq!(batch.byte_len(), 16);
    }

    #[test]
    fn test_missing_projection_field() {
        let mut reader = RecordReader::new(Cursor::new(encode(&[1, 2, 3])), schema());
        let err = reader
            .read(&ReaderOptions::new().with_fields(["AGE", "INCOME"]))
            .unwrap_err();
        match err {
            FehError::Model(ModelError::MissingFields { missing, available }) => {
                assert_eq!(missing, vec!["INCOME"]);
                assert_eq!(available, vec!["PERNUM", "AGE", "SEX"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
