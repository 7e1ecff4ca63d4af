//! Chunked reading of large data files.
//!
//! [`ChunkedReader`] streams a data file in fixed-size batches. Its position
//! lives in an explicit [`CursorState`]; the file handle is opened lazily and
//! released as soon as the data is exhausted or a read fails.
//!
//! ```no_run
//! use std::path::Path;
//! use feh_io::{ChunkSize, ChunkedReader, ChunkedReaderOptions, FileType};
//!
//! let options = ChunkedReaderOptions::new()
//!     .with_chunk_size(ChunkSize::records(10_000).unwrap())
//!     .with_fields(["PERNUM", "AGE"]);
//! let mut reader = ChunkedReader::open(
//!     Path::new("header.dat"),
//!     Path::new("person.dat"),
//!     FileType::Person,
//!     options,
//! )
//! .unwrap();
//! for chunk in reader.chunks() {
//!     let chunk = chunk.unwrap();
//!     println!("{} records", chunk.len());
//! }
//! ```

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use feh_model::{FileType, RecordBatch, RecordSchema};

use crate::error::{FehError, Result};
use crate::header::read_header;
use crate::reader::RecordReader;
use crate::types::{ChunkSize, ChunkedReaderOptions, RecordCount};

/// Read position and policy of a chunked read session.
///
/// `bytes_consumed` only grows between policy changes and never exceeds
/// `file_len`. Changing the chunk size or projection rewinds to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorState {
    chunk_size: ChunkSize,
    fields: Option<Vec<String>>,
    bytes_consumed: u64,
    file_len: u64,
}

impl CursorState {
    /// Fresh state at the start of a file of `file_len` bytes.
    #[must_use]
    pub fn new(file_len: u64, chunk_size: ChunkSize, fields: Option<Vec<String>>) -> Self {
        Self {
            chunk_size,
            fields,
            bytes_consumed: 0,
            file_len,
        }
    }

    /// Records per chunk.
    #[must_use]
    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// Active projection, if any.
    #[must_use]
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    /// Bytes read so far.
    #[must_use]
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Size of the data file in bytes.
    #[must_use]
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.file_len - self.bytes_consumed
    }

    /// Whether every byte has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.bytes_consumed == self.file_len
    }

    /// Byte span of the next chunk, clamped to what is left.
    #[must_use]
    pub fn next_span(&self, record_width: usize) -> u64 {
        let remaining = self.remaining();
        match self.chunk_size {
            ChunkSize::WholeFile => remaining,
            ChunkSize::Records(n) => (n.get() as u64)
                .saturating_mul(record_width as u64)
                .min(remaining),
        }
    }

    /// Move forward by the bytes actually returned.
    pub fn advance(&mut self, bytes: u64) {
        self.bytes_consumed = self.bytes_consumed.saturating_add(bytes).min(self.file_len);
    }

    /// Return to the start of the file.
    pub fn rewind(&mut self) {
        self.bytes_consumed = 0;
    }

    /// Change the chunk size and rewind.
    pub fn set_chunk_size(&mut self, chunk_size: ChunkSize) {
        self.chunk_size = chunk_size;
        self.rewind();
    }

    /// Change the projection and rewind.
    pub fn set_fields(&mut self, fields: Option<Vec<String>>) {
        self.fields = fields;
        self.rewind();
    }
}

/// Streaming reader over one family or person data file.
pub struct ChunkedReader {
    path: PathBuf,
    schema: Arc<RecordSchema>,
    reader: Option<RecordReader<BufReader<File>>>,
    state: CursorState,
}

impl ChunkedReader {
    /// Decode `header_path` and prepare to stream `data_path`.
    ///
    /// Both paths are checked before the header is read.
    pub fn open(
        header_path: &Path,
        data_path: &Path,
        file_type: FileType,
        options: ChunkedReaderOptions,
    ) -> Result<Self> {
        for path in [header_path, data_path] {
            fs::metadata(path).map_err(|e| FehError::from_open(path, e))?;
        }
        let header = read_header(header_path)?;
        Self::with_schema(data_path, Arc::clone(header.schema(file_type)), options)
    }

    /// Like [`ChunkedReader::open`], taking the record kind as text
    /// (`"family"` or `"person"`).
    pub fn open_named(
        header_path: &Path,
        data_path: &Path,
        file_type: &str,
        options: ChunkedReaderOptions,
    ) -> Result<Self> {
        let file_type: FileType = file_type.parse()?;
        Self::open(header_path, data_path, file_type, options)
    }

    /// Stream `data_path` using an already decoded schema.
    pub fn with_schema(
        data_path: &Path,
        schema: Arc<RecordSchema>,
        options: ChunkedReaderOptions,
    ) -> Result<Self> {
        let file_len = fs::metadata(data_path)
            .map_err(|e| FehError::from_open(data_path, e))?
            .len();
        if let Some(fields) = &options.fields {
            schema.check_fields(fields)?;
        }
        if file_len % schema.record_width().max(1) as u64 != 0 {
            tracing::warn!(
                path = %data_path.display(),
                file_len,
                record_width = schema.record_width(),
                "data file length is not a whole number of records"
            );
        }
        Ok(Self {
            path: data_path.to_path_buf(),
            schema,
            reader: None,
            state: CursorState::new(file_len, options.chunk_size, options.fields),
        })
    }

    /// Path of the data file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full, unprojected record schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Current read position and policy.
    #[must_use]
    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Whether a file handle is currently held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Change the chunk size. Reading restarts from the beginning.
    pub fn set_chunk_size(&mut self, chunk_size: ChunkSize) {
        self.state.set_chunk_size(chunk_size);
    }

    /// Change the projection. Reading restarts from the beginning.
    ///
    /// On error the previous projection and position are kept.
    pub fn set_field_projection(&mut self, fields: Option<Vec<String>>) -> Result<()> {
        if let Some(names) = &fields {
            self.schema.check_fields(names)?;
        }
        self.state.set_fields(fields);
        Ok(())
    }

    /// Read the next chunk.
    ///
    /// Returns an empty batch once the whole file has been consumed.
    pub fn read_chunk(&mut self) -> Result<RecordBatch> {
        let batch = if self.state.is_exhausted() {
            self.reader = None;
            RecordBatch::new(Arc::clone(&self.schema))
        } else {
            self.read_next()?
        };
        match self.state.fields() {
            Some(fields) => Ok(batch.select(fields)?),
            None => Ok(batch),
        }
    }

    /// Iterate over chunks until the data is exhausted or a read fails.
    pub fn chunks(&mut self) -> Chunks<'_> {
        Chunks {
            reader: self,
            done: false,
        }
    }

    fn read_next(&mut self) -> Result<RecordBatch> {
        let width = self.schema.record_width();
        let offset = self.state.bytes_consumed();
        let span = self.state.next_span(width);
        let count = RecordCount::Records(span.div_ceil(width.max(1) as u64) as usize);

        // A ragged file length was already reported at construction.
        let result = self
            .ensure_open()
            .and_then(|reader| reader.read_span(offset, count));
        let batch = match result {
            Ok((batch, _trailing)) => batch,
            Err(err) => {
                self.reader = None;
                return Err(err);
            }
        };

        if batch.is_empty() {
            // Only a partial record is left.
            self.state.advance(self.state.remaining());
        } else {
            self.state.advance(batch.byte_len() as u64);
        }
        if self.state.is_exhausted() {
            self.reader = None;
        }

        tracing::debug!(
            offset,
            records = batch.len(),
            consumed = self.state.bytes_consumed(),
            file_len = self.state.file_len(),
            "read chunk"
        );
        Ok(batch)
    }

    fn ensure_open(&mut self) -> Result<&mut RecordReader<BufReader<File>>> {
        let reader = match self.reader.take() {
            Some(reader) => reader,
            None => RecordReader::open(&self.path, Arc::clone(&self.schema))?,
        };
        Ok(self.reader.insert(reader))
    }
}

/// Iterator returned by [`ChunkedReader::chunks`].
pub struct Chunks<'a> {
    reader: &'a mut ChunkedReader,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_chunk() {
            Ok(batch) if batch.is_empty() => {
                self.done = true;
                None
            }
            Ok(batch) => Some(Ok(batch)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
