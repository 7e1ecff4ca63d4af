//! Reader and writer options.

use std::num::NonZeroUsize;

use crate::error::{FehError, Result};
use crate::format::DatasetFormat;

/// Number of records a single read should return.
///
/// | Signed value | Variant          |
/// |--------------|------------------|
/// | `-1`         | `All`            |
/// | `n >= 0`     | `Records(n)`     |
/// | other        | rejected         |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordCount {
    /// Everything from the offset to the end of the file.
    #[default]
    All,
    /// At most this many records.
    Records(usize),
}

impl RecordCount {
    /// Convert the signed convention where `-1` means all remaining records.
    pub fn from_signed(count: i64) -> Result<Self> {
        match count {
            -1 => Ok(Self::All),
            n => usize::try_from(n).map(Self::Records).map_err(|_| {
                FehError::invalid_argument(format!("record count must be -1 or >= 0, got {n}"))
            }),
        }
    }

    /// Byte span for records of `record_width` bytes, `None` for all.
    #[must_use]
    pub fn byte_span(self, record_width: usize) -> Option<u64> {
        match self {
            Self::All => None,
            Self::Records(n) => Some((n as u64).saturating_mul(record_width as u64)),
        }
    }
}

/// Records per chunk for the chunked reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkSize {
    /// The whole remaining file in one chunk.
    #[default]
    WholeFile,
    /// A fixed number of records per chunk.
    Records(NonZeroUsize),
}

impl ChunkSize {
    /// Convert the signed convention where `-1` means the whole file.
    pub fn from_signed(size: i64) -> Result<Self> {
        if size == -1 {
            return Ok(Self::WholeFile);
        }
        usize::try_from(size)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self::Records)
            .ok_or_else(|| {
                FehError::invalid_argument(format!("chunk size must be -1 or positive, got {size}"))
            })
    }

    /// Fixed-size chunks of `n` records.
    pub fn records(n: usize) -> Result<Self> {
        NonZeroUsize::new(n)
            .map(Self::Records)
            .ok_or_else(|| FehError::invalid_argument("chunk size must be positive"))
    }

    /// Record count handed to a single read.
    #[must_use]
    pub fn as_count(self) -> RecordCount {
        match self {
            Self::WholeFile => RecordCount::All,
            Self::Records(n) => RecordCount::Records(n.get()),
        }
    }
}

/// Options for a single record read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    /// How many records to read.
    pub count: RecordCount,
    /// Byte offset into the data file.
    pub offset: u64,
    /// Fields to keep, in output order.
    pub fields: Option<Vec<String>>,
}

impl ReaderOptions {
    /// Create reader options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the read to `count` records.
    #[must_use]
    pub fn with_count(mut self, count: RecordCount) -> Self {
        self.count = count;
        self
    }

    /// Start reading at a byte offset.
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Keep only the named fields.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Options for the chunked reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedReaderOptions {
    /// Records per chunk.
    pub chunk_size: ChunkSize,
    /// Fields to keep, in output order.
    pub fields: Option<Vec<String>>,
}

impl ChunkedReaderOptions {
    /// Create chunked reader options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Keep only the named fields.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Options for writing header files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Header dialect to emit.
    pub format: DatasetFormat,
    /// Dataset year.
    pub year: i32,
}

impl WriterOptions {
    /// Create writer options.
    #[must_use]
    pub fn new(format: DatasetFormat, year: i32) -> Self {
        Self { format, year }
    }

    /// Set the header dialect.
    #[must_use]
    pub fn with_format(mut self, format: DatasetFormat) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_count_from_signed() {
        assert_eq!(RecordCount::from_signed(-1).unwrap(), RecordCount::All);
        assert_eq!(RecordCount::from_signed(0).unwrap(), RecordCount::Records(0));
        assert_eq!(RecordCount::from_signed(12).unwrap(), RecordCount::Records(12));
        assert!(RecordCount::from_signed(-2).is_err());
    }

    #[test]
    fn test_chunk_size_from_signed() {
        assert_eq!(ChunkSize::from_signed(-1).unwrap(), ChunkSize::WholeFile);
        assert_eq!(ChunkSize::from_signed(7).unwrap(), ChunkSize::records(7).unwrap());
        for bad in [0, -2, i64::MIN] {
            assert!(matches!(
                ChunkSize::from_signed(bad),
                Err(FehError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn test_byte_span() {
        assert_eq!(RecordCount::All.byte_span(12), None);
        assert_eq!(RecordCount::Records(3).byte_span(12), Some(36));
        assert_eq!(
            ChunkSize::records(5).unwrap().as_count(),
            RecordCount::Records(5)
        );
    }

    #[test]
    fn test_reader_options_builder() {
        let opts = ReaderOptions::new()
            .with_count(RecordCount::Records(10))
            .with_offset(40)
            .with_fields(["PERNUM", "AGE"]);
        assert_eq!(opts.count, RecordCount::Records(10));
        assert_eq!(opts.offset, 40);
        assert_eq!(
            opts.fields,
            Some(vec!["PERNUM".to_string(), "AGE".to_string()])
        );
    }
}
