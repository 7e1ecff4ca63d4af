//! FEH header and data file reader and writer.
//!
//! This crate reads the binary microdata written by the FEH simulation: a
//! header file describing the family and person record layouts, and one
//! fixed-width data file per record kind.
//!
//! # Features
//!
//! - Header dialect detection (Input and Output) from the first ten bytes
//! - Schema expansion of micro time series into one field per year
//! - Offset/count record reads with field projection
//! - Chunked streaming with an explicit cursor
//! - Header and data file writing
//! - Codebook parsing
//! - Optional Polars DataFrame integration (with `polars` feature)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use feh_io::{FileType, ReaderOptions, read_header, read_records, wide_to_long};
//!
//! let header = read_header(Path::new("header.dat")).unwrap();
//! println!("{} header for {}", header.format, header.year);
//!
//! let options = ReaderOptions::new().with_fields(["PERNUM", "EARN2000", "EARN2001"]);
//! let batch = read_records(
//!     header.schema(FileType::Person),
//!     Path::new("person.dat"),
//!     &options,
//! )
//! .unwrap();
//!
//! let long = wide_to_long(&batch).unwrap();
//! for row in long.rows() {
//!     println!("{} {} {:?}", row.year, row.pernum, row.values);
//! }
//! ```

pub mod chunked;
pub mod codebook;
mod error;
pub mod format;
pub mod header;
mod reader;
mod sink;
mod types;
mod writer;

#[cfg(feature = "polars")]
mod polars_ext;

// Re-export error types
pub use error::{FehError, Result};

// Re-export the data model
pub use feh_model::{
    FIELD_WIDTH, FieldKind, FieldSpec, FileType, LongBatch, LongRecord, ModelError, MtsRef,
    PERNUM_FIELD, RawHeaderSection, Record, RecordBatch, RecordSchema, SchemaBuilder,
    wide_to_long,
};

pub use chunked::{ChunkedReader, Chunks, CursorState};
pub use codebook::{CodebookEntry, CodebookKind, codebook_schema, parse_codebook, read_codebook};
pub use format::{DatasetFormat, PREFIX_LEN, detect_format};
pub use header::{FehHeader, parse_header, read_header, read_header_from};
pub use reader::{RecordReader, read_feh_data_file, read_records};
pub use sink::{RowSink, RowSource, copy_rows};
pub use types::{ChunkSize, ChunkedReaderOptions, ReaderOptions, RecordCount, WriterOptions};
pub use writer::{FehDataWriter, build_header, write_header, write_header_file, write_records};

// Re-export Polars integration
#[cfg(feature = "polars")]
pub use polars_ext::{
    DataFrameSink, batch_to_dataframe, dataframe_to_batch, dataframe_to_batch_with_schema,
    long_to_dataframe,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
