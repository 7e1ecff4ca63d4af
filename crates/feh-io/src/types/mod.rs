//! Option types for FEH readers and writers.

mod options;

pub use options::{
    ChunkSize, ChunkedReaderOptions, ReaderOptions, RecordCount, WriterOptions,
};
