//! Row sink and source traits.
//!
//! A [`RecordBatch`] carries its schema, so a sink persists batches without
//! re-deriving the layout.

use std::io::Write;

use feh_model::RecordBatch;

use crate::chunked::ChunkedReader;
use crate::error::Result;
use crate::writer::FehDataWriter;

/// Destination for record batches.
pub trait RowSink {
    /// Persist one batch.
    fn write_batch(&mut self, batch: &RecordBatch) -> Result<()>;

    /// Flush anything buffered. Called once after the last batch.
    fn finish(&mut self) -> Result<()>;
}

/// Producer of record batches.
pub trait RowSource {
    /// Next batch, or `None` when the source is exhausted.
    fn next_batch(&mut self) -> Result<Option<RecordBatch>>;
}

/// Move every batch from `source` into `sink`, returning the record count.
pub fn copy_rows<S, K>(source: &mut S, sink: &mut K) -> Result<usize>
where
    S: RowSource + ?Sized,
    K: RowSink + ?Sized,
{
    let mut records = 0;
    while let Some(batch) = source.next_batch()? {
        sink.write_batch(&batch)?;
        records += batch.len();
    }
    sink.finish()?;
    tracing::debug!(records, "copied rows");
    Ok(records)
}

impl RowSource for ChunkedReader {
    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        let batch = self.read_chunk()?;
        Ok((!batch.is_empty()).then_some(batch))
    }
}

impl<W: Write> RowSink for FehDataWriter<W> {
    fn write_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        FehDataWriter::write_batch(self, batch)
    }

    fn finish(&mut self) -> Result<()> {
        self.flush()
    }
}

impl RowSink for Vec<RecordBatch> {
    fn write_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        self.push(batch.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
