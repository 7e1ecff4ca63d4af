//! FEH header and data file writer.
//!
//! Produces headers that decode back to the same sections in either dialect,
//! and data files of packed little-endian records.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use feh_model::{ModelError, RawHeaderSection, RecordBatch, RecordSchema};

use crate::error::{FehError, Result};
use crate::format::{DatasetFormat, PREFIX_LEN};
use crate::header::build_section;
use crate::types::WriterOptions;

/// Encode a complete header.
///
/// The emitted prefix is checked against the detector, so an Input header
/// with a year outside the detectable window is rejected here rather than
/// producing a file that cannot be read back.
pub fn build_header(
    options: WriterOptions,
    family: &RawHeaderSection,
    person: &RawHeaderSection,
) -> Result<Vec<u8>> {
    // Resolve references up front so unreadable layouts are never written.
    family.schema()?;
    person.schema()?;

    let mut out = options.format.encode_year(options.year)?;
    build_section(family, options.format, &mut out)?;
    build_section(person, options.format, &mut out)?;

    let prefix: Option<&[u8; PREFIX_LEN]> =
        out.get(..PREFIX_LEN).and_then(|bytes| bytes.try_into().ok());
    let detected = prefix.map(DatasetFormat::detect).transpose();
    if !matches!(detected, Ok(Some(format)) if format == options.format) {
        return Err(FehError::invalid_argument(format!(
            "year {} cannot be encoded as a detectable {} header",
            options.year, options.format
        )));
    }
    Ok(out)
}

/// Write a header to any writer.
pub fn write_header<W: Write>(
    mut writer: W,
    options: WriterOptions,
    family: &RawHeaderSection,
    person: &RawHeaderSection,
) -> Result<()> {
    let bytes = build_header(options, family, person)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    tracing::debug!(
        format = %options.format,
        year = options.year,
        bytes = bytes.len(),
        "wrote header"
    );
    Ok(())
}

/// Write a header file.
pub fn write_header_file(
    path: &Path,
    options: WriterOptions,
    family: &RawHeaderSection,
    person: &RawHeaderSection,
) -> Result<()> {
    let file = File::create(path)?;
    write_header(file, options, family, person)
}

/// Writer for FEH data files.
///
/// Every batch must share the schema of the first batch written.
pub struct FehDataWriter<W: Write> {
    writer: BufWriter<W>,
    schema: Option<Arc<RecordSchema>>,
    records: usize,
}

impl<W: Write> FehDataWriter<W> {
    /// Create a new data writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            schema: None,
            records: 0,
        }
    }

    /// Append a batch of records.
    pub fn write_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        match &self.schema {
            Some(schema) if schema.as_ref() != batch.schema() => {
                return Err(ModelError::SchemaMismatch {
                    expected: schema.field_names(),
                    actual: batch.schema().field_names(),
                }
                .into());
            }
            Some(_) => {}
            None => self.schema = Some(Arc::clone(batch.schema_ref())),
        }

        for value in batch.values() {
            self.writer.write_all(&value.to_le_bytes())?;
        }
        self.records += batch.len();
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records
    }

    /// Schema of the records written so far.
    #[must_use]
    pub fn schema(&self) -> Option<&Arc<RecordSchema>> {
        self.schema.as_ref()
    }

    /// Flush buffered records.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| FehError::Io(err.into_error()))
    }
}

impl FehDataWriter<File> {
    /// Create a data file for writing.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(file))
    }
}

/// Write a single batch as a complete data file.
pub fn write_records(path: &Path, batch: &RecordBatch) -> Result<()> {
    let mut writer = FehDataWriter::create(path)?;
    writer.write_batch(batch)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use feh_model::MtsRef;

    use super::*;
    use crate::header::parse_header;

    fn sections() -> (RawHeaderSection, RawHeaderSection) {
        let family = RawHeaderSection::new(vec!["FAMID".into(), "STATE".into()], vec![]);
        let person = RawHeaderSection::new(
            vec!["PERNUM".into(), "AGE".into()],
            vec![MtsRef::new(1, 2000, 2002)],
        )
        .with_aux(0, 20);
        (family, person)
    }

    #[test]
    fn test_output_header_prefix() {
        let (family, person) = sections();
        let bytes = build_header(
            WriterOptions::new(DatasetFormat::Output, 2060),
            &family,
            &person,
        )
        .unwrap();
        assert_eq!(&bytes[..10], b"      2060");
        assert_eq!(&bytes[10..12], b"\r\n");
    }

    #[test]
    fn test_header_round_trip_both_dialects() {
        let (family, person) = sections();
        for format in [DatasetFormat::Input, DatasetFormat::Output] {
            let bytes = build_header(WriterOptions::new(format, 2006), &family, &person).unwrap();
            let header = parse_header(&bytes).unwrap();
            assert_eq!(header.format, format);
            assert_eq!(header.year, 2006);
            assert_eq!(header.family, family);
            assert_eq!(header.person, person);
        }
    }

    #[test]
    fn test_undetectable_input_year() {
        let (family, person) = sections();
        let err = build_header(
            WriterOptions::new(DatasetFormat::Input, 1999),
            &family,
            &person,
        )
        .unwrap_err();
        assert!(matches!(err, FehError::InvalidArgument { .. }));
    }

    #[test]
    fn test_unresolvable_reference_not_written() {
        let family = RawHeaderSection::new(vec!["FAMID".into()], vec![MtsRef::new(4, 2000, 2001)]);
        let (_, person) = sections();
        let err = build_header(
            WriterOptions::new(DatasetFormat::Output, 2060),
            &family,
            &person,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FehError::Model(ModelError::SourceIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_data_writer_rejects_other_schema() {
        let (family, person) = sections();
        let family_batch =
            RecordBatch::from_values(Arc::new(family.schema().unwrap()), vec![1, 36]).unwrap();
        let person_batch =
            RecordBatch::from_values(Arc::new(person.schema().unwrap()), vec![1, 40, 1, 2, 3])
                .unwrap();

        let mut writer = FehDataWriter::new(Vec::new());
        writer.write_batch(&family_batch).unwrap();
        writer.write_batch(&family_batch).unwrap();
        assert!(writer.write_batch(&person_batch).is_err());
        assert_eq!(writer.records_written(), 2);

        let bytes = writer.into_inner().unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[4..8], &36i32.to_le_bytes());
    }
}
