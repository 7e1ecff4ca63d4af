//! FEH header file parsing.
//!
//! A header file holds the dataset year followed by two sections, family
//! then person. Each section describes the fixed-width record layout of the
//! matching data file:
//!
//! | Part          | Input dialect    | Output dialect        |
//! |---------------|------------------|-----------------------|
//! | year          | 4-byte LE `i32`  | 10-byte ASCII decimal |
//! | family section| see [`section`]  | see [`section`]       |
//! | person section| see [`section`]  | see [`section`]       |
//!
//! Bytes after the person section are ignored.

pub(crate) mod cursor;
pub mod section;

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use feh_model::{FileType, RawHeaderSection, RecordSchema};

use crate::error::{FehError, Result};
use crate::format::{DatasetFormat, PREFIX_LEN};

use cursor::ByteCursor;
pub use section::NAME_LEN;
pub(crate) use section::build_section;

/// Decoded header file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FehHeader {
    /// Dataset year.
    pub year: i32,
    /// Detected dialect.
    pub format: DatasetFormat,
    /// Raw family section.
    pub family: RawHeaderSection,
    /// Raw person section.
    pub person: RawHeaderSection,
    family_schema: Arc<RecordSchema>,
    person_schema: Arc<RecordSchema>,
}

impl FehHeader {
    /// Assemble a header from its sections, building both schemas.
    pub fn new(
        year: i32,
        format: DatasetFormat,
        family: RawHeaderSection,
        person: RawHeaderSection,
    ) -> Result<Self> {
        let family_schema = Arc::new(family.schema()?);
        let person_schema = Arc::new(person.schema()?);
        Ok(Self {
            year,
            format,
            family,
            person,
            family_schema,
            person_schema,
        })
    }

    /// Raw section for a file type.
    #[must_use]
    pub fn section(&self, file_type: FileType) -> &RawHeaderSection {
        match file_type {
            FileType::Family => &self.family,
            FileType::Person => &self.person,
        }
    }

    /// Expanded record schema for a file type.
    #[must_use]
    pub fn schema(&self, file_type: FileType) -> &Arc<RecordSchema> {
        match file_type {
            FileType::Family => &self.family_schema,
            FileType::Person => &self.person_schema,
        }
    }
}

/// Decode a header from its bytes.
pub fn parse_header(data: &[u8]) -> Result<FehHeader> {
    let prefix: &[u8; PREFIX_LEN] = data
        .get(..PREFIX_LEN)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(FehError::Truncated {
            offset: 0,
            needed: PREFIX_LEN,
            available: data.len(),
        })?;

    let format = DatasetFormat::detect(prefix)?;
    let year = format.decode_year(prefix)?;

    let mut cursor = ByteCursor::new(data, format.resume_offset());
    let family = section::parse_section(&mut cursor, format)?;
    let person = section::parse_section(&mut cursor, format)?;

    if cursor.remaining() > 0 {
        tracing::debug!(
            trailing = cursor.remaining(),
            "ignoring bytes after person section"
        );
    }

    let header = FehHeader::new(year, format, family, person)?;
    tracing::info!(
        year,
        %format,
        family_fields = header.family_schema.len(),
        person_fields = header.person_schema.len(),
        "decoded FEH header"
    );
    Ok(header)
}

/// Read and decode a header from any reader.
pub fn read_header_from<R: Read>(mut reader: R) -> Result<FehHeader> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    parse_header(&data)
}

/// Read and decode a header file.
pub fn read_header(path: &Path) -> Result<FehHeader> {
    let file = File::open(path).map_err(|e| FehError::from_open(path, e))?;
    read_header_from(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::LINE_BREAK;
    use feh_model::MtsRef;

    fn output_header() -> Vec<u8> {
        let mut data = b"      2060".to_vec();
        // Family: FAMID, no series.
        data.extend_from_slice(&LINE_BREAK);
        data.extend_from_slice(b"         1         0         4         0");
        data.extend_from_slice(&LINE_BREAK);
        data.extend_from_slice(b"FAMID   ");
        // Person: PERNUM, EARN, series of EARN 2000-2001.
        data.extend_from_slice(&LINE_BREAK);
        data.extend_from_slice(b"         2         0        16         1");
        data.extend_from_slice(&LINE_BREAK);
        data.extend_from_slice(b"PERNUM  EARN    ");
        data.extend_from_slice(&LINE_BREAK);
        for value in [2i32, 2000, 2001, 8] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_parse_output_header() {
        let header = parse_header(&output_header()).unwrap();
        assert_eq!(header.year, 2060);
        assert_eq!(header.format, DatasetFormat::Output);
        assert_eq!(header.family.names, vec!["FAMID"]);
        assert_eq!(header.person.record_length_hint, 16);
        assert_eq!(header.person.mts_refs, vec![MtsRef {
            source_index: 1,
            first_year: 2000,
            last_year: 2001,
            byte_offset: 8,
        }]);
        assert_eq!(
            header.schema(FileType::Person).field_names(),
            vec!["PERNUM", "EARN", "EARN2000", "EARN2001"]
        );
        assert_eq!(header.schema(FileType::Family).record_width(), 4);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut data = output_header();
        data.extend_from_slice(b"\r\n\0\0");
        assert!(parse_header(&data).is_ok());
    }

    #[test]
    fn test_short_prefix() {
        assert!(matches!(
            parse_header(b"   "),
            Err(FehError::Truncated {
                needed: PREFIX_LEN,
                available: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_person_section() {
        let data = output_header();
        assert!(matches!(
            parse_header(&data[..62]),
            Err(FehError::Truncated { .. })
        ));
    }

    #[test]
    fn test_read_header_not_found() {
        let err = read_header(Path::new("/nonexistent/header.dat")).unwrap_err();
        assert!(matches!(err, FehError::FileNotFound { .. }));
    }
}
