//! Header section parsing and building.
//!
//! A header holds two sections (family, then person). Each section is:
//!
//! | Part        | Input dialect                  | Output dialect                       |
//! |-------------|--------------------------------|--------------------------------------|
//! | counts      | 2 pad, 4 x LE `i32`, 2 pad     | 2 pad, 4 x 10-byte ASCII int, 2 pad  |
//! | names       | `variable_count` x 8-byte ASCII, space padded                         |
//! | MTS block   | only when `mts_count > 0`: 2 pad, then four LE `i32` arrays of length |
//! |             | `mts_count`: source index (1-based), first year, last year, offset    |
//!
//! The four counts are, in order: `variable_count`, `aux1`,
//! `record_length_hint`, `mts_count`.

use feh_model::{ModelError, MtsRef, RawHeaderSection};

use crate::error::{FehError, Result};
use crate::format::{ASCII_INT_LEN, DatasetFormat, LINE_BREAK, encode_ascii_int, parse_ascii_int};

use super::cursor::ByteCursor;

/// Width of a variable name slot.
pub const NAME_LEN: usize = 8;

const COUNT_FIELDS: [&str; 4] = ["variable_count", "aux1", "record_length_hint", "mts_count"];

/// Parse one section starting at the cursor.
pub(crate) fn parse_section(
    cursor: &mut ByteCursor<'_>,
    format: DatasetFormat,
) -> Result<RawHeaderSection> {
    let start = cursor.offset();
    cursor.skip(2)?;
    let mut counts = [0i32; 4];
    for (slot, field) in counts.iter_mut().zip(COUNT_FIELDS) {
        *slot = match format {
            DatasetFormat::Input => cursor.read_i32_le()?,
            DatasetFormat::Output => parse_ascii_int(cursor.take(ASCII_INT_LEN)?, field)?,
        };
    }
    cursor.skip(2)?;

    let [variable_count, aux1, record_length_hint, mts_count] = counts;
    let variable_count = non_negative(variable_count, "variable_count")?;
    let mts_count = non_negative(mts_count, "mts_count")?;

    let name_bytes = cursor.take((variable_count as usize).saturating_mul(NAME_LEN))?;
    let names: Vec<String> = name_bytes.chunks_exact(NAME_LEN).map(decode_name).collect();

    let mut mts_refs = Vec::new();
    if mts_count > 0 {
        cursor.skip(2)?;
        let count = mts_count as usize;
        let sources = cursor.read_i32_array(count)?;
        let first_years = cursor.read_i32_array(count)?;
        let last_years = cursor.read_i32_array(count)?;
        let offsets = cursor.read_i32_array(count)?;

        mts_refs.reserve(count);
        for (idx, source) in sources.into_iter().enumerate() {
            // Stored 1-based on disk.
            let index = i64::from(source) - 1;
            let source_index =
                usize::try_from(index).map_err(|_| ModelError::SourceIndexOutOfRange {
                    index,
                    available: names.len(),
                })?;
            mts_refs.push(MtsRef {
                source_index,
                first_year: first_years[idx],
                last_year: last_years[idx],
                byte_offset: offsets[idx],
            });
        }
    }

    tracing::debug!(
        %format,
        offset = start,
        variables = variable_count,
        mts = mts_count,
        "decoded header section"
    );

    Ok(RawHeaderSection {
        variable_count,
        aux1,
        record_length_hint,
        mts_count,
        names,
        mts_refs,
    })
}

/// Append the encoding of one section.
///
/// Counts are taken from the name and reference lists, not from the
/// section's stored counts.
pub(crate) fn build_section(
    section: &RawHeaderSection,
    format: DatasetFormat,
    out: &mut Vec<u8>,
) -> Result<()> {
    let counts = [
        count_to_i32(section.names.len(), "variable_count")?,
        section.aux1,
        section.record_length_hint,
        count_to_i32(section.mts_refs.len(), "mts_count")?,
    ];

    out.extend_from_slice(&LINE_BREAK);
    for value in counts {
        match format {
            DatasetFormat::Input => out.extend_from_slice(&value.to_le_bytes()),
            DatasetFormat::Output => out.extend(encode_ascii_int(value, ASCII_INT_LEN)?),
        }
    }
    out.extend_from_slice(&LINE_BREAK);

    for name in &section.names {
        out.extend_from_slice(&encode_name(name)?);
    }

    if !section.mts_refs.is_empty() {
        out.extend_from_slice(&LINE_BREAK);
        let mut sources = Vec::with_capacity(section.mts_refs.len());
        for mts in &section.mts_refs {
            sources.push(count_to_i32(mts.source_index + 1, "source_index")?);
        }
        let columns: [Vec<i32>; 4] = [
            sources,
            section.mts_refs.iter().map(|m| m.first_year).collect(),
            section.mts_refs.iter().map(|m| m.last_year).collect(),
            section.mts_refs.iter().map(|m| m.byte_offset).collect(),
        ];
        for column in columns {
            for value in column {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
    Ok(())
}

/// Decode an 8-byte name slot.
fn decode_name(slot: &[u8]) -> String {
    String::from_utf8_lossy(slot)
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

/// Encode a name into an 8-byte, space-padded slot.
fn encode_name(name: &str) -> Result<[u8; NAME_LEN]> {
    let bytes = name.trim().as_bytes();
    if bytes.len() > NAME_LEN {
        return Err(FehError::NameTooLong {
            name: name.to_string(),
        });
    }
    let mut slot = [b' '; NAME_LEN];
    slot[..bytes.len()].copy_from_slice(bytes);
    Ok(slot)
}

fn non_negative(value: i32, field: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| FehError::InvalidHeaderField {
        field,
        raw: value.to_string(),
    })
}

fn count_to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| FehError::invalid_argument(format!("{what} {value} exceeds i32 range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_section() -> RawHeaderSection {
        RawHeaderSection::new(
            vec!["PERNUM".to_string(), "AGE".to_string()],
            vec![MtsRef {
                source_index: 1,
                first_year: 2000,
                last_year: 2002,
                byte_offset: 8,
            }],
        )
        .with_aux(3, 20)
    }

    #[test]
    fn test_name_slots() {
        assert_eq!(&encode_name("AGE").unwrap(), b"AGE     ");
        assert_eq!(decode_name(b"AGE     "), "AGE");
        assert_eq!(decode_name(b"AGE\0\0\0\0\0"), "AGE");
        assert!(matches!(
            encode_name("EARNINGS9"),
            Err(FehError::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_output_section_layout() {
        let mut out = Vec::new();
        build_section(&sample_section(), DatasetFormat::Output, &mut out).unwrap();

        assert_eq!(out.len(), 44 + 2 * NAME_LEN + 2 + 4 * 4);
        assert_eq!(&out[..2], &LINE_BREAK);
        assert_eq!(&out[2..12], b"         2");
        assert_eq!(&out[42..44], &LINE_BREAK);
        assert_eq!(&out[44..52], b"PERNUM  ");
        // Source index is written 1-based.
        assert_eq!(&out[62..66], &2i32.to_le_bytes());
    }

    #[test]
    fn test_parse_input_section() {
        let mut out = Vec::new();
        build_section(&sample_section(), DatasetFormat::Input, &mut out).unwrap();
        assert_eq!(&out[2..6], &2i32.to_le_bytes());

        let mut cursor = ByteCursor::new(&out, 0);
        let parsed = parse_section(&mut cursor, DatasetFormat::Input).unwrap();
        assert_eq!(parsed, sample_section());
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_section_without_mts_has_no_trailer() {
        let section = RawHeaderSection::new(vec!["FAMID".to_string()], vec![]);
        let mut out = Vec::new();
        build_section(&section, DatasetFormat::Output, &mut out).unwrap();
        assert_eq!(out.len(), 44 + NAME_LEN);

        let mut cursor = ByteCursor::new(&out, 0);
        let parsed = parse_section(&mut cursor, DatasetFormat::Output).unwrap();
        assert_eq!(parsed.names, vec!["FAMID"]);
        assert!(parsed.mts_refs.is_empty());
    }

    #[test]
    fn test_zero_source_index_is_rejected() {
        let mut out = Vec::new();
        out.extend_from_slice(&LINE_BREAK);
        for value in [1i32, 0, 0, 1] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.extend_from_slice(&LINE_BREAK);
        out.extend_from_slice(b"AGE     ");
        out.extend_from_slice(&LINE_BREAK);
        for value in [0i32, 2000, 2001, 0] {
            out.extend_from_slice(&value.to_le_bytes());
        }

        let mut cursor = ByteCursor::new(&out, 0);
        let err = parse_section(&mut cursor, DatasetFormat::Input).unwrap_err();
        assert!(matches!(
            err,
            FehError::Model(ModelError::SourceIndexOutOfRange { index: -1, .. })
        ));
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let mut out = Vec::new();
        out.extend_from_slice(&LINE_BREAK);
        out.extend_from_slice(b"        -1         0         0         0");
        out.extend_from_slice(&LINE_BREAK);

        let mut cursor = ByteCursor::new(&out, 0);
        assert!(matches!(
            parse_section(&mut cursor, DatasetFormat::Output),
            Err(FehError::InvalidHeaderField {
                field: "variable_count",
                ..
            })
        ));
    }

    #[test]
    fn test_truncated_names() {
        let mut out = Vec::new();
        build_section(&sample_section(), DatasetFormat::Output, &mut out).unwrap();
        out.truncate(50);

        let mut cursor = ByteCursor::new(&out, 0);
        assert!(matches!(
            parse_section(&mut cursor, DatasetFormat::Output),
            Err(FehError::Truncated { offset: 44, .. })
        ));
    }
}
