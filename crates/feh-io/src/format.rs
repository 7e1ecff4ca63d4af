//! Header dialect detection.
//!
//! Two incompatible header layouts exist, told apart only by their first
//! ten bytes:
//!
//! | Dialect  | Bytes 0-3            | Bytes 4-5  | Bytes 6-9     | Resume at |
//! |----------|----------------------|------------|---------------|-----------|
//! | `Input`  | year, LE `i32`       | `0D 0A`    | section data  | 4         |
//! | `Output` | `20 20 20 20`        | `20 20`    | ASCII year    | 10        |
//!
//! The Input dialect stores section integers as raw little-endian words; the
//! Output dialect stores them as right-aligned ASCII decimals.

use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{FehError, Result};

/// Number of leading bytes inspected for detection.
pub const PREFIX_LEN: usize = 10;

/// Two-byte marker used as a structural separator in header files.
pub const LINE_BREAK: [u8; 2] = [0x0D, 0x0A];

/// Width of an ASCII-encoded integer in Output headers.
pub const ASCII_INT_LEN: usize = 10;

/// Years accepted in the binary year field of an Input header.
const INPUT_YEAR_RANGE: RangeInclusive<i32> = 2000..=2100;

/// Leading blanks of an Output header.
const OUTPUT_MARKER: [u8; 6] = [b' '; 6];

/// Header dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetFormat {
    /// Starting-sample headers: binary integers.
    Input,
    /// Simulation output headers: ASCII integers.
    Output,
}

impl DatasetFormat {
    /// Classify a header by its first ten bytes.
    ///
    /// Input is checked first; no other heuristic is attempted.
    pub fn detect(prefix: &[u8; PREFIX_LEN]) -> Result<Self> {
        let year = i32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        if INPUT_YEAR_RANGE.contains(&year) && prefix[4..6] == LINE_BREAK {
            return Ok(Self::Input);
        }
        if prefix[..6] == OUTPUT_MARKER {
            return Ok(Self::Output);
        }
        Err(FehError::UnrecognizedFormat { prefix: *prefix })
    }

    /// Offset at which section parsing continues after the year.
    #[must_use]
    pub const fn resume_offset(self) -> usize {
        match self {
            Self::Input => 4,
            Self::Output => PREFIX_LEN,
        }
    }

    /// Decode the dataset year from the header prefix.
    pub fn decode_year(self, prefix: &[u8; PREFIX_LEN]) -> Result<i32> {
        match self {
            Self::Input => Ok(i32::from_le_bytes([
                prefix[0], prefix[1], prefix[2], prefix[3],
            ])),
            Self::Output => parse_ascii_int(prefix, "year"),
        }
    }

    /// Encode the dataset year as it appears at the start of a header.
    pub fn encode_year(self, year: i32) -> Result<Vec<u8>> {
        match self {
            Self::Input => Ok(year.to_le_bytes().to_vec()),
            Self::Output => encode_ascii_int(year, PREFIX_LEN),
        }
    }

    /// Size of one section's count block, padding included.
    #[must_use]
    pub const fn count_block_len(self) -> usize {
        match self {
            Self::Input => 2 + 4 * 4 + 2,
            Self::Output => 2 + 4 * ASCII_INT_LEN + 2,
        }
    }

    /// Lowercase dialect name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the dialect and the offset to resume parsing from.
pub fn detect_format(prefix: &[u8; PREFIX_LEN]) -> Result<(DatasetFormat, usize)> {
    let format = DatasetFormat::detect(prefix)?;
    Ok((format, format.resume_offset()))
}

/// Parse a space-padded ASCII decimal.
pub(crate) fn parse_ascii_int(raw: &[u8], field: &'static str) -> Result<i32> {
    std::str::from_utf8(raw)
        .ok()
        .map(str::trim)
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| FehError::invalid_header_field(field, raw))
}

/// Right-align a decimal in a fixed-width ASCII field.
pub(crate) fn encode_ascii_int(value: i32, width: usize) -> Result<Vec<u8>> {
    let text = format!("{value:>width$}");
    if text.len() > width {
        return Err(FehError::invalid_argument(format!(
            "{value} does not fit in {width} ASCII bytes"
        )));
    }
    Ok(text.into_bytes())
}
