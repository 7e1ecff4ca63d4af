//! Plain-text codebook parsing.
//!
//! The simulation writes a codebook alongside its binary output. Variables
//! are listed per record kind between a `RECORD- FAMILY` / `RECORD- PERSON`
//! marker and the following `ENDVARS` line:
//!
//! ```text
//! RECORD- FAMILY
//!   V- FAMID    family identifier
//! ENDVARS
//! RECORD- PERSON
//!   V- PERNUM   person number
//!   V- EARN(1951-2100)  annual earnings
//! ENDVARS
//! ```
//!
//! A name followed by `(first-last)` is a year series.

use std::path::Path;
use std::sync::LazyLock;

use feh_model::{FileType, RecordSchema};
use regex::Regex;

use crate::error::{FehError, Result};

const FAMILY_MARKER: &str = "RECORD- FAMILY";
const PERSON_MARKER: &str = "RECORD- PERSON";
const END_MARKER: &str = "ENDVARS";
const VARIABLE_MARKER: &str = "V-";

static VARIABLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"V-\s*(\w+)(?:\((\d+)-(\d+)\))?").expect("Invalid codebook variable regex")
});

/// How a codebook variable is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodebookKind {
    Scalar,
    /// One field per year in the inclusive range.
    Series { first_year: i32, last_year: i32 },
}

/// One `V-` line of a codebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodebookEntry {
    pub name: String,
    pub kind: CodebookKind,
}

/// Parse the variables of one record kind from codebook text.
pub fn parse_codebook(text: &str, file_type: FileType) -> Result<Vec<CodebookEntry>> {
    let lines: Vec<&str> = text.lines().collect();
    let find = |marker: &str| lines.iter().position(|line| line.contains(marker));

    let family_start = find(FAMILY_MARKER)
        .ok_or_else(|| FehError::invalid_codebook(format!("no '{FAMILY_MARKER}' line")))?;
    let person_start = find(PERSON_MARKER)
        .ok_or_else(|| FehError::invalid_codebook(format!("no '{PERSON_MARKER}' line")))?;
    let ends: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(END_MARKER))
        .map(|(idx, _)| idx)
        .collect();

    let (family_end, person_end) = match ends.as_slice() {
        [first, second, ..]
            if family_start < *first && *first < person_start && person_start < *second =>
        {
            (*first, *second)
        }
        _ => {
            return Err(FehError::invalid_codebook(format!(
                "expected {END_MARKER} after {FAMILY_MARKER} (line {}) and after \
                 {PERSON_MARKER} (line {}), found {END_MARKER} at lines {ends:?}",
                family_start + 1,
                person_start + 1,
            )));
        }
    };

    let (start, end) = match file_type {
        FileType::Family => (family_start + 1, family_end),
        FileType::Person => (person_start + 1, person_end),
    };

    let entries = lines[start..end]
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(VARIABLE_MARKER))
        .map(|(idx, line)| parse_variable_line(line, start + idx + 1))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(%file_type, variables = entries.len(), "parsed codebook");
    Ok(entries)
}

/// Read and parse a codebook file.
pub fn read_codebook(path: &Path, file_type: FileType) -> Result<Vec<CodebookEntry>> {
    let text = std::fs::read_to_string(path).map_err(|e| FehError::from_open(path, e))?;
    parse_codebook(&text, file_type)
}

/// Record schema implied by codebook entries.
///
/// Every name is a field, in order, followed by the per-year fields of each
/// series.
pub fn codebook_schema(entries: &[CodebookEntry]) -> Result<RecordSchema> {
    let mut builder = RecordSchema::builder();
    for entry in entries {
        builder = builder.scalar(entry.name.as_str());
    }
    for (idx, entry) in entries.iter().enumerate() {
        if let CodebookKind::Series {
            first_year,
            last_year,
        } = entry.kind
        {
            builder = builder.series(idx, first_year, last_year);
        }
    }
    Ok(builder.build()?)
}

fn parse_variable_line(line: &str, line_number: usize) -> Result<CodebookEntry> {
    let caps = VARIABLE_REGEX.captures(line).ok_or_else(|| {
        FehError::invalid_codebook(format!("line {line_number}: no variable name in {line:?}"))
    })?;
    let name = caps[1].to_string();

    let kind = match (caps.get(2), caps.get(3)) {
        (Some(first), Some(last)) => {
            let year = |raw: &str| {
                raw.parse::<i32>().map_err(|_| {
                    FehError::invalid_codebook(format!("line {line_number}: bad year {raw:?}"))
                })
            };
            CodebookKind::Series {
                first_year: year(first.as_str())?,
                last_year: year(last.as_str())?,
            }
        }
        _ => CodebookKind::Scalar,
    };
    Ok(CodebookEntry { name, kind })
}
