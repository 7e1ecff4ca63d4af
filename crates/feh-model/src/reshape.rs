//! Wide to long reshaping of person records.
//!
//! In wide form every MTS variable is spread over one column per year
//! (`EARN1999`, `EARN2000`, ...). Long form has one row per (person, year)
//! with a single column per variable, named by the lower-cased base name.
//!
//! Series columns are recognized purely by name: any field whose last four
//! characters are ASCII digits. A field named only by four digits has an
//! empty base name.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::batch::RecordBatch;
use crate::error::{ModelError, Result};

/// Field holding the person identifier in person records.
pub const PERNUM_FIELD: &str = "PERNUM";

/// One (person, year) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongRecord {
    pub year: i32,
    pub pernum: i32,
    /// One value per variable, aligned with [`LongBatch::variables`].
    pub values: Vec<i32>,
}

/// Long-form rows plus the variable names they share.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongBatch {
    variables: Vec<String>,
    years: Vec<i32>,
    rows: Vec<LongRecord>,
}

impl LongBatch {
    /// Lower-cased base names, ascending.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Distinct years, ascending.
    #[must_use]
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Rows, year-major then input order.
    #[must_use]
    pub fn rows(&self) -> &[LongRecord] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All column names: `year`, `pernum`, then the variables.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        ["year", "pernum"]
            .into_iter()
            .map(str::to_string)
            .chain(self.variables.iter().cloned())
            .collect()
    }

    /// Value of `variable` in row `index`.
    #[must_use]
    pub fn get(&self, index: usize, variable: &str) -> Option<i32> {
        let row = self.rows.get(index)?;
        match variable {
            "year" => Some(row.year),
            "pernum" => Some(row.pernum),
            _ => {
                let slot = self.variables.iter().position(|v| v == variable)?;
                row.values.get(slot).copied()
            }
        }
    }
}

/// Split a series field name into its lower-cased base name and year.
fn split_series_name(name: &str) -> Option<(String, i32)> {
    let split = name.len().checked_sub(4)?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (base, suffix) = name.split_at(split);
    if !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = suffix.parse().ok()?;
    Some((base.to_lowercase(), year))
}

/// Reshape a batch of wide person records into long form.
///
/// Produces `records * years` rows. A variable without a column for some
/// year is left at zero in that year's rows.
pub fn wide_to_long(wide: &RecordBatch) -> Result<LongBatch> {
    let schema = wide.schema();
    let pernum_idx = schema
        .position(PERNUM_FIELD)
        .ok_or_else(|| ModelError::MissingFields {
            missing: vec![PERNUM_FIELD.to_string()],
            available: schema.field_names(),
        })?;

    let series: Vec<(usize, String, i32)> = schema
        .names()
        .enumerate()
        .filter_map(|(idx, name)| split_series_name(name).map(|(base, year)| (idx, base, year)))
        .collect();

    let years: Vec<i32> = series
        .iter()
        .map(|(_, _, year)| *year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let variables: Vec<String> = series
        .iter()
        .map(|(_, base, _)| base.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // (year, variable slot) -> wide field position
    let mut lookup: BTreeMap<(i32, usize), usize> = BTreeMap::new();
    for (idx, base, year) in &series {
        if let Ok(slot) = variables.binary_search(base)
            && lookup.insert((*year, slot), *idx).is_some()
        {
            return Err(ModelError::duplicate_field(format!("{base}{year}")));
        }
    }

    tracing::debug!(
        records = wide.len(),
        years = years.len(),
        variables = variables.len(),
        "reshaping wide records to long form"
    );

    let mut rows = Vec::with_capacity(wide.len() * years.len());
    for &year in &years {
        let columns: Vec<Option<usize>> = (0..variables.len())
            .map(|slot| lookup.get(&(year, slot)).copied())
            .collect();
        for record in wide.records() {
            let values = record.values();
            rows.push(LongRecord {
                year,
                pernum: values[pernum_idx],
                values: columns
                    .iter()
                    .map(|column| column.map_or(0, |idx| values[idx]))
                    .collect(),
            });
        }
    }

    Ok(LongBatch {
        variables,
        years,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::{MtsRef, RawHeaderSection, RecordSchema};

    fn wide_batch(values: Vec<i32>) -> RecordBatch {
        // PERNUM, EARN, HLTH, EARN1999, EARN2000, HLTH2000
        let raw = RawHeaderSection::new(
            vec!["PERNUM".into(), "EARN".into(), "HLTH".into()],
            vec![MtsRef::new(1, 1999, 2000), MtsRef::new(2, 2000, 2000)],
        );
        RecordBatch::from_values(Arc::new(raw.schema().unwrap()), values).unwrap()
    }

    #[test]
    fn test_split_series_name() {
        assert_eq!(split_series_name("EARN1999"), Some(("earn".to_string(), 1999)));
        assert_eq!(split_series_name("PERNUM"), None);
        assert_eq!(split_series_name("2000"), Some((String::new(), 2000)));
        assert_eq!(split_series_name("200"), None);
        assert_eq!(split_series_name("AB12C4"), None);
    }

    #[test]
    fn test_rows_are_year_major() {
        let wide = wide_batch(vec![
            1, 0, 0, 100, 200, 7, //
            2, 0, 0, 300, 400, 8,
        ]);
        let long = wide_to_long(&wide).unwrap();

        assert_eq!(long.years(), &[1999, 2000]);
        assert_eq!(long.variables(), &["earn".to_string(), "hlth".to_string()]);
        assert_eq!(long.len(), 4);

        let keys: Vec<(i32, i32)> = long.rows().iter().map(|r| (r.year, r.pernum)).collect();
        assert_eq!(keys, vec![(1999, 1), (1999, 2), (2000, 1), (2000, 2)]);
    }

    #[test]
    fn test_values_come_from_matching_year() {
        let wide = wide_batch(vec![1, 0, 0, 100, 200, 7]);
        let long = wide_to_long(&wide).unwrap();

        assert_eq!(long.get(0, "earn"), Some(100));
        assert_eq!(long.get(1, "earn"), Some(200));
        assert_eq!(long.get(1, "hlth"), Some(7));
    }

    #[test]
    fn test_missing_year_defaults_to_zero() {
        let wide = wide_batch(vec![1, 0, 0, 100, 200, 7]);
        let long = wide_to_long(&wide).unwrap();
        // HLTH has no 1999 column
        assert_eq!(long.get(0, "hlth"), Some(0));
    }

    #[test]
    fn test_requires_pernum() {
        let raw = RawHeaderSection::new(vec!["EARN".into()], vec![MtsRef::new(0, 2000, 2001)]);
        let batch = RecordBatch::new(Arc::new(raw.schema().unwrap()));
        assert!(matches!(
            wide_to_long(&batch),
            Err(ModelError::MissingFields { .. })
        ));
    }

    #[test]
    fn test_case_folded_collision_is_rejected() {
        let schema = RecordSchema::builder()
            .scalar("PERNUM")
            .scalar("Earn2000")
            .scalar("EARN2000")
            .build()
            .unwrap();
        let batch = RecordBatch::from_values(Arc::new(schema), vec![1, 10, 20]).unwrap();
        assert_eq!(
            wide_to_long(&batch).unwrap_err(),
            ModelError::DuplicateField {
                name: "earn2000".to_string()
            }
        );
    }

    #[test]
    fn test_bare_year_field_has_empty_base() {
        let schema = RecordSchema::builder()
            .scalar("PERNUM")
            .scalar("2000")
            .build()
            .unwrap();
        let batch = RecordBatch::from_values(Arc::new(schema), vec![1, 42]).unwrap();
        let long = wide_to_long(&batch).unwrap();
        assert_eq!(long.years(), &[2000]);
        assert_eq!(long.variables(), &[String::new()]);
        assert_eq!(long.get(0, ""), Some(42));
    }

    #[test]
    fn test_column_names() {
        let long = wide_to_long(&wide_batch(vec![])).unwrap();
        assert!(long.is_empty());
        assert_eq!(long.column_names(), vec!["year", "pernum", "earn", "hlth"]);
    }
}
