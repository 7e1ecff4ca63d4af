//! Record layouts derived from FEH header sections.
//!
//! A header section declares variable names plus micro time series (MTS)
//! references. Each MTS reference repeats one declared variable once per
//! calendar year, so the materialized layout is:
//!
//! 1. every declared name, in declaration order;
//! 2. for each MTS reference in declaration order, `NAME{year}` for every
//!    year from `first_year` to `last_year` inclusive.
//!
//! Every field is a little-endian signed 32-bit integer, so a record is
//! `4 * field_count` bytes with no padding.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Width in bytes of every field in a FEH record.
pub const FIELD_WIDTH: usize = 4;

/// One micro time series reference from a header section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MtsRef {
    /// Zero-based index into the field names built so far.
    pub source_index: usize,
    /// First year of the series (inclusive).
    pub first_year: i32,
    /// Last year of the series (inclusive).
    pub last_year: i32,
    /// Byte offset recorded by the simulation. Informational only.
    pub byte_offset: i32,
}

impl MtsRef {
    /// Create a reference with a zero byte offset.
    #[must_use]
    pub fn new(source_index: usize, first_year: i32, last_year: i32) -> Self {
        Self {
            source_index,
            first_year,
            last_year,
            byte_offset: 0,
        }
    }

    /// Years covered by this series.
    #[must_use]
    pub fn years(&self) -> RangeInclusive<i32> {
        self.first_year..=self.last_year
    }

    /// Number of fields this series expands to.
    #[must_use]
    pub fn year_count(&self) -> usize {
        let span = i64::from(self.last_year) - i64::from(self.first_year) + 1;
        usize::try_from(span).unwrap_or(0)
    }
}

/// A header section as stored on disk, before layout expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHeaderSection {
    /// Number of declared variable names.
    pub variable_count: u32,
    /// Second header integer. Carried through unchanged.
    pub aux1: i32,
    /// Record length as written by the simulation. Not used for layout.
    pub record_length_hint: i32,
    /// Number of MTS references.
    pub mts_count: u32,
    /// Declared variable names, trimmed.
    pub names: Vec<String>,
    /// MTS references in declaration order.
    pub mts_refs: Vec<MtsRef>,
}

impl RawHeaderSection {
    /// Build a section from names and references, deriving the counts.
    #[must_use]
    pub fn new(names: Vec<String>, mts_refs: Vec<MtsRef>) -> Self {
        Self {
            variable_count: u32::try_from(names.len()).unwrap_or(u32::MAX),
            aux1: 0,
            record_length_hint: 0,
            mts_count: u32::try_from(mts_refs.len()).unwrap_or(u32::MAX),
            names,
            mts_refs,
        }
    }

    /// Set the two informational header integers.
    #[must_use]
    pub fn with_aux(mut self, aux1: i32, record_length_hint: i32) -> Self {
        self.aux1 = aux1;
        self.record_length_hint = record_length_hint;
        self
    }

    /// Expand this section into a record layout.
    pub fn schema(&self) -> Result<RecordSchema> {
        RecordSchema::from_section(self)
    }
}

/// What a field represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A plain declared variable.
    Scalar,
    /// One year of a micro time series.
    YearSeriesElement { base_name: String, year: i32 },
}

/// A single fixed-width field in a record layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within a schema.
    pub name: String,
    /// Scalar or series element.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Create a scalar field.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar,
        }
    }

    /// Create a series element named `{base_name}{year}`.
    pub fn series(base_name: impl Into<String>, year: i32) -> Self {
        let base_name = base_name.into();
        Self {
            name: format!("{base_name}{year}"),
            kind: FieldKind::YearSeriesElement { base_name, year },
        }
    }

    /// Field width in bytes.
    #[must_use]
    pub const fn byte_width(&self) -> usize {
        FIELD_WIDTH
    }

    /// Year of a series element.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        match &self.kind {
            FieldKind::Scalar => None,
            FieldKind::YearSeriesElement { year, .. } => Some(*year),
        }
    }
}

/// Ordered, fixed-width record layout with unique field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SchemaRepr", into = "SchemaRepr")]
pub struct RecordSchema {
    fields: Vec<FieldSpec>,
    positions: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct SchemaRepr {
    fields: Vec<FieldSpec>,
}

impl TryFrom<SchemaRepr> for RecordSchema {
    type Error = ModelError;

    fn try_from(repr: SchemaRepr) -> Result<Self> {
        Self::new(repr.fields)
    }
}

impl From<RecordSchema> for SchemaRepr {
    fn from(schema: RecordSchema) -> Self {
        Self {
            fields: schema.fields,
        }
    }
}

impl PartialEq for RecordSchema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for RecordSchema {}

impl RecordSchema {
    /// Create a schema, rejecting duplicate names.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            if positions.insert(field.name.clone(), idx).is_some() {
                return Err(ModelError::duplicate_field(&field.name));
            }
        }
        Ok(Self { fields, positions })
    }

    /// Start building a schema from scalar names and series references.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Expand a raw header section.
    pub fn from_section(section: &RawHeaderSection) -> Result<Self> {
        let builder = section
            .names
            .iter()
            .fold(Self::builder(), |builder, name| builder.scalar(name.trim()));
        section
            .mts_refs
            .iter()
            .fold(builder, |builder, mts| {
                builder.series(mts.source_index, mts.first_year, mts.last_year)
            })
            .build()
    }

    /// Fields in layout order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Bytes per record.
    #[must_use]
    pub fn record_width(&self) -> usize {
        self.fields.iter().map(FieldSpec::byte_width).sum()
    }

    /// Field names in layout order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// Owned copy of the field names.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.names().map(str::to_string).collect()
    }

    /// Position of a field by name.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.position(name).map(|idx| &self.fields[idx])
    }

    /// Whether a field exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Check that every requested name exists.
    pub fn check_fields<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        if names.is_empty() {
            return Err(ModelError::EmptyProjection);
        }
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.contains(name.as_ref()))
            .map(|name| name.as_ref().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ModelError::MissingFields {
                missing,
                available: self.field_names(),
            })
        }
    }

    /// Build the dense layout for a subset of fields.
    ///
    /// Returns the projected schema (fields in requested order) together
    /// with each field's position in this schema.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<(Self, Vec<usize>)> {
        self.check_fields(names)?;
        let positions: Vec<usize> = names
            .iter()
            .filter_map(|name| self.position(name.as_ref()))
            .collect();
        let fields = positions.iter().map(|&idx| self.fields[idx].clone()).collect();
        Ok((Self::new(fields)?, positions))
    }
}

/// Incremental schema construction.
///
/// Scalars always precede series expansions regardless of call order.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    scalars: Vec<String>,
    series: Vec<MtsRef>,
}

impl SchemaBuilder {
    /// Append a declared variable.
    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>) -> Self {
        self.scalars.push(name.into());
        self
    }

    /// Append a series over `first_year..=last_year` of the field at `source_index`.
    #[must_use]
    pub fn series(mut self, source_index: usize, first_year: i32, last_year: i32) -> Self {
        self.series
            .push(MtsRef::new(source_index, first_year, last_year));
        self
    }

    /// Materialize the layout.
    pub fn build(self) -> Result<RecordSchema> {
        let expanded: usize = self.series.iter().map(MtsRef::year_count).sum();
        let mut fields: Vec<FieldSpec> = Vec::with_capacity(self.scalars.len() + expanded);
        fields.extend(self.scalars.into_iter().map(FieldSpec::scalar));

        for mts in &self.series {
            // Resolved against the names built so far, series fields included.
            let base_name = fields
                .get(mts.source_index)
                .map(|field| field.name.clone())
                .ok_or(ModelError::SourceIndexOutOfRange {
                    index: i64::try_from(mts.source_index).unwrap_or(i64::MAX),
                    available: fields.len(),
                })?;
            if mts.first_year > mts.last_year {
                tracing::warn!(
                    base_name = %base_name,
                    first_year = mts.first_year,
                    last_year = mts.last_year,
                    "MTS reference has an empty year range"
                );
            }
            fields.extend(
                mts.years()
                    .map(|year| FieldSpec::series(base_name.as_str(), year)),
            );
        }

        RecordSchema::new(fields)
    }
}
