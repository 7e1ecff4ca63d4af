//! Error types for record layouts and batches.

use thiserror::Error;

/// Errors raised while building schemas or manipulating record batches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Two fields resolved to the same name.
    #[error("duplicate field name: {name}")]
    DuplicateField { name: String },

    /// An MTS reference points outside the declared variable names.
    #[error("MTS source index {index} is out of range for {available} declared variables")]
    SourceIndexOutOfRange { index: i64, available: usize },

    /// Requested fields are not part of the schema.
    #[error("fields missing from the data: {missing:?}; available fields: {available:?}")]
    MissingFields {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// Record kind other than `family` or `person`.
    #[error("file_type can be 'person' or 'family' but not '{value}'")]
    InvalidFileType { value: String },

    /// A projection must name at least one field.
    #[error("field projection must name at least one field")]
    EmptyProjection,

    /// Record arity does not match the schema.
    #[error("row length mismatch: expected {expected} values, got {actual}")]
    RowLengthMismatch { expected: usize, actual: usize },

    /// Two batches with different layouts were combined.
    #[error("schema mismatch: expected fields {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

impl ModelError {
    /// Create a DuplicateField error.
    pub fn duplicate_field(name: impl Into<String>) -> Self {
        Self::DuplicateField { name: name.into() }
    }

    /// Create an InvalidFileType error.
    pub fn invalid_file_type(value: impl Into<String>) -> Self {
        Self::InvalidFileType {
            value: value.into(),
        }
    }
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
