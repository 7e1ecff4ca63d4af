//! Error types for FEH file operations.

use std::path::PathBuf;

use feh_model::ModelError;
use thiserror::Error;

use crate::format::PREFIX_LEN;

/// Errors that can occur when reading or writing FEH files.
#[derive(Debug, Error)]
pub enum FehError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The leading bytes match neither header dialect.
    #[error(
        "unrecognized FEH header: expected a binary year followed by CR LF (input) \
         or six spaces followed by an ASCII year (output); first ten bytes, raw: b\"{}\"",
        .prefix.escape_ascii()
    )]
    UnrecognizedFormat { prefix: [u8; PREFIX_LEN] },

    /// The header ended before a complete field could be read.
    #[error("header truncated at byte {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A header integer could not be decoded.
    #[error("invalid header field {field}: {raw:?}")]
    InvalidHeaderField { field: &'static str, raw: String },

    /// Variable name does not fit the 8-byte header slot.
    #[error("variable name '{name}' exceeds 8 bytes")]
    NameTooLong { name: String },

    /// Caller supplied an unusable argument.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Codebook text does not have the expected structure.
    #[error("invalid codebook: {reason}")]
    InvalidCodebook { reason: String },

    /// Schema, projection or batch error.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Failed DataFrame operation.
    #[cfg(feature = "polars")]
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for FEH operations.
pub type Result<T> = std::result::Result<T, FehError>;

impl FehError {
    /// Create an InvalidArgument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an InvalidCodebook error.
    pub fn invalid_codebook(reason: impl Into<String>) -> Self {
        Self::InvalidCodebook {
            reason: reason.into(),
        }
    }

    /// Create an InvalidHeaderField error from raw bytes.
    pub fn invalid_header_field(field: &'static str, raw: &[u8]) -> Self {
        Self::InvalidHeaderField {
            field,
            raw: String::from_utf8_lossy(raw).into_owned(),
        }
    }

    /// Map an open/stat failure, turning `NotFound` into [`FehError::FileNotFound`].
    pub(crate) fn from_open(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io(err)
        }
    }
}

#[cfg(feature = "polars")]
impl From<polars::prelude::PolarsError> for FehError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}
