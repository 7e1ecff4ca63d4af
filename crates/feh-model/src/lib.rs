//! Data model for FEH microdata.
//!
//! A FEH header describes two record kinds (family and person). Each kind's
//! layout is a flat list of 32-bit integer fields: the declared variables
//! followed by the per-year expansion of every micro time series. This crate
//! holds that layout ([`RecordSchema`]), the records read against it
//! ([`RecordBatch`]) and the reshaping of wide series into long rows
//! ([`wide_to_long`]). It performs no file I/O.
//!
//! # Example
//!
//! ```
//! use feh_model::{MtsRef, RawHeaderSection};
//!
//! let section = RawHeaderSection::new(
//!     vec!["PERNUM".to_string(), "AGE".to_string()],
//!     vec![MtsRef::new(1, 2000, 2002)],
//! );
//! let schema = section.schema().unwrap();
//! assert_eq!(
//!     schema.field_names(),
//!     vec!["PERNUM", "AGE", "AGE2000", "AGE2001", "AGE2002"]
//! );
//! assert_eq!(schema.record_width(), 20);
//! ```

mod batch;
mod error;
mod file_type;
mod reshape;
mod schema;

pub use batch::{Record, RecordBatch};
pub use error::{ModelError, Result};
pub use file_type::FileType;
pub use reshape::{LongBatch, LongRecord, PERNUM_FIELD, wide_to_long};
pub use schema::{
    FIELD_WIDTH, FieldKind, FieldSpec, MtsRef, RawHeaderSection, RecordSchema, SchemaBuilder,
};
