//! Record kinds stored in a FEH dataset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Which of the two header sections describes a data file.
///
/// The family section always precedes the person section in a header file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Family,
    Person,
}

impl FileType {
    /// Both kinds, in header order.
    pub const ALL: [Self; 2] = [Self::Family, Self::Person];

    /// Lowercase name as used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Family => "family",
            Self::Person => "person",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "family" => Ok(Self::Family),
            "person" => Ok(Self::Person),
            other => Err(ModelError::invalid_file_type(other)),
        }
    }
}
