//! Bulk import/export of donors through flat JSON files.
//!
//! This is an auxiliary path next to the SQLite store, used to seed or back
//! up the donor collection.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod donor_file;

pub use donor_file::{load_donor_file, save_donor_file, DEFAULT_DONOR_FILE};

pub type TransferResult<T> = Result<T, TransferError>;

#[derive(Debug)]
pub enum TransferError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// An entry parsed but does not describe a valid donor.
    InvalidEntry { index: usize, message: String },
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "donor file `{}`: {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "donor file `{}` is not valid JSON: {source}", path.display())
            }
            Self::InvalidEntry { index, message } => {
                write!(f, "donor file entry #{index} is invalid: {message}")
            }
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidEntry { .. } => None,
        }
    }
}
