//! Record store bootstrap for the donor registry.
//!
//! # Responsibility
//! - Open, configure and close the SQLite connection that backs every
//!   repository.
//! - Apply schema migrations before any registry data is touched.
//!
//! # Invariants
//! - The connection is an explicit handle: opened at startup, passed to
//!   repositories by reference, closed through [`close_db`].
//! - Schema version is tracked via `PRAGMA user_version`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{close_db, open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Store-level failure surfaced by bootstrap and by repositories.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The database file was written by a newer binary.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "registry schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
