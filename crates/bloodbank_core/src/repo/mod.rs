//! Repository layer over the registry store.
//!
//! # Responsibility
//! - Define persistence contracts per aggregate (donor, profile, visits).
//! - Keep SQL, column encoding and transaction handling inside this boundary.
//!
//! # Invariants
//! - Every write runs in its own `BEGIN IMMEDIATE` transaction. A failed
//!   statement or commit drops the transaction, which rolls it back, so no
//!   partial write is ever visible.
//! - Store failures reach callers as `RepoError::Db` with the SQLite message
//!   intact.
//! - Timestamps are stored as UTC epoch milliseconds.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod donor_repo;
pub mod profile_repo;
pub mod visit_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all registry repositories.
#[derive(Debug)]
pub enum RepoError {
    /// Store failure, including constraint violations and commit failures.
    Db(DbError),
    /// Keyed write hit no row.
    NotFound { entity: &'static str, id: Uuid },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Persisted row cannot be turned back into a valid domain value.
    InvalidData(String),
}

impl RepoError {
    /// Human-readable store message, used verbatim in 500-class responses.
    pub fn store_message(&self) -> String {
        self.to_string()
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "registry repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "registry repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted registry data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Verifies that `conn` was opened through `db::open_db*` and holds the
/// tables a repository needs.
pub(crate) fn ensure_connection_ready(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

/// Starts a write transaction on a shared connection handle.
pub(crate) fn begin_write(conn: &Connection) -> RepoResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

/// Commits `tx`; on failure the transaction is rolled back and the store
/// error is returned.
pub(crate) fn commit(tx: Transaction<'_>, operation: &'static str) -> RepoResult<()> {
    tx.commit().map_err(|err| {
        warn!(
            "event=tx_commit module=repo status=rolled_back operation={} error={}",
            operation, err
        );
        RepoError::from(err)
    })
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_flag(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_optional_flag(value: Option<i64>, column: &str) -> RepoResult<Option<bool>> {
    value.map(|raw| parse_flag(raw, column)).transpose()
}

pub(crate) fn flag_to_db(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn timestamp_to_db(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

pub(crate) fn parse_timestamp(value: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("timestamp `{value}` out of range in {column}"))
    })
}

pub(crate) fn parse_optional_timestamp(
    value: Option<i64>,
    column: &str,
) -> RepoResult<Option<DateTime<Utc>>> {
    value.map(|raw| parse_timestamp(raw, column)).transpose()
}
