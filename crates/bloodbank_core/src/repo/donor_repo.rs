//! Donor repository contract and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Donor::validate()` before touching SQL.
//! - `cedula` is never part of an UPDATE statement.
//! - Listing follows insertion order (`rowid`). Callers must not rely on it.

use crate::model::donor::{Donor, DonorId};
use crate::repo::{begin_write, commit, ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const DONOR_SELECT_SQL: &str = "SELECT id, cedula, nombre, apellido FROM donors";

/// Persistence contract for the donor collection.
pub trait DonorRepository {
    fn insert_donor(&self, donor: &Donor) -> RepoResult<()>;
    /// Inserts every donor in one transaction; any failure inserts none.
    fn insert_donors(&self, donors: &[Donor]) -> RepoResult<()>;
    fn get_donor(&self, id: DonorId) -> RepoResult<Option<Donor>>;
    fn list_donors(&self) -> RepoResult<Vec<Donor>>;
    fn update_donor(&self, donor: &Donor) -> RepoResult<()>;
    /// Hard-deletes a donor; profile, visits and samples cascade.
    fn delete_donor(&self, id: DonorId) -> RepoResult<()>;
}

/// SQLite-backed donor repository borrowing the process store handle.
pub struct SqliteDonorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDonorRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["donors"])?;
        Ok(Self { conn })
    }
}

impl DonorRepository for SqliteDonorRepository<'_> {
    fn insert_donor(&self, donor: &Donor) -> RepoResult<()> {
        self.insert_donors(std::slice::from_ref(donor))
    }

    fn insert_donors(&self, donors: &[Donor]) -> RepoResult<()> {
        for donor in donors {
            donor.validate().map_err(invalid_donor)?;
        }

        let tx = begin_write(self.conn)?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO donors (id, cedula, nombre, apellido)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for donor in donors {
                stmt.execute(params![
                    donor.id.to_string(),
                    donor.cedula.as_str(),
                    donor.given_name.as_str(),
                    donor.family_name.as_str(),
                ])?;
            }
        }
        commit(tx, "insert_donors")
    }

    fn get_donor(&self, id: DonorId) -> RepoResult<Option<Donor>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DONOR_SELECT_SQL} WHERE id = ?1;"))?;
        let columns = stmt
            .query_row([id.to_string()], read_columns)
            .optional()?;
        columns.map(parse_donor).transpose()
    }

    fn list_donors(&self) -> RepoResult<Vec<Donor>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DONOR_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut donors = Vec::new();
        while let Some(row) = rows.next()? {
            donors.push(parse_donor(read_columns(row)?)?);
        }
        Ok(donors)
    }

    fn update_donor(&self, donor: &Donor) -> RepoResult<()> {
        donor.validate().map_err(invalid_donor)?;

        let tx = begin_write(self.conn)?;
        let changed = tx.execute(
            "UPDATE donors SET nombre = ?1, apellido = ?2 WHERE id = ?3;",
            params![
                donor.given_name.as_str(),
                donor.family_name.as_str(),
                donor.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(donor.id));
        }
        commit(tx, "update_donor")
    }

    fn delete_donor(&self, id: DonorId) -> RepoResult<()> {
        let tx = begin_write(self.conn)?;
        let changed = tx.execute("DELETE FROM donors WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        commit(tx, "delete_donor")
    }
}

struct DonorColumns {
    id: String,
    cedula: String,
    given_name: String,
    family_name: String,
}

fn read_columns(row: &Row<'_>) -> rusqlite::Result<DonorColumns> {
    Ok(DonorColumns {
        id: row.get("id")?,
        cedula: row.get("cedula")?,
        given_name: row.get("nombre")?,
        family_name: row.get("apellido")?,
    })
}

fn parse_donor(columns: DonorColumns) -> RepoResult<Donor> {
    let id = parse_uuid(&columns.id, "donors.id")?;
    Donor::from_parts(id, columns.cedula, columns.given_name, columns.family_name)
        .map_err(invalid_donor)
}

fn invalid_donor(err: impl std::fmt::Display) -> RepoError {
    RepoError::InvalidData(format!("donor: {err}"))
}

fn not_found(id: DonorId) -> RepoError {
    RepoError::NotFound { entity: "donor", id }
}
