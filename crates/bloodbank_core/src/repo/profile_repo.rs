//! Donor profile repository contract and SQLite implementation.
//!
//! # Invariants
//! - At most one profile row per donor (`profiles.donor_id` is UNIQUE).
//! - Inserting for a missing donor fails with the store's foreign-key error.

use crate::model::donor::DonorId;
use crate::model::profile::{BloodType, Profile};
use crate::repo::{
    begin_write, commit, ensure_connection_ready, flag_to_db, parse_flag, parse_optional_flag,
    parse_optional_timestamp, parse_uuid, timestamp_to_db, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const PROFILE_SELECT_SQL: &str = "SELECT
    id,
    donor_id,
    hepatitis,
    hiv,
    phone,
    birth_date,
    email,
    rh_positive,
    blood_type
FROM profiles";

pub trait ProfileRepository {
    fn insert_profile(&self, profile: &Profile) -> RepoResult<()>;
    fn get_profile_for_donor(&self, donor_id: DonorId) -> RepoResult<Option<Profile>>;
    fn update_profile(&self, profile: &Profile) -> RepoResult<()>;
}

pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["donors", "profiles"])?;
        Ok(Self { conn })
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn insert_profile(&self, profile: &Profile) -> RepoResult<()> {
        let tx = begin_write(self.conn)?;
        tx.execute(
            "INSERT INTO profiles (
                id,
                donor_id,
                hepatitis,
                hiv,
                phone,
                birth_date,
                email,
                rh_positive,
                blood_type
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                profile.id.to_string(),
                profile.donor_id.to_string(),
                flag_to_db(profile.hepatitis),
                flag_to_db(profile.hiv),
                profile.phone.as_deref(),
                profile.birth_date.map(timestamp_to_db),
                profile.email.as_deref(),
                profile.rh_positive.map(flag_to_db),
                profile.blood_type.map(BloodType::as_str),
            ],
        )?;
        commit(tx, "insert_profile")
    }

    fn get_profile_for_donor(&self, donor_id: DonorId) -> RepoResult<Option<Profile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROFILE_SELECT_SQL} WHERE donor_id = ?1;"))?;
        let mut rows = stmt.query([donor_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_profile_row(row)?));
        }
        Ok(None)
    }

    fn update_profile(&self, profile: &Profile) -> RepoResult<()> {
        let tx = begin_write(self.conn)?;
        let changed = tx.execute(
            "UPDATE profiles
             SET
                hepatitis = ?1,
                hiv = ?2,
                phone = ?3,
                birth_date = ?4,
                email = ?5,
                rh_positive = ?6,
                blood_type = ?7
             WHERE id = ?8;",
            params![
                flag_to_db(profile.hepatitis),
                flag_to_db(profile.hiv),
                profile.phone.as_deref(),
                profile.birth_date.map(timestamp_to_db),
                profile.email.as_deref(),
                profile.rh_positive.map(flag_to_db),
                profile.blood_type.map(BloodType::as_str),
                profile.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "profile",
                id: profile.id,
            });
        }
        commit(tx, "update_profile")
    }
}

fn parse_profile_row(row: &Row<'_>) -> RepoResult<Profile> {
    let id_text: String = row.get("id")?;
    let donor_text: String = row.get("donor_id")?;

    let blood_type = match row.get::<_, Option<String>>("blood_type")? {
        Some(value) => Some(BloodType::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid blood type `{value}` in profiles.blood_type"
            ))
        })?),
        None => None,
    };

    Ok(Profile {
        id: parse_uuid(&id_text, "profiles.id")?,
        donor_id: parse_uuid(&donor_text, "profiles.donor_id")?,
        hepatitis: parse_flag(row.get("hepatitis")?, "profiles.hepatitis")?,
        hiv: parse_flag(row.get("hiv")?, "profiles.hiv")?,
        phone: row.get("phone")?,
        birth_date: parse_optional_timestamp(row.get("birth_date")?, "profiles.birth_date")?,
        email: row.get("email")?,
        rh_positive: parse_optional_flag(row.get("rh_positive")?, "profiles.rh_positive")?,
        blood_type,
    })
}
