//! Visit and sample repository contract and SQLite implementation.
//!
//! Samples are only reachable through their visit, so both tables share one
//! repository.
//!
//! # Invariants
//! - Visits list newest first (`visited_at DESC, id ASC`).
//! - Samples list in registration order.

use crate::model::donor::DonorId;
use crate::model::sample::{Sample, SampleId};
use crate::model::visit::{Visit, VisitId};
use crate::repo::{
    begin_write, commit, ensure_connection_ready, flag_to_db, parse_flag,
    parse_optional_timestamp, parse_timestamp, parse_uuid, timestamp_to_db, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const VISIT_SELECT_SQL: &str = "SELECT
    id,
    donor_id,
    visited_at,
    interviewer,
    gender,
    sexual_orientation,
    last_psychotropic_use,
    last_menstrual_period,
    last_tattoo
FROM visits";

const SAMPLE_SELECT_SQL: &str = "SELECT id, visit_id, collected_at, has_disease, analyst FROM samples";

pub trait VisitRepository {
    fn insert_visit(&self, visit: &Visit) -> RepoResult<()>;
    fn get_visit(&self, id: VisitId) -> RepoResult<Option<Visit>>;
    fn list_visits_for_donor(&self, donor_id: DonorId) -> RepoResult<Vec<Visit>>;
    fn update_visit(&self, visit: &Visit) -> RepoResult<()>;
    fn insert_sample(&self, sample: &Sample) -> RepoResult<()>;
    fn get_sample(&self, id: SampleId) -> RepoResult<Option<Sample>>;
    fn list_samples_for_visit(&self, visit_id: VisitId) -> RepoResult<Vec<Sample>>;
    fn update_sample(&self, sample: &Sample) -> RepoResult<()>;
}

pub struct SqliteVisitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVisitRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["donors", "visits", "samples"])?;
        Ok(Self { conn })
    }
}

impl VisitRepository for SqliteVisitRepository<'_> {
    fn insert_visit(&self, visit: &Visit) -> RepoResult<()> {
        let tx = begin_write(self.conn)?;
        tx.execute(
            "INSERT INTO visits (
                id,
                donor_id,
                visited_at,
                interviewer,
                gender,
                sexual_orientation,
                last_psychotropic_use,
                last_menstrual_period,
                last_tattoo
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                visit.id.to_string(),
                visit.donor_id.to_string(),
                timestamp_to_db(visit.visited_at),
                visit.interviewer.as_str(),
                visit.gender.as_deref(),
                visit.sexual_orientation.as_deref(),
                visit.last_psychotropic_use.map(timestamp_to_db),
                visit.last_menstrual_period.map(timestamp_to_db),
                visit.last_tattoo.map(timestamp_to_db),
            ],
        )?;
        commit(tx, "insert_visit")
    }

    fn get_visit(&self, id: VisitId) -> RepoResult<Option<Visit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{VISIT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_visit_row(row)?));
        }
        Ok(None)
    }

    fn list_visits_for_donor(&self, donor_id: DonorId) -> RepoResult<Vec<Visit>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VISIT_SELECT_SQL} WHERE donor_id = ?1 ORDER BY visited_at DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([donor_id.to_string()])?;
        let mut visits = Vec::new();
        while let Some(row) = rows.next()? {
            visits.push(parse_visit_row(row)?);
        }
        Ok(visits)
    }

    fn update_visit(&self, visit: &Visit) -> RepoResult<()> {
        let tx = begin_write(self.conn)?;
        let changed = tx.execute(
            "UPDATE visits
             SET
                visited_at = ?1,
                interviewer = ?2,
                gender = ?3,
                sexual_orientation = ?4,
                last_psychotropic_use = ?5,
                last_menstrual_period = ?6,
                last_tattoo = ?7
             WHERE id = ?8;",
            params![
                timestamp_to_db(visit.visited_at),
                visit.interviewer.as_str(),
                visit.gender.as_deref(),
                visit.sexual_orientation.as_deref(),
                visit.last_psychotropic_use.map(timestamp_to_db),
                visit.last_menstrual_period.map(timestamp_to_db),
                visit.last_tattoo.map(timestamp_to_db),
                visit.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "visit",
                id: visit.id,
            });
        }
        commit(tx, "update_visit")
    }

    fn insert_sample(&self, sample: &Sample) -> RepoResult<()> {
        let tx = begin_write(self.conn)?;
        tx.execute(
            "INSERT INTO samples (id, visit_id, collected_at, has_disease, analyst)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                sample.id.to_string(),
                sample.visit_id.to_string(),
                sample.collected_at.map(timestamp_to_db),
                flag_to_db(sample.has_disease),
                sample.analyst.as_deref(),
            ],
        )?;
        commit(tx, "insert_sample")
    }

    fn get_sample(&self, id: SampleId) -> RepoResult<Option<Sample>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SAMPLE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_sample_row(row)?));
        }
        Ok(None)
    }

    fn list_samples_for_visit(&self, visit_id: VisitId) -> RepoResult<Vec<Sample>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SAMPLE_SELECT_SQL} WHERE visit_id = ?1 ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([visit_id.to_string()])?;
        let mut samples = Vec::new();
        while let Some(row) = rows.next()? {
            samples.push(parse_sample_row(row)?);
        }
        Ok(samples)
    }

    fn update_sample(&self, sample: &Sample) -> RepoResult<()> {
        let tx = begin_write(self.conn)?;
        let changed = tx.execute(
            "UPDATE samples
             SET collected_at = ?1, has_disease = ?2, analyst = ?3
             WHERE id = ?4;",
            params![
                sample.collected_at.map(timestamp_to_db),
                flag_to_db(sample.has_disease),
                sample.analyst.as_deref(),
                sample.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "sample",
                id: sample.id,
            });
        }
        commit(tx, "update_sample")
    }
}

fn parse_visit_row(row: &Row<'_>) -> RepoResult<Visit> {
    let id_text: String = row.get("id")?;
    let donor_text: String = row.get("donor_id")?;
    Ok(Visit {
        id: parse_uuid(&id_text, "visits.id")?,
        donor_id: parse_uuid(&donor_text, "visits.donor_id")?,
        visited_at: parse_timestamp(row.get("visited_at")?, "visits.visited_at")?,
        interviewer: row.get("interviewer")?,
        gender: row.get("gender")?,
        sexual_orientation: row.get("sexual_orientation")?,
        last_psychotropic_use: parse_optional_timestamp(
            row.get("last_psychotropic_use")?,
            "visits.last_psychotropic_use",
        )?,
        last_menstrual_period: parse_optional_timestamp(
            row.get("last_menstrual_period")?,
            "visits.last_menstrual_period",
        )?,
        last_tattoo: parse_optional_timestamp(row.get("last_tattoo")?, "visits.last_tattoo")?,
    })
}

fn parse_sample_row(row: &Row<'_>) -> RepoResult<Sample> {
    let id_text: String = row.get("id")?;
    let visit_text: String = row.get("visit_id")?;
    Ok(Sample {
        id: parse_uuid(&id_text, "samples.id")?,
        visit_id: parse_uuid(&visit_text, "samples.visit_id")?,
        collected_at: parse_optional_timestamp(row.get("collected_at")?, "samples.collected_at")?,
        has_disease: parse_flag(row.get("has_disease")?, "samples.has_disease")?,
        analyst: row.get("analyst")?,
    })
}
