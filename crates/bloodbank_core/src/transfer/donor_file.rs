//! Donor JSON file format: an array of `{cedula, nombre, apellido}` objects.
//!
//! # Invariants
//! - Loading registers each entry, so names come back normalized.
//! - An unreadable file is replaced by an empty one and yields no donors.
//! - A file that reads but does not parse is reported, never overwritten.

use super::{TransferError, TransferResult};
use crate::model::donor::{Donor, DonorRecord};
use log::{info, warn};
use std::fs;
use std::path::Path;

/// File name used when no donor file is configured.
pub const DEFAULT_DONOR_FILE: &str = "donante.json";

/// Reads donors from `path`.
///
/// Only an unreadable file is recreated; parse
/// failures and invalid entries are returned as errors and the file is kept.
///
/// # Side effects
/// - Creates an empty file at `path` when it cannot be read.
pub fn load_donor_file(path: impl AsRef<Path>) -> TransferResult<Vec<Donor>> {
    let path = path.as_ref();
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(
                "event=donor_file_load module=transfer status=recreated error={}",
                err
            );
            fs::write(path, b"").map_err(|source| TransferError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            return Ok(Vec::new());
        }
    };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records: Vec<DonorRecord> =
        serde_json::from_str(&raw).map_err(|source| TransferError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let donors = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            Donor::register(record.cedula.clone(), &record.nombre, &record.apellido).map_err(
                |err| TransferError::InvalidEntry {
                    index,
                    message: err.to_string(),
                },
            )
        })
        .collect::<TransferResult<Vec<_>>>()?;

    info!(
        "event=donor_file_load module=transfer status=ok count={}",
        donors.len()
    );
    Ok(donors)
}

/// Writes `donors` to `path` as a JSON array, replacing previous content.
pub fn save_donor_file(path: impl AsRef<Path>, donors: &[Donor]) -> TransferResult<()> {
    let path = path.as_ref();
    let records: Vec<DonorRecord> = donors.iter().map(Donor::record).collect();
    let encoded = serde_json::to_vec(&records).map_err(|source| TransferError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, encoded).map_err(|source| TransferError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        "event=donor_file_save module=transfer status=ok count={}",
        donors.len()
    );
    Ok(())
}
