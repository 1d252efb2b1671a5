//! Donor resource use-case service.
//!
//! # Responsibility
//! - Validate raw create/patch payloads before anything reaches the store.
//! - Normalize names on registration.
//! - Orchestrate donor list/create/read/update/delete and file transfer.
//!
//! # Invariants
//! - Create validation runs in a fixed order and stops at the first failure:
//!   malformed payload, then missing keys, then invalid values.
//! - Keyed operations check existence before mutating.
//! - Store failures are reported with the store's own message after the
//!   transaction has been rolled back. Nothing is retried.
//! - Log events never carry names or `cedula`.

use crate::model::donor::{Donor, DonorId, DonorPatch, CEDULA_MAX_CHARS};
use crate::model::patch::PatchError;
use crate::repo::donor_repo::DonorRepository;
use crate::repo::RepoError;
use crate::transfer::{load_donor_file, save_donor_file, TransferError};
use log::{error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Keys a create payload must carry.
pub const REQUIRED_DONOR_FIELDS: [&str; 3] = ["cedula", "nombre", "apellido"];

/// Failure taxonomy of the donor resource.
#[derive(Debug)]
pub enum DonorServiceError {
    /// Payload absent or not a JSON object.
    MalformedRequest,
    /// Required keys absent, in declaration order.
    MissingFields(Vec<&'static str>),
    /// Keys present but a value is empty, mistyped or too long.
    InvalidFieldValues(String),
    NotFound(DonorId),
    /// Store failure; carries the store message verbatim.
    Persistence(String),
    Transfer(TransferError),
}

impl Display for DonorServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedRequest => write!(f, "request carries no donor payload"),
            Self::MissingFields(fields) => {
                write!(f, "missing required fields: {}", fields.join(", "))
            }
            Self::InvalidFieldValues(message) => write!(f, "invalid field values: {message}"),
            Self::NotFound(id) => write!(f, "donor not found: {id}"),
            Self::Persistence(message) => write!(f, "{message}"),
            Self::Transfer(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DonorServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transfer(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DonorServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::NotFound(id),
            other => Self::Persistence(other.store_message()),
        }
    }
}

impl From<TransferError> for DonorServiceError {
    fn from(value: TransferError) -> Self {
        Self::Transfer(value)
    }
}

impl From<PatchError> for DonorServiceError {
    fn from(value: PatchError) -> Self {
        match value {
            PatchError::NotAnObject => Self::MalformedRequest,
            invalid @ PatchError::InvalidField { .. } => Self::InvalidFieldValues(invalid.to_string()),
        }
    }
}

/// Donor resource facade over a repository implementation.
pub struct DonorService<R: DonorRepository> {
    repo: R,
}

impl<R: DonorRepository> DonorService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists donors, optionally keeping only those whose full name contains
    /// `name` (case-insensitive).
    ///
    /// Order follows the store's retrieval order and is not guaranteed.
    pub fn list_donors(&self, name: Option<&str>) -> Result<Vec<Donor>, DonorServiceError> {
        let donors = self
            .repo
            .list_donors()
            .map_err(|err| persistence_failure("donor_list", err))?;
        let filtered: Vec<Donor> = match name {
            Some(filter) => donors
                .into_iter()
                .filter(|donor| donor.matches_name(filter))
                .collect(),
            None => donors,
        };
        info!(
            "event=donor_list module=donor_service status=ok filtered={} count={}",
            name.is_some(),
            filtered.len()
        );
        Ok(filtered)
    }

    /// Validates a raw create payload, registers and persists the donor.
    pub fn create_donor(&self, payload: Option<&Value>) -> Result<Donor, DonorServiceError> {
        let donor = match validate_registration(payload) {
            Ok(donor) => donor,
            Err(err) => {
                warn!(
                    "event=donor_create module=donor_service status=rejected reason={}",
                    rejection_reason(&err)
                );
                return Err(err);
            }
        };

        self.repo
            .insert_donor(&donor)
            .map_err(|err| persistence_failure("donor_create", err))?;
        info!(
            "event=donor_create module=donor_service status=ok donor_id={}",
            donor.id
        );
        Ok(donor)
    }

    pub fn get_donor(&self, id: DonorId) -> Result<Donor, DonorServiceError> {
        self.repo
            .get_donor(id)
            .map_err(|err| persistence_failure("donor_get", err))?
            .ok_or(DonorServiceError::NotFound(id))
    }

    /// Applies an allow-listed partial update to an existing donor.
    ///
    /// Unknown keys and `cedula` are ignored. A known key with a bad value
    /// rejects the whole patch before any write.
    pub fn update_donor(
        &self,
        id: DonorId,
        payload: Option<&Value>,
    ) -> Result<Donor, DonorServiceError> {
        let mut donor = self.get_donor(id)?;
        let patch = payload
            .ok_or(DonorServiceError::MalformedRequest)
            .and_then(|value| DonorPatch::from_json(value).map_err(DonorServiceError::from))
            .map_err(|err| {
                warn!(
                    "event=donor_update module=donor_service status=rejected donor_id={} reason={}",
                    id,
                    rejection_reason(&err)
                );
                err
            })?;

        donor.apply_patch(&patch);
        self.repo
            .update_donor(&donor)
            .map_err(|err| persistence_failure("donor_update", err))?;
        info!(
            "event=donor_update module=donor_service status=ok donor_id={} changed={}",
            id,
            !patch.is_empty()
        );
        Ok(donor)
    }

    pub fn delete_donor(&self, id: DonorId) -> Result<(), DonorServiceError> {
        self.get_donor(id)?;
        self.repo
            .delete_donor(id)
            .map_err(|err| persistence_failure("donor_delete", err))?;
        info!(
            "event=donor_delete module=donor_service status=ok donor_id={}",
            id
        );
        Ok(())
    }

    /// Registers every donor from a donor JSON file in one transaction.
    ///
    /// Returns the number of donors imported.
    pub fn import_from_file(&self, path: impl AsRef<Path>) -> Result<usize, DonorServiceError> {
        let donors = load_donor_file(path)?;
        self.repo
            .insert_donors(&donors)
            .map_err(|err| persistence_failure("donor_import", err))?;
        info!(
            "event=donor_import module=donor_service status=ok count={}",
            donors.len()
        );
        Ok(donors.len())
    }

    /// Writes all donors to a donor JSON file. Returns the number written.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<usize, DonorServiceError> {
        let donors = self.list_donors(None)?;
        save_donor_file(path, &donors)?;
        Ok(donors.len())
    }
}

/// Runs the create validation chain and builds a normalized donor.
pub fn validate_registration(payload: Option<&Value>) -> Result<Donor, DonorServiceError> {
    let fields = payload
        .and_then(Value::as_object)
        .ok_or(DonorServiceError::MalformedRequest)?;

    let missing: Vec<&'static str> = REQUIRED_DONOR_FIELDS
        .iter()
        .copied()
        .filter(|key| !fields.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(DonorServiceError::MissingFields(missing));
    }

    let cedula = cedula_text(&fields["cedula"])?;
    let given_name = name_text("nombre", &fields["nombre"])?;
    let family_name = name_text("apellido", &fields["apellido"])?;

    if cedula.is_empty() {
        return Err(DonorServiceError::InvalidFieldValues(
            "cedula must not be empty".to_string(),
        ));
    }
    let cedula_chars = cedula.chars().count();
    if cedula_chars > CEDULA_MAX_CHARS {
        return Err(DonorServiceError::InvalidFieldValues(format!(
            "cedula has {cedula_chars} characters, limit is {CEDULA_MAX_CHARS}"
        )));
    }

    Donor::register(cedula, given_name, family_name)
        .map_err(|err| DonorServiceError::InvalidFieldValues(err.to_string()))
}

/// Accepts a string or an integer; numbers are kept in their decimal form.
fn cedula_text(value: &Value) -> Result<String, DonorServiceError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) if number.is_i64() || number.is_u64() => Ok(number.to_string()),
        _ => Err(DonorServiceError::InvalidFieldValues(
            "cedula must be a string or an integer".to_string(),
        )),
    }
}

fn name_text<'a>(field: &str, value: &'a Value) -> Result<&'a str, DonorServiceError> {
    match value.as_str() {
        Some("") => Err(DonorServiceError::InvalidFieldValues(format!(
            "{field} must not be empty"
        ))),
        Some(text) => Ok(text),
        None => Err(DonorServiceError::InvalidFieldValues(format!(
            "{field} must be a string"
        ))),
    }
}

fn persistence_failure(operation: &'static str, err: RepoError) -> DonorServiceError {
    if !matches!(err, RepoError::NotFound { .. }) {
        error!(
            "event={} module=donor_service status=error rolled_back=true error={}",
            operation, err
        );
    }
    DonorServiceError::from(err)
}

fn rejection_reason(err: &DonorServiceError) -> &'static str {
    match err {
        DonorServiceError::MalformedRequest => "malformed_request",
        DonorServiceError::MissingFields(_) => "missing_fields",
        DonorServiceError::InvalidFieldValues(_) => "invalid_field_values",
        DonorServiceError::NotFound(_) => "not_found",
        DonorServiceError::Persistence(_) => "persistence",
        DonorServiceError::Transfer(_) => "transfer",
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_registration, DonorServiceError};
    use serde_json::json;

    #[test]
    fn absent_or_non_object_payload_is_malformed() {
        assert!(matches!(
            validate_registration(None),
            Err(DonorServiceError::MalformedRequest)
        ));
        assert!(matches!(
            validate_registration(Some(&json!(["cedula"]))),
            Err(DonorServiceError::MalformedRequest)
        ));
    }

    #[test]
    fn missing_keys_are_reported_before_values_are_checked() {
        let err = validate_registration(Some(&json!({"cedula": ""}))).unwrap_err();
        match err {
            DonorServiceError::MissingFields(fields) => {
                assert_eq!(fields, vec!["nombre", "apellido"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn numeric_cedula_is_accepted_in_decimal_form() {
        let donor =
            validate_registration(Some(&json!({"cedula": 12345, "nombre": "a", "apellido": "b"})))
                .unwrap();
        assert_eq!(donor.cedula, "12345");
    }

    #[test]
    fn cedula_of_exactly_fourteen_chars_is_accepted() {
        let payload = json!({"cedula": "12345678901234", "nombre": "a", "apellido": "b"});
        assert!(validate_registration(Some(&payload)).is_ok());
        let payload = json!({"cedula": "123456789012345", "nombre": "a", "apellido": "b"});
        assert!(matches!(
            validate_registration(Some(&payload)),
            Err(DonorServiceError::InvalidFieldValues(_))
        ));
    }

    #[test]
    fn non_string_name_is_an_invalid_value() {
        let payload = json!({"cedula": "1", "nombre": null, "apellido": "b"});
        assert!(matches!(
            validate_registration(Some(&payload)),
            Err(DonorServiceError::InvalidFieldValues(_))
        ));
    }
}
