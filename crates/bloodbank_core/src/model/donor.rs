//! Donor domain model.
//!
//! # Responsibility
//! - Define the root registry entity and its wire projection.
//! - Normalize name casing at registration time.
//!
//! # Invariants
//! - `id` is generated once and never reused, even after deletion.
//! - `cedula` is non-empty, at most 14 characters, and never patched.
//! - Given and family names are never empty.

use crate::model::patch::{as_object, read_text, PatchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Surrogate identifier of a donor row.
pub type DonorId = Uuid;

/// Maximum length of the national identity number, in characters.
pub const CEDULA_MAX_CHARS: usize = 14;
/// Column limit for given and family names.
pub const NAME_MAX_CHARS: usize = 80;

/// Invariant violations for donor construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DonorValidationError {
    EmptyCedula,
    CedulaTooLong { chars: usize },
    EmptyGivenName,
    EmptyFamilyName,
    NilId,
}

impl Display for DonorValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCedula => write!(f, "cedula must not be empty"),
            Self::CedulaTooLong { chars } => write!(
                f,
                "cedula has {chars} characters, limit is {CEDULA_MAX_CHARS}"
            ),
            Self::EmptyGivenName => write!(f, "nombre must not be empty"),
            Self::EmptyFamilyName => write!(f, "apellido must not be empty"),
            Self::NilId => write!(f, "donor id must not be nil"),
        }
    }
}

impl Error for DonorValidationError {}

/// A person registered to give blood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Donor {
    pub id: DonorId,
    /// National identity number; the natural key.
    pub cedula: String,
    pub given_name: String,
    pub family_name: String,
}

/// Wire projection of a donor: `{cedula, nombre, apellido, nombre_completo}`.
///
/// Also the entry shape of the donor JSON file, where `nombre_completo` is
/// optional on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorRecord {
    pub cedula: String,
    pub nombre: String,
    pub apellido: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre_completo: Option<String>,
}

impl Donor {
    /// Registers a new donor with a generated id.
    ///
    /// Names are lower-cased and then get their first character upper-cased,
    /// so `"MARIA"` and `"maria"` both become `"Maria"`.
    pub fn register(
        cedula: impl Into<String>,
        given_name: &str,
        family_name: &str,
    ) -> Result<Self, DonorValidationError> {
        let donor = Self {
            id: Uuid::new_v4(),
            cedula: cedula.into(),
            given_name: normalize_name(given_name),
            family_name: normalize_name(family_name),
        };
        donor.validate()?;
        Ok(donor)
    }

    /// Rebuilds a donor from persisted columns without renormalizing names.
    pub fn from_parts(
        id: DonorId,
        cedula: String,
        given_name: String,
        family_name: String,
    ) -> Result<Self, DonorValidationError> {
        let donor = Self {
            id,
            cedula,
            given_name,
            family_name,
        };
        donor.validate()?;
        Ok(donor)
    }

    pub fn validate(&self) -> Result<(), DonorValidationError> {
        if self.id.is_nil() {
            return Err(DonorValidationError::NilId);
        }
        if self.cedula.is_empty() {
            return Err(DonorValidationError::EmptyCedula);
        }
        let chars = self.cedula.chars().count();
        if chars > CEDULA_MAX_CHARS {
            return Err(DonorValidationError::CedulaTooLong { chars });
        }
        if self.given_name.is_empty() {
            return Err(DonorValidationError::EmptyGivenName);
        }
        if self.family_name.is_empty() {
            return Err(DonorValidationError::EmptyFamilyName);
        }
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }

    /// Case-insensitive substring match against the full name.
    pub fn matches_name(&self, filter: &str) -> bool {
        self.full_name()
            .to_lowercase()
            .contains(&filter.to_lowercase())
    }

    pub fn record(&self) -> DonorRecord {
        DonorRecord {
            cedula: self.cedula.clone(),
            nombre: self.given_name.clone(),
            apellido: self.family_name.clone(),
            nombre_completo: Some(self.full_name()),
        }
    }

    /// Assigns the fields present in `patch`; absent fields stay untouched.
    pub fn apply_patch(&mut self, patch: &DonorPatch) {
        if let Some(given_name) = &patch.given_name {
            self.given_name = given_name.clone();
        }
        if let Some(family_name) = &patch.family_name {
            self.family_name = family_name.clone();
        }
    }
}

/// Allow-listed partial update for a donor.
///
/// Only `nombre` and `apellido` are patchable. `cedula` is immutable and any
/// other key is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonorPatch {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl DonorPatch {
    pub fn from_json(payload: &Value) -> Result<Self, PatchError> {
        let mut patch = Self::default();
        for (key, value) in as_object(payload)? {
            match key.as_str() {
                "nombre" => patch.given_name = Some(read_text("nombre", value, NAME_MAX_CHARS)?),
                "apellido" => {
                    patch.family_name = Some(read_text("apellido", value, NAME_MAX_CHARS)?)
                }
                _ => {}
            }
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.given_name.is_none() && self.family_name.is_none()
    }
}

/// Lower-cases `raw`, then upper-cases its first character.
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, Donor, DonorPatch, DonorValidationError};
    use serde_json::json;

    #[test]
    fn normalize_name_capitalizes_first_letter_only() {
        assert_eq!(normalize_name("MARIA"), "Maria");
        assert_eq!(normalize_name("maría josé"), "María josé");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn register_rejects_long_cedula() {
        let err = Donor::register("123456789012345", "ana", "ruiz").unwrap_err();
        assert_eq!(err, DonorValidationError::CedulaTooLong { chars: 15 });
    }

    #[test]
    fn patch_ignores_cedula_and_unknown_keys() {
        let patch = DonorPatch::from_json(&json!({"cedula": "999", "edad": 30})).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn patch_rejects_non_string_name() {
        assert!(DonorPatch::from_json(&json!({"nombre": 7})).is_err());
    }
}
