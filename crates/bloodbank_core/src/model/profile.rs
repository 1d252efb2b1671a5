//! Donor health/contact profile.
//!
//! # Invariants
//! - A donor owns at most one profile; the profile lives and dies with it.
//! - Disease flags default to `false` until explicitly patched.

use crate::model::donor::DonorId;
use crate::model::patch::{
    as_object, read_bool, read_optional_bool, read_optional_text, read_optional_timestamp,
    PatchError,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type ProfileId = Uuid;

pub const PHONE_MAX_CHARS: usize = 15;
pub const EMAIL_MAX_CHARS: usize = 100;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]*$").expect("valid phone regex"));

/// ABO blood group, stored in a two-character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloodType {
    A,
    B,
    AB,
    O,
}

impl BloodType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::AB => "AB",
            Self::O => "O",
        }
    }

    /// Parses a blood group, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "AB" => Some(Self::AB),
            "O" => Some(Self::O),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub donor_id: DonorId,
    pub hepatitis: bool,
    #[serde(rename = "VIH")]
    pub hiv: bool,
    #[serde(rename = "telefono")]
    pub phone: Option<String>,
    #[serde(rename = "fecha_nacimiento")]
    pub birth_date: Option<DateTime<Utc>>,
    pub email: Option<String>,
    #[serde(rename = "RH_positivo")]
    pub rh_positive: Option<bool>,
    #[serde(rename = "sangre_tipo")]
    pub blood_type: Option<BloodType>,
}

impl Profile {
    /// Creates an empty profile for `donor_id` with both disease flags off.
    pub fn create(donor_id: DonorId) -> Self {
        Self {
            id: Uuid::new_v4(),
            donor_id,
            hepatitis: false,
            hiv: false,
            phone: None,
            birth_date: None,
            email: None,
            rh_positive: None,
            blood_type: None,
        }
    }

    pub fn apply_patch(&mut self, patch: &ProfilePatch) {
        if let Some(hepatitis) = patch.hepatitis {
            self.hepatitis = hepatitis;
        }
        if let Some(hiv) = patch.hiv {
            self.hiv = hiv;
        }
        if let Some(phone) = &patch.phone {
            self.phone = phone.clone();
        }
        if let Some(birth_date) = patch.birth_date {
            self.birth_date = birth_date;
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(rh_positive) = patch.rh_positive {
            self.rh_positive = rh_positive;
        }
        if let Some(blood_type) = patch.blood_type {
            self.blood_type = blood_type;
        }
    }
}

/// Allow-listed partial update for a profile.
///
/// Outer `None` means "leave as is"; `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub hepatitis: Option<bool>,
    pub hiv: Option<bool>,
    pub phone: Option<Option<String>>,
    pub birth_date: Option<Option<DateTime<Utc>>>,
    pub email: Option<Option<String>>,
    pub rh_positive: Option<Option<bool>>,
    pub blood_type: Option<Option<BloodType>>,
}

impl ProfilePatch {
    pub fn from_json(payload: &Value) -> Result<Self, PatchError> {
        let mut patch = Self::default();
        for (key, value) in as_object(payload)? {
            match key.as_str() {
                "hepatitis" => patch.hepatitis = Some(read_bool("hepatitis", value)?),
                "VIH" => patch.hiv = Some(read_bool("VIH", value)?),
                "telefono" => patch.phone = Some(read_phone(value)?),
                "fecha_nacimiento" => {
                    patch.birth_date = Some(read_optional_timestamp("fecha_nacimiento", value)?)
                }
                "email" => patch.email = Some(read_email(value)?),
                "RH_positivo" => patch.rh_positive = Some(read_optional_bool("RH_positivo", value)?),
                "sangre_tipo" => patch.blood_type = Some(read_blood_type(value)?),
                _ => {}
            }
        }
        Ok(patch)
    }
}

fn read_phone(value: &Value) -> Result<Option<String>, PatchError> {
    let phone = read_optional_text("telefono", value, PHONE_MAX_CHARS)?;
    if let Some(text) = phone.as_deref() {
        if !PHONE_RE.is_match(text) {
            return Err(PatchError::invalid("telefono", "expected digits, spaces or dashes"));
        }
    }
    Ok(phone)
}

fn read_email(value: &Value) -> Result<Option<String>, PatchError> {
    let email = read_optional_text("email", value, EMAIL_MAX_CHARS)?;
    if let Some(text) = email.as_deref() {
        if !EMAIL_RE.is_match(text) {
            return Err(PatchError::invalid("email", format!("`{text}` is not an address")));
        }
    }
    Ok(email)
}

fn read_blood_type(value: &Value) -> Result<Option<BloodType>, PatchError> {
    match read_optional_text("sangre_tipo", value, 2)? {
        Some(text) => BloodType::parse(&text)
            .map(Some)
            .ok_or_else(|| PatchError::invalid("sangre_tipo", "expected one of A, B, AB, O")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::{BloodType, Profile, ProfilePatch};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn create_defaults_disease_flags_to_false() {
        let profile = Profile::create(Uuid::new_v4());
        assert!(!profile.hepatitis);
        assert!(!profile.hiv);
        assert_eq!(profile.blood_type, None);
    }

    #[test]
    fn patch_assigns_known_fields_and_clears_nulls() {
        let mut profile = Profile::create(Uuid::new_v4());
        profile.email = Some("old@example.com".to_string());

        let patch = ProfilePatch::from_json(&json!({
            "VIH": true,
            "sangre_tipo": "ab",
            "email": null,
            "unknown": "ignored"
        }))
        .unwrap();
        profile.apply_patch(&patch);

        assert!(profile.hiv);
        assert_eq!(profile.blood_type, Some(BloodType::AB));
        assert_eq!(profile.email, None);
    }

    #[test]
    fn patch_rejects_mistyped_flag_and_bad_email() {
        assert!(ProfilePatch::from_json(&json!({"hepatitis": "yes"})).is_err());
        assert!(ProfilePatch::from_json(&json!({"email": "not-an-address"})).is_err());
        assert!(ProfilePatch::from_json(&json!({"sangre_tipo": "Z"})).is_err());
    }
}
