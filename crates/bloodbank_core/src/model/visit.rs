//! Donation visit model and the eligibility capability seam.
//!
//! # Invariants
//! - `visited_at` is always set; it defaults to the opening instant in UTC.
//! - `interviewer` is never empty.
//! - Eligibility is never computed here. The registry only forwards the
//!   questionnaire to an [`EligibilityAssessor`] supplied by the caller.

use crate::model::donor::DonorId;
use crate::model::patch::{
    as_object, read_optional_text, read_optional_timestamp, read_text, read_timestamp, JsonObject,
    PatchError,
};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type VisitId = Uuid;

pub const INTERVIEWER_MAX_CHARS: usize = 100;
pub const DEMOGRAPHIC_MAX_CHARS: usize = 30;

/// Questionnaire answers keyed by question id.
pub type QuestionnaireAnswers = JsonObject;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub donor_id: DonorId,
    #[serde(rename = "fecha_hora")]
    pub visited_at: DateTime<Utc>,
    #[serde(rename = "encuestador")]
    pub interviewer: String,
    #[serde(rename = "genero")]
    pub gender: Option<String>,
    #[serde(rename = "orientacion_sexual")]
    pub sexual_orientation: Option<String>,
    #[serde(rename = "ultimo_consumo_psicotropicas")]
    pub last_psychotropic_use: Option<DateTime<Utc>>,
    #[serde(rename = "ultimo_periodo_menstrual")]
    pub last_menstrual_period: Option<DateTime<Utc>>,
    #[serde(rename = "ultimo_tatuaje")]
    pub last_tattoo: Option<DateTime<Utc>>,
}

impl Visit {
    /// Opens a visit for `donor_id`, stamped with the current UTC time at
    /// millisecond precision.
    pub fn open(donor_id: DonorId, interviewer: &str) -> Result<Self, PatchError> {
        let interviewer = read_text(
            "encuestador",
            &Value::String(interviewer.to_string()),
            INTERVIEWER_MAX_CHARS,
        )?;
        Ok(Self {
            id: Uuid::new_v4(),
            donor_id,
            visited_at: Utc::now().trunc_subsecs(3),
            interviewer,
            gender: None,
            sexual_orientation: None,
            last_psychotropic_use: None,
            last_menstrual_period: None,
            last_tattoo: None,
        })
    }

    pub fn apply_patch(&mut self, patch: &VisitPatch) {
        if let Some(visited_at) = patch.visited_at {
            self.visited_at = visited_at;
        }
        if let Some(interviewer) = &patch.interviewer {
            self.interviewer = interviewer.clone();
        }
        if let Some(gender) = &patch.gender {
            self.gender = gender.clone();
        }
        if let Some(orientation) = &patch.sexual_orientation {
            self.sexual_orientation = orientation.clone();
        }
        if let Some(value) = patch.last_psychotropic_use {
            self.last_psychotropic_use = value;
        }
        if let Some(value) = patch.last_menstrual_period {
            self.last_menstrual_period = value;
        }
        if let Some(value) = patch.last_tattoo {
            self.last_tattoo = value;
        }
    }

    /// Asks `assessor` whether the donor may give blood at this visit.
    pub fn determine_eligibility(
        &self,
        assessor: &dyn EligibilityAssessor,
        answers: &QuestionnaireAnswers,
    ) -> Result<bool, EligibilityError> {
        assessor.assess(self, answers)
    }
}

/// Allow-listed partial update for a visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitPatch {
    pub visited_at: Option<DateTime<Utc>>,
    pub interviewer: Option<String>,
    pub gender: Option<Option<String>>,
    pub sexual_orientation: Option<Option<String>>,
    pub last_psychotropic_use: Option<Option<DateTime<Utc>>>,
    pub last_menstrual_period: Option<Option<DateTime<Utc>>>,
    pub last_tattoo: Option<Option<DateTime<Utc>>>,
}

impl VisitPatch {
    pub fn from_json(payload: &Value) -> Result<Self, PatchError> {
        let mut patch = Self::default();
        for (key, value) in as_object(payload)? {
            match key.as_str() {
                "fecha_hora" => patch.visited_at = Some(read_timestamp("fecha_hora", value)?),
                "encuestador" => {
                    patch.interviewer =
                        Some(read_text("encuestador", value, INTERVIEWER_MAX_CHARS)?)
                }
                "genero" => {
                    patch.gender = Some(read_optional_text("genero", value, DEMOGRAPHIC_MAX_CHARS)?)
                }
                "orientacion_sexual" => {
                    patch.sexual_orientation = Some(read_optional_text(
                        "orientacion_sexual",
                        value,
                        DEMOGRAPHIC_MAX_CHARS,
                    )?)
                }
                "ultimo_consumo_psicotropicas" => {
                    patch.last_psychotropic_use = Some(read_optional_timestamp(
                        "ultimo_consumo_psicotropicas",
                        value,
                    )?)
                }
                "ultimo_periodo_menstrual" => {
                    patch.last_menstrual_period =
                        Some(read_optional_timestamp("ultimo_periodo_menstrual", value)?)
                }
                "ultimo_tatuaje" => {
                    patch.last_tattoo = Some(read_optional_timestamp("ultimo_tatuaje", value)?)
                }
                _ => {}
            }
        }
        Ok(patch)
    }
}

/// Failure to reach an eligibility verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EligibilityError {
    /// No eligibility rules are configured.
    Undetermined,
    /// The external assessor failed.
    Assessor(String),
}

impl Display for EligibilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undetermined => write!(f, "no eligibility rules are configured"),
            Self::Assessor(message) => write!(f, "eligibility assessor failed: {message}"),
        }
    }
}

impl Error for EligibilityError {}

/// Decides whether a donor may give blood at a visit.
///
/// Implementations are provided by the blood bank; the registry ships none
/// that return a verdict.
pub trait EligibilityAssessor {
    fn assess(&self, visit: &Visit, answers: &QuestionnaireAnswers)
        -> Result<bool, EligibilityError>;
}

/// Assessor used until real rules are plugged in. Never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UndeterminedEligibility;

impl EligibilityAssessor for UndeterminedEligibility {
    fn assess(
        &self,
        _visit: &Visit,
        _answers: &QuestionnaireAnswers,
    ) -> Result<bool, EligibilityError> {
        Err(EligibilityError::Undetermined)
    }
}

#[cfg(test)]
mod tests {
    use super::{EligibilityError, QuestionnaireAnswers, UndeterminedEligibility, Visit, VisitPatch};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn open_requires_interviewer() {
        assert!(Visit::open(Uuid::new_v4(), "").is_err());
        let visit = Visit::open(Uuid::new_v4(), "Rosa").unwrap();
        assert_eq!(visit.interviewer, "Rosa");
        assert_eq!(visit.gender, None);
    }

    #[test]
    fn undetermined_assessor_never_returns_a_verdict() {
        let visit = Visit::open(Uuid::new_v4(), "Rosa").unwrap();
        let answers = QuestionnaireAnswers::new();
        assert_eq!(
            visit.determine_eligibility(&UndeterminedEligibility, &answers),
            Err(EligibilityError::Undetermined)
        );
    }

    #[test]
    fn patch_rejects_null_visit_time() {
        assert!(VisitPatch::from_json(&json!({"fecha_hora": null})).is_err());
        let patch = VisitPatch::from_json(&json!({"ultimo_tatuaje": null})).unwrap();
        assert_eq!(patch.last_tattoo, Some(None));
    }
}
