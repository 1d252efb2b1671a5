//! Blood sample taken during a visit.

use crate::model::patch::PatchError;
use crate::model::visit::VisitId;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SampleId = Uuid;

pub const ANALYST_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    pub visit_id: VisitId,
    #[serde(rename = "fecha_hora")]
    pub collected_at: Option<DateTime<Utc>>,
    #[serde(rename = "tiene_enfermedad")]
    pub has_disease: bool,
    #[serde(rename = "bioanalista")]
    pub analyst: Option<String>,
}

/// Lab outcome for one sample. All three fields are recorded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleResult {
    pub collected_at: DateTime<Utc>,
    pub has_disease: bool,
    pub analyst: String,
}

impl Sample {
    /// Registers a pending sample with no lab result.
    pub fn create(visit_id: VisitId) -> Self {
        Self {
            id: Uuid::new_v4(),
            visit_id,
            collected_at: None,
            has_disease: false,
            analyst: None,
        }
    }

    pub fn record_result(&mut self, result: SampleResult) -> Result<(), PatchError> {
        let chars = result.analyst.chars().count();
        if chars == 0 {
            return Err(PatchError::invalid("bioanalista", "must not be empty"));
        }
        if chars > ANALYST_MAX_CHARS {
            return Err(PatchError::invalid(
                "bioanalista",
                format!("{chars} characters exceeds the limit of {ANALYST_MAX_CHARS}"),
            ));
        }

        self.collected_at = Some(result.collected_at.trunc_subsecs(3));
        self.has_disease = result.has_disease;
        self.analyst = Some(result.analyst);
        Ok(())
    }

    pub fn has_result(&self) -> bool {
        self.analyst.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{Sample, SampleResult};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn record_result_sets_all_fields_together() {
        let mut sample = Sample::create(Uuid::new_v4());
        assert!(!sample.has_result());

        let at = Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap();
        sample
            .record_result(SampleResult {
                collected_at: at,
                has_disease: true,
                analyst: "Luis".to_string(),
            })
            .unwrap();

        assert_eq!(sample.collected_at, Some(at));
        assert!(sample.has_disease);
        assert_eq!(sample.analyst.as_deref(), Some("Luis"));
    }

    #[test]
    fn record_result_leaves_sample_untouched_on_rejection() {
        let mut sample = Sample::create(Uuid::new_v4());
        let err = sample.record_result(SampleResult {
            collected_at: Utc::now(),
            has_disease: true,
            analyst: String::new(),
        });
        assert!(err.is_err());
        assert!(!sample.has_disease);
        assert_eq!(sample.collected_at, None);
    }
}
