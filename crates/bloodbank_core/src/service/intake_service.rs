//! Donation intake use-cases: profile, visits, samples.
//!
//! # Responsibility
//! - Attach and patch the donor profile.
//! - Open and patch visits, and route eligibility questions to a caller-supplied
//!   assessor.
//! - Register samples and record their lab results.
//!
//! # Invariants
//! - Every operation checks that the owning donor/visit exists first.
//! - Patches are parsed and type-checked in full before any assignment.

use crate::model::donor::DonorId;
use crate::model::patch::PatchError;
use crate::model::profile::{Profile, ProfilePatch};
use crate::model::sample::{Sample, SampleId, SampleResult};
use crate::model::visit::{
    EligibilityAssessor, EligibilityError, QuestionnaireAnswers, Visit, VisitId, VisitPatch,
};
use crate::repo::donor_repo::DonorRepository;
use crate::repo::profile_repo::ProfileRepository;
use crate::repo::visit_repo::VisitRepository;
use crate::repo::RepoError;
use log::info;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum IntakeError {
    DonorNotFound(DonorId),
    /// The donor exists but has no profile yet.
    ProfileNotFound(DonorId),
    ProfileAlreadyExists(DonorId),
    VisitNotFound(VisitId),
    SampleNotFound(SampleId),
    InvalidPatch(PatchError),
    Eligibility(EligibilityError),
    Repo(RepoError),
}

impl Display for IntakeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DonorNotFound(id) => write!(f, "donor not found: {id}"),
            Self::ProfileNotFound(id) => write!(f, "donor {id} has no profile"),
            Self::ProfileAlreadyExists(id) => write!(f, "donor {id} already has a profile"),
            Self::VisitNotFound(id) => write!(f, "visit not found: {id}"),
            Self::SampleNotFound(id) => write!(f, "sample not found: {id}"),
            Self::InvalidPatch(err) => write!(f, "{err}"),
            Self::Eligibility(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IntakeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPatch(err) => Some(err),
            Self::Eligibility(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for IntakeError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<PatchError> for IntakeError {
    fn from(value: PatchError) -> Self {
        Self::InvalidPatch(value)
    }
}

impl From<EligibilityError> for IntakeError {
    fn from(value: EligibilityError) -> Self {
        Self::Eligibility(value)
    }
}

pub type IntakeResult<T> = Result<T, IntakeError>;

pub struct IntakeService<D, P, V>
where
    D: DonorRepository,
    P: ProfileRepository,
    V: VisitRepository,
{
    donors: D,
    profiles: P,
    visits: V,
}

impl<D, P, V> IntakeService<D, P, V>
where
    D: DonorRepository,
    P: ProfileRepository,
    V: VisitRepository,
{
    pub fn new(donors: D, profiles: P, visits: V) -> Self {
        Self {
            donors,
            profiles,
            visits,
        }
    }

    /// Creates the default profile for a donor that has none.
    pub fn attach_profile(&self, donor_id: DonorId) -> IntakeResult<Profile> {
        self.ensure_donor(donor_id)?;
        if self.profiles.get_profile_for_donor(donor_id)?.is_some() {
            return Err(IntakeError::ProfileAlreadyExists(donor_id));
        }

        let profile = Profile::create(donor_id);
        self.profiles.insert_profile(&profile)?;
        info!(
            "event=profile_attach module=intake_service status=ok donor_id={}",
            donor_id
        );
        Ok(profile)
    }

    pub fn get_profile(&self, donor_id: DonorId) -> IntakeResult<Profile> {
        self.ensure_donor(donor_id)?;
        self.profiles
            .get_profile_for_donor(donor_id)?
            .ok_or(IntakeError::ProfileNotFound(donor_id))
    }

    pub fn update_profile(&self, donor_id: DonorId, payload: &Value) -> IntakeResult<Profile> {
        let mut profile = self.get_profile(donor_id)?;
        let patch = ProfilePatch::from_json(payload)?;
        profile.apply_patch(&patch);
        self.profiles.update_profile(&profile)?;
        info!(
            "event=profile_update module=intake_service status=ok donor_id={}",
            donor_id
        );
        Ok(profile)
    }

    /// Opens a visit stamped with the current time.
    pub fn open_visit(&self, donor_id: DonorId, interviewer: &str) -> IntakeResult<Visit> {
        self.ensure_donor(donor_id)?;
        let visit = Visit::open(donor_id, interviewer)?;
        self.visits.insert_visit(&visit)?;
        info!(
            "event=visit_open module=intake_service status=ok donor_id={} visit_id={}",
            donor_id, visit.id
        );
        Ok(visit)
    }

    pub fn get_visit(&self, visit_id: VisitId) -> IntakeResult<Visit> {
        self.visits
            .get_visit(visit_id)?
            .ok_or(IntakeError::VisitNotFound(visit_id))
    }

    pub fn update_visit(&self, visit_id: VisitId, payload: &Value) -> IntakeResult<Visit> {
        let mut visit = self.get_visit(visit_id)?;
        let patch = VisitPatch::from_json(payload)?;
        visit.apply_patch(&patch);
        self.visits.update_visit(&visit)?;
        Ok(visit)
    }

    /// Lists a donor's visits, newest first.
    pub fn list_visits(&self, donor_id: DonorId) -> IntakeResult<Vec<Visit>> {
        self.ensure_donor(donor_id)?;
        Ok(self.visits.list_visits_for_donor(donor_id)?)
    }

    /// Asks `assessor` for a donate/defer verdict on a stored visit.
    pub fn assess_visit(
        &self,
        visit_id: VisitId,
        assessor: &dyn EligibilityAssessor,
        answers: &QuestionnaireAnswers,
    ) -> IntakeResult<bool> {
        let visit = self.get_visit(visit_id)?;
        let verdict = visit.determine_eligibility(assessor, answers)?;
        info!(
            "event=visit_assess module=intake_service status=ok visit_id={} eligible={}",
            visit_id, verdict
        );
        Ok(verdict)
    }

    pub fn register_sample(&self, visit_id: VisitId) -> IntakeResult<Sample> {
        self.get_visit(visit_id)?;
        let sample = Sample::create(visit_id);
        self.visits.insert_sample(&sample)?;
        Ok(sample)
    }

    /// Records timestamp, disease flag and analyst of a sample together.
    pub fn record_sample_result(
        &self,
        sample_id: SampleId,
        result: SampleResult,
    ) -> IntakeResult<Sample> {
        let mut sample = self
            .visits
            .get_sample(sample_id)?
            .ok_or(IntakeError::SampleNotFound(sample_id))?;
        sample.record_result(result)?;
        self.visits.update_sample(&sample)?;
        info!(
            "event=sample_result module=intake_service status=ok sample_id={}",
            sample_id
        );
        Ok(sample)
    }

    pub fn list_samples(&self, visit_id: VisitId) -> IntakeResult<Vec<Sample>> {
        self.get_visit(visit_id)?;
        Ok(self.visits.list_samples_for_visit(visit_id)?)
    }

    fn ensure_donor(&self, donor_id: DonorId) -> IntakeResult<()> {
        match self.donors.get_donor(donor_id)? {
            Some(_) => Ok(()),
            None => Err(IntakeError::DonorNotFound(donor_id)),
        }
    }
}
