//! Core domain logic for the blood bank donor registry.
//! This crate is the single source of truth for registry invariants.

pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod transfer;

pub use api::{handle, ApiRequest, ApiResponse, Method};
pub use config::{ConfigError, RegistryConfig};
pub use db::{close_db, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::donor::{normalize_name, Donor, DonorId, DonorPatch, DonorRecord};
pub use model::patch::PatchError;
pub use model::profile::{BloodType, Profile, ProfileId};
pub use model::sample::{Sample, SampleId, SampleResult};
pub use model::visit::{
    EligibilityAssessor, EligibilityError, QuestionnaireAnswers, UndeterminedEligibility, Visit,
    VisitId,
};
pub use repo::donor_repo::{DonorRepository, SqliteDonorRepository};
pub use repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
pub use repo::visit_repo::{SqliteVisitRepository, VisitRepository};
pub use repo::{RepoError, RepoResult};
pub use service::donor_service::{DonorService, DonorServiceError};
pub use service::intake_service::{IntakeError, IntakeResult, IntakeService};
pub use transfer::{load_donor_file, save_donor_file, TransferError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
