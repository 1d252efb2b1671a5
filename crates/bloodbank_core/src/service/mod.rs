//! Registry use-case services.
//!
//! # Responsibility
//! - Turn raw caller input into validated domain operations.
//! - Keep callers decoupled from SQL and transaction details.

pub mod donor_service;
pub mod intake_service;
