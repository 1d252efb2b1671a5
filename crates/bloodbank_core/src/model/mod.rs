//! Registry domain model.
//!
//! # Responsibility
//! - Define donors and the records they own: profile, visits, samples.
//! - Provide allow-listed, type-checked patches for every mutable entity.
//!
//! # Invariants
//! - `Donor` is the root. Profile and visits reference a donor, samples
//!   reference a visit, and none of them outlive their owner.

pub mod donor;
pub mod patch;
pub mod profile;
pub mod sample;
pub mod visit;
