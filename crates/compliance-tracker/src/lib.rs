//! Compliance requirement tracking: account onboarding, requirement intake with
//! evidence uploads, expiration notices, and CSV reporting.

pub mod accounts;
pub mod config;
pub mod error;
pub mod notice;
pub mod notifications;
pub mod reference;
pub mod requirements;
pub mod store;
pub mod telemetry;
pub mod validation;
