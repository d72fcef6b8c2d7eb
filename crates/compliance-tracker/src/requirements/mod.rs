//! Requirement intake, evidence handling, expiration scanning, and reporting.

pub mod cache;
pub mod domain;
pub mod evidence;
pub mod report;
pub mod repository;
pub mod router;
pub mod scanner;
pub mod service;

#[cfg(test)]
mod tests;

pub use cache::RequirementCache;
pub use domain::{
    NewRequirement, PersonInCharge, Requirement, RequirementDraft, RequirementId, ValidatedDraft,
};
pub use evidence::{BlobStore, EvidenceFile, RenamedEvidence, UploadError, ACCEPTED_EXTENSIONS};
pub use report::{write_csv, ReportError, REPORT_HEADERS};
pub use repository::{NotificationLedger, RequirementStore};
pub use router::requirement_router;
pub use scanner::{
    days_until, ExpirationScanner, FailedDispatch, NotifyPolicy, ScanReport, SkipReason,
    SkippedRecord, DEFAULT_WINDOW_DAYS,
};
pub use service::{RequirementService, RequirementServiceError};
