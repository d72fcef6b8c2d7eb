use chrono::NaiveDate;

use super::domain::{NewRequirement, Requirement, RequirementId};
use crate::reference::DocumentReference;
use crate::store::StoreError;

/// Storage abstraction over the hosted requirement collection.
pub trait RequirementStore: Send + Sync {
    /// Persists a new requirement and returns it with its store-assigned id.
    fn insert(&self, requirement: NewRequirement) -> Result<Requirement, StoreError>;
    fn all(&self) -> Result<Vec<Requirement>, StoreError>;
    fn find_by_reference(
        &self,
        reference: &DocumentReference,
    ) -> Result<Vec<Requirement>, StoreError>;
}

/// Remembers which expirations have already produced a notice.
pub trait NotificationLedger: Send + Sync {
    fn already_notified(&self, id: &RequirementId, expiration: NaiveDate) -> bool;
    fn record(&self, id: &RequirementId, expiration: NaiveDate);
}
