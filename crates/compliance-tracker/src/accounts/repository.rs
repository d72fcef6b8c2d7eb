use super::domain::{NewUser, User};
use crate::store::StoreError;

/// Document collection of registered user profiles.
pub trait UserRepository: Send + Sync {
    fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    fn all(&self) -> Result<Vec<User>, StoreError>;
    /// Matches addresses case-insensitively.
    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}
