use serde::Serialize;

use super::domain::AuthUid;

/// Identity returned by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthIdentity {
    pub uid: AuthUid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credential")]
    InvalidCredential,
    #[error("email already in use")]
    EmailAlreadyInUse,
    #[error("too many requests")]
    TooManyRequests,
    #[error("authentication provider unavailable: {0}")]
    Unavailable(String),
}

/// External identity service holding credentials.
pub trait AuthProvider: Send + Sync {
    fn create_identity(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;
    fn authenticate(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;
    fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;
}
