//! User registration, sign-in and password reset.

pub mod auth;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use auth::{AuthError, AuthIdentity, AuthProvider};
pub use domain::{
    AuthUid, LoginForm, NewUser, PasswordResetForm, RegistrationForm, Role, User, UserId,
    ValidatedRegistration,
};
pub use repository::UserRepository;
pub use router::account_router;
pub use service::{AccountAction, AccountService, AccountServiceError};
