use std::sync::Arc;

use tracing::{info, warn};

use super::auth::{AuthError, AuthIdentity, AuthProvider};
use super::domain::{LoginForm, PasswordResetForm, RegistrationForm, User};
use super::repository::UserRepository;
use crate::notice::Notice;
use crate::store::StoreError;
use crate::validation::ValidationErrors;

/// Operation an error occurred in; selects the fallback notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAction {
    Register,
    Login,
    PasswordReset,
    ListUsers,
}

/// Registration, sign-in and password reset on top of the auth provider and
/// the user collection.
pub struct AccountService<A, U> {
    auth: Arc<A>,
    users: Arc<U>,
}

impl<A, U> AccountService<A, U>
where
    A: AuthProvider + 'static,
    U: UserRepository + 'static,
{
    pub fn new(auth: Arc<A>, users: Arc<U>) -> Self {
        Self { auth, users }
    }

    /// Creates the identity and then the profile. Each step runs only after
    /// the previous one succeeded.
    pub fn register(&self, form: RegistrationForm) -> Result<User, AccountServiceError> {
        let registration = form.validate()?;

        if self.users.find_by_email(&registration.email)?.is_some() {
            return Err(AccountServiceError::EmailAlreadyRegistered(
                registration.email,
            ));
        }

        let identity = self
            .auth
            .create_identity(&registration.email, &registration.password)?;
        let user = self
            .users
            .insert(registration.into_new_user(identity.uid))
            .inspect_err(|err| {
                warn!(error = %err, "identity created but user profile was not saved");
            })?;

        info!(user_id = %user.id, uid = %user.uid, role = ?user.role, "user registered");
        Ok(user)
    }

    pub fn login(&self, form: LoginForm) -> Result<AuthIdentity, AccountServiceError> {
        form.errors().into_result()?;
        let identity = self.auth.authenticate(form.email.trim(), &form.password)?;
        info!(uid = %identity.uid, "user logged in");
        Ok(identity)
    }

    pub fn request_password_reset(
        &self,
        form: PasswordResetForm,
    ) -> Result<(), AccountServiceError> {
        form.errors().into_result()?;
        self.auth.send_password_reset(form.email.trim())?;
        info!("password reset requested");
        Ok(())
    }

    pub fn users(&self) -> Result<Vec<User>, AccountServiceError> {
        Ok(self.users.all()?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountServiceError {
    #[error("account form rejected: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0} is already registered")]
    EmailAlreadyRegistered(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccountServiceError {
    pub fn notice(&self, action: AccountAction) -> Notice {
        match self {
            AccountServiceError::Validation(errors) => Notice::error(
                errors
                    .fields()
                    .next()
                    .map(|(_, message)| message.to_string())
                    .unwrap_or_else(|| "Please correct the highlighted fields.".to_string()),
            ),
            AccountServiceError::EmailAlreadyRegistered(_)
            | AccountServiceError::Auth(AuthError::EmailAlreadyInUse) => {
                Notice::error("Email is already registered.")
            }
            AccountServiceError::Auth(AuthError::InvalidCredential) => {
                Notice::error("Incorrect email/password.")
            }
            AccountServiceError::Auth(AuthError::TooManyRequests) => Notice::error(
                "Your account has been temporarily disabled due to too many failed login attempts.",
            ),
            AccountServiceError::Auth(AuthError::Unavailable(_))
            | AccountServiceError::Store(_) => Notice::error(match action {
                AccountAction::Register => "Failed to save user data.",
                AccountAction::Login => "Login failed. Please try again.",
                AccountAction::PasswordReset => "Failed to send password reset email.",
                AccountAction::ListUsers => "Failed to load users.",
            }),
        }
    }
}
