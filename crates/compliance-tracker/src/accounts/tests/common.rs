use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::accounts::auth::{AuthError, AuthIdentity, AuthProvider};
use crate::accounts::domain::{AuthUid, NewUser, RegistrationForm, User, UserId};
use crate::accounts::repository::UserRepository;
use crate::accounts::service::AccountService;
use crate::store::StoreError;

pub(super) type TestService = AccountService<RecordingAuth, MemoryUsers>;

pub(super) fn registration() -> RegistrationForm {
    RegistrationForm {
        first_name: "Ana".to_string(),
        middle_name: "Reyes".to_string(),
        last_name: "Santos".to_string(),
        email: "ana.santos@agency.gov.ph".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
        department: "Finance".to_string(),
        contact: "09171234567".to_string(),
        ..RegistrationForm::default()
    }
}

pub(super) fn build_service() -> (TestService, Arc<RecordingAuth>, Arc<MemoryUsers>) {
    let auth = Arc::new(RecordingAuth::default());
    let users = Arc::new(MemoryUsers::default());
    let service = AccountService::new(auth.clone(), users.clone());
    (service, auth, users)
}

/// Counts every provider call; `failure` is returned from every call when set.
#[derive(Default)]
pub(super) struct RecordingAuth {
    pub(super) calls: AtomicUsize,
    pub(super) created: Mutex<Vec<String>>,
    pub(super) resets: Mutex<Vec<String>>,
    pub(super) failure: Option<AuthError>,
}

impl RecordingAuth {
    pub(super) fn failing(error: AuthError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl AuthProvider for RecordingAuth {
    fn create_identity(&self, email: &str, _password: &str) -> Result<AuthIdentity, AuthError> {
        self.check()?;
        let mut created = self.created.lock().expect("auth mutex poisoned");
        created.push(email.to_string());
        Ok(AuthIdentity {
            uid: AuthUid(format!("uid-{}", created.len())),
            email: email.to_string(),
        })
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        self.check()?;
        if password != "secret1" {
            return Err(AuthError::InvalidCredential);
        }
        Ok(AuthIdentity {
            uid: AuthUid("uid-1".to_string()),
            email: email.to_string(),
        })
    }

    fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.check()?;
        self.resets
            .lock()
            .expect("auth mutex poisoned")
            .push(email.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryUsers {
    pub(super) users: Mutex<Vec<User>>,
    pub(super) inserts: AtomicUsize,
    pub(super) fail_inserts: bool,
}

impl MemoryUsers {
    pub(super) fn failing_inserts() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    pub(super) fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

impl UserRepository for MemoryUsers {
    fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(StoreError::Unavailable("firestore offline".to_string()));
        }
        let mut users = self.users.lock().expect("users mutex poisoned");
        let record = User::with_id(UserId(format!("user-{}", users.len() + 1)), user);
        users.push(record.clone());
        Ok(record)
    }

    fn all(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().expect("users mutex poisoned").clone())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .expect("users mutex poisoned")
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
