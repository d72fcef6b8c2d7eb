use chrono::NaiveDate;
use compliance_tracker::accounts::{
    AuthError, AuthIdentity, AuthProvider, AuthUid, NewUser, User, UserId, UserRepository,
};
use compliance_tracker::config::NotificationConfig;
use compliance_tracker::notifications::{
    DeliveryReceipt, DispatchError, EmailJsConfig, EmailJsDispatcher, HttpEmailTransport,
    LoggingDispatcher, NotificationDispatcher, NotificationRequest,
};
use compliance_tracker::reference::DocumentReference;
use compliance_tracker::requirements::{
    BlobStore, ExpirationScanner, NewRequirement, NotificationLedger, RenamedEvidence,
    Requirement, RequirementId, RequirementStore, UploadError,
};
use compliance_tracker::store::StoreError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// Failed sign-ins allowed before the in-memory provider locks an account.
pub(crate) const MAX_FAILED_LOGINS: u32 = 5;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) blobs: InMemoryBlobStore,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRequirementStore {
    records: Arc<Mutex<Vec<Requirement>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryRequirementStore {
    /// Seeds the store with documents exported from another deployment.
    pub(crate) fn from_records(records: Vec<Requirement>) -> Self {
        Self {
            sequence: Arc::new(AtomicU64::new(records.len() as u64)),
            records: Arc::new(Mutex::new(records)),
        }
    }
}

impl RequirementStore for InMemoryRequirementStore {
    fn insert(&self, requirement: NewRequirement) -> Result<Requirement, StoreError> {
        let next = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let record = Requirement::with_id(RequirementId(format!("req-{next:06}")), requirement);
        lock(&self.records).push(record.clone());
        Ok(record)
    }

    fn all(&self) -> Result<Vec<Requirement>, StoreError> {
        Ok(lock(&self.records).clone())
    }

    fn find_by_reference(
        &self,
        reference: &DocumentReference,
    ) -> Result<Vec<Requirement>, StoreError> {
        Ok(lock(&self.records)
            .iter()
            .filter(|record| &record.document_reference == reference)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserRepository {
    users: Arc<Mutex<Vec<User>>>,
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut guard = lock(&self.users);
        if guard
            .iter()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Conflict);
        }
        let record = User::with_id(UserId(format!("user-{:06}", guard.len() + 1)), user);
        guard.push(record.clone());
        Ok(record)
    }

    fn all(&self) -> Result<Vec<User>, StoreError> {
        Ok(lock(&self.users).clone())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

struct StoredCredential {
    uid: AuthUid,
    email: String,
    password: String,
    failed_attempts: u32,
}

/// Development stand-in for the hosted identity service. Credentials live only
/// in process memory.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAuthProvider {
    credentials: Arc<Mutex<HashMap<String, StoredCredential>>>,
    sequence: Arc<AtomicU64>,
}

impl AuthProvider for InMemoryAuthProvider {
    fn create_identity(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let key = email.to_ascii_lowercase();
        let mut guard = lock(&self.credentials);
        if guard.contains_key(&key) {
            return Err(AuthError::EmailAlreadyInUse);
        }
        let next = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let uid = AuthUid(format!("uid-{next:06}"));
        guard.insert(
            key,
            StoredCredential {
                uid: uid.clone(),
                email: email.to_string(),
                password: password.to_string(),
                failed_attempts: 0,
            },
        );
        Ok(AuthIdentity {
            uid,
            email: email.to_string(),
        })
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let mut guard = lock(&self.credentials);
        let Some(credential) = guard.get_mut(&email.to_ascii_lowercase()) else {
            return Err(AuthError::InvalidCredential);
        };
        if credential.failed_attempts >= MAX_FAILED_LOGINS {
            return Err(AuthError::TooManyRequests);
        }
        if credential.password != password {
            credential.failed_attempts += 1;
            warn!(uid = %credential.uid, attempts = credential.failed_attempts, "failed sign-in");
            return Err(AuthError::InvalidCredential);
        }
        credential.failed_attempts = 0;
        Ok(AuthIdentity {
            uid: credential.uid.clone(),
            email: credential.email.clone(),
        })
    }

    fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        // Unknown addresses succeed silently so the endpoint cannot enumerate accounts.
        let mut guard = lock(&self.credentials);
        if let Some(credential) = guard.get_mut(&email.to_ascii_lowercase()) {
            credential.failed_attempts = 0;
            info!(uid = %credential.uid, "password reset link issued");
        }
        Ok(())
    }
}

/// Keeps uploaded evidence in memory and serves it under `public_base_url`.
#[derive(Clone)]
pub(crate) struct InMemoryBlobStore {
    public_base_url: String,
    files: Arc<Mutex<HashMap<String, RenamedEvidence>>>,
}

impl InMemoryBlobStore {
    pub(crate) fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            files: Arc::default(),
        }
    }

    pub(crate) fn get(&self, file_name: &str) -> Option<RenamedEvidence> {
        lock(&self.files).get(file_name).cloned()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn upload(&self, file: RenamedEvidence) -> Result<String, UploadError> {
        let url = format!("{}/{}", self.public_base_url, file.file_name);
        lock(&self.files).insert(file.file_name.clone(), file);
        Ok(url)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLedger {
    entries: Arc<Mutex<HashSet<(RequirementId, NaiveDate)>>>,
}

impl NotificationLedger for InMemoryLedger {
    fn already_notified(&self, id: &RequirementId, expiration: NaiveDate) -> bool {
        lock(&self.entries).contains(&(id.clone(), expiration))
    }

    fn record(&self, id: &RequirementId, expiration: NaiveDate) {
        lock(&self.entries).insert((id.clone(), expiration));
    }
}

/// Dispatcher chosen at startup from the email settings.
pub(crate) enum ConfiguredDispatcher {
    Email(EmailJsDispatcher<HttpEmailTransport>),
    Log(LoggingDispatcher),
}

impl NotificationDispatcher for ConfiguredDispatcher {
    fn dispatch(&self, request: &NotificationRequest) -> Result<DeliveryReceipt, DispatchError> {
        match self {
            ConfiguredDispatcher::Email(dispatcher) => dispatcher.dispatch(request),
            ConfiguredDispatcher::Log(dispatcher) => dispatcher.dispatch(request),
        }
    }
}

impl ConfiguredDispatcher {
    /// EmailJS when configured, otherwise log-only delivery.
    pub(crate) fn from_config(email: Option<&EmailJsConfig>) -> Self {
        match email {
            Some(config) => ConfiguredDispatcher::Email(EmailJsDispatcher::new(
                config.clone(),
                Arc::new(HttpEmailTransport::default()),
            )),
            None => ConfiguredDispatcher::Log(LoggingDispatcher),
        }
    }

    pub(crate) fn sends_email(&self) -> bool {
        matches!(self, ConfiguredDispatcher::Email(_))
    }
}

/// Scanner honoring the configured window and re-notification policy.
pub(crate) fn expiration_scanner(
    config: &NotificationConfig,
    dispatcher: ConfiguredDispatcher,
) -> ExpirationScanner<ConfiguredDispatcher> {
    let scanner =
        ExpirationScanner::new(Arc::new(dispatcher)).with_window_days(config.window_days);
    if config.notify_once {
        scanner.with_ledger(Arc::new(InMemoryLedger::default()))
    } else {
        scanner
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_provider_locks_after_repeated_failures() {
        let auth = InMemoryAuthProvider::default();
        auth.create_identity("Ana@agency.ph", "secret1")
            .expect("identity created");

        for _ in 0..MAX_FAILED_LOGINS {
            assert_eq!(
                auth.authenticate("ana@agency.ph", "wrong"),
                Err(AuthError::InvalidCredential)
            );
        }
        assert_eq!(
            auth.authenticate("ana@agency.ph", "secret1"),
            Err(AuthError::TooManyRequests)
        );

        auth.send_password_reset("ana@agency.ph").expect("reset");
        let identity = auth
            .authenticate("ANA@agency.ph", "secret1")
            .expect("unlocked after reset");
        assert_eq!(identity.email, "Ana@agency.ph");
    }

    #[test]
    fn auth_provider_rejects_duplicate_identity() {
        let auth = InMemoryAuthProvider::default();
        auth.create_identity("ana@agency.ph", "secret1")
            .expect("identity created");
        assert!(matches!(
            auth.create_identity("ANA@agency.ph", "other1"),
            Err(AuthError::EmailAlreadyInUse)
        ));
    }

    #[test]
    fn blob_store_builds_public_url() {
        let blobs = InMemoryBlobStore::new("http://localhost:3000/files");
        let url = blobs
            .upload(RenamedEvidence {
                file_name: "FI-2024-AB12.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: b"%PDF".to_vec(),
            })
            .expect("upload");
        assert_eq!(url, "http://localhost:3000/files/FI-2024-AB12.pdf");
        assert!(blobs.get("FI-2024-AB12.pdf").is_some());
    }
}
