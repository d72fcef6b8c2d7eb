use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::notifications::{
    DeliveryReceipt, DispatchError, NotificationDispatcher, NotificationRequest,
};
use crate::reference::DocumentReference;
use crate::requirements::domain::{
    NewRequirement, PersonInCharge, Requirement, RequirementDraft, RequirementId,
};
use crate::requirements::evidence::{BlobStore, RenamedEvidence, UploadError};
use crate::requirements::repository::{NotificationLedger, RequirementStore};
use crate::requirements::scanner::ExpirationScanner;
use crate::requirements::service::RequirementService;
use crate::store::StoreError;

pub(super) type TestService = RequirementService<MemoryStore, MemoryBlobs, RecordingDispatcher>;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    date(year, month, day).and_time(NaiveTime::MIN)
}

pub(super) fn requirement(
    id: &str,
    expiration: NaiveDate,
    person_in_charge: Option<PersonInCharge>,
) -> Requirement {
    Requirement {
        id: RequirementId(id.to_string()),
        compliance_list: format!("Compliance {id}"),
        department: "Finance".to_string(),
        entity: "Head Office".to_string(),
        frequency_of_compliance: "Annual".to_string(),
        type_of_compliance: "Permit".to_string(),
        date_submitted: date(2023, 1, 15),
        expiration,
        renewal: date(2023, 12, 15),
        person_in_charge,
        status: "Active".to_string(),
        document_reference: DocumentReference(format!("FI-2023-{id}")),
        uploaded_file_url: None,
    }
}

pub(super) fn address(value: &str) -> Option<PersonInCharge> {
    Some(PersonInCharge::Address(value.to_string()))
}

pub(super) fn draft() -> RequirementDraft {
    RequirementDraft {
        compliance_list: "Mayor's Permit".to_string(),
        department: "finance".to_string(),
        entity: "Makati Branch".to_string(),
        frequency_of_compliance: "Annual".to_string(),
        type_of_compliance: "Business Permit".to_string(),
        date_submitted: "2024-01-02".to_string(),
        expiration: "2025-01-20".to_string(),
        renewal: "2024-12-20".to_string(),
        person_in_charge: "treasury@agency.gov.ph".to_string(),
        status: "Active".to_string(),
        document_reference: None,
        uploaded_file_url: None,
    }
}

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryStore>,
    Arc<MemoryBlobs>,
    Arc<RecordingDispatcher>,
) {
    let store = Arc::new(MemoryStore::default());
    let blobs = Arc::new(MemoryBlobs::default());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let scanner = ExpirationScanner::new(dispatcher.clone());
    let service = RequirementService::new(store.clone(), blobs.clone(), scanner);
    (service, store, blobs, dispatcher)
}

#[derive(Default)]
pub(super) struct MemoryStore {
    pub(super) records: Mutex<Vec<Requirement>>,
    sequence: AtomicU64,
    pub(super) inserts: AtomicUsize,
}

impl MemoryStore {
    pub(super) fn seeded(records: Vec<Requirement>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub(super) fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

impl RequirementStore for MemoryStore {
    fn insert(&self, requirement: NewRequirement) -> Result<Requirement, StoreError> {
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let record = Requirement::with_id(RequirementId(format!("req-{id:04}")), requirement);
        self.records
            .lock()
            .expect("store mutex poisoned")
            .push(record.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    fn all(&self) -> Result<Vec<Requirement>, StoreError> {
        Ok(self.records.lock().expect("store mutex poisoned").clone())
    }

    fn find_by_reference(
        &self,
        reference: &DocumentReference,
    ) -> Result<Vec<Requirement>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .filter(|record| &record.document_reference == reference)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableStore;

impl RequirementStore for UnavailableStore {
    fn insert(&self, _requirement: NewRequirement) -> Result<Requirement, StoreError> {
        Err(StoreError::Unavailable("firestore offline".to_string()))
    }

    fn all(&self) -> Result<Vec<Requirement>, StoreError> {
        Err(StoreError::Unavailable("firestore offline".to_string()))
    }

    fn find_by_reference(
        &self,
        _reference: &DocumentReference,
    ) -> Result<Vec<Requirement>, StoreError> {
        Err(StoreError::Unavailable("firestore offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryBlobs {
    pub(super) uploads: Mutex<Vec<RenamedEvidence>>,
    pub(super) fail: bool,
}

impl MemoryBlobs {
    pub(super) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(super) fn names(&self) -> Vec<String> {
        self.uploads
            .lock()
            .expect("blob mutex poisoned")
            .iter()
            .map(|file| file.file_name.clone())
            .collect()
    }
}

impl BlobStore for MemoryBlobs {
    fn upload(&self, file: RenamedEvidence) -> Result<String, UploadError> {
        if self.fail {
            return Err(UploadError::Storage("media host timeout".to_string()));
        }
        let url = format!("https://files.test/{}", file.file_name);
        self.uploads.lock().expect("blob mutex poisoned").push(file);
        Ok(url)
    }
}

/// Records every request; recipients listed in `failing` produce transport errors.
#[derive(Default)]
pub(super) struct RecordingDispatcher {
    pub(super) requests: Mutex<Vec<NotificationRequest>>,
    pub(super) failing: Vec<String>,
}

impl RecordingDispatcher {
    pub(super) fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|value| value.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(super) fn requests(&self) -> Vec<NotificationRequest> {
        self.requests.lock().expect("dispatch mutex poisoned").clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn dispatch(&self, request: &NotificationRequest) -> Result<DeliveryReceipt, DispatchError> {
        self.requests
            .lock()
            .expect("dispatch mutex poisoned")
            .push(request.clone());
        if self.failing.contains(&request.recipient) {
            return Err(DispatchError::Transport("connection reset".to_string()));
        }
        Ok(DeliveryReceipt {
            status: 200,
            detail: "OK".to_string(),
        })
    }
}

/// Blocks the calling thread for `delay` per dispatch and notes whether the
/// shared `ticks` counter moved while it was blocked.
pub(super) struct SlowDispatcher {
    pub(super) delay: Duration,
    pub(super) ticks: Arc<AtomicUsize>,
    pub(super) progressed: AtomicUsize,
}

impl SlowDispatcher {
    pub(super) fn new(delay: Duration, ticks: Arc<AtomicUsize>) -> Self {
        Self {
            delay,
            ticks,
            progressed: AtomicUsize::new(0),
        }
    }

    pub(super) fn dispatches_with_progress(&self) -> usize {
        self.progressed.load(Ordering::SeqCst)
    }
}

impl NotificationDispatcher for SlowDispatcher {
    fn dispatch(&self, _request: &NotificationRequest) -> Result<DeliveryReceipt, DispatchError> {
        let before = self.ticks.load(Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.ticks.load(Ordering::SeqCst) > before {
            self.progressed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(DeliveryReceipt {
            status: 200,
            detail: "OK".to_string(),
        })
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    entries: Mutex<HashSet<(RequirementId, NaiveDate)>>,
}

impl NotificationLedger for MemoryLedger {
    fn already_notified(&self, id: &RequirementId, expiration: NaiveDate) -> bool {
        self.entries
            .lock()
            .expect("ledger mutex poisoned")
            .contains(&(id.clone(), expiration))
    }

    fn record(&self, id: &RequirementId, expiration: NaiveDate) {
        self.entries
            .lock()
            .expect("ledger mutex poisoned")
            .insert((id.clone(), expiration));
    }
}

/// Counts ERROR-level events emitted while it is the active subscriber.
#[derive(Clone, Default)]
pub(super) struct ErrorCounter(Arc<AtomicUsize>);

impl ErrorCounter {
    pub(super) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub(super) fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
