use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::cache::RequirementCache;
use super::domain::{Requirement, RequirementDraft, ValidatedDraft};
use super::evidence::{rename_for, BlobStore, EvidenceFile, UploadError};
use super::report::{write_csv, ReportError};
use super::repository::RequirementStore;
use super::scanner::{ExpirationScanner, ScanReport};
use crate::notice::Notice;
use crate::notifications::NotificationDispatcher;
use crate::reference::{self, DocumentReference};
use crate::store::StoreError;
use crate::validation::{validate_name, ValidationErrors};

/// Generated references are retried this many times before giving up.
pub const MAX_REFERENCE_ATTEMPTS: usize = 5;

type ReferenceGenerator = Box<dyn Fn(&str) -> DocumentReference + Send + Sync>;

/// Service composing the requirement store, evidence storage, cache, and scanner.
pub struct RequirementService<S, B, D> {
    store: Arc<S>,
    blobs: Arc<B>,
    scanner: ExpirationScanner<D>,
    cache: Mutex<RequirementCache>,
    generate_reference: ReferenceGenerator,
}

impl<S, B, D> RequirementService<S, B, D>
where
    S: RequirementStore + 'static,
    B: BlobStore + 'static,
    D: NotificationDispatcher + 'static,
{
    pub fn new(store: Arc<S>, blobs: Arc<B>, scanner: ExpirationScanner<D>) -> Self {
        Self {
            store,
            blobs,
            scanner,
            cache: Mutex::new(RequirementCache::default()),
            generate_reference: Box::new(reference::generate),
        }
    }

    pub fn with_reference_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&str) -> DocumentReference + Send + Sync + 'static,
    {
        self.generate_reference = Box::new(generator);
        self
    }

    pub fn scanner(&self) -> &ExpirationScanner<D> {
        &self.scanner
    }

    fn cache(&self) -> MutexGuard<'_, RequirementCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issues a fresh, currently unused reference for the form to display.
    pub fn issue_reference(
        &self,
        department: &str,
    ) -> Result<DocumentReference, RequirementServiceError> {
        let mut errors = ValidationErrors::new();
        errors.check("department", validate_name(department.trim(), "Department"));
        errors.into_result()?;

        self.unused_reference(department.trim())
    }

    /// Uploads evidence under `<reference>.<ext>` and returns its public URL.
    pub fn upload_evidence(
        &self,
        reference: &DocumentReference,
        file: EvidenceFile,
    ) -> Result<String, RequirementServiceError> {
        let original_name = file.file_name.clone();
        let renamed = rename_for(reference, file)?;
        let stored_name = renamed.file_name.clone();
        let url = self.blobs.upload(renamed)?;
        info!(%reference, original = %original_name, stored = %stored_name, %url, "evidence uploaded");
        Ok(url)
    }

    /// Validates and persists a requirement.
    pub fn submit(&self, draft: RequirementDraft) -> Result<Requirement, RequirementServiceError> {
        self.submit_inner(draft, None)
    }

    /// Validates, uploads the evidence, then persists the requirement with the
    /// uploaded file's URL.
    pub fn submit_with_evidence(
        &self,
        draft: RequirementDraft,
        evidence: EvidenceFile,
    ) -> Result<Requirement, RequirementServiceError> {
        self.submit_inner(draft, Some(evidence))
    }

    fn submit_inner(
        &self,
        draft: RequirementDraft,
        evidence: Option<EvidenceFile>,
    ) -> Result<Requirement, RequirementServiceError> {
        let mut validated: ValidatedDraft = draft.validate()?;

        let reference = match validated.document_reference.take() {
            Some(supplied) => {
                if !self.store.find_by_reference(&supplied)?.is_empty() {
                    return Err(RequirementServiceError::ReferenceInUse(supplied));
                }
                supplied
            }
            None => self.unused_reference(&validated.department)?,
        };

        if let Some(file) = evidence {
            let url = self.upload_evidence(&reference, file)?;
            validated.uploaded_file_url = Some(url);
        }

        let stored = self.store.insert(validated.into_new(reference))?;
        info!(
            requirement_id = %stored.id,
            reference = %stored.document_reference,
            "requirement saved"
        );
        self.cache().insert(stored.clone());
        Ok(stored)
    }

    fn unused_reference(
        &self,
        department: &str,
    ) -> Result<DocumentReference, RequirementServiceError> {
        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let candidate = (self.generate_reference)(department);
            if self.store.find_by_reference(&candidate)?.is_empty() {
                return Ok(candidate);
            }
            warn!(reference = %candidate, "generated document reference collided; retrying");
        }
        Err(RequirementServiceError::ReferenceExhausted(
            MAX_REFERENCE_ATTEMPTS,
        ))
    }

    /// Replaces the cached record set with the store's current contents.
    pub fn refresh(&self) -> Result<usize, RequirementServiceError> {
        let records = self.store.all()?;
        let count = records.len();
        self.cache().replace(records);
        Ok(count)
    }

    /// Refreshes the cache and runs an expiration pass over it.
    pub fn refresh_and_scan(
        &self,
        now: NaiveDateTime,
    ) -> Result<ScanReport, RequirementServiceError> {
        self.refresh()?;
        let records = self.list();
        let report = self.scanner.scan(&records, now);
        info!(
            evaluated = report.evaluated,
            dispatched = report.dispatched.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            suppressed = report.suppressed.len(),
            policy = ?self.scanner.policy(),
            "expiration scan complete"
        );
        Ok(report)
    }

    /// Cached requirements ordered by id.
    pub fn list(&self) -> Vec<Requirement> {
        self.cache().iter().cloned().collect()
    }

    pub fn export_csv<W: Write>(&self, writer: W) -> Result<(), RequirementServiceError> {
        let records = self.list();
        write_csv(writer, &records)?;
        Ok(())
    }
}

/// Error raised by the requirement service.
#[derive(Debug, thiserror::Error)]
pub enum RequirementServiceError {
    #[error("requirement rejected: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("document reference {0} is already in use")]
    ReferenceInUse(DocumentReference),
    #[error("no unused document reference after {0} attempts")]
    ReferenceExhausted(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl RequirementServiceError {
    pub fn notice(&self) -> Notice {
        match self {
            RequirementServiceError::Validation(_) => {
                Notice::error("Please correct the highlighted fields.")
            }
            RequirementServiceError::ReferenceInUse(reference) => Notice::error(format!(
                "Document reference {reference} is already in use."
            )),
            RequirementServiceError::ReferenceExhausted(_) => {
                Notice::error("Could not allocate a document reference. Please try again.")
            }
            RequirementServiceError::Upload(UploadError::Storage(_)) => {
                Notice::error("Failed to upload files. Please try again.")
            }
            RequirementServiceError::Upload(err) => Notice::error(err.to_string()),
            RequirementServiceError::Store(_) => Notice::error("Error saving requirement."),
            RequirementServiceError::Report(_) => Notice::error("Failed to generate report."),
        }
    }
}
