//! Outbound expiration notices.
//!
//! The scanner hands each qualifying requirement to a [`NotificationDispatcher`]
//! and only logs the outcome; delivery retries, if any, belong to the adapter.

pub mod emailjs;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

pub use emailjs::{EmailJsConfig, EmailJsDispatcher, EmailPayload, EmailTransport, HttpEmailTransport};

/// Who to notify about which requirement, and when it lapses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    pub recipient: String,
    pub compliance_name: String,
    pub expiration_date: NaiveDate,
}

/// Acknowledgement returned by the delivery backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub status: u16,
    pub detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid recipient address: {0:?}")]
    InvalidRecipient(String),
    #[error("email backend rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("email transport unavailable: {0}")]
    Transport(String),
}

pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, request: &NotificationRequest) -> Result<DeliveryReceipt, DispatchError>;
}

/// Dry-run dispatcher that records each request in the log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

impl NotificationDispatcher for LoggingDispatcher {
    fn dispatch(&self, request: &NotificationRequest) -> Result<DeliveryReceipt, DispatchError> {
        info!(
            recipient = %request.recipient,
            compliance = %request.compliance_name,
            expiration = %request.expiration_date,
            "expiration notice (not sent: email delivery disabled)"
        );
        Ok(DeliveryReceipt {
            status: 0,
            detail: "logged".to_string(),
        })
    }
}
