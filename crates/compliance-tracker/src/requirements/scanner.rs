//! Expiration scan: decides which requirements are close enough to lapsing to
//! notify their person in charge.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::{debug, error, info};

use super::domain::{PersonInCharge, Requirement, RequirementId};
use super::repository::NotificationLedger;
use crate::notifications::{NotificationDispatcher, NotificationRequest};

pub const DEFAULT_WINDOW_DAYS: i64 = 7;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Whole days from `now` until the start of `expiration`, rounded up.
pub fn days_until(expiration: NaiveDate, now: NaiveDateTime) -> i64 {
    let expires_at = expiration.and_time(NaiveTime::MIN);
    let millis = (expires_at - now).num_milliseconds();
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Every evaluation pass notifies every qualifying record again.
    EveryPass,
    /// A record is notified once per expiration date.
    OncePerExpiration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingRecipient,
    NonStringRecipient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub id: RequirementId,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDispatch {
    pub id: RequirementId,
    pub error: String,
}

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub evaluated: usize,
    pub dispatched: Vec<RequirementId>,
    pub skipped: Vec<SkippedRecord>,
    pub failed: Vec<FailedDispatch>,
    pub suppressed: Vec<RequirementId>,
}

impl ScanReport {
    pub fn qualifying(&self) -> usize {
        self.dispatched.len() + self.skipped.len() + self.failed.len() + self.suppressed.len()
    }
}

pub struct ExpirationScanner<D> {
    dispatcher: Arc<D>,
    window_days: i64,
    ledger: Option<Arc<dyn NotificationLedger>>,
}

impl<D> ExpirationScanner<D>
where
    D: NotificationDispatcher,
{
    pub fn new(dispatcher: Arc<D>) -> Self {
        Self {
            dispatcher,
            window_days: DEFAULT_WINDOW_DAYS,
            ledger: None,
        }
    }

    /// Negative windows are treated as zero: only same-day expirations qualify.
    pub fn with_window_days(mut self, window_days: i64) -> Self {
        self.window_days = window_days.max(0);
        self
    }

    /// Switches to [`NotifyPolicy::OncePerExpiration`], backed by `ledger`.
    pub fn with_ledger(mut self, ledger: Arc<dyn NotificationLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    pub fn policy(&self) -> NotifyPolicy {
        if self.ledger.is_some() {
            NotifyPolicy::OncePerExpiration
        } else {
            NotifyPolicy::EveryPass
        }
    }

    /// Days until expiration when the record falls inside the window.
    pub fn qualifies(&self, expiration: NaiveDate, now: NaiveDateTime) -> Option<i64> {
        let days = days_until(expiration, now);
        (0..=self.window_days).contains(&days).then_some(days)
    }

    /// Evaluates every record independently. Dispatch failures are logged and
    /// recorded in the report; they never stop the pass.
    pub fn scan<'a, I>(&self, records: I, now: NaiveDateTime) -> ScanReport
    where
        I: IntoIterator<Item = &'a Requirement>,
    {
        let mut report = ScanReport::default();

        for record in records {
            report.evaluated += 1;

            let Some(days) = self.qualifies(record.expiration, now) else {
                continue;
            };

            let recipient = match record.person_in_charge.as_ref() {
                Some(person) => match person.address() {
                    Some(address) => address,
                    None => {
                        let reason = match person {
                            PersonInCharge::Address(_) => SkipReason::MissingRecipient,
                            PersonInCharge::Other(_) => SkipReason::NonStringRecipient,
                        };
                        self.skip(&mut report, record, reason);
                        continue;
                    }
                },
                None => {
                    self.skip(&mut report, record, SkipReason::MissingRecipient);
                    continue;
                }
            };

            if let Some(ledger) = &self.ledger {
                if ledger.already_notified(&record.id, record.expiration) {
                    debug!(requirement_id = %record.id, "expiration already notified");
                    report.suppressed.push(record.id.clone());
                    continue;
                }
            }

            let request = NotificationRequest {
                recipient: recipient.to_string(),
                compliance_name: record.compliance_list.clone(),
                expiration_date: record.expiration,
            };

            match self.dispatcher.dispatch(&request) {
                Ok(receipt) => {
                    info!(
                        requirement_id = %record.id,
                        recipient = %request.recipient,
                        days_until_expiration = days,
                        status = receipt.status,
                        "expiration notice dispatched"
                    );
                    if let Some(ledger) = &self.ledger {
                        ledger.record(&record.id, record.expiration);
                    }
                    report.dispatched.push(record.id.clone());
                }
                Err(err) => {
                    error!(
                        requirement_id = %record.id,
                        recipient = %request.recipient,
                        error = %err,
                        "failed to send expiration notice"
                    );
                    report.failed.push(FailedDispatch {
                        id: record.id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        report
    }

    fn skip(&self, report: &mut ScanReport, record: &Requirement, reason: SkipReason) {
        error!(
            requirement_id = %record.id,
            compliance = %record.compliance_list,
            ?reason,
            "person in charge is missing or not a string; notification skipped"
        );
        report.skipped.push(SkippedRecord {
            id: record.id.clone(),
            reason,
        });
    }
}
