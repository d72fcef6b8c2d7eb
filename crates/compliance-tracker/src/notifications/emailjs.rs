use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use super::{DeliveryReceipt, DispatchError, NotificationDispatcher, NotificationRequest};
use crate::validation::validate_email;

pub const DEFAULT_EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Identifiers of the hosted email service, template and account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub user_id: String,
    pub endpoint: String,
}

/// JSON body accepted by the EmailJS `send` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailPayload {
    pub service_id: String,
    pub template_id: String,
    pub user_id: String,
    pub template_params: TemplateParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateParams {
    pub to_email: String,
    pub compliance_name: String,
    pub expiration_date: String,
}

pub trait EmailTransport: Send + Sync {
    fn send(&self, endpoint: &str, payload: &EmailPayload) -> Result<DeliveryReceipt, DispatchError>;
}

/// Blocking HTTP transport. The timeout lives here, not in the scanner.
#[derive(Clone)]
pub struct HttpEmailTransport {
    agent: ureq::Agent,
}

impl HttpEmailTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Default for HttpEmailTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl std::fmt::Debug for HttpEmailTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmailTransport").finish_non_exhaustive()
    }
}

impl EmailTransport for HttpEmailTransport {
    fn send(&self, endpoint: &str, payload: &EmailPayload) -> Result<DeliveryReceipt, DispatchError> {
        match self.agent.post(endpoint).send_json(payload) {
            Ok(response) => {
                let status = response.status();
                let detail = response.into_string().unwrap_or_default();
                Ok(DeliveryReceipt { status, detail })
            }
            Err(ureq::Error::Status(status, response)) => Err(DispatchError::Rejected {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(err) => Err(DispatchError::Transport(err.to_string())),
        }
    }
}

/// Sends the expiration template through EmailJS.
pub struct EmailJsDispatcher<T> {
    config: EmailJsConfig,
    transport: Arc<T>,
}

impl<T> EmailJsDispatcher<T>
where
    T: EmailTransport,
{
    pub fn new(config: EmailJsConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    pub fn payload_for(&self, request: &NotificationRequest) -> EmailPayload {
        EmailPayload {
            service_id: self.config.service_id.clone(),
            template_id: self.config.template_id.clone(),
            user_id: self.config.user_id.clone(),
            template_params: TemplateParams {
                to_email: request.recipient.clone(),
                compliance_name: request.compliance_name.clone(),
                expiration_date: request.expiration_date.format("%Y-%m-%d").to_string(),
            },
        }
    }
}

impl<T> NotificationDispatcher for EmailJsDispatcher<T>
where
    T: EmailTransport,
{
    fn dispatch(&self, request: &NotificationRequest) -> Result<DeliveryReceipt, DispatchError> {
        if !validate_email(&request.recipient).is_empty() {
            error!(recipient = %request.recipient, "invalid email address; notice not sent");
            return Err(DispatchError::InvalidRecipient(request.recipient.clone()));
        }

        let payload = self.payload_for(request);
        let receipt = self.transport.send(&self.config.endpoint, &payload)?;
        info!(
            recipient = %request.recipient,
            status = receipt.status,
            "expiration notice sent"
        );
        Ok(receipt)
    }
}
