//! Dispatch pipeline types and error definitions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attachment::AttachmentError;
use crate::template::TemplateError;

/// Errors that reject a dispatch before anything is attempted.
/// None of these produce a log row.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Render error: {0}")]
    Render(#[from] TemplateError),

    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    /// Pipeline deadline expired before the first send attempt; nothing
    /// reached the transport so there is no outcome to report
    #[error("Pipeline deadline expired before any send attempt")]
    DeadlineExpired,
}

/// Ordered recipient lists for one message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recipients {
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
}

impl Recipients {
    /// Convenience constructor for to-only recipient lists.
    pub fn to<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            to: addresses.into_iter().map(Into::into).collect(),
            cc: Vec::new(),
            bcc: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.to.is_empty() {
            return Err(DispatchError::Validation(
                "Recipient list 'to' must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Final status of one dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Transport accepted the message
    Sent,
    /// All attempts exhausted or a permanent failure occurred
    Failed,
    /// Caller cancelled before the transport accepted the message
    Cancelled,
    /// Send was attempted but the outcome log could not be written;
    /// deliberately distinct so aggregate counts are never guesses
    Unconfirmed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Cancelled => "cancelled",
            DeliveryStatus::Unconfirmed => "unconfirmed",
        }
    }
}

/// Result of one dispatch call.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of transport attempts actually made
    pub attempts: u32,
}

/// One dispatch request.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Logical reason for the send, e.g. "password-reset"
    pub trigger: String,
    pub template_id: String,
    pub variables: serde_json::Map<String, serde_json::Value>,
    pub recipients: Recipients,
    /// Bypass the template's own attachments when set
    pub attachments_override: Option<Vec<crate::attachment::ResolvedAttachment>>,
    /// Layout override passed through to the composer
    pub layout_override: Option<String>,
}

impl DispatchRequest {
    pub fn new(
        trigger: impl Into<String>,
        template_id: impl Into<String>,
        variables: serde_json::Map<String, serde_json::Value>,
        recipients: Recipients,
    ) -> Self {
        Self {
            trigger: trigger.into(),
            template_id: template_id.into(),
            variables,
            recipients,
            attachments_override: None,
            layout_override: None,
        }
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.trigger.is_empty() {
            return Err(DispatchError::Validation(
                "Trigger must not be empty".to_string(),
            ));
        }
        self.recipients.validate()
    }
}

/// Cooperative cancellation for an in-flight dispatch.
///
/// Cancelling only takes effect between attempts: once the transport has
/// accepted a send, cancellation cannot un-send it.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
