//! Development transport that accepts every message without sending it.

use async_trait::async_trait;

use crate::attachment::ResolvedAttachment;
use crate::dispatch::Recipients;
use crate::template::RenderedMessage;

use super::{Transport, TransportError};

/// Accepts and logs every message. Stands in for a real provider in
/// development and tests.
#[derive(Debug, Default)]
pub struct SinkTransport;

impl SinkTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for SinkTransport {
    async fn send(
        &self,
        message: &RenderedMessage,
        attachments: &[ResolvedAttachment],
        recipients: &Recipients,
    ) -> Result<(), TransportError> {
        tracing::info!(
            subject = %message.subject,
            to = ?recipients.to,
            cc_count = recipients.cc.len(),
            bcc_count = recipients.bcc.len(),
            attachment_count = attachments.len(),
            "Sink transport accepted message"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sink"
    }
}
