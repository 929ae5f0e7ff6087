//! Delivery transports.
//!
//! A transport is the capability injected into the dispatcher that
//! actually hands a rendered message to the outside world. The set of
//! supported transports is closed and resolved once at startup by the
//! factory; there is no runtime name-to-type lookup beyond that single
//! match.

mod factory;
mod sink;
mod smtp;

pub use factory::create_transport;
pub use sink::SinkTransport;
pub use smtp::SmtpTransport;

use async_trait::async_trait;
use thiserror::Error;

use crate::attachment::ResolvedAttachment;
use crate::dispatch::Recipients;
use crate::template::RenderedMessage;

/// Transport failure, classified for retry policy.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Worth retrying: connection trouble, timeouts, 4xx responses
    #[error("Transient transport failure: {0}")]
    Transient(String),

    /// Not worth retrying: malformed addresses, 5xx rejections
    #[error("Permanent transport failure: {0}")]
    Permanent(String),

    /// Transport could not be constructed from configuration
    #[error("Transport configuration error: {0}")]
    Config(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

/// Capability for sending one rendered message.
///
/// Implementations must be thread-safe (`Send + Sync`) as dispatches run
/// concurrently and share a single transport instance.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the message to all recipients. A `Transient` error may be
    /// retried by the dispatcher; a `Permanent` one is final.
    async fn send(
        &self,
        message: &RenderedMessage,
        attachments: &[ResolvedAttachment],
        recipients: &Recipients,
    ) -> Result<(), TransportError>;

    /// Short backend identifier, e.g. "smtp".
    fn name(&self) -> &'static str;
}
