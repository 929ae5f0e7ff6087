//! Transport factory

use std::sync::Arc;

use crate::config::TransportConfig;

use super::sink::SinkTransport;
use super::smtp::SmtpTransport;
use super::{Transport, TransportError};

/// Create a transport based on configuration.
///
/// Resolved once at startup; the returned instance is shared by every
/// dispatch. Backends:
/// - `"smtp"`: lettre-based SMTP delivery
/// - `"sink"` (default): accepts everything, for development
pub fn create_transport(settings: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
    match settings.backend.as_str() {
        "smtp" => {
            tracing::info!(
                backend = "smtp",
                host = %settings.smtp.host,
                port = settings.smtp.port,
                "Creating SMTP transport"
            );
            Ok(Arc::new(SmtpTransport::new(&settings.smtp)?))
        }
        "sink" => {
            tracing::info!(backend = "sink", "Creating sink transport");
            Ok(Arc::new(SinkTransport::new()))
        }
        other => {
            tracing::warn!(
                backend = %other,
                "Unknown transport backend, falling back to sink"
            );
            Ok(Arc::new(SinkTransport::new()))
        }
    }
}
