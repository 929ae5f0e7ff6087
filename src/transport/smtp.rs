//! SMTP transport using lettre.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::attachment::ResolvedAttachment;
use crate::config::SmtpSettings;
use crate::dispatch::Recipients;
use crate::template::RenderedMessage;

use super::{Transport, TransportError};

/// SMTP delivery via a relay or a local development server.
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpTransport {
    pub fn new(settings: &SmtpSettings) -> Result<Self, TransportError> {
        let from: Mailbox = format!("{} <{}>", settings.from_name, settings.from_email)
            .parse()
            .map_err(|e| TransportError::Config(format!("Invalid from address: {}", e)))?;

        let transport = if settings.use_tls {
            let creds = Credentials::new(settings.username.clone(), settings.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| TransportError::Config(format!("Failed to create SMTP relay: {}", e)))?
                .credentials(creds)
                .port(settings.port)
                .build()
        } else if !settings.username.is_empty() {
            let creds = Credentials::new(settings.username.clone(), settings.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .credentials(creds)
                .port(settings.port)
                .build()
        } else {
            // No auth (for Mailpit/Mailhog)
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .port(settings.port)
                .build()
        };

        Ok(Self { transport, from })
    }

    fn build_message(
        &self,
        message: &RenderedMessage,
        attachments: &[ResolvedAttachment],
        recipients: &Recipients,
    ) -> Result<Message, TransportError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(&message.subject);

        for to in &recipients.to {
            builder = builder.to(parse_mailbox(to)?);
        }
        for cc in &recipients.cc {
            builder = builder.cc(parse_mailbox(cc)?);
        }
        for bcc in &recipients.bcc {
            builder = builder.bcc(parse_mailbox(bcc)?);
        }

        let body = match &message.text {
            Some(text) => MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(message.html.clone()),
                ),
            None => MultiPart::alternative().singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(message.html.clone()),
            ),
        };

        let built = if attachments.is_empty() {
            builder.multipart(body)
        } else {
            let mut mixed = MultiPart::mixed().multipart(body);
            for attachment in attachments {
                let content_type = ContentType::parse(&attachment.mime_type).map_err(|e| {
                    TransportError::Permanent(format!(
                        "Invalid MIME type '{}': {}",
                        attachment.mime_type, e
                    ))
                })?;
                mixed = mixed.singlepart(
                    Attachment::new(attachment.filename.clone())
                        .body(attachment.bytes.clone(), content_type),
                );
            }
            builder.multipart(mixed)
        };

        built.map_err(|e| TransportError::Permanent(format!("Failed to build message: {}", e)))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .parse()
        .map_err(|e| TransportError::Permanent(format!("Invalid address '{}': {}", address, e)))
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(
        &self,
        message: &RenderedMessage,
        attachments: &[ResolvedAttachment],
        recipients: &Recipients,
    ) -> Result<(), TransportError> {
        let email = self.build_message(message, attachments, recipients)?;

        match self.transport.send(email).await {
            Ok(response) => {
                tracing::debug!(
                    code = %response.code(),
                    to = ?recipients.to,
                    "SMTP server accepted message"
                );
                Ok(())
            }
            Err(e) if e.is_permanent() => Err(TransportError::Permanent(e.to_string())),
            // Connection trouble, timeouts and 4xx responses are retryable
            Err(e) => Err(TransportError::Transient(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_settings() -> SmtpSettings {
        SmtpSettings {
            host: "localhost".to_string(),
            port: 1025,
            username: String::new(),
            password: String::new(),
            from_email: "noreply@example.com".to_string(),
            from_name: "Mailroom".to_string(),
            use_tls: false,
        }
    }

    #[test]
    fn test_build_message_with_attachment() {
        let transport = SmtpTransport::new(&local_settings()).unwrap();
        let message = RenderedMessage {
            subject: "Invoice".to_string(),
            html: "<p>See attached</p>".to_string(),
            text: Some("See attached".to_string()),
        };
        let attachments = vec![ResolvedAttachment {
            filename: "invoice.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.7".to_vec(),
        }];
        let recipients = Recipients::to(["ada@example.com"]);

        assert!(transport
            .build_message(&message, &attachments, &recipients)
            .is_ok());
    }

    #[test]
    fn test_malformed_address_is_permanent() {
        let transport = SmtpTransport::new(&local_settings()).unwrap();
        let message = RenderedMessage {
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
            text: None,
        };
        let recipients = Recipients::to(["not an address"]);

        let result = transport.build_message(&message, &[], &recipients);
        assert!(matches!(result, Err(TransportError::Permanent(_))));
    }
}
