//! The delivery dispatcher: renders, resolves, sends with retry and
//! records exactly one outcome log row per dispatch that reached the
//! transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::attachment::{AttachmentResolver, ResolvedAttachment};
use crate::logs::{LogStatus, LogStoreBackend, NewLogEntry};
use crate::metrics::{DispatchMetrics, LOG_APPEND_FAILURES_TOTAL};
use crate::template::{Composer, RenderedMessage};
use crate::transport::Transport;

use super::backoff::RetryPolicy;
use super::types::{
    CancelHandle, DeliveryOutcome, DeliveryStatus, DispatchError, DispatchRequest, Recipients,
};
use crate::config::DispatchConfig;

/// Outcome of the retry loop, before logging.
struct SendResult {
    status: DeliveryStatus,
    error_message: Option<String>,
    attempts: u32,
}

/// Dispatches one rendered message per call.
///
/// Dispatches are independent: the only shared state between concurrent
/// calls is the log store and the transport, both of which are
/// thread-safe. There is no global lock spanning dispatches.
pub struct Dispatcher {
    composer: Composer,
    resolver: AttachmentResolver,
    transport: Arc<dyn Transport>,
    logs: Arc<dyn LogStoreBackend>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        composer: Composer,
        resolver: AttachmentResolver,
        transport: Arc<dyn Transport>,
        logs: Arc<dyn LogStoreBackend>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            composer,
            resolver,
            transport,
            logs,
            config,
        }
    }

    /// Dispatch a message, returning the delivery outcome.
    ///
    /// Validation and render failures reject the call with an error and
    /// write no log row; everything that reached the transport produces
    /// exactly one row.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DeliveryOutcome, DispatchError> {
        self.dispatch_with_cancel(request, &CancelHandle::new())
            .await
    }

    /// Dispatch with cooperative cancellation.
    ///
    /// Cancellation is honored between attempts only; once the transport
    /// has accepted the message the outcome reflects the actual result.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, request, cancel),
        fields(trigger = %request.trigger, template_id = %request.template_id)
    )]
    pub async fn dispatch_with_cancel(
        &self,
        mut request: DispatchRequest,
        cancel: &CancelHandle,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let started = Instant::now();

        request.validate()?;

        let rendered = self.composer.compose(
            &request.template_id,
            &request.variables,
            request.layout_override.as_deref(),
        )?;

        let attachments = match request.attachments_override.take() {
            Some(attachments) => attachments,
            None => self.resolver.resolve(&request.template_id).await?,
        };

        let result = self
            .send_with_retry(&rendered, &attachments, &request.recipients, cancel)
            .await?;

        let outcome = self
            .record_outcome(&request, &rendered, result)
            .await;

        DispatchMetrics::record_outcome(outcome.status.as_str());
        DispatchMetrics::record_duration(started.elapsed().as_secs_f64());

        tracing::debug!(
            status = outcome.status.as_str(),
            attempts = outcome.attempts,
            "Dispatch completed"
        );

        Ok(outcome)
    }

    /// Retry loop: transient errors back off and retry up to
    /// `max_attempts`; permanent errors stop immediately; the pipeline
    /// deadline bounds the whole loop. A deadline that expires before the
    /// first attempt rejects the dispatch instead of producing an outcome
    /// for a send that never happened.
    async fn send_with_retry(
        &self,
        rendered: &RenderedMessage,
        attachments: &[ResolvedAttachment],
        recipients: &Recipients,
        cancel: &CancelHandle,
    ) -> Result<SendResult, DispatchError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.pipeline_timeout_seconds);
        let attempt_timeout = Duration::from_secs(self.config.attempt_timeout_seconds);
        let policy = RetryPolicy::new(&self.config.backoff);

        let mut attempts = 0u32;
        let mut last_error: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                return Ok(SendResult {
                    status: DeliveryStatus::Cancelled,
                    error_message: last_error,
                    attempts,
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                if attempts == 0 {
                    return Err(DispatchError::DeadlineExpired);
                }
                return Ok(SendResult {
                    status: DeliveryStatus::Failed,
                    error_message: Some(match last_error {
                        Some(e) => format!("Pipeline deadline exceeded; last error: {}", e),
                        None => "Pipeline deadline exceeded".to_string(),
                    }),
                    attempts,
                });
            }

            attempts += 1;
            let this_timeout = attempt_timeout.min(remaining);

            let send = self.transport.send(rendered, attachments, recipients);
            match tokio::time::timeout(this_timeout, send).await {
                Ok(Ok(())) => {
                    return Ok(SendResult {
                        status: DeliveryStatus::Sent,
                        error_message: None,
                        attempts,
                    });
                }
                Ok(Err(e)) if e.is_transient() => {
                    tracing::warn!(attempt = attempts, error = %e, "Transient transport failure");
                    last_error = Some(e.to_string());
                }
                Ok(Err(e)) => {
                    tracing::warn!(attempt = attempts, error = %e, "Permanent transport failure");
                    return Ok(SendResult {
                        status: DeliveryStatus::Failed,
                        error_message: Some(e.to_string()),
                        attempts,
                    });
                }
                Err(_) => {
                    tracing::warn!(
                        attempt = attempts,
                        timeout_ms = this_timeout.as_millis() as u64,
                        "Transport attempt timed out"
                    );
                    last_error = Some(format!(
                        "Attempt timed out after {}ms",
                        this_timeout.as_millis()
                    ));
                }
            }

            if attempts >= self.config.max_attempts {
                return Ok(SendResult {
                    status: DeliveryStatus::Failed,
                    error_message: last_error,
                    attempts,
                });
            }

            DispatchMetrics::record_retry();
            let delay = policy
                .delay_for(attempts)
                .min(deadline.saturating_duration_since(Instant::now()));
            tokio::time::sleep(delay).await;
        }
    }

    /// Write the outcome log row and build the returned outcome.
    ///
    /// A dispatch cancelled before its first attempt never reached the
    /// transport, so it writes no row. A log append failure after an
    /// attempted send downgrades the outcome to `Unconfirmed` instead of
    /// guessing either way.
    async fn record_outcome(
        &self,
        request: &DispatchRequest,
        rendered: &RenderedMessage,
        result: SendResult,
    ) -> DeliveryOutcome {
        if result.attempts == 0 {
            return DeliveryOutcome {
                status: result.status,
                error_message: result.error_message,
                attempts: 0,
            };
        }

        let (log_status, log_error) = match result.status {
            DeliveryStatus::Sent => (LogStatus::Sent, None),
            DeliveryStatus::Failed => (
                LogStatus::Failed,
                Some(
                    result
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "Delivery failed".to_string()),
                ),
            ),
            DeliveryStatus::Cancelled => (
                LogStatus::Failed,
                Some(match &result.error_message {
                    Some(e) => format!("Cancelled after {} attempts; last error: {}", result.attempts, e),
                    None => format!("Cancelled after {} attempts", result.attempts),
                }),
            ),
            // record_outcome is the only place that produces Unconfirmed
            DeliveryStatus::Unconfirmed => unreachable!("unconfirmed is assigned below"),
        };

        let entry = NewLogEntry {
            trigger: request.trigger.clone(),
            template_id: request.template_id.clone(),
            subject: rendered.subject.clone(),
            to: request.recipients.to.clone(),
            cc: request.recipients.cc.clone(),
            bcc: request.recipients.bcc.clone(),
            status: log_status,
            error_message: log_error,
            attempts: result.attempts,
        };

        match self.logs.append(entry).await {
            Ok(log_id) => {
                tracing::trace!(log_id = %log_id, "Outcome log row written");
                DeliveryOutcome {
                    status: result.status,
                    error_message: result.error_message,
                    attempts: result.attempts,
                }
            }
            Err(e) => {
                LOG_APPEND_FAILURES_TOTAL.inc();
                tracing::error!(
                    error = %e,
                    trigger = %request.trigger,
                    "Failed to append outcome log row; reporting unconfirmed"
                );
                DeliveryOutcome {
                    status: DeliveryStatus::Unconfirmed,
                    error_message: Some(format!("Outcome log unavailable: {}", e)),
                    attempts: result.attempts,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{AttachmentResolver, MemoryBlobStore};
    use crate::config::{BackoffSettings, RenderConfig};
    use crate::logs::{LogFilter, MemoryLogStore, Pagination};
    use crate::template::{NewTemplate, Template, TemplateStore};
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Transport that plays back a scripted sequence of results, then
    /// succeeds.
    struct ScriptedTransport {
        script: Mutex<Vec<Result<(), TransportError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<(), TransportError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            _message: &RenderedMessage,
            _attachments: &[ResolvedAttachment],
            _recipients: &Recipients,
        ) -> Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok(())
            } else {
                script.remove(0)
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn test_config() -> DispatchConfig {
        DispatchConfig {
            max_attempts: 3,
            attempt_timeout_seconds: 5,
            pipeline_timeout_seconds: 30,
            backoff: BackoffSettings {
                initial_delay_ms: 1,
                max_delay_ms: 5,
                multiplier: 2.0,
                jitter_factor: 0.0,
            },
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        transport: Arc<ScriptedTransport>,
        logs: Arc<MemoryLogStore>,
    }

    fn harness(script: Vec<Result<(), TransportError>>) -> Harness {
        let store = Arc::new(TemplateStore::new());
        store
            .create_template(Template::from(NewTemplate {
                id: "welcome".to_string(),
                name: "Welcome".to_string(),
                layout_id: None,
                subject: "Hi {{name}}".to_string(),
                html: "<p>Hello {{name}}</p>".to_string(),
                text: None,
                variables: vec!["name".to_string()],
            }))
            .unwrap();

        let transport = Arc::new(ScriptedTransport::new(script));
        let logs = Arc::new(MemoryLogStore::new());
        let composer = Composer::new(
            store.clone(),
            &RenderConfig {
                strict_variables: true,
            },
        );
        let resolver = AttachmentResolver::new(store, Arc::new(MemoryBlobStore::new()));
        let dispatcher = Dispatcher::new(
            composer,
            resolver,
            transport.clone(),
            logs.clone(),
            test_config(),
        );

        Harness {
            dispatcher,
            transport,
            logs,
        }
    }

    fn welcome_request() -> DispatchRequest {
        let variables = match json!({"name": "Ada"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        DispatchRequest::new(
            "welcome",
            "welcome",
            variables,
            Recipients::to(["ada@example.com"]),
        )
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let h = harness(vec![]);
        let outcome = h.dispatcher.dispatch(welcome_request()).await.unwrap();

        assert_eq!(outcome.status, DeliveryStatus::Sent);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.error_message.is_none());
        assert_eq!(h.logs.len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_then_success() {
        let h = harness(vec![
            Err(TransportError::Transient("421 busy".to_string())),
            Err(TransportError::Transient("421 busy".to_string())),
        ]);
        let outcome = h.dispatcher.dispatch(welcome_request()).await.unwrap();

        assert_eq!(outcome.status, DeliveryStatus::Sent);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(h.transport.calls(), 3);

        let rows = h
            .logs
            .query(&LogFilter::default(), &Pagination::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, LogStatus::Sent);
        assert_eq!(rows[0].attempts, 3);
    }

    #[tokio::test]
    async fn test_transient_exhaustion_fails() {
        let h = harness(vec![
            Err(TransportError::Transient("timeout".to_string())),
            Err(TransportError::Transient("timeout".to_string())),
            Err(TransportError::Transient("timeout".to_string())),
        ]);
        let outcome = h.dispatcher.dispatch(welcome_request()).await.unwrap();

        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.error_message.is_some());

        let rows = h
            .logs
            .query(&LogFilter::default(), &Pagination::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, LogStatus::Failed);
    }

    #[tokio::test]
    async fn test_permanent_failure_no_retry() {
        let h = harness(vec![Err(TransportError::Permanent(
            "550 mailbox unavailable".to_string(),
        ))]);
        let outcome = h.dispatcher.dispatch(welcome_request()).await.unwrap();

        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(h.transport.calls(), 1);
        assert_eq!(h.logs.len(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_writes_no_log() {
        let h = harness(vec![]);
        let mut request = welcome_request();
        request.recipients = Recipients::default();

        let result = h.dispatcher.dispatch(request).await;
        assert!(matches!(result, Err(DispatchError::Validation(_))));
        assert!(h.logs.is_empty());
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_render_failure_writes_no_log() {
        let h = harness(vec![]);
        let mut request = welcome_request();
        request.variables.clear();

        let result = h.dispatcher.dispatch(request).await;
        assert!(matches!(result, Err(DispatchError::Render(_))));
        assert!(h.logs.is_empty());
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_first_attempt() {
        let h = harness(vec![]);
        let cancel = CancelHandle::new();
        cancel.cancel();

        let outcome = h
            .dispatcher
            .dispatch_with_cancel(welcome_request(), &cancel)
            .await
            .unwrap();

        assert_eq!(outcome.status, DeliveryStatus::Cancelled);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(h.transport.calls(), 0);
        assert!(h.logs.is_empty());
    }

    #[tokio::test]
    async fn test_zero_pipeline_deadline_rejects_without_attempting() {
        let store = Arc::new(TemplateStore::new());
        store
            .create_template(Template::from(NewTemplate {
                id: "welcome".to_string(),
                name: "Welcome".to_string(),
                layout_id: None,
                subject: "Hi {{name}}".to_string(),
                html: "<p>Hello {{name}}</p>".to_string(),
                text: None,
                variables: vec!["name".to_string()],
            }))
            .unwrap();

        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let logs = Arc::new(MemoryLogStore::new());
        let dispatcher = Dispatcher::new(
            Composer::new(
                store.clone(),
                &RenderConfig {
                    strict_variables: true,
                },
            ),
            AttachmentResolver::new(store, Arc::new(MemoryBlobStore::new())),
            transport.clone(),
            logs.clone(),
            DispatchConfig {
                pipeline_timeout_seconds: 0,
                ..test_config()
            },
        );

        let result = dispatcher.dispatch(welcome_request()).await;
        assert!(matches!(result, Err(DispatchError::DeadlineExpired)));
        assert_eq!(transport.calls(), 0);
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn test_log_row_subject_is_snapshot() {
        let h = harness(vec![]);
        h.dispatcher.dispatch(welcome_request()).await.unwrap();

        let rows = h
            .logs
            .query(&LogFilter::default(), &Pagination::default())
            .await
            .unwrap();
        assert_eq!(rows[0].subject, "Hi Ada");
        assert_eq!(rows[0].trigger, "welcome");
        assert_eq!(rows[0].to, vec!["ada@example.com"]);
    }
}
