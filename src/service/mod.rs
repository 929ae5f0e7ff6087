//! The `Mailroom` facade: wires the composer, attachment resolver,
//! dispatcher, log store and aggregation engine together and exposes
//! the dispatch and dashboard query interfaces.

use std::sync::Arc;

use chrono::Duration;

use crate::analytics::{
    AggregationEngine, AnalyticsError, OverviewStats, SeriesPoint, TimeWindow, TriggerCount,
};
use crate::attachment::{AttachmentResolver, BlobStore, MemoryBlobStore, ResolvedAttachment};
use crate::config::Settings;
use crate::dispatch::{
    CancelHandle, DeliveryOutcome, Dispatcher, DispatchError, DispatchRequest, Recipients,
};
use crate::logs::{
    create_log_store, LogEntry, LogFilter, LogStoreBackend, LogStoreError, Pagination,
};
use crate::template::{Composer, TemplateStore};
use crate::transport::{create_transport, Transport, TransportError};

/// The mail dispatch core.
///
/// One instance is shared across callers; dispatch calls run
/// concurrently and independently, and aggregation queries never pause
/// dispatching.
pub struct Mailroom {
    templates: Arc<TemplateStore>,
    blobs: Arc<dyn BlobStore>,
    logs: Arc<dyn LogStoreBackend>,
    dispatcher: Dispatcher,
    analytics: AggregationEngine,
}

impl Mailroom {
    /// Build a Mailroom with explicit transport and log store, for
    /// callers that construct those themselves (tests, embedders).
    pub fn new(
        settings: &Settings,
        transport: Arc<dyn Transport>,
        logs: Arc<dyn LogStoreBackend>,
    ) -> Self {
        let templates = Arc::new(TemplateStore::new());
        let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());

        let composer = Composer::new(templates.clone(), &settings.render);
        let resolver = AttachmentResolver::new(templates.clone(), blobs.clone());
        let dispatcher = Dispatcher::new(
            composer,
            resolver,
            transport,
            logs.clone(),
            settings.dispatch.clone(),
        );
        let analytics = AggregationEngine::new(logs.clone());

        Self {
            templates,
            blobs,
            logs,
            dispatcher,
            analytics,
        }
    }

    /// Build a Mailroom entirely from settings, with both the transport
    /// and the log store resolved by their factories. Without a pool a
    /// `postgres` log store setting falls back to memory with a warning.
    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        Self::from_settings_with_pool(settings, None)
    }

    /// Build a Mailroom from settings and an optional PostgreSQL pool
    /// for the log store.
    pub fn from_settings_with_pool(
        settings: &Settings,
        pool: Option<sqlx::PgPool>,
    ) -> Result<Self, TransportError> {
        let transport = create_transport(&settings.transport)?;
        let logs = create_log_store(&settings.log_store, pool);
        Ok(Self::new(settings, transport, logs))
    }

    /// Template and layout storage, for operator tooling.
    pub fn templates(&self) -> &Arc<TemplateStore> {
        &self.templates
    }

    /// Attachment blob storage, for operator tooling.
    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    // ------------------------------------------------------------------
    // Dispatch entry points
    // ------------------------------------------------------------------

    /// Compose and send one message, recording its outcome.
    pub async fn dispatch(
        &self,
        trigger: impl Into<String>,
        template_id: impl Into<String>,
        variables: serde_json::Map<String, serde_json::Value>,
        recipients: Recipients,
        attachments_override: Option<Vec<ResolvedAttachment>>,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let mut request = DispatchRequest::new(trigger, template_id, variables, recipients);
        request.attachments_override = attachments_override;
        self.dispatcher.dispatch(request).await
    }

    /// Dispatch with a prepared request and cooperative cancellation.
    pub async fn dispatch_with_cancel(
        &self,
        request: DispatchRequest,
        cancel: &CancelHandle,
    ) -> Result<DeliveryOutcome, DispatchError> {
        self.dispatcher.dispatch_with_cancel(request, cancel).await
    }

    // ------------------------------------------------------------------
    // Dashboard queries
    // ------------------------------------------------------------------

    pub async fn overview_stats(&self, window: TimeWindow) -> Result<OverviewStats, AnalyticsError> {
        self.analytics.overview_stats(window).await
    }

    pub async fn failure_series(
        &self,
        window: TimeWindow,
        bucket_size: Duration,
    ) -> Result<Vec<SeriesPoint>, AnalyticsError> {
        self.analytics.failure_series(window, bucket_size).await
    }

    pub async fn top_triggers(
        &self,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<TriggerCount>, AnalyticsError> {
        self.analytics.top_triggers(window, limit).await
    }

    /// Raw log access for audit tooling.
    pub async fn query_logs(
        &self,
        filter: &LogFilter,
        pagination: &Pagination,
    ) -> Result<Vec<LogEntry>, LogStoreError> {
        self.logs.query(filter, pagination).await
    }
}
