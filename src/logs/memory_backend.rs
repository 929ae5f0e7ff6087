//! In-memory outcome log backend using DashMap.
//!
//! Rows are lost on restart; production deployments use the PostgreSQL
//! backend.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::metrics::LOG_APPENDS_TOTAL;

use super::backend::{LogStoreBackend, LogStoreError};
use super::models::{LogEntry, LogFilter, NewLogEntry, Pagination};

struct StoredRow {
    /// Append order, used to break created_at ties deterministically
    seq: u64,
    entry: LogEntry,
}

/// In-memory outcome log backend.
///
/// `DashMap` gives per-shard locking, so concurrent appends never
/// interleave within a row and queries never take a global lock that
/// would block writers. Queries snapshot matching rows, then sort and
/// page outside any lock.
pub struct MemoryLogStore {
    rows: DashMap<Uuid, StoredRow>,
    sequence: AtomicU64,
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Total number of rows, for tests and introspection.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl LogStoreBackend for MemoryLogStore {
    async fn append(&self, entry: NewLogEntry) -> Result<Uuid, LogStoreError> {
        entry.validate().map_err(LogStoreError::InvalidEntry)?;

        let id = Uuid::new_v4();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let row = LogEntry {
            id,
            trigger: entry.trigger,
            template_id: entry.template_id,
            subject: entry.subject,
            to: entry.to,
            cc: entry.cc,
            bcc: entry.bcc,
            status: entry.status,
            error_message: entry.error_message,
            attempts: entry.attempts,
            created_at: Utc::now(),
        };

        self.rows.insert(id, StoredRow { seq, entry: row });
        LOG_APPENDS_TOTAL.inc();

        tracing::trace!(log_id = %id, "Appended outcome log row");
        Ok(id)
    }

    async fn query(
        &self,
        filter: &LogFilter,
        pagination: &Pagination,
    ) -> Result<Vec<LogEntry>, LogStoreError> {
        let mut matched: Vec<(u64, LogEntry)> = self
            .rows
            .iter()
            .filter(|row| filter.matches(&row.entry))
            .map(|row| (row.seq, row.entry.clone()))
            .collect();

        matched.sort_by(|a, b| {
            a.1.created_at
                .cmp(&b.1.created_at)
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(matched
            .into_iter()
            .skip(pagination.offset)
            .take(pagination.limit)
            .map(|(_, entry)| entry)
            .collect())
    }

    async fn count(&self, filter: &LogFilter) -> Result<u64, LogStoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| filter.matches(&row.entry))
            .count() as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
