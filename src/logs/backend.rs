//! Backend trait for outcome log storage.
//!
//! The trait is append-only on purpose: there are no update or delete
//! operations, so historical rows cannot be rewritten through this
//! interface.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::models::{LogEntry, LogFilter, NewLogEntry, Pagination};

/// Errors that can occur during log store operations.
#[derive(Debug, Error)]
pub enum LogStoreError {
    /// Row violates the log invariants
    #[error("Invalid log entry: {0}")]
    InvalidEntry(String),

    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Backend is temporarily unreachable
    #[error("Log store unavailable: {0}")]
    Unavailable(String),
}

/// Backend trait for the append-only outcome log.
///
/// # Concurrency
///
/// Implementations must be thread-safe (`Send + Sync`): appends run from
/// concurrent dispatches and must not interleave or corrupt rows, and
/// queries must not block writers. Readers observe a consistent snapshot
/// as of call time; seeing the very latest concurrent append is not
/// guaranteed.
#[async_trait]
pub trait LogStoreBackend: Send + Sync {
    /// Append one row and return its id. Never overwrites.
    async fn append(&self, entry: NewLogEntry) -> Result<Uuid, LogStoreError>;

    /// Filtered, paginated read in ascending created_at order.
    async fn query(
        &self,
        filter: &LogFilter,
        pagination: &Pagination,
    ) -> Result<Vec<LogEntry>, LogStoreError>;

    /// Count of rows matching the filter.
    async fn count(&self, filter: &LogFilter) -> Result<u64, LogStoreError>;

    /// Short backend identifier, e.g. "memory".
    fn name(&self) -> &'static str;
}
