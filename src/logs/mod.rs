//! Append-only outcome log: one row per dispatch attempt, never updated
//! or deleted by the core. Aggregation reads this log through the same
//! backend trait.

mod backend;
mod factory;
mod memory_backend;
mod models;
mod postgres_backend;

pub use backend::{LogStoreBackend, LogStoreError};
pub use factory::create_log_store;
pub use memory_backend::MemoryLogStore;
pub use models::{LogEntry, LogFilter, LogStatus, NewLogEntry, Pagination};
pub use postgres_backend::PostgresLogStore;
