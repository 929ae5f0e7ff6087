//! Log store backend factory

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::LogStoreConfig;

use super::backend::LogStoreBackend;
use super::memory_backend::MemoryLogStore;
use super::postgres_backend::PostgresLogStore;

/// Create a log store backend based on configuration.
///
/// Returns the appropriate backend implementation based on the `backend`
/// setting:
/// - `"postgres"`: Returns a `PostgresLogStore` if a pool is provided
/// - `"memory"` (default): Returns a `MemoryLogStore`
pub fn create_log_store(
    settings: &LogStoreConfig,
    pg_pool: Option<PgPool>,
) -> Arc<dyn LogStoreBackend> {
    match settings.backend.as_str() {
        "postgres" => {
            if let Some(pool) = pg_pool {
                tracing::info!(backend = "postgres", "Creating PostgreSQL log store");
                Arc::new(PostgresLogStore::new(pool))
            } else {
                tracing::warn!(
                    "PostgreSQL log store requested but no pool provided, falling back to memory"
                );
                Arc::new(MemoryLogStore::new())
            }
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating in-memory log store");
            Arc::new(MemoryLogStore::new())
        }
        other => {
            tracing::warn!(
                backend = %other,
                "Unknown log store backend, falling back to memory"
            );
            Arc::new(MemoryLogStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogStoreConfig;

    #[test]
    fn test_default_is_memory() {
        let store = create_log_store(&LogStoreConfig::default(), None);
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn test_postgres_without_pool_falls_back() {
        let settings = LogStoreConfig {
            backend: "postgres".to_string(),
            database_url: None,
        };
        let store = create_log_store(&settings, None);
        assert_eq!(store.name(), "memory");
    }
}
