//! Template store factory.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::DatabaseConfig;

use super::memory::MemoryTemplateStore;
use super::postgres::PostgresTemplateStore;
use super::TemplateStore;

/// Create a template store based on configuration.
///
/// Returns the appropriate backend implementation based on the `backend`
/// setting:
/// - `"postgres"`: Returns a `PostgresTemplateStore` if a pool is provided
/// - `"memory"` (default): Returns a `MemoryTemplateStore`
pub fn create_template_store(
    settings: &DatabaseConfig,
    pool: Option<PgPool>,
) -> Arc<dyn TemplateStore> {
    match settings.backend.as_str() {
        "postgres" => {
            if let Some(pool) = pool {
                tracing::info!(backend = "postgres", "Creating PostgreSQL template store");
                Arc::new(PostgresTemplateStore::new(pool))
            } else {
                tracing::warn!(
                    "PostgreSQL backend requested but no pool provided, falling back to memory"
                );
                Arc::new(MemoryTemplateStore::new())
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory template store");
            Arc::new(MemoryTemplateStore::new())
        }
    }
}
