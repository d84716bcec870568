//! Wiring: turn a `CatalogConfig` into a ready-to-use repository.

use std::sync::Arc;

use anyhow::Context;

use catalog_products::{InMemoryProductRepository, ProductRepository};

use crate::config::{CatalogConfig, StorageBackend};
use crate::postgres::PostgresProductRepository;

/// Install the global tracing subscriber in the configured format.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_observability(config: &CatalogConfig) {
    catalog_observability::init_with(config.log_format);
}

/// Build the repository selected by `config`.
///
/// For Postgres this connects the pool and runs the schema migration before
/// returning, so callers get a repository that is ready to serve.
pub async fn build_repository(config: &CatalogConfig) -> anyhow::Result<Arc<dyn ProductRepository>> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::info!(storage = "memory", "catalog repository ready");
            Ok(Arc::new(InMemoryProductRepository::new()))
        }
        StorageBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("postgres storage selected without database settings")?;

            let repository = PostgresProductRepository::connect(database)
                .await
                .context("failed to connect to postgres")?;
            repository
                .migrate()
                .await
                .context("failed to migrate catalog schema")?;

            tracing::info!(
                storage = "postgres",
                max_connections = database.max_connections,
                "catalog repository ready"
            );
            Ok(Arc::new(repository))
        }
    }
}

#[cfg(test)]
mod tests {
    use catalog_products::ProductFilter;

    use super::*;

    #[tokio::test]
    async fn memory_backend_starts_empty() {
        let repository = build_repository(&CatalogConfig::default()).await.unwrap();
        assert_eq!(repository.count(&ProductFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn postgres_without_database_settings_is_an_error() {
        let config = CatalogConfig {
            storage: StorageBackend::Postgres,
            database: None,
            ..CatalogConfig::default()
        };
        let err = build_repository(&config).await.err().unwrap();
        assert!(err.to_string().contains("without database settings"));
    }
}
