//! Infrastructure layer: configuration, Postgres storage, and wiring.

pub mod bootstrap;
pub mod config;
pub mod postgres;

pub use bootstrap::{build_repository, init_observability};
pub use config::{CatalogConfig, ConfigError, DatabaseConfig, StorageBackend, UnknownStorageBackend};
pub use postgres::PostgresProductRepository;
