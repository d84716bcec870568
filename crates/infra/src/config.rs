//! Configuration loading and representation.
//!
//! Settings come from environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `CATALOG_STORAGE` | `memory` | `memory` or `postgres` |
//! | `DATABASE_URL` | none | required when storage is `postgres` |
//! | `CATALOG_DB_MAX_CONNECTIONS` | `10` | pool size, at least 1 |
//! | `CATALOG_LOG_FORMAT` | `json` | `json` or `pretty` |

use core::str::FromStr;

use thiserror::Error;

use catalog_observability::LogFormat;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be set when CATALOG_STORAGE=postgres")]
    Missing { var: &'static str },

    #[error("invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown storage backend '{0}' (expected 'memory' or 'postgres')")]
pub struct UnknownStorageBackend(pub String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = UnknownStorageBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(UnknownStorageBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub storage: StorageBackend,
    /// Present iff `storage` is `Postgres`.
    pub database: Option<DatabaseConfig>,
    pub log_format: LogFormat,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Memory,
            database: None,
            log_format: LogFormat::Json,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable lookup (tests, embedding).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match lookup("CATALOG_STORAGE") {
            Some(value) => value
                .parse::<StorageBackend>()
                .map_err(|e| ConfigError::Invalid {
                    var: "CATALOG_STORAGE",
                    reason: e.to_string(),
                    value,
                })?,
            None => StorageBackend::default(),
        };

        let log_format = match lookup("CATALOG_LOG_FORMAT") {
            Some(value) => value
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::Invalid {
                    var: "CATALOG_LOG_FORMAT",
                    reason: e.to_string(),
                    value,
                })?,
            None => LogFormat::default(),
        };

        let database = match storage {
            StorageBackend::Memory => None,
            StorageBackend::Postgres => {
                let url = lookup("DATABASE_URL")
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(ConfigError::Missing { var: "DATABASE_URL" })?;
                let max_connections = match lookup("CATALOG_DB_MAX_CONNECTIONS") {
                    Some(value) => parse_max_connections(value)?,
                    None => DEFAULT_MAX_CONNECTIONS,
                };
                Some(DatabaseConfig { url, max_connections })
            }
        };

        Ok(Self {
            storage,
            database,
            log_format,
        })
    }
}

fn parse_max_connections(value: String) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        Ok(_) => Err(ConfigError::Invalid {
            var: "CATALOG_DB_MAX_CONNECTIONS",
            value,
            reason: "must be at least 1".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            var: "CATALOG_DB_MAX_CONNECTIONS",
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<CatalogConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CatalogConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_to_in_memory_json() {
        assert_eq!(load(&[]).unwrap(), CatalogConfig::default());
    }

    #[test]
    fn postgres_requires_database_url() {
        assert_eq!(
            load(&[("CATALOG_STORAGE", "postgres")]).unwrap_err(),
            ConfigError::Missing { var: "DATABASE_URL" }
        );

        let config = load(&[
            ("CATALOG_STORAGE", "postgres"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("CATALOG_DB_MAX_CONNECTIONS", "4"),
            ("CATALOG_LOG_FORMAT", "pretty"),
        ])
        .unwrap();
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(
            config.database,
            Some(DatabaseConfig {
                url: "postgres://localhost/catalog".to_string(),
                max_connections: 4,
            })
        );
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn storage_backend_parse_errors_are_typed() {
        assert_eq!(" PostgreSQL ".parse::<StorageBackend>(), Ok(StorageBackend::Postgres));
        let err = "Mongo".parse::<StorageBackend>().unwrap_err();
        assert_eq!(err, UnknownStorageBackend("mongo".to_string()));
        assert_eq!(
            err.to_string(),
            "unknown storage backend 'mongo' (expected 'memory' or 'postgres')"
        );
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            load(&[("CATALOG_STORAGE", "mongo")]),
            Err(ConfigError::Invalid { var: "CATALOG_STORAGE", .. })
        ));
        assert!(matches!(
            load(&[("CATALOG_LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { var: "CATALOG_LOG_FORMAT", .. })
        ));
        assert!(matches!(
            load(&[
                ("CATALOG_STORAGE", "postgres"),
                ("DATABASE_URL", "postgres://localhost/catalog"),
                ("CATALOG_DB_MAX_CONNECTIONS", "0"),
            ]),
            Err(ConfigError::Invalid { var: "CATALOG_DB_MAX_CONNECTIONS", .. })
        ));
    }
}
