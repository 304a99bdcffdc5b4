//! Storage factory for runtime storage selection

use std::sync::Arc;

use crate::domain::record::RecordRepository;
use crate::domain::DomainError;

use super::in_memory::InMemoryRecordRepository;
use super::migrations::run_storage_migrations;
use super::postgres::{PostgresConfig, PostgresRecordRepository};

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl std::str::FromStr for StorageType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(DomainError::configuration(format!(
                "Unknown storage backend: {}. Valid backends: in_memory, postgres",
                s
            ))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    Postgres(PostgresConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }

    /// Creates a PostgreSQL configuration from a URL
    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self::Postgres(PostgresConfig::new(url))
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Factory for creating record repositories
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates a record repository based on the configuration
    ///
    /// For PostgreSQL, pending migrations run before the repository is returned
    /// when `run_migrations` is set.
    pub async fn create(
        config: &StorageConfig,
        run_migrations: bool,
    ) -> Result<Arc<dyn RecordRepository>, DomainError> {
        match config {
            StorageConfig::InMemory => Ok(Arc::new(InMemoryRecordRepository::new())),
            StorageConfig::Postgres(pg_config) => {
                let repository = PostgresRecordRepository::connect(pg_config).await?;

                if run_migrations {
                    run_storage_migrations(repository.pool()).await?;
                }

                Ok(Arc::new(repository))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!("memory".parse::<StorageType>().unwrap(), StorageType::InMemory);
        assert_eq!("in-memory".parse::<StorageType>().unwrap(), StorageType::InMemory);
        assert_eq!("postgresql".parse::<StorageType>().unwrap(), StorageType::Postgres);
        assert_eq!("pg".parse::<StorageType>().unwrap(), StorageType::Postgres);
        assert!("mysql".parse::<StorageType>().is_err());
    }

    #[test]
    fn test_storage_config_types() {
        assert_eq!(StorageConfig::in_memory().storage_type(), StorageType::InMemory);
        assert_eq!(
            StorageConfig::postgres_url("postgres://localhost/test").storage_type(),
            StorageType::Postgres
        );
    }

    #[tokio::test]
    async fn test_factory_create_in_memory() {
        let repository = StorageFactory::create(&StorageConfig::in_memory(), true)
            .await
            .unwrap();

        assert_eq!(repository.count().await.unwrap(), 0);
    }
}
