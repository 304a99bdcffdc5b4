//! Key-value data service
//!
//! Reads go through a cache-aside path over a durable record store. Writes
//! and deletes are acknowledged once scheduled and applied later on a
//! bounded task executor, store first and cache second.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use infrastructure::cache::CacheFactory;
use infrastructure::executor::TaskExecutor;
use infrastructure::services::DataProcessor;
use infrastructure::storage::StorageFactory;
use tracing::info;

/// Create the application state with in-memory backends
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage_config = config.storage.to_storage_config()?;
    info!(backend = ?storage_config.storage_type(), "Initializing record store");
    let repository = StorageFactory::create(&storage_config, config.storage.run_migrations).await?;

    let cache_config = config.cache.to_cache_config()?;
    info!(backend = %cache_config.cache_type, "Initializing cache");
    let cache = CacheFactory::new().create(&cache_config).await?;

    let executor = Arc::new(TaskExecutor::new(config.executor.clone())?);

    let processor = DataProcessor::new(
        repository.clone(),
        cache.clone(),
        executor,
        config.processor.clone(),
    )?;

    Ok(AppState::new(processor, repository, cache))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_app_state_defaults() {
        let state = create_app_state().await.unwrap();

        assert_eq!(state.repository.count().await.unwrap(), 0);
        assert!(!state.processor.executor().is_shut_down().await);

        state.processor.shutdown().await;
    }

    #[tokio::test]
    async fn test_create_app_state_rejects_unknown_backend() {
        let mut config = AppConfig::default();
        config.storage.backend = "cassandra".to_string();

        assert!(create_app_state_with_config(&config).await.is_err());
    }
}
