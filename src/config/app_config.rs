use std::time::Duration;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheConfig, CacheType};
use crate::infrastructure::executor::ExecutorConfig;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::services::ProcessorConfig;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Durable store selection
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// `in_memory` or `postgres`
    #[serde(default = "default_in_memory")]
    pub backend: String,
    /// Apply pending migrations when the server starts
    #[serde(default = "default_true")]
    pub run_migrations: bool,
    #[serde(default)]
    pub postgres: PostgresSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresSettings {
    /// Falls back to `DATABASE_URL` when unset
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

/// Distributed cache selection
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// `in_memory` or `redis`
    #[serde(default = "default_in_memory")]
    pub backend: String,
    /// Falls back to `REDIS_URL` when unset
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default)]
    pub key_prefix: Option<String>,
    /// Entry expiry in seconds; 0 disables expiry
    #[serde(default)]
    pub ttl_secs: u64,
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

fn default_in_memory() -> String {
    "in_memory".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_max_capacity() -> u64 {
    10_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_in_memory(),
            run_migrations: true,
            postgres: PostgresSettings::default(),
        }
    }
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: default_in_memory(),
            redis_url: None,
            key_prefix: None,
            ttl_secs: 0,
            max_capacity: default_max_capacity(),
        }
    }
}

impl StorageSettings {
    pub fn to_storage_config(&self) -> Result<StorageConfig, DomainError> {
        match self.backend.parse::<StorageType>()? {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => Ok(StorageConfig::postgres(
                self.postgres.to_postgres_config()?,
            )),
        }
    }
}

impl PostgresSettings {
    pub fn to_postgres_config(&self) -> Result<PostgresConfig, DomainError> {
        let url = self
            .url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .ok_or_else(|| {
                DomainError::configuration(
                    "storage.postgres.url or DATABASE_URL is required for the postgres backend",
                )
            })?;

        Ok(PostgresConfig::new(url)
            .with_max_connections(self.max_connections)
            .with_min_connections(self.min_connections)
            .with_connect_timeout(self.connect_timeout_secs)
            .with_idle_timeout(self.idle_timeout_secs))
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> Result<CacheConfig, DomainError> {
        let mut config = match self.backend.parse::<CacheType>()? {
            CacheType::InMemory => CacheConfig::in_memory().with_max_capacity(self.max_capacity),
            CacheType::Redis => {
                let url = self
                    .redis_url
                    .clone()
                    .or_else(|| std::env::var("REDIS_URL").ok())
                    .ok_or_else(|| {
                        DomainError::configuration(
                            "cache.redis_url or REDIS_URL is required for the redis backend",
                        )
                    })?;
                CacheConfig::redis(url)
            }
        };

        if let Some(prefix) = &self.key_prefix {
            config = config.with_key_prefix(prefix.clone());
        }

        if self.ttl_secs > 0 {
            config = config.with_ttl(Duration::from_secs(self.ttl_secs));
        }

        Ok(config)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Checks cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), DomainError> {
        self.executor.validate()?;
        self.processor.validate()?;
        self.storage.backend.parse::<StorageType>()?;
        self.cache.backend.parse::<CacheType>()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::executor::RejectionPolicy;
    use crate::infrastructure::services::LockMode;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.storage.backend, "in_memory");
        assert_eq!(config.cache.backend, "in_memory");
        assert_eq!(config.executor.core_workers, 10);
        assert_eq!(config.processor.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_nested_sections() {
        let source = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                host = "127.0.0.1"
                port = 9000

                [cache]
                backend = "redis"
                redis_url = "redis://cache:6379"
                key_prefix = "data"
                ttl_secs = 300

                [executor]
                core_workers = 2
                max_workers = 4
                rejection_policy = "block"

                [processor]
                retry_delay_ms = 50
                lock_mode = "striped"
                lock_stripes = 16
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: AppConfig = source.try_deserialize().unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.executor.core_workers, 2);
        assert_eq!(config.executor.queue_capacity, 50);
        assert_eq!(config.executor.rejection_policy, RejectionPolicy::Block);
        assert_eq!(config.processor.retry_delay_ms, 50);
        assert_eq!(config.processor.lock_mode, LockMode::Striped);
        assert_eq!(config.processor.lock_stripes, 16);

        let cache = config.cache.to_cache_config().unwrap();
        assert_eq!(cache.cache_type, CacheType::Redis);
        assert_eq!(cache.redis_url, Some("redis://cache:6379".to_string()));
        assert_eq!(cache.key_prefix, Some("data".to_string()));
        assert_eq!(cache.ttl, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_zero_ttl_means_no_expiry() {
        let cache = CacheSettings::default().to_cache_config().unwrap();

        assert_eq!(cache.cache_type, CacheType::InMemory);
        assert!(cache.ttl.is_none());
        assert_eq!(cache.max_capacity, Some(10_000));
    }

    #[test]
    fn test_postgres_settings_with_url() {
        let settings = StorageSettings {
            backend: "postgres".to_string(),
            run_migrations: false,
            postgres: PostgresSettings {
                url: Some("postgres://db/records".to_string()),
                max_connections: 5,
                ..Default::default()
            },
        };

        match settings.to_storage_config().unwrap() {
            StorageConfig::Postgres(pg) => {
                assert_eq!(pg.url, "postgres://db/records");
                assert_eq!(pg.max_connections, 5);
            }
            other => panic!("expected postgres config, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_backend_fails_validation() {
        let mut config = AppConfig::default();
        config.storage.backend = "mongo".to_string();

        assert!(matches!(
            config.validate(),
            Err(DomainError::Configuration { .. })
        ));
    }
}
