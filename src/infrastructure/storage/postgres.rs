//! PostgreSQL record repository with connection pooling

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::domain::record::{Record, RecordId, RecordRepository};
use crate::domain::DomainError;

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/kv_cache".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }
}

/// Opens a connection pool for the given configuration
pub async fn connect_pool(config: &PostgresConfig) -> Result<PgPool, DomainError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))
}

/// Record repository backed by the `records` table
///
/// The table is created by the storage migrations; see `run_storage_migrations`.
pub struct PostgresRecordRepository {
    pool: PgPool,
}

impl Debug for PostgresRecordRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRecordRepository")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl PostgresRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        Ok(Self::new(connect_pool(config).await?))
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn record_from_row(row: &PgRow) -> Result<Record, DomainError> {
    let map_err = |e: sqlx::Error| DomainError::storage(format!("Failed to read record row: {}", e));

    let id: i64 = row.try_get("id").map_err(map_err)?;
    let key: String = row.try_get("key").map_err(map_err)?;
    let value: String = row.try_get("value").map_err(map_err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(map_err)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(map_err)?;

    Ok(Record::from_parts(
        RecordId::new(id),
        key,
        value,
        created_at,
        updated_at,
    ))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[async_trait]
impl RecordRepository for PostgresRecordRepository {
    async fn find_by_key(&self, key: &str) -> Result<Option<Record>, DomainError> {
        let row = sqlx::query(
            "SELECT id, key, value, created_at, updated_at FROM records WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to find record '{}': {}", key, e)))?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn save(&self, record: Record) -> Result<Record, DomainError> {
        match record.id() {
            None => {
                let row = sqlx::query(
                    r#"
                    INSERT INTO records (key, value, created_at, updated_at)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id, key, value, created_at, updated_at
                    "#,
                )
                .bind(record.key())
                .bind(record.value())
                .bind(record.created_at())
                .bind(record.updated_at())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        DomainError::conflict(format!(
                            "Record with key '{}' already exists",
                            record.key()
                        ))
                    } else {
                        DomainError::storage(format!("Failed to insert record: {}", e))
                    }
                })?;

                record_from_row(&row)
            }
            Some(id) => {
                let row = sqlx::query(
                    r#"
                    UPDATE records
                    SET value = $2, updated_at = NOW()
                    WHERE id = $1
                    RETURNING id, key, value, created_at, updated_at
                    "#,
                )
                .bind(id.value())
                .bind(record.value())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to update record: {}", e)))?;

                match row {
                    Some(row) => record_from_row(&row),
                    None => Err(DomainError::not_found(format!(
                        "Record with id '{}' not found",
                        id
                    ))),
                }
            }
        }
    }

    async fn delete(&self, record: &Record) -> Result<bool, DomainError> {
        let Some(id) = record.id() else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM records WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete record: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count records: {}", e)))?;

        Ok(count as usize)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to reach database: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_default() {
        let config = PostgresConfig::default();

        assert_eq!(config.url, "postgres://localhost/kv_cache");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
    }

    #[test]
    fn test_postgres_config_builder() {
        let config = PostgresConfig::new("postgres://db/records")
            .with_max_connections(20)
            .with_min_connections(2)
            .with_connect_timeout(5)
            .with_idle_timeout(60);

        assert_eq!(config.url, "postgres://db/records");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.idle_timeout_secs, 60);
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
