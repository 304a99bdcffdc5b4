//! Cache trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Volatile key-value cache holding string projections of record values
///
/// Entries may disappear at any time at the backend's discretion; callers
/// must treat a miss as normal and fall back to the durable store.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Gets the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Stores `value` under `key`, replacing any previous entry
    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError>;

    /// Removes the entry under `key`, returns true if one existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Checks if a key exists in the cache
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get(key).await?.is_some())
    }
}
