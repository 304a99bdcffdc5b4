//! Record repository trait

use async_trait::async_trait;

use super::entity::Record;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Durable store for records
///
/// Implementations must keep at most one record per business key.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Finds the record with the given business key
    async fn find_by_key(&self, key: &str) -> Result<Option<Record>, DomainError>;

    /// Inserts a record without an id, updates a record with one
    async fn save(&self, record: Record) -> Result<Record, DomainError>;

    /// Deletes a persisted record, returns true if a row was removed
    async fn delete(&self, record: &Record) -> Result<bool, DomainError>;

    /// Returns the number of stored records
    async fn count(&self) -> Result<usize, DomainError>;

    /// Checks that the store is reachable
    async fn ping(&self) -> Result<(), DomainError> {
        self.count().await.map(|_| ())
    }
}
