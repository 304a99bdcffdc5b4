//! In-memory record repository

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::record::{Record, RecordId, RecordRepository};
use crate::domain::DomainError;

/// Thread-safe in-memory record repository
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryRecordRepository {
    records: RwLock<HashMap<String, Record>>,
    next_id: AtomicI64,
}

impl Default for InMemoryRecordRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Creates a repository pre-populated with `(key, value)` pairs
    pub fn with_records<K, V>(records: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = HashMap::new();
        let mut next_id = 1;

        for (key, value) in records {
            let record = Record::new(key, value).with_id(RecordId::new(next_id));
            next_id += 1;
            map.insert(record.key().to_string(), record);
        }

        Self {
            records: RwLock::new(map),
            next_id: AtomicI64::new(next_id),
        }
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn find_by_key(&self, key: &str) -> Result<Option<Record>, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(records.get(key).cloned())
    }

    async fn save(&self, mut record: Record) -> Result<Record, DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        match record.id() {
            None => {
                if records.contains_key(record.key()) {
                    return Err(DomainError::conflict(format!(
                        "Record with key '{}' already exists",
                        record.key()
                    )));
                }

                let id = RecordId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
                record = record.with_id(id);
            }
            Some(id) => {
                let existing = records
                    .get(record.key())
                    .filter(|existing| existing.id() == Some(id))
                    .ok_or_else(|| {
                        DomainError::not_found(format!("Record with id '{}' not found", id))
                    })?;

                let created_at = existing.created_at();
                record.set_timestamps(created_at, Utc::now());
            }
        }

        records.insert(record.key().to_string(), record.clone());
        Ok(record)
    }

    async fn delete(&self, record: &Record) -> Result<bool, DomainError> {
        let Some(id) = record.id() else {
            return Ok(false);
        };

        let mut records = self.records.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let matches = records
            .get(record.key())
            .is_some_and(|existing| existing.id() == Some(id));

        if matches {
            records.remove(record.key());
        }

        Ok(matches)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_assigns_id() {
        let repository = InMemoryRecordRepository::new();

        let saved = repository.save(Record::new("k1", "v1")).await.unwrap();

        assert_eq!(saved.id(), Some(RecordId::new(1)));
        assert_eq!(repository.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ping() {
        let repository = InMemoryRecordRepository::new();

        assert!(repository.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_find_by_key() {
        let repository = InMemoryRecordRepository::with_records([("k1", "v1")]);

        let found = repository.find_by_key("k1").await.unwrap().unwrap();
        assert_eq!(found.value(), "v1");

        assert!(repository.find_by_key("k2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_key_conflicts() {
        let repository = InMemoryRecordRepository::with_records([("k1", "v1")]);

        let result = repository.save(Record::new("k1", "v2")).await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
        assert_eq!(
            repository.find_by_key("k1").await.unwrap().unwrap().value(),
            "v1"
        );
    }

    #[tokio::test]
    async fn test_update_existing_record() {
        let repository = InMemoryRecordRepository::with_records([("k1", "v1")]);
        let mut record = repository.find_by_key("k1").await.unwrap().unwrap();
        let created_at = record.created_at();

        record.set_value("v2");
        let saved = repository.save(record).await.unwrap();

        assert_eq!(saved.value(), "v2");
        assert_eq!(saved.created_at(), created_at);
        assert_eq!(repository.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let repository = InMemoryRecordRepository::new();

        let result = repository
            .save(Record::new("k1", "v1").with_id(RecordId::new(42)))
            .await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete() {
        let repository = InMemoryRecordRepository::with_records([("k1", "v1")]);
        let record = repository.find_by_key("k1").await.unwrap().unwrap();

        assert!(repository.delete(&record).await.unwrap());
        assert!(!repository.delete(&record).await.unwrap());
        assert!(repository.find_by_key("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_unpersisted_record_is_noop() {
        let repository = InMemoryRecordRepository::with_records([("k1", "v1")]);

        assert!(!repository.delete(&Record::new("k1", "v1")).await.unwrap());
        assert_eq!(repository.count().await.unwrap(), 1);
    }
}
