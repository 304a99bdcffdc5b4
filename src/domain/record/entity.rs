//! Record entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persistence identifier assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored key-value pair
///
/// `key` is the business identity and is unique across the store; `id` is the
/// persistence identity and stays `None` until the record has been saved once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: Option<RecordId>,
    key: String,
    value: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Record {
    /// Create a record that has not been persisted yet
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            key: key.into(),
            value: value.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a persisted record, e.g. from a database row
    pub fn from_parts(
        id: RecordId,
        key: impl Into<String>,
        value: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id),
            key: key.into(),
            value: value.into(),
            created_at,
            updated_at,
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Replace the value in place
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.updated_at = Utc::now();
    }

    pub(crate) fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    // Getters

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_not_persisted() {
        let record = Record::new("k1", "v1");

        assert_eq!(record.key(), "k1");
        assert_eq!(record.value(), "v1");
        assert!(record.id().is_none());
        assert!(!record.is_persisted());
    }

    #[test]
    fn test_with_id() {
        let record = Record::new("k1", "v1").with_id(RecordId::new(7));

        assert_eq!(record.id(), Some(RecordId::new(7)));
        assert!(record.is_persisted());
    }

    #[test]
    fn test_set_value_keeps_identity() {
        let mut record = Record::new("k1", "v1").with_id(RecordId::new(1));
        let created = record.created_at();

        record.set_value("v2");

        assert_eq!(record.value(), "v2");
        assert_eq!(record.key(), "k1");
        assert_eq!(record.id(), Some(RecordId::new(1)));
        assert_eq!(record.created_at(), created);
        assert!(record.updated_at() >= created);
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId::new(42).to_string(), "42");
    }
}
