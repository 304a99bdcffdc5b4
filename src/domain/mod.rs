//! Domain layer - Core entities and collaborator traits

pub mod cache;
pub mod error;
pub mod record;

pub use cache::Cache;
pub use error::DomainError;
pub use record::{
    validate_record_key, Record, RecordId, RecordRepository, RecordValidationError,
};
