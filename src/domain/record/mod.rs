//! Record domain - Key-value records and their durable store

mod entity;
mod repository;
mod validation;

pub use entity::{Record, RecordId};
pub use repository::RecordRepository;
pub use validation::{validate_record_key, RecordValidationError, MAX_RECORD_KEY_LENGTH};

#[cfg(test)]
pub use repository::MockRecordRepository;
