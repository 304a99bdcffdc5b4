//! Record validation

use thiserror::Error;

use crate::domain::DomainError;

/// Errors that can occur during record key validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordValidationError {
    #[error("Record key cannot be empty")]
    EmptyKey,

    #[error("Record key cannot exceed {0} characters")]
    KeyTooLong(usize),
}

impl From<RecordValidationError> for DomainError {
    fn from(err: RecordValidationError) -> Self {
        DomainError::validation(err.to_string())
    }
}

/// Matches the width of the `key` column
pub const MAX_RECORD_KEY_LENGTH: usize = 255;

/// Validate a record key
pub fn validate_record_key(key: &str) -> Result<(), RecordValidationError> {
    if key.is_empty() {
        return Err(RecordValidationError::EmptyKey);
    }

    if key.chars().count() > MAX_RECORD_KEY_LENGTH {
        return Err(RecordValidationError::KeyTooLong(MAX_RECORD_KEY_LENGTH));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert!(validate_record_key("k1").is_ok());
        assert!(validate_record_key("user:42:profile").is_ok());
        assert!(validate_record_key(&"a".repeat(MAX_RECORD_KEY_LENGTH)).is_ok());
    }

    #[test]
    fn test_empty_key() {
        assert_eq!(
            validate_record_key(""),
            Err(RecordValidationError::EmptyKey)
        );
    }

    #[test]
    fn test_key_too_long() {
        let key = "a".repeat(MAX_RECORD_KEY_LENGTH + 1);
        assert_eq!(
            validate_record_key(&key),
            Err(RecordValidationError::KeyTooLong(MAX_RECORD_KEY_LENGTH))
        );
    }

    #[test]
    fn test_into_domain_error() {
        let err: DomainError = RecordValidationError::EmptyKey.into();
        assert!(matches!(err, DomainError::Validation { .. }));
    }
}
