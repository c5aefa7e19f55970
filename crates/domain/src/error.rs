//! Domain error types.

use thiserror::Error;

/// Errors raised while interpreting or deriving from commerce records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A field the caller cannot default is absent or unusable.
    #[error("Malformed record {record}: missing or invalid field '{field}'")]
    MalformedRecord {
        record: String,
        field: &'static str,
    },

    /// A monetary amount does not fit in the minor-unit representation.
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),
}

impl DomainError {
    /// Shorthand for a [`DomainError::MalformedRecord`].
    pub fn malformed(record: impl Into<String>, field: &'static str) -> Self {
        DomainError::MalformedRecord {
            record: record.into(),
            field,
        }
    }
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;
