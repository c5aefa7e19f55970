//! Projector error types.

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur while reading and normalizing records.
#[derive(Debug, Error)]
pub enum ProjectorError {
    /// The data source could not be reached or rejected the query.
    #[error("Data source error: {0}")]
    DataSource(String),

    /// The data source answered with a non-success status.
    #[error("Data source returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// A returned row did not have the expected shape.
    #[error("Record deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A returned row lacks a field the caller cannot default.
    #[error(transparent)]
    Malformed(#[from] DomainError),
}

impl ProjectorError {
    /// True when the record itself is unusable, as opposed to the read failing.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ProjectorError::Malformed(_) | ProjectorError::Deserialization(_)
        )
    }
}

impl From<reqwest::Error> for ProjectorError {
    fn from(err: reqwest::Error) -> Self {
        ProjectorError::DataSource(err.to_string())
    }
}

/// Result type for projector operations.
pub type Result<T> = std::result::Result<T, ProjectorError>;
