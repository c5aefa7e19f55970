//! Notifier error types.

use std::time::Duration;

use domain::DomainError;
use projector::ProjectorError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification reported in notification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The event's subject has no backing record.
    NotFound,
    /// An outbound call failed or timed out.
    IntegrationFailure,
    /// The record lacks a field the notification cannot default.
    MalformedRecord,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::IntegrationFailure => "integration_failure",
            ErrorKind::MalformedRecord => "malformed_record",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of the outbound email, audience and customer integrations.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The call did not finish within the configured bound.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The request could not be sent or its response not read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("Provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The provider refused the request.
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for IntegrationError {
    fn from(err: reqwest::Error) -> Self {
        IntegrationError::Transport(err.to_string())
    }
}

/// Why a single handler step failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Projection failed: {0}")]
    Projection(#[from] ProjectorError),

    #[error(transparent)]
    Malformed(#[from] DomainError),

    #[error("Integration failed: {0}")]
    Integration(#[from] IntegrationError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Projection(err) if err.is_malformed() => ErrorKind::MalformedRecord,
            DispatchError::Projection(_) | DispatchError::Integration(_) => {
                ErrorKind::IntegrationFailure
            }
            DispatchError::Malformed(_) => ErrorKind::MalformedRecord,
        }
    }
}

/// Result type for outbound integration calls.
pub type Result<T> = std::result::Result<T, IntegrationError>;
