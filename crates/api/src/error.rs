//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use projector::ProjectorError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The data layer could not be read.
    Upstream(ProjectorError),
    /// A record could not be turned into a report row.
    Malformed(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream(err) if err.is_malformed() => {
                tracing::warn!(error = %err, "malformed record from data layer");
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            ApiError::Upstream(err) => {
                tracing::error!(error = %err, "data layer request failed");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            ApiError::Malformed(err) => {
                tracing::warn!(error = %err, "malformed record");
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ProjectorError> for ApiError {
    fn from(err: ProjectorError) -> Self {
        ApiError::Upstream(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Malformed(err)
    }
}
