//! Inbound event endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use domain::EventEnvelope;
use notifier::{AudienceSync, CustomerStore, EmailSender, NotificationOutcome};
use projector::DataSource;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

/// An event as the bus delivers it: `{name, data: {id}, occurred_at?}`.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub name: String,
    pub data: EventData,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub id: String,
}

impl EventRequest {
    fn subject(&self) -> Result<&str, ApiError> {
        let id = self.data.id.trim();
        if id.is_empty() {
            return Err(ApiError::BadRequest("data.id is required".to_string()));
        }
        Ok(id)
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct IgnoredResponse {
    pub ignored: bool,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub outcomes: Vec<NotificationOutcome>,
    pub ignored: usize,
}

// -- Handlers --

/// POST /events: handles one event occurrence to completion.
///
/// Answers `202` with the outcome, or `200 {"ignored": true}` for names this
/// service does not subscribe to.
pub async fn receive<D, E, A, C>(
    State(state): State<Arc<AppState<D, E, A, C>>>,
    Json(req): Json<EventRequest>,
) -> Result<Response, ApiError>
where
    D: DataSource + 'static,
    E: EmailSender + 'static,
    A: AudienceSync + 'static,
    C: CustomerStore + 'static,
{
    let subject = req.subject()?;
    match state
        .dispatcher
        .dispatch_raw(&req.name, subject, req.occurred_at)
        .await
    {
        Some(outcome) => Ok((StatusCode::ACCEPTED, Json(outcome)).into_response()),
        None => Ok((
            StatusCode::OK,
            Json(IgnoredResponse {
                ignored: true,
                name: req.name,
            }),
        )
            .into_response()),
    }
}

/// POST /events/batch: handles independent occurrences concurrently.
pub async fn receive_batch<D, E, A, C>(
    State(state): State<Arc<AppState<D, E, A, C>>>,
    Json(requests): Json<Vec<EventRequest>>,
) -> Result<(StatusCode, Json<BatchResponse>), ApiError>
where
    D: DataSource + 'static,
    E: EmailSender + 'static,
    A: AudienceSync + 'static,
    C: CustomerStore + 'static,
{
    let mut envelopes = Vec::with_capacity(requests.len());
    let mut ignored = 0;
    for req in &requests {
        match EventEnvelope::from_wire(&req.name, req.subject()?, req.occurred_at) {
            Some(envelope) => envelopes.push(envelope),
            None => {
                metrics::counter!("events_ignored_total").increment(1);
                ignored += 1;
            }
        }
    }

    let outcomes = state
        .dispatcher
        .dispatch_all(envelopes, state.concurrency)
        .await;
    Ok((StatusCode::ACCEPTED, Json(BatchResponse { outcomes, ignored })))
}
