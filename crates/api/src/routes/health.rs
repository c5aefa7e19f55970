//! Liveness probe.

use axum::Json;
use domain::EventKind;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Bus event names this instance reacts to.
    pub subscribed: &'static [&'static str],
}

/// GET /health
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        subscribed: &EventKind::SUBSCRIBED_NAMES,
    })
}
