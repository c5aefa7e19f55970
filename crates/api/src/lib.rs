//! HTTP API server for the order notification dispatcher.
//!
//! Accepts bus events over HTTP and serves the tax report, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use notifier::{
    AudienceSync, ConsoleEmailSender, CustomerStore, EmailSender, EventDispatcher,
    HttpCustomerStore, InMemoryCustomerStore, NoopAudienceSync, ResendClient,
    SideEffectCoordinator,
};
use projector::{DataSource, HttpDataSource, InMemoryDataSource};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<D, E, A, C>
where
    D: DataSource,
    E: EmailSender,
    A: AudienceSync,
    C: CustomerStore,
{
    pub dispatcher: EventDispatcher<D, E, A, C>,
    /// In-flight limit for batch dispatch.
    pub concurrency: usize,
}

/// State whose collaborators are chosen at startup.
pub type DynAppState = AppState<
    Arc<dyn DataSource>,
    Arc<dyn EmailSender>,
    Arc<dyn AudienceSync>,
    Arc<dyn CustomerStore>,
>;

impl<D, E, A, C> AppState<D, E, A, C>
where
    D: DataSource,
    E: EmailSender,
    A: AudienceSync,
    C: CustomerStore,
{
    /// Wires the given collaborators into a dispatcher configured from `config`.
    pub fn new(config: &Config, source: D, email: E, audience: A, customers: C) -> Self {
        let coordinator =
            SideEffectCoordinator::new(source, email, audience, customers, config.coordinator());
        Self {
            dispatcher: EventDispatcher::new(coordinator),
            concurrency: config.dispatch_concurrency,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<D, E, A, C>(
    state: Arc<AppState<D, E, A, C>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    D: DataSource + 'static,
    E: EmailSender + 'static,
    A: AudienceSync + 'static,
    C: CustomerStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/events", post(routes::events::receive::<D, E, A, C>))
        .route("/events/batch", post(routes::events::receive_batch::<D, E, A, C>))
        .route("/admin/tax-export", get(routes::tax_export::export::<D, E, A, C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the application state from configuration.
///
/// - `DATA_API_URL` set: records are read from, and customer patches written
///   to, the commerce platform. Otherwise an empty in-memory data layer is used.
/// - `RESEND_API_KEY` set: emails and audience contacts go through Resend.
///   Otherwise emails are logged and audience sync is disabled.
pub fn create_default_state(config: &Config) -> Result<DynAppState, String> {
    let timeout = config.integration_timeout;

    let (source, customers): (Arc<dyn DataSource>, Arc<dyn CustomerStore>) =
        match &config.data_api_url {
            Some(url) => {
                let mut source = HttpDataSource::new(url.as_str(), timeout)
                    .map_err(|e| format!("data source: {e}"))?;
                let mut customers = HttpCustomerStore::new(url.as_str(), timeout)
                    .map_err(|e| format!("customer store: {e}"))?;
                if let Some(token) = &config.data_api_token {
                    source = source.with_token(token.as_str());
                    customers = customers.with_token(token.as_str());
                }
                tracing::info!(url = %url, "using HTTP data layer");
                (Arc::new(source), Arc::new(customers))
            }
            None => {
                tracing::warn!("DATA_API_URL not set, using an empty in-memory data layer");
                (
                    Arc::new(InMemoryDataSource::new()),
                    Arc::new(InMemoryCustomerStore::new()),
                )
            }
        };

    let (email, audience): (Arc<dyn EmailSender>, Arc<dyn AudienceSync>) =
        match &config.resend_api_key {
            Some(key) => {
                let client = Arc::new(
                    ResendClient::new(key.as_str(), timeout)
                        .map_err(|e| format!("email client: {e}"))?,
                );
                (client.clone(), client)
            }
            None => {
                tracing::warn!("RESEND_API_KEY not set, emails will be logged instead of sent");
                (Arc::new(ConsoleEmailSender::new()), Arc::new(NoopAudienceSync))
            }
        };

    Ok(AppState::new(config, source, email, audience, customers))
}
