//! Tax report download.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use notifier::{AudienceSync, CustomerStore, EmailSender};
use projector::DataSource;

use crate::AppState;
use crate::error::ApiError;

/// GET /admin/tax-export: one CSV row per item and shipping line of every paid order.
///
/// Any failure answers with a JSON error; a partial CSV is never sent.
pub async fn export<D, E, A, C>(
    State(state): State<Arc<AppState<D, E, A, C>>>,
) -> Result<impl IntoResponse, ApiError>
where
    D: DataSource + 'static,
    E: EmailSender + 'static,
    A: AudienceSync + 'static,
    C: CustomerStore + 'static,
{
    let orders = state
        .dispatcher
        .coordinator()
        .projector()
        .list_orders_for_tax_export()
        .await?;
    let rows = domain::build_rows(&orders)?;
    let csv = domain::render_csv(&rows);

    tracing::info!(orders = orders.len(), rows = rows.len(), "tax report exported");
    metrics::counter!("tax_export_rows_total").increment(rows.len() as u64);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=tax_report.csv",
            ),
        ],
        csv,
    ))
}
