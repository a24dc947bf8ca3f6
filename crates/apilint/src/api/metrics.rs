//! Prometheus scrape endpoint.

use axum::{extract::State, http::header, response::IntoResponse};

use apilint_telemetry::{prometheus::render_metrics, PROMETHEUS_CONTENT_TYPE};

use super::router::AppState;

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        render_metrics(state.service.metrics()),
    )
}
