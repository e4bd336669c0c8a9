//! Prometheus scrape endpoint.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics: renders every recorded storefront metric in the
/// Prometheus text format. Mounted at the root, outside `/api`.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    // Drains histogram buckets that would otherwise grow between scrapes.
    handle.run_upkeep();
    ([(CONTENT_TYPE, TEXT_FORMAT)], handle.render())
}
