//! Prometheus scrape endpoint.
//!
//! Unauthenticated. Labels carry no user data.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

#[tracing::instrument(skip_all, name = "venue.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
