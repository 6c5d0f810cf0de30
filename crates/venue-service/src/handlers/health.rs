//! Liveness and readiness probes.
//!
//! - `/health`: the process is running
//! - `/ready`: signing keys are available, so tokens can be verified

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe. Checks no dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe.
///
/// Ready when the key cache already holds keys, or a fetch made now
/// succeeds. Returns 503 with a generic error otherwise; the cause is
/// logged.
#[tracing::instrument(skip_all, name = "venue.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let key_cache = state.verifier.key_cache();

    if key_cache.key_count().await == 0 {
        if let Err(e) = key_cache.refresh().await {
            tracing::warn!(target: "venue.health", error = %e, "Readiness check failed: signing keys unavailable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    signing_keys: Some("unavailable"),
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            );
        }
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            signing_keys: Some("available"),
            error: None,
        }),
    )
}
