//! Bearer gate for the JSON API.
//!
//! Extracts `Authorization: Bearer <token>`, verifies it and injects the
//! [`AuthenticatedIdentity`] into request extensions. Every failure is a
//! 403 with the same body; no refresh is attempted.

use crate::auth::TokenVerifier;
use crate::errors::ServiceError;
use crate::observability::metrics::record_token_validation;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the bearer gate.
#[derive(Clone)]
pub struct BearerState {
    pub verifier: Arc<TokenVerifier>,
}

fn extract_bearer_token(req: &Request) -> Result<&str, ServiceError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "venue.middleware.bearer", "Missing Authorization header");
            record_token_validation("bearer", "missing_credentials");
            ServiceError::Forbidden
        })?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "venue.middleware.bearer", "Invalid Authorization header format");
            record_token_validation("bearer", "missing_credentials");
            ServiceError::Forbidden
        })
}

#[instrument(skip_all, name = "venue.middleware.bearer")]
pub async fn require_bearer(
    State(state): State<Arc<BearerState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = extract_bearer_token(&req)?;

    let identity = state.verifier.verify(token).await.map_err(|e| {
        record_token_validation("bearer", e.as_label());
        if e.is_transient() {
            tracing::warn!(target: "venue.middleware.bearer", "Signing keys unavailable");
        } else {
            tracing::debug!(target: "venue.middleware.bearer", reason = e.as_label(), "Bearer token rejected");
        }
        ServiceError::Forbidden
    })?;
    record_token_validation("bearer", "success");

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
