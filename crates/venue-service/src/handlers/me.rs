//! Current user handler.

use crate::auth::AuthenticatedIdentity;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `GET /api/v1/me`.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
}

/// Returns the identity the bearer gate attached.
#[instrument(skip_all, name = "venue.handlers.me")]
pub async fn get_me(Extension(identity): Extension<AuthenticatedIdentity>) -> Json<MeResponse> {
    tracing::debug!(target: "venue.handlers.me", "Returning caller identity");

    Json(MeResponse {
        user_id: identity.user_id,
        email: identity.email,
    })
}
