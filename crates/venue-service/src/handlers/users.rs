//! User registration handler.

use crate::errors::ServiceError;
use crate::models::{RegisterUserRequest, UserResponse};
use crate::routes::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/v1/users
///
/// Creates the account at the identity provider and stores it.
///
/// - 201 with `{id, created_on, updated_on, email}`
/// - 400 for a malformed email or a short password
/// - 409 if the email is already registered
#[instrument(skip_all, name = "venue.handlers.register_user")]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ServiceError> {
    let user = state
        .user_service
        .register(&payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}
