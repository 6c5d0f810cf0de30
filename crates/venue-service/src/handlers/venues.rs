//! Venue ("point of interest") API handlers.

use crate::auth::AuthenticatedIdentity;
use crate::errors::ServiceError;
use crate::models::{NewVenue, Venue, VenuePage};
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// Query string for `GET /api/v1/pois`.
#[derive(Debug, Default, Deserialize)]
pub struct VenueSearchParams {
    #[serde(default)]
    pub city_id: String,
    #[serde(default)]
    pub sport: String,
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
}

/// Handler for POST /api/v1/pois
///
/// The caller's user id becomes `created_by` and `updated_by`.
#[instrument(skip_all, name = "venue.handlers.create_venue")]
pub async fn create_venue(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Json(payload): Json<NewVenue>,
) -> Result<(StatusCode, Json<Venue>), ServiceError> {
    let venue = state
        .venue_service
        .create(&identity.user_id, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(venue)))
}

/// Handler for GET /api/v1/pois
///
/// Public. Pages are keyed by the id of the last venue returned.
#[instrument(skip_all, name = "venue.handlers.search_venues")]
pub async fn search_venues(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VenueSearchParams>,
) -> Result<Json<VenuePage>, ServiceError> {
    let page = state
        .venue_service
        .search(
            &params.city_id,
            &params.sport,
            params.cursor.as_deref(),
            params.page_size,
        )
        .await?;

    Ok(Json(page))
}
