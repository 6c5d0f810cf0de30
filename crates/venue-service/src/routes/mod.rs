//! HTTP routes for the venue service.
//!
//! Defines the Axum router and application state.

use crate::auth::{KeyCache, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{
    http_metrics_middleware, require_bearer, require_json, session_gate, BearerState,
    SessionState,
};
use crate::repositories::{InMemoryUserRepository, InMemoryVenueRepository};
use crate::services::{IdentityProvider, IdentityToolkitClient, UserService, VenueService};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use common::clock::Clock;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,

    /// Shared by both gates and the readiness probe.
    pub verifier: Arc<TokenVerifier>,

    pub identity: Arc<dyn IdentityProvider>,

    pub clock: Arc<dyn Clock>,

    pub user_service: Arc<UserService>,

    pub venue_service: Arc<VenueService>,
}

impl AppState {
    /// Wire the key cache, verifier, provider client and in-memory
    /// repositories from configuration.
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Self {
        let key_cache = KeyCache::new(config.keys_url.clone());
        let verifier = Arc::new(
            TokenVerifier::new(
                key_cache,
                config.project_id.clone(),
                &config.issuer_prefix,
                Arc::clone(&clock),
            )
            .with_clock_skew(config.jwt_clock_skew()),
        );

        let identity: Arc<dyn IdentityProvider> = Arc::new(IdentityToolkitClient::new(
            config.auth_url.clone(),
            config.token_url.clone(),
            config.api_key.clone(),
        ));

        let user_service = Arc::new(UserService::new(
            Arc::clone(&identity),
            Arc::new(InMemoryUserRepository::new()),
        ));
        let venue_service = Arc::new(VenueService::new(Arc::new(InMemoryVenueRepository::new())));

        Self {
            config,
            verifier,
            identity,
            clock,
            user_service,
            venue_service,
        }
    }
}

/// Build the application routes.
///
/// - `/health`, `/ready`, `/metrics` - operational, no gate
/// - `/api/v1/users` (POST), `/api/v1/pois` (GET) - public API
/// - `/api/v1/me`, `/api/v1/pois` (POST) - bearer gate
/// - HTML pages - cookie-session gate
///
/// API bodies pass the JSON content-type guard before the bearer gate.
/// TraceLayer, a 30 second timeout and HTTP metrics (outermost) wrap
/// everything.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let bearer_state = Arc::new(BearerState {
        verifier: Arc::clone(&state.verifier),
    });
    let session_state = Arc::new(SessionState {
        verifier: Arc::clone(&state.verifier),
        identity: Arc::clone(&state.identity),
        clock: Arc::clone(&state.clock),
        refresh_cookie_ttl_days: state.config.refresh_cookie_ttl_days,
    });

    let operational_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let public_api_routes = Router::new()
        .route("/api/v1/users", post(handlers::register_user))
        .route("/api/v1/pois", get(handlers::search_venues))
        .with_state(state.clone());

    let protected_api_routes = Router::new()
        .route("/api/v1/me", get(handlers::get_me))
        .route("/api/v1/pois", post(handlers::create_venue))
        .route_layer(middleware::from_fn_with_state(bearer_state, require_bearer))
        .with_state(state.clone());

    let api_routes = public_api_routes
        .merge(protected_api_routes)
        .layer(middleware::from_fn(require_json));

    let page_routes = Router::new()
        .route("/", get(handlers::pages::home))
        .route(
            "/login",
            get(handlers::pages::login_page).post(handlers::pages::login),
        )
        .route("/logout", post(handlers::pages::logout))
        .route(
            "/register",
            get(handlers::pages::register_page).post(handlers::pages::register),
        )
        .route("/wheretoplay", get(handlers::pages::where_to_play))
        .route("/wheretoplay/search", get(handlers::pages::search))
        .route(
            "/wheretoplay/new",
            get(handlers::pages::new_venue_page).post(handlers::pages::create_venue),
        )
        .route(
            "/wheretoplay/:sport/:venue_id",
            get(handlers::pages::venue_details),
        )
        .route_layer(middleware::from_fn_with_state(session_state, session_gate))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TraceLayer (innermost)
    // 2. TimeoutLayer
    // 3. http_metrics_middleware (outermost, sees 404/405/415)
    operational_routes
        .merge(metrics_routes)
        .merge(api_routes)
        .merge(page_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
