//! Test server harness for E2E testing
//!
//! Provides `TestVenueServer` for spawning the real router against a
//! wiremock identity provider.

use crate::idp_mock::{auth_url, keys_url, token_url, TEST_API_KEY};
use crate::token_builders::{TEST_ISSUER_PREFIX, TEST_PROJECT_ID};
use common::clock::{Clock, SystemClock};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use venue_service::config::Config;
use venue_service::routes::{self, AppState};
use wiremock::MockServer;

/// A running venue service bound to a random local port.
///
/// # Example
/// ```rust,ignore
/// let idp = MockServer::start().await;
/// mount_primary_keys(&idp).await;
/// let server = TestVenueServer::spawn(&idp).await?;
/// let response = reqwest::get(format!("{}/ready", server.url())).await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestVenueServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestVenueServer {
    /// Spawn with the system clock.
    pub async fn spawn(idp: &MockServer) -> Result<Self, anyhow::Error> {
        Self::spawn_with_clock(idp, Arc::new(SystemClock)).await
    }

    /// Spawn with an injected clock, e.g. a `FixedClock` for expiry
    /// scenarios.
    pub async fn spawn_with_clock(
        idp: &MockServer,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&test_vars(idp))
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::new(config, clock));

        // A local recorder handle; nothing is installed globally, so tests
        // in one binary do not fight over the recorder.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(Arc::clone(&state), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared state, e.g. to inspect the key cache.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// A client that neither follows redirects nor keeps cookies, so tests
    /// see `Location` and `Set-Cookie` exactly as sent.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("test client should build")
    }
}

impl Drop for TestVenueServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

/// Environment for a server pointed at `idp`.
pub fn test_vars(idp: &MockServer) -> HashMap<String, String> {
    HashMap::from([
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("IDP_PROJECT_ID".to_string(), TEST_PROJECT_ID.to_string()),
        ("IDP_API_KEY".to_string(), TEST_API_KEY.to_string()),
        ("IDP_KEYS_URL".to_string(), keys_url(idp)),
        ("IDP_AUTH_URL".to_string(), auth_url(idp)),
        ("IDP_TOKEN_URL".to_string(), token_url(idp)),
        ("IDP_ISSUER_PREFIX".to_string(), TEST_ISSUER_PREFIX.to_string()),
        ("KEY_REFRESH_INTERVAL_SECONDS".to_string(), "0".to_string()),
    ])
}
