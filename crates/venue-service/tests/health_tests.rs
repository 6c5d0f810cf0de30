//! Health, readiness and metrics endpoint tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use venue_test_utils::{key_set_failure_mock, mount_primary_keys, TestVenueServer};
use wiremock::MockServer;

#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<()> {
    let idp = MockServer::start().await;
    let server = TestVenueServer::spawn(&idp).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_ready_fetches_keys_when_cache_is_empty() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;
    assert_eq!(server.state().verifier.key_cache().key_count().await, 0);

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(server.state().verifier.key_cache().key_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_ready_reports_unavailable_keys() -> Result<()> {
    let idp = MockServer::start().await;
    key_set_failure_mock(500).mount(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 503);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["signing_keys"], "unavailable");
    assert_eq!(body["error"], "Service dependencies unavailable");
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_exposed() -> Result<()> {
    let idp = MockServer::start().await;
    let server = TestVenueServer::spawn(&idp).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<()> {
    let idp = MockServer::start().await;
    let server = TestVenueServer::spawn(&idp).await?;

    let response = reqwest::get(format!("{}/api/v1/nope", server.url())).await?;
    assert_eq!(response.status(), 404);
    Ok(())
}
