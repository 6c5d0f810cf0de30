//! Token verification and bearer gate integration tests.
//!
//! Runs the real router and key cache against a wiremock key endpoint.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use common::clock::{Clock, FixedClock, SystemClock};
use std::sync::Arc;
use venue_service::auth::AuthError;
use venue_test_utils::{
    key_map_json, key_set_failure_mock, key_set_mock, mount_primary_keys, primary_key_map,
    tamper_signature, IdTokenBuilder, TestVenueServer, PRIMARY_CERTIFICATE_PEM, PRIMARY_KID,
    SECONDARY_KID, SECONDARY_PRIVATE_KEY_PEM, TEST_ISSUER_PREFIX,
};
use wiremock::MockServer;

fn now() -> i64 {
    SystemClock.now_unix()
}

async fn get_me(server: &TestVenueServer, authorization: Option<&str>) -> Result<reqwest::Response> {
    let mut request = server.client().get(format!("{}/api/v1/me", server.url()));
    if let Some(value) = authorization {
        request = request.header("Authorization", value);
    }
    Ok(request.send().await?)
}

#[tokio::test]
async fn test_valid_token_reaches_handler() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;

    let token = IdTokenBuilder::new(now())
        .subject("uid-42")
        .email("keeper@example.com")
        .build();

    let response = get_me(&server, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["user_id"], "uid-42");
    assert_eq!(body["email"], "keeper@example.com");
    Ok(())
}

#[tokio::test]
async fn test_verification_is_idempotent() -> Result<()> {
    let idp = MockServer::start().await;
    key_set_mock(primary_key_map()).expect(1).mount(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;
    let verifier = &server.state().verifier;

    let token = IdTokenBuilder::new(now()).build();
    let first = verifier.verify(&token).await?;
    let second = verifier.verify(&token).await?;

    assert_eq!(first, second);
    assert!(first.is_authenticated);
    assert_eq!(first.user_id, "test-user");
    assert_eq!(first.email, "player@example.com");
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_rejected() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let clock = Arc::new(FixedClock::new(1_700_000_000));
    let server = TestVenueServer::spawn_with_clock(&idp, clock.clone()).await?;

    let builder = IdTokenBuilder::new(1_700_000_000 - 7200);
    assert!(builder.exp() < clock.now_unix());
    let token = builder.build();

    assert_eq!(
        server.state().verifier.verify(&token).await,
        Err(AuthError::Expired)
    );

    let response = get_me(&server, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 403);
    Ok(())
}

#[tokio::test]
async fn test_token_expiring_exactly_now_is_expired() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let clock = Arc::new(FixedClock::new(1_700_000_000));
    let server = TestVenueServer::spawn_with_clock(&idp, clock.clone()).await?;

    let token = IdTokenBuilder::new(1_700_000_000 - 60)
        .expires_at(1_700_000_000)
        .build();

    assert_eq!(
        server.state().verifier.verify(&token).await,
        Err(AuthError::Expired)
    );
    Ok(())
}

#[tokio::test]
async fn test_token_issued_in_the_future_is_not_yet_valid() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let clock = Arc::new(FixedClock::new(1_700_000_000));
    let server = TestVenueServer::spawn_with_clock(&idp, clock).await?;

    let token = IdTokenBuilder::new(1_700_000_000 + 120).build();

    assert_eq!(
        server.state().verifier.verify(&token).await,
        Err(AuthError::NotYetValid)
    );
    Ok(())
}

#[tokio::test]
async fn test_audience_and_issuer_must_match_project() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;
    let verifier = &server.state().verifier;

    let wrong_aud = IdTokenBuilder::new(now()).audience("someone-else").build();
    assert_eq!(
        verifier.verify(&wrong_aud).await,
        Err(AuthError::AudienceMismatch)
    );

    let wrong_iss = IdTokenBuilder::new(now())
        .issuer(&format!("{TEST_ISSUER_PREFIX}/someone-else"))
        .build();
    assert_eq!(
        verifier.verify(&wrong_iss).await,
        Err(AuthError::IssuerMismatch)
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_kid_fails_after_one_refetch() -> Result<()> {
    let idp = MockServer::start().await;
    // One fetch to warm the cache, exactly one more for the unknown kid
    key_set_mock(primary_key_map()).expect(2).mount(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;
    let verifier = &server.state().verifier;

    verifier.verify(&IdTokenBuilder::new(now()).build()).await?;

    let rotated = IdTokenBuilder::new(now())
        .signing_key(SECONDARY_KID, SECONDARY_PRIVATE_KEY_PEM)
        .build();
    assert_eq!(
        verifier.verify(&rotated).await,
        Err(AuthError::UnknownSigningKey)
    );

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_tampered_signature_is_rejected() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;

    let token = tamper_signature(&IdTokenBuilder::new(now()).build());

    assert_eq!(
        server.state().verifier.verify(&token).await,
        Err(AuthError::InvalidSignature)
    );

    let response = get_me(&server, Some(&format!("Bearer {token}"))).await?;
    assert_eq!(response.status(), 403);
    Ok(())
}

#[tokio::test]
async fn test_key_signed_under_wrong_kid_is_rejected() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;

    // Advertises the primary kid but is signed with the secondary key
    let token = IdTokenBuilder::new(now())
        .signing_key(PRIMARY_KID, SECONDARY_PRIVATE_KEY_PEM)
        .build();

    assert_eq!(
        server.state().verifier.verify(&token).await,
        Err(AuthError::InvalidSignature)
    );
    Ok(())
}

#[tokio::test]
async fn test_wrong_scheme_is_forbidden_without_verification() -> Result<()> {
    let idp = MockServer::start().await;
    key_set_mock(primary_key_map()).expect(0).mount(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;

    let response = get_me(&server, Some("Basic xyz")).await?;
    assert_eq!(response.status(), 403);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_missing_header_is_forbidden() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;

    let response = get_me(&server, None).await?;
    assert_eq!(response.status(), 403);
    Ok(())
}

#[tokio::test]
async fn test_failures_share_one_response_body() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let clock = Arc::new(FixedClock::new(1_700_000_000));
    let server = TestVenueServer::spawn_with_clock(&idp, clock).await?;

    let expired = IdTokenBuilder::new(1_700_000_000 - 7200).build();
    let tampered = tamper_signature(&IdTokenBuilder::new(1_700_000_000).build());

    let a: serde_json::Value = get_me(&server, Some(&format!("Bearer {expired}")))
        .await?
        .json()
        .await?;
    let b: serde_json::Value = get_me(&server, Some(&format!("Bearer {tampered}")))
        .await?
        .json()
        .await?;
    let c: serde_json::Value = get_me(&server, Some("Bearer garbage")).await?.json().await?;

    assert_eq!(a, b);
    assert_eq!(b, c);
    Ok(())
}

#[tokio::test]
async fn test_key_endpoint_failure_keeps_prior_keys() -> Result<()> {
    let idp = MockServer::start().await;
    key_set_mock(primary_key_map())
        .up_to_n_times(1)
        .mount(&idp)
        .await;
    key_set_failure_mock(500).mount(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;
    let verifier = &server.state().verifier;

    let token = IdTokenBuilder::new(now()).build();
    verifier.verify(&token).await?;
    let fetched_at = verifier.key_cache().last_fetched_at().await;

    assert!(verifier.key_cache().refresh().await.is_err());
    assert_eq!(verifier.key_cache().key_count().await, 1);
    assert_eq!(verifier.key_cache().last_fetched_at().await, fetched_at);

    // Cached key still verifies
    verifier.verify(&token).await?;

    // A miss now surfaces the outage, not a credential fault
    let rotated = IdTokenBuilder::new(now())
        .signing_key(SECONDARY_KID, SECONDARY_PRIVATE_KEY_PEM)
        .build();
    assert_eq!(
        verifier.verify(&rotated).await,
        Err(AuthError::KeyUnavailable)
    );
    Ok(())
}

#[tokio::test]
async fn test_certificate_key_map_verifies() -> Result<()> {
    let idp = MockServer::start().await;
    key_set_mock(key_map_json(&[(PRIMARY_KID, PRIMARY_CERTIFICATE_PEM)]))
        .mount(&idp)
        .await;
    let server = TestVenueServer::spawn(&idp).await?;

    let identity = server
        .state()
        .verifier
        .verify(&IdTokenBuilder::new(now()).build())
        .await?;
    assert_eq!(identity.user_id, "test-user");
    Ok(())
}

#[tokio::test]
async fn test_concurrent_misses_share_one_fetch() -> Result<()> {
    let idp = MockServer::start().await;
    key_set_mock(primary_key_map()).expect(1).mount(&idp).await;
    let server = TestVenueServer::spawn(&idp).await?;

    let token = IdTokenBuilder::new(now()).build();
    let verifier = Arc::clone(&server.state().verifier);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let verifier = Arc::clone(&verifier);
        let token = token.clone();
        handles.push(tokio::spawn(async move { verifier.verify(&token).await }));
    }
    for handle in handles {
        assert!(handle.await?.is_ok());
    }

    idp.verify().await;
    Ok(())
}
