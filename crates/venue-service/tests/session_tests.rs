//! Cookie-session gate integration tests.
//!
//! Drives the HTML routes with session cookies against wiremock key and
//! token endpoints.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use common::clock::FixedClock;
use std::sync::Arc;
use venue_service::middleware::cookies::{refresh_cookie, session_cookie_at};
use venue_test_utils::{
    key_set_failure_mock, key_set_mock, mount_primary_keys, primary_key_map, refresh_mock,
    refresh_rejected_mock, refresh_unavailable_mock, sign_in_body, sign_in_mock,
    sign_in_rejected_mock, IdTokenBuilder, TestVenueServer,
};
use wiremock::MockServer;

const NOW: i64 = 1_700_000_000;

fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn cookie_for<'a>(cookies: &'a [String], name: &str) -> Option<&'a String> {
    let prefix = format!("{name}=");
    cookies.iter().find(|cookie| cookie.starts_with(&prefix))
}

async fn spawn_at_fixed_time(idp: &MockServer) -> Result<TestVenueServer> {
    TestVenueServer::spawn_with_clock(idp, Arc::new(FixedClock::new(NOW))).await
}

async fn get_home(server: &TestVenueServer, cookie: Option<&str>) -> Result<reqwest::Response> {
    let mut request = server.client().get(format!("{}/", server.url()));
    if let Some(cookie) = cookie {
        request = request.header("Cookie", cookie);
    }
    Ok(request.send().await?)
}

#[tokio::test]
async fn test_no_cookies_is_anonymous() -> Result<()> {
    let idp = MockServer::start().await;
    key_set_mock(primary_key_map()).expect(0).mount(&idp).await;
    let server = spawn_at_fixed_time(&idp).await?;

    let response = get_home(&server, None).await?;
    assert_eq!(response.status(), 200);
    assert!(set_cookies(&response).is_empty());

    let body = response.text().await?;
    assert!(body.contains("Find a place to play"));
    assert!(body.contains(r#"<a href="/login">Log in</a>"#));

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_valid_id_cookie_is_authenticated() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    refresh_rejected_mock("TOKEN_EXPIRED").expect(0).mount(&idp).await;
    let server = spawn_at_fixed_time(&idp).await?;

    let token = IdTokenBuilder::new(NOW - 60).build();
    let response = get_home(
        &server,
        Some(&format!("idToken={token}; refreshToken=refresh-1")),
    )
    .await?;

    assert_eq!(response.status(), 200);
    assert!(set_cookies(&response).is_empty());
    assert!(response
        .text()
        .await?
        .contains("Welcome back, player@example.com"));

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_expired_id_cookie_is_refreshed() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;

    let fresh = IdTokenBuilder::new(NOW).build();
    refresh_mock("refresh-1", &fresh, "refresh-1", "test-user")
        .expect(1)
        .mount(&idp)
        .await;
    let server = spawn_at_fixed_time(&idp).await?;

    let expired = IdTokenBuilder::new(NOW - 7200).build();
    let response = get_home(
        &server,
        Some(&format!("idToken={expired}; refreshToken=refresh-1")),
    )
    .await?;

    assert_eq!(response.status(), 200);

    let cookies = set_cookies(&response);
    assert_eq!(
        cookie_for(&cookies, "idToken"),
        Some(&session_cookie_at("idToken", &fresh, NOW + 3600))
    );
    // Unrotated refresh token is left alone
    assert_eq!(cookie_for(&cookies, "refreshToken"), None);

    assert!(response
        .text()
        .await?
        .contains("Welcome back, player@example.com"));

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_rotated_refresh_token_is_reissued() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;

    let fresh = IdTokenBuilder::new(NOW).build();
    refresh_mock("refresh-1", &fresh, "refresh-2", "test-user")
        .mount(&idp)
        .await;
    let server = spawn_at_fixed_time(&idp).await?;

    let expired = IdTokenBuilder::new(NOW - 7200).build();
    let response = get_home(
        &server,
        Some(&format!("idToken={expired}; refreshToken=refresh-1")),
    )
    .await?;

    let cookies = set_cookies(&response);
    assert!(cookie_for(&cookies, "idToken").is_some());
    assert_eq!(
        cookie_for(&cookies, "refreshToken"),
        Some(&refresh_cookie("refresh-2", NOW, 30))
    );
    Ok(())
}

#[tokio::test]
async fn test_garbage_id_cookie_is_refreshed() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;

    let fresh = IdTokenBuilder::new(NOW).build();
    refresh_mock("refresh-1", &fresh, "refresh-1", "test-user")
        .expect(1)
        .mount(&idp)
        .await;
    let server = spawn_at_fixed_time(&idp).await?;

    let response = get_home(&server, Some("idToken=not-a-jwt; refreshToken=refresh-1")).await?;

    assert!(cookie_for(&set_cookies(&response), "idToken").is_some());
    assert!(response.text().await?.contains("Welcome back"));

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_failed_refresh_clears_both_cookies() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    refresh_rejected_mock("INVALID_REFRESH_TOKEN")
        .expect(1)
        .mount(&idp)
        .await;
    let server = spawn_at_fixed_time(&idp).await?;

    let expired = IdTokenBuilder::new(NOW - 7200).build();
    let response = get_home(
        &server,
        Some(&format!("idToken={expired}; refreshToken=revoked")),
    )
    .await?;

    assert_eq!(response.status(), 200);

    let cookies = set_cookies(&response);
    let id = cookie_for(&cookies, "idToken").expect("idToken cleared");
    let refresh = cookie_for(&cookies, "refreshToken").expect("refreshToken cleared");
    assert!(id.starts_with("idToken=;"));
    assert!(id.contains("Max-Age=0"));
    assert!(refresh.starts_with("refreshToken=;"));
    assert!(refresh.contains("Max-Age=0"));

    assert!(response.text().await?.contains("Find a place to play"));

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_refresh_outage_keeps_cookies() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    refresh_unavailable_mock(503).expect(1).mount(&idp).await;
    let server = spawn_at_fixed_time(&idp).await?;

    let expired = IdTokenBuilder::new(NOW - 7200).build();
    let response = get_home(
        &server,
        Some(&format!("idToken={expired}; refreshToken=refresh-1")),
    )
    .await?;

    assert_eq!(response.status(), 200);
    assert!(set_cookies(&response).is_empty());
    assert!(response.text().await?.contains("Find a place to play"));

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_missing_refresh_cookie_clears_session() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    refresh_rejected_mock("MISSING_REFRESH_TOKEN")
        .expect(0)
        .mount(&idp)
        .await;
    let server = spawn_at_fixed_time(&idp).await?;

    let expired = IdTokenBuilder::new(NOW - 7200).build();
    let response = get_home(&server, Some(&format!("idToken={expired}"))).await?;

    let cookies = set_cookies(&response);
    assert!(cookie_for(&cookies, "idToken").is_some_and(|c| c.contains("Max-Age=0")));
    assert!(cookie_for(&cookies, "refreshToken").is_some_and(|c| c.contains("Max-Age=0")));

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_refreshed_token_for_other_subject_is_rejected() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;

    let someone_else = IdTokenBuilder::new(NOW).subject("intruder").build();
    refresh_mock("refresh-1", &someone_else, "refresh-1", "test-user")
        .mount(&idp)
        .await;
    let server = spawn_at_fixed_time(&idp).await?;

    let expired = IdTokenBuilder::new(NOW - 7200).build();
    let response = get_home(
        &server,
        Some(&format!("idToken={expired}; refreshToken=refresh-1")),
    )
    .await?;

    let cookies = set_cookies(&response);
    assert!(cookie_for(&cookies, "idToken").is_some_and(|c| c.contains("Max-Age=0")));
    assert!(response.text().await?.contains("Find a place to play"));
    Ok(())
}

#[tokio::test]
async fn test_key_outage_leaves_cookies_alone() -> Result<()> {
    let idp = MockServer::start().await;
    key_set_failure_mock(503).mount(&idp).await;
    refresh_rejected_mock("UNUSED").expect(0).mount(&idp).await;
    let server = spawn_at_fixed_time(&idp).await?;

    let token = IdTokenBuilder::new(NOW - 60).build();
    let response = get_home(
        &server,
        Some(&format!("idToken={token}; refreshToken=refresh-1")),
    )
    .await?;

    assert_eq!(response.status(), 200);
    assert!(set_cookies(&response).is_empty());
    assert!(response.text().await?.contains("Find a place to play"));

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_login_sets_session_cookies() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;

    let token = IdTokenBuilder::new(NOW).build();
    sign_in_mock(sign_in_body(
        &token,
        "refresh-1",
        "test-user",
        "player@example.com",
    ))
    .expect(1)
    .mount(&idp)
    .await;
    let server = spawn_at_fixed_time(&idp).await?;

    let response = server
        .client()
        .post(format!("{}/login", server.url()))
        .form(&[("email", "player@example.com"), ("password", "hunter22")])
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("hx-redirect").unwrap(), "/");

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert_eq!(
        cookie_for(&cookies, "idToken"),
        Some(&session_cookie_at("idToken", &token, NOW + 3600))
    );
    assert_eq!(
        cookie_for(&cookies, "refreshToken"),
        Some(&refresh_cookie("refresh-1", NOW, 30))
    );

    idp.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_login_rejected_renders_error_fragment() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    sign_in_rejected_mock("INVALID_LOGIN_CREDENTIALS")
        .mount(&idp)
        .await;
    let server = spawn_at_fixed_time(&idp).await?;

    let response = server
        .client()
        .post(format!("{}/login", server.url()))
        .form(&[("email", "player@example.com"), ("password", "wrong-one")])
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("hx-redirect").is_none());
    assert!(set_cookies(&response).is_empty());
    assert!(response
        .text()
        .await?
        .contains(r#"<div class="error">Invalid email or password</div>"#));
    Ok(())
}

#[tokio::test]
async fn test_logout_clears_cookies_once() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let server = spawn_at_fixed_time(&idp).await?;

    let token = IdTokenBuilder::new(NOW - 60).build();
    let response = server
        .client()
        .post(format!("{}/logout", server.url()))
        .header("Cookie", format!("idToken={token}; refreshToken=refresh-1"))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("hx-redirect").unwrap(), "/");

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    Ok(())
}

#[tokio::test]
async fn test_new_venue_page_redirects_anonymous_to_login() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let server = spawn_at_fixed_time(&idp).await?;

    let response = server
        .client()
        .get(format!("{}/wheretoplay/new", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 303);
    assert_eq!(response.headers().get("location").unwrap(), "/login");
    Ok(())
}

#[tokio::test]
async fn test_new_venue_page_for_signed_in_user() -> Result<()> {
    let idp = MockServer::start().await;
    mount_primary_keys(&idp).await;
    let server = spawn_at_fixed_time(&idp).await?;

    let token = IdTokenBuilder::new(NOW - 60).build();
    let response = server
        .client()
        .get(format!("{}/wheretoplay/new", server.url()))
        .header("Cookie", format!("idToken={token}"))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert!(response.text().await?.contains("Add a venue"));
    Ok(())
}
