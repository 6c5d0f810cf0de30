//! Identity provider endpoints on a wiremock server.
//!
//! Paths mirror the real provider: keys at [`KEYS_PATH`], password calls
//! under [`AUTH_PATH`], the refresh grant at [`TOKEN_PATH`]. Builders
//! return a [`Mock`] so tests can add `.expect(n)` before mounting.

use crate::crypto_fixtures::primary_key_map;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const KEYS_PATH: &str = "/keys";
pub const AUTH_PATH: &str = "/v1";
pub const TOKEN_PATH: &str = "/v1/token";
pub const TEST_API_KEY: &str = "test-api-key";

pub fn keys_url(server: &MockServer) -> String {
    format!("{}{KEYS_PATH}", server.uri())
}

pub fn auth_url(server: &MockServer) -> String {
    format!("{}{AUTH_PATH}", server.uri())
}

pub fn token_url(server: &MockServer) -> String {
    format!("{}{TOKEN_PATH}", server.uri())
}

/// Key endpoint answering with `key_map`.
pub fn key_set_mock(key_map: Value) -> Mock {
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(key_map))
}

/// Key endpoint failing with `status`.
pub fn key_set_failure_mock(status: u16) -> Mock {
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(ResponseTemplate::new(status))
}

/// Serve the primary fixture key.
pub async fn mount_primary_keys(server: &MockServer) {
    key_set_mock(primary_key_map()).mount(server).await;
}

/// The provider's sign-in / sign-up success body.
pub fn sign_in_body(id_token: &str, refresh_token: &str, local_id: &str, email: &str) -> Value {
    json!({
        "kind": "identitytoolkit#VerifyPasswordResponse",
        "localId": local_id,
        "email": email,
        "displayName": "",
        "idToken": id_token,
        "registered": true,
        "refreshToken": refresh_token,
        "expiresIn": "3600",
    })
}

/// The provider's error body for `reason`.
pub fn provider_error_body(status: u16, reason: &str) -> Value {
    json!({
        "error": {
            "code": status,
            "message": reason,
            "errors": [{"message": reason, "domain": "global", "reason": "invalid"}],
        }
    })
}

fn accounts_mock(operation: &str, template: ResponseTemplate) -> Mock {
    Mock::given(method("POST"))
        .and(path(format!("{AUTH_PATH}/accounts:{operation}")))
        .and(query_param("key", TEST_API_KEY))
        .respond_with(template)
}

pub fn sign_in_mock(body: Value) -> Mock {
    accounts_mock(
        "signInWithPassword",
        ResponseTemplate::new(200).set_body_json(body),
    )
}

pub fn sign_in_rejected_mock(reason: &str) -> Mock {
    accounts_mock(
        "signInWithPassword",
        ResponseTemplate::new(400).set_body_json(provider_error_body(400, reason)),
    )
}

pub fn sign_up_mock(body: Value) -> Mock {
    accounts_mock("signUp", ResponseTemplate::new(200).set_body_json(body))
}

pub fn sign_up_rejected_mock(reason: &str) -> Mock {
    accounts_mock(
        "signUp",
        ResponseTemplate::new(400).set_body_json(provider_error_body(400, reason)),
    )
}

/// Refresh grant accepting `refresh_token` and answering with a new ID
/// token (and possibly rotated refresh token) for `user_id`.
pub fn refresh_mock(
    refresh_token: &str,
    new_id_token: &str,
    new_refresh_token: &str,
    user_id: &str,
) -> Mock {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(query_param("key", TEST_API_KEY))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains(format!("refresh_token={refresh_token}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": "3600",
            "token_type": "Bearer",
            "refresh_token": new_refresh_token,
            "id_token": new_id_token,
            "user_id": user_id,
            "project_id": "1234567890",
        })))
}

/// Refresh grant endpoint failing with a server error.
pub fn refresh_unavailable_mock(status: u16) -> Mock {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(status))
}

/// Refresh grant rejecting every refresh token.
pub fn refresh_rejected_mock(reason: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(provider_error_body(400, reason)),
        )
}
