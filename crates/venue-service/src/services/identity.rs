//! Identity provider client.
//!
//! Password sign-in, account creation and the refresh-grant exchange. The
//! rest of the service only sees the [`IdentityProvider`] trait.
//!
//! # Security
//!
//! - Passwords, refresh tokens and the API key are `SecretString`
//! - Timeouts prevent hanging connections
//! - Provider error bodies are logged by reason code only

use crate::observability::metrics::record_idp_request;
use common::secret::{ExposeSecret, SecretString};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

const IDP_REQUEST_TIMEOUT_SECS: u64 = 10;
const IDP_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The provider refused the request (4xx). Carries the provider's reason
    /// code, e.g. `EMAIL_EXISTS` or `INVALID_LOGIN_CREDENTIALS`.
    #[error("Identity provider rejected the request: {0}")]
    Rejected(String),

    /// Network failure or 5xx.
    #[error("Identity provider unavailable")]
    Unavailable,

    #[error("Identity provider returned an invalid response")]
    InvalidResponse,
}

impl IdentityError {
    pub fn as_label(&self) -> &'static str {
        match self {
            IdentityError::Rejected(_) => "rejected",
            IdentityError::Unavailable => "unavailable",
            IdentityError::InvalidResponse => "invalid_response",
        }
    }
}

/// Credentials returned by sign-in and sign-up.
#[derive(Clone)]
pub struct SignInResponse {
    pub id_token: String,
    pub refresh_token: SecretString,
    /// ID token lifetime in seconds.
    pub expires_in: i64,
    /// Provider user id.
    pub local_id: String,
    pub email: String,
}

impl fmt::Debug for SignInResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInResponse")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token)
            .field("expires_in", &self.expires_in)
            .field("local_id", &"[REDACTED]")
            .field("email", &"[REDACTED]")
            .finish()
    }
}

/// Result of a refresh-grant exchange.
#[derive(Clone)]
pub struct RefreshedTokens {
    pub id_token: String,
    /// The provider may rotate the refresh token.
    pub refresh_token: SecretString,
    pub expires_in: i64,
    pub user_id: String,
}

impl fmt::Debug for RefreshedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedTokens")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token)
            .field("expires_in", &self.expires_in)
            .field("user_id", &"[REDACTED]")
            .finish()
    }
}

/// Remote identity service.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignInResponse, IdentityError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignInResponse, IdentityError>;

    async fn refresh(&self, refresh_token: &SecretString)
        -> Result<RefreshedTokens, IdentityError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWire {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct RefreshWire {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: String,
}

fn parse_expires_in(raw: &str) -> Result<i64, IdentityError> {
    raw.trim().parse::<i64>().map_err(|_| {
        tracing::error!(target: "venue.services.identity", "expiresIn is not an integer");
        IdentityError::InvalidResponse
    })
}

impl TryFrom<SignInWire> for SignInResponse {
    type Error = IdentityError;

    fn try_from(wire: SignInWire) -> Result<Self, Self::Error> {
        Ok(Self {
            expires_in: parse_expires_in(&wire.expires_in)?,
            id_token: wire.id_token,
            refresh_token: SecretString::from(wire.refresh_token),
            local_id: wire.local_id,
            email: wire.email,
        })
    }
}

impl TryFrom<RefreshWire> for RefreshedTokens {
    type Error = IdentityError;

    fn try_from(wire: RefreshWire) -> Result<Self, Self::Error> {
        Ok(Self {
            expires_in: parse_expires_in(&wire.expires_in)?,
            id_token: wire.id_token,
            refresh_token: SecretString::from(wire.refresh_token),
            user_id: wire.user_id,
        })
    }
}

/// HTTP client for the provider's REST API.
pub struct IdentityToolkitClient {
    auth_url: String,
    token_url: String,
    api_key: SecretString,
    http_client: Client,
}

impl IdentityToolkitClient {
    pub fn new(auth_url: String, token_url: String, api_key: SecretString) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(IDP_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(IDP_CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "venue.services.identity", error = %e, "Failed to build HTTP client with custom config, using defaults");
                Client::new()
            });

        Self {
            auth_url: auth_url.trim_end_matches('/').to_string(),
            token_url,
            api_key,
            http_client,
        }
    }

    async fn password_exchange(
        &self,
        operation: &'static str,
        endpoint: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<SignInResponse, IdentityError> {
        let start = Instant::now();
        let url = format!("{}/accounts:{}", self.auth_url, endpoint);
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
            "returnSecureToken": true,
        });

        let result = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&body)
            .send()
            .await;

        let outcome = match result {
            Ok(response) => handle_response::<SignInWire>(operation, response)
                .await
                .and_then(SignInResponse::try_from),
            Err(e) => {
                tracing::error!(target: "venue.services.identity", operation, error = %e, "Identity provider request failed");
                Err(IdentityError::Unavailable)
            }
        };

        record_idp_request(operation, status_label(&outcome), start.elapsed());
        outcome
    }
}

#[async_trait::async_trait]
impl IdentityProvider for IdentityToolkitClient {
    #[instrument(skip_all, name = "venue.services.identity.sign_in")]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignInResponse, IdentityError> {
        self.password_exchange("sign_in", "signInWithPassword", email, password)
            .await
    }

    #[instrument(skip_all, name = "venue.services.identity.sign_up")]
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignInResponse, IdentityError> {
        self.password_exchange("sign_up", "signUp", email, password)
            .await
    }

    #[instrument(skip_all, name = "venue.services.identity.refresh")]
    async fn refresh(
        &self,
        refresh_token: &SecretString,
    ) -> Result<RefreshedTokens, IdentityError> {
        let start = Instant::now();

        let result = self
            .http_client
            .post(&self.token_url)
            .query(&[("key", self.api_key.expose_secret())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
            ])
            .send()
            .await;

        let outcome = match result {
            Ok(response) => handle_response::<RefreshWire>("refresh", response)
                .await
                .and_then(RefreshedTokens::try_from),
            Err(e) => {
                tracing::error!(target: "venue.services.identity", error = %e, "Refresh-grant request failed");
                Err(IdentityError::Unavailable)
            }
        };

        record_idp_request("refresh", status_label(&outcome), start.elapsed());
        outcome
    }
}

fn status_label<T>(outcome: &Result<T, IdentityError>) -> &'static str {
    match outcome {
        Ok(_) => "success",
        Err(e) => e.as_label(),
    }
}

async fn handle_response<T: DeserializeOwned>(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<T, IdentityError> {
    let status = response.status();

    if status.is_success() {
        response.json().await.map_err(|e| {
            tracing::error!(target: "venue.services.identity", operation, error = %e, "Failed to parse provider response");
            IdentityError::InvalidResponse
        })
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(target: "venue.services.identity", operation, status = %status, "Provider returned server error");
        Err(IdentityError::Unavailable)
    } else {
        let reason = response
            .json::<ProviderErrorBody>()
            .await
            .map(|b| reason_code(&b.error.message))
            .unwrap_or_else(|_| format!("HTTP_{}", status.as_u16()));
        tracing::info!(target: "venue.services.identity", operation, status = %status, reason = %reason, "Provider rejected request");
        Err(IdentityError::Rejected(reason))
    }
}

/// The provider sometimes appends detail, e.g.
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
fn reason_code(message: &str) -> String {
    message
        .split(" : ")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
