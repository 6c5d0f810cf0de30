//! ID token claims and the request-scoped identity derived from them.
//!
//! `sub` and `email` identify a person and are redacted in Debug output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The `aud` claim. The provider issues a single string, but the JWT format
/// also allows an array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    /// True when `project_id` is the audience (or one of them).
    pub fn contains(&self, project_id: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == project_id,
            Audience::Many(auds) => auds.iter().any(|a| a == project_id),
        }
    }
}

/// Claims of a provider-issued ID token.
#[derive(Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Provider user id - redacted in Debug output.
    pub sub: String,

    pub iss: String,

    pub aud: Audience,

    /// Issued-at (Unix epoch seconds).
    pub iat: i64,

    /// Expiration (Unix epoch seconds).
    pub exp: i64,

    /// Redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,
}

impl fmt::Debug for IdTokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdTokenClaims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("email_verified", &self.email_verified)
            .field("auth_time", &self.auth_time)
            .finish()
    }
}

/// Who is making the request. Attached to every request that passes a gate.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub user_id: String,
    pub email: String,
    pub is_authenticated: bool,
}

impl AuthenticatedIdentity {
    /// The identity for anonymous browsing.
    pub fn anonymous() -> Self {
        Self {
            user_id: String::new(),
            email: String::new(),
            is_authenticated: false,
        }
    }
}

impl From<&IdTokenClaims> for AuthenticatedIdentity {
    fn from(claims: &IdTokenClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            email: claims.email.clone().unwrap_or_default(),
            is_authenticated: true,
        }
    }
}

impl fmt::Debug for AuthenticatedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedIdentity")
            .field("user_id", &"[REDACTED]")
            .field("email", &"[REDACTED]")
            .field("is_authenticated", &self.is_authenticated)
            .finish()
    }
}
