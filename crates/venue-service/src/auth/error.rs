//! Authentication error taxonomy.
//!
//! Display strings are generic. Which check failed is only visible through
//! the variant itself and the debug logs.

use thiserror::Error;

/// Why a token could not produce an authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("The token is invalid")]
    MalformedToken,

    #[error("The token is invalid")]
    UnknownSigningKey,

    /// Signing keys could not be fetched. Transient, not a credential fault.
    #[error("Authentication is temporarily unavailable")]
    KeyUnavailable,

    #[error("The token is invalid")]
    InvalidSignature,

    #[error("The token is invalid")]
    Expired,

    #[error("The token is invalid")]
    NotYetValid,

    #[error("The token is invalid")]
    AudienceMismatch,

    #[error("The token is invalid")]
    IssuerMismatch,

    #[error("The session could not be refreshed")]
    RefreshFailed,
}

impl AuthError {
    /// Bounded label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownSigningKey => "unknown_signing_key",
            AuthError::KeyUnavailable => "key_unavailable",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::NotYetValid => "not_yet_valid",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::RefreshFailed => "refresh_failed",
        }
    }

    /// True when the failure says nothing about the credential itself.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::KeyUnavailable)
    }
}

/// Errors from the signing key cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyCacheError {
    /// The key id is absent even after a fresh fetch.
    #[error("Signing key not found")]
    NotFound,

    /// The key set could not be fetched or parsed.
    #[error("Failed to fetch signing keys: {0}")]
    Fetch(String),
}

impl From<KeyCacheError> for AuthError {
    fn from(err: KeyCacheError) -> Self {
        match err {
            KeyCacheError::NotFound => AuthError::UnknownSigningKey,
            KeyCacheError::Fetch(_) => AuthError::KeyUnavailable,
        }
    }
}
