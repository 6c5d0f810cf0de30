//! JWT structure utilities shared across Courtside components.
//!
//! Everything here works on the compact serialization only. Nothing in this
//! module checks a signature; callers must verify the token with the key the
//! header names before trusting any claim.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - The header must carry a non-empty `kid`
//! - Error messages are generic; details go to debug logs

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// ID tokens from the identity provider are typically around 1KB. Anything
/// over this limit is rejected before base64 decoding or any RSA work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default clock skew tolerance applied to `iat`.
///
/// Zero keeps the strict `iat <= now` rule.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(0);

/// Maximum configurable clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors from structural inspection of a token.
///
/// Display strings are intentionally identical so nothing about the failure
/// reaches a client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtFormatError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The token is invalid")]
    TokenTooLarge,

    /// Wrong segment count, bad base64, or a header that is not a JSON object.
    #[error("The token is invalid")]
    MalformedToken,

    /// Header has no usable `kid`.
    #[error("The token is invalid")]
    MissingKid,
}

// =============================================================================
// Header
// =============================================================================

/// The parts of a JOSE header we care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Signing key identifier.
    pub kid: String,

    /// Declared algorithm. Empty when the header omits it.
    pub alg: String,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    alg: Option<String>,
}

/// Split a compact token into its three segments.
///
/// # Errors
///
/// Returns `TokenTooLarge` for oversized input and `MalformedToken` when the
/// token does not have exactly three non-empty segments.
pub fn split_segments(token: &str) -> Result<[&str; 3], JwtFormatError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtFormatError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(
            target: "common.jwt",
            parts = token.split('.').count(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtFormatError::MalformedToken);
    };

    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty segment");
        return Err(JwtFormatError::MalformedToken);
    }

    Ok([header, payload, signature])
}

/// Decode the header of a compact token without verifying anything.
///
/// The returned `kid` is only fit for looking up a key in a trusted key set.
///
/// # Errors
///
/// - `TokenTooLarge` if the token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` for bad structure, base64, or JSON
/// - `MissingKid` if `kid` is absent, empty, or not a string
pub fn parse_header(token: &str) -> Result<TokenHeader, JwtFormatError> {
    let [header_part, _, _] = split_segments(token)?;

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtFormatError::MalformedToken
    })?;

    let value: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtFormatError::MalformedToken
    })?;

    if !value.is_object() {
        tracing::debug!(target: "common.jwt", "JWT header is not a JSON object");
        return Err(JwtFormatError::MalformedToken);
    }

    // A non-string kid fails here; report it as a missing kid.
    let raw: RawHeader =
        serde_json::from_value(value).map_err(|_| JwtFormatError::MissingKid)?;

    let kid = raw
        .kid
        .filter(|s| !s.is_empty())
        .ok_or(JwtFormatError::MissingKid)?;

    Ok(TokenHeader {
        kid,
        alg: raw.alg.unwrap_or_default(),
    })
}

/// Convenience wrapper returning only the `kid`.
///
/// # Errors
///
/// Same as [`parse_header`].
pub fn extract_kid(token: &str) -> Result<String, JwtFormatError> {
    parse_header(token).map(|h| h.kid)
}
