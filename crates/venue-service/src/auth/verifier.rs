//! ID token verification.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Only RS256 is accepted; the declared `alg` must match
//! - Claims are checked against an injected clock, in a fixed order
//! - Failures carry a typed reason but a generic message

use crate::auth::claims::{AuthenticatedIdentity, IdTokenClaims};
use crate::auth::error::AuthError;
use crate::auth::keys::{KeyCache, SigningKey};
use common::clock::Clock;
use common::jwt::parse_header;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// The only accepted signing algorithm.
pub const EXPECTED_ALGORITHM: &str = "RS256";

/// Verifies provider-issued ID tokens against the shared key cache.
pub struct TokenVerifier {
    key_cache: KeyCache,
    project_id: String,
    expected_issuer: String,
    clock: Arc<dyn Clock>,
    /// Tolerance applied to `iat` only.
    clock_skew_seconds: i64,
}

impl TokenVerifier {
    /// Create a verifier for `project_id`. The expected issuer is
    /// `{issuer_prefix}/{project_id}`.
    pub fn new(
        key_cache: KeyCache,
        project_id: String,
        issuer_prefix: &str,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let expected_issuer = format!("{}/{}", issuer_prefix.trim_end_matches('/'), project_id);
        Self {
            key_cache,
            project_id,
            expected_issuer,
            clock,
            clock_skew_seconds: 0,
        }
    }

    /// Allow `iat` to sit up to `skew` in the future.
    #[must_use]
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew_seconds = i64::try_from(skew.as_secs()).unwrap_or(i64::MAX);
        self
    }

    pub fn expected_issuer(&self) -> &str {
        &self.expected_issuer
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn key_cache(&self) -> &KeyCache {
        &self.key_cache
    }

    /// Verify a token and return the identity it proves.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] except `RefreshFailed`.
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let claims = self.verify_claims(token).await?;
        Ok(AuthenticatedIdentity::from(&claims))
    }

    /// Verify a token and return its typed claims.
    ///
    /// Steps, each failing with its own variant:
    /// 1. structure and header (`MalformedToken`)
    /// 2. key lookup, one refetch on a miss (`UnknownSigningKey`, `KeyUnavailable`)
    /// 3. algorithm and RS256 signature (`InvalidSignature`)
    /// 4. claims, see [`TokenVerifier::check_claims`]
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] except `RefreshFailed`.
    #[instrument(skip_all, name = "venue.auth.verify")]
    pub async fn verify_claims(&self, token: &str) -> Result<IdTokenClaims, AuthError> {
        let header = parse_header(token).map_err(|e| {
            tracing::debug!(target: "venue.auth.verifier", error = ?e, "Token header rejected");
            AuthError::MalformedToken
        })?;

        let key = self.key_cache.ensure_key(&header.kid).await?;

        if header.alg != EXPECTED_ALGORITHM {
            tracing::warn!(
                target: "venue.auth.verifier",
                alg = %header.alg,
                "Token declares an unexpected algorithm"
            );
            return Err(AuthError::InvalidSignature);
        }

        let claims = verify_signature(token, &key)?;
        self.check_claims(&claims)?;

        tracing::debug!(target: "venue.auth.verifier", "Token verified");
        Ok(claims)
    }

    /// Check time, audience and issuer claims, in that order.
    ///
    /// # Errors
    ///
    /// `Expired`, `NotYetValid`, `AudienceMismatch` or `IssuerMismatch`.
    pub fn check_claims(&self, claims: &IdTokenClaims) -> Result<(), AuthError> {
        let now = self.clock.now_unix();

        if claims.exp <= now {
            tracing::debug!(target: "venue.auth.verifier", exp = claims.exp, now = now, "Token expired");
            return Err(AuthError::Expired);
        }

        if claims.iat > now.saturating_add(self.clock_skew_seconds) {
            tracing::debug!(
                target: "venue.auth.verifier",
                iat = claims.iat,
                now = now,
                clock_skew_secs = self.clock_skew_seconds,
                "Token issued in the future"
            );
            return Err(AuthError::NotYetValid);
        }

        if !claims.aud.contains(&self.project_id) {
            tracing::debug!(target: "venue.auth.verifier", aud = ?claims.aud, "Audience mismatch");
            return Err(AuthError::AudienceMismatch);
        }

        if claims.iss != self.expected_issuer {
            tracing::debug!(target: "venue.auth.verifier", iss = %claims.iss, "Issuer mismatch");
            return Err(AuthError::IssuerMismatch);
        }

        Ok(())
    }
}

/// Verify the RS256 signature and decode the claims.
///
/// Time and audience validation are disabled here; [`TokenVerifier::check_claims`]
/// owns them so the failure reason stays precise.
fn verify_signature(token: &str, key: &SigningKey) -> Result<IdTokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<IdTokenClaims>(token, key.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                tracing::debug!(target: "venue.auth.verifier", error = %e, "Token claims malformed");
                AuthError::MalformedToken
            }
            _ => {
                tracing::debug!(target: "venue.auth.verifier", error = %e, "Token signature rejected");
                AuthError::InvalidSignature
            }
        })
}
