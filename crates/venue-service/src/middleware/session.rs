//! Cookie-session gate for the HTML routes.
//!
//! Never rejects a request. Every request leaves with an
//! [`AuthenticatedIdentity`] extension, anonymous when the session cookies
//! cannot be confirmed.
//!
//! | ID token cookie            | Result                                        |
//! |----------------------------|-----------------------------------------------|
//! | absent                     | anonymous                                     |
//! | valid                      | authenticated                                 |
//! | keys unavailable           | anonymous, cookies untouched                  |
//! | any other failure          | refresh grant                                 |
//! | refresh grant succeeds     | authenticated, fresh `idToken` cookie         |
//! | refresh grant rejected     | anonymous, both cookies cleared               |
//! | provider unavailable       | anonymous, cookies untouched                  |

use crate::auth::{AuthError, AuthenticatedIdentity, TokenVerifier};
use crate::middleware::cookies::{
    append_set_cookies, cleared_session_cookies, read_cookie, refresh_cookie, session_cookie_at,
    sets_cookie, ID_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::observability::metrics::{record_session_refresh, record_token_validation};
use crate::services::identity::{IdentityError, IdentityProvider};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use common::clock::Clock;
use common::secret::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::instrument;

/// State for the cookie-session gate.
#[derive(Clone)]
pub struct SessionState {
    pub verifier: Arc<TokenVerifier>,
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Arc<dyn Clock>,
    /// Lifetime of a re-issued refresh cookie.
    pub refresh_cookie_ttl_days: i64,
}

/// Identity for the request plus cookies to set on the way out.
struct SessionOutcome {
    identity: AuthenticatedIdentity,
    set_cookies: Vec<(&'static str, String)>,
}

impl SessionOutcome {
    fn anonymous() -> Self {
        Self {
            identity: AuthenticatedIdentity::anonymous(),
            set_cookies: Vec::new(),
        }
    }

    fn cleared() -> Self {
        let [id, refresh] = cleared_session_cookies();
        Self {
            identity: AuthenticatedIdentity::anonymous(),
            set_cookies: vec![(ID_TOKEN_COOKIE, id), (REFRESH_TOKEN_COOKIE, refresh)],
        }
    }
}

/// Attach the session identity and, after the handler runs, any cookie
/// updates the session needs.
///
/// A cookie the handler already set (login, logout) wins over the gate's.
#[instrument(skip_all, name = "venue.middleware.session")]
pub async fn session_gate(
    State(state): State<Arc<SessionState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let outcome = resolve_session(&state, req.headers()).await;

    req.extensions_mut().insert(outcome.identity);

    let mut response = next.run(req).await;

    let pending: Vec<String> = outcome
        .set_cookies
        .into_iter()
        .filter(|(name, _)| !sets_cookie(response.headers(), name))
        .map(|(_, cookie)| cookie)
        .collect();
    append_set_cookies(response.headers_mut(), pending);

    response
}

async fn resolve_session(state: &SessionState, headers: &HeaderMap) -> SessionOutcome {
    let Some(id_token) = read_cookie(headers, ID_TOKEN_COOKIE) else {
        return SessionOutcome::anonymous();
    };

    match state.verifier.verify(id_token).await {
        Ok(identity) => {
            record_token_validation("cookie", "success");
            return SessionOutcome {
                identity,
                set_cookies: Vec::new(),
            };
        }
        Err(e) if e.is_transient() => {
            record_token_validation("cookie", e.as_label());
            tracing::warn!(
                target: "venue.middleware.session",
                "Signing keys unavailable, continuing anonymously"
            );
            return SessionOutcome::anonymous();
        }
        Err(e) => {
            record_token_validation("cookie", e.as_label());
            tracing::debug!(
                target: "venue.middleware.session",
                reason = e.as_label(),
                "ID token rejected, attempting refresh"
            );
        }
    }

    match refresh_session(state, headers).await {
        Ok(outcome) => {
            record_session_refresh("success", None);
            tracing::debug!(target: "venue.middleware.session", "Session refreshed");
            outcome
        }
        Err(RefreshFailure::Unavailable) => {
            record_session_refresh("error", Some("unavailable"));
            tracing::warn!(
                target: "venue.middleware.session",
                "Session refresh unavailable, continuing anonymously"
            );
            SessionOutcome::anonymous()
        }
        Err(RefreshFailure::Rejected) => {
            record_session_refresh("error", Some(AuthError::RefreshFailed.as_label()));
            tracing::info!(
                target: "venue.middleware.session",
                "Session refresh failed, clearing session cookies"
            );
            SessionOutcome::cleared()
        }
    }
}

/// Why a refresh produced no session.
enum RefreshFailure {
    /// Provider or signing keys unreachable. The refresh token may still be
    /// good, so cookies stay.
    Unavailable,
    /// The refresh credential or its result is bad.
    Rejected,
}

/// Exchange the refresh cookie for a new ID token and verify it.
async fn refresh_session(
    state: &SessionState,
    headers: &HeaderMap,
) -> Result<SessionOutcome, RefreshFailure> {
    let refresh_token = read_cookie(headers, REFRESH_TOKEN_COOKIE)
        .map(|value| SecretString::from(value.to_string()))
        .ok_or_else(|| {
            tracing::debug!(target: "venue.middleware.session", "No refresh cookie");
            RefreshFailure::Rejected
        })?;

    let tokens = state.identity.refresh(&refresh_token).await.map_err(|e| {
        tracing::info!(
            target: "venue.middleware.session",
            reason = e.as_label(),
            "Refresh grant failed"
        );
        match e {
            IdentityError::Unavailable => RefreshFailure::Unavailable,
            IdentityError::Rejected(_) | IdentityError::InvalidResponse => {
                RefreshFailure::Rejected
            }
        }
    })?;

    let claims = state
        .verifier
        .verify_claims(&tokens.id_token)
        .await
        .map_err(|e| {
            record_token_validation("refresh", e.as_label());
            tracing::warn!(
                target: "venue.middleware.session",
                reason = e.as_label(),
                "Refreshed ID token failed verification"
            );
            if e.is_transient() {
                RefreshFailure::Unavailable
            } else {
                RefreshFailure::Rejected
            }
        })?;
    record_token_validation("refresh", "success");

    if claims.sub != tokens.user_id {
        tracing::warn!(
            target: "venue.middleware.session",
            "Refreshed ID token subject does not match the refresh grant"
        );
        return Err(RefreshFailure::Rejected);
    }

    let mut set_cookies = vec![(
        ID_TOKEN_COOKIE,
        session_cookie_at(ID_TOKEN_COOKIE, &tokens.id_token, claims.exp),
    )];

    if tokens.refresh_token.expose_secret() != refresh_token.expose_secret() {
        set_cookies.push((
            REFRESH_TOKEN_COOKIE,
            refresh_cookie(
                tokens.refresh_token.expose_secret(),
                state.clock.now_unix(),
                state.refresh_cookie_ttl_days,
            ),
        ));
    }

    Ok(SessionOutcome {
        identity: AuthenticatedIdentity::from(&claims),
        set_cookies,
    })
}
