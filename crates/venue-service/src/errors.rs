//! Venue service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! returned to clients are generic where detail would leak internals; the
//! actual cause is logged server-side.

use crate::repositories::RepositoryError;
use crate::services::identity::IdentityError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Maps to:
/// - BadRequest: 400
/// - Forbidden: 403 (every bearer-gate failure)
/// - NotFound: 404
/// - Conflict: 409
/// - UnsupportedMediaType: 415
/// - ServiceUnavailable: 503
/// - Internal: 500
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported media type")]
    UnsupportedMediaType,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServiceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a user, in an API body or an HTML fragment.
    pub fn client_message(&self) -> String {
        match self {
            ServiceError::BadRequest(reason)
            | ServiceError::NotFound(reason)
            | ServiceError::Conflict(reason) => reason.clone(),
            ServiceError::Forbidden => "Access denied".to_string(),
            ServiceError::UnsupportedMediaType => {
                "Unsupported Content-Type, please use application/json".to_string()
            }
            ServiceError::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            ServiceError::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "BAD_REQUEST",
            ServiceError::Forbidden => "FORBIDDEN",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ServiceError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match &self {
            ServiceError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "venue.availability", reason = %reason, "Service unavailable");
            }
            ServiceError::Internal(reason) => {
                tracing::error!(target: "venue.errors", reason = %reason, "Internal error");
            }
            _ => {}
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.client_message(),
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(reason) if reason == "EMAIL_EXISTS" => {
                ServiceError::Conflict("User is already registered".to_string())
            }
            IdentityError::Rejected(reason)
                if reason == "INVALID_LOGIN_CREDENTIALS"
                    || reason == "EMAIL_NOT_FOUND"
                    || reason == "INVALID_PASSWORD" =>
            {
                ServiceError::BadRequest("Invalid email or password".to_string())
            }
            IdentityError::Rejected(reason) if reason.starts_with("WEAK_PASSWORD") => {
                ServiceError::BadRequest("Password is too weak".to_string())
            }
            IdentityError::Rejected(reason) => {
                tracing::info!(target: "venue.errors", reason = %reason, "Identity provider rejected request");
                ServiceError::BadRequest("Request rejected".to_string())
            }
            IdentityError::Unavailable => {
                ServiceError::ServiceUnavailable("identity provider unavailable".to_string())
            }
            IdentityError::InvalidResponse => {
                ServiceError::Internal("identity provider returned an invalid response".to_string())
            }
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(reason) => ServiceError::Conflict(reason),
        }
    }
}
