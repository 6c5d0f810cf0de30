//! JSON content-type guard for the API routes.
//!
//! POST, PUT and PATCH bodies under `/api/v1` must be
//! `application/json` (parameters such as `charset` are allowed).

use crate::errors::ServiceError;
use axum::{
    extract::Request,
    http::{header::CONTENT_TYPE, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn is_json(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

pub async fn require_json(req: Request, next: Next) -> Response {
    if carries_body(req.method()) && !is_json(&req) {
        tracing::debug!(
            target: "venue.middleware.content_type",
            method = %req.method(),
            "Rejecting non-JSON request body"
        );
        return ServiceError::UnsupportedMediaType.into_response();
    }

    next.run(req).await
}
