//! HTTP middleware for the venue service.
//!
//! # Components
//!
//! - `session` - Cookie-session gate for HTML routes (degrades to anonymous)
//! - `bearer` - Bearer gate for JSON API routes (hard 403)
//! - `cookies` - Session cookie parsing and `Set-Cookie` values
//! - `content_type` - JSON content-type guard for API bodies
//! - `http_metrics` - HTTP request metrics

pub mod bearer;
pub mod content_type;
pub mod cookies;
pub mod http_metrics;
pub mod session;

pub use bearer::{require_bearer, BearerState};
pub use content_type::require_json;
pub use http_metrics::http_metrics_middleware;
pub use session::{session_gate, SessionState};
