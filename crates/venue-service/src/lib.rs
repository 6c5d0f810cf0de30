//! Venue Service Library
//!
//! A small web application for finding places to play sports. Users
//! register and sign in through a third-party identity provider, browse
//! venues by city and sport, and submit new venues.
//!
//! # Architecture
//!
//! Handler -> Service -> Repository, with authentication in front:
//!
//! ```text
//! routes/mod.rs -> middleware/{session,bearer}.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//!                          |
//!                          v
//!              auth::TokenVerifier -> auth::KeyCache
//! ```
//!
//! # Modules
//!
//! - `auth` - Signing key cache, token verification, typed claims
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - JSON API, HTML pages and operational endpoints
//! - `middleware` - Session and bearer gates, content-type guard, metrics
//! - `models` - Data models
//! - `observability` - Prometheus metrics
//! - `repositories` - In-memory storage behind async traits
//! - `routes` - Axum router setup and application state
//! - `services` - Identity provider client, users, venues
//! - `tasks` - Background key refresh

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
