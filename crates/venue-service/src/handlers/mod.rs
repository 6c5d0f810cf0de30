//! HTTP request handlers for the venue service.

pub mod health;
pub mod me;
pub mod metrics;
pub mod pages;
pub mod users;
pub mod venues;

pub use health::{health_check, readiness_check};
pub use me::get_me;
pub use metrics::metrics_handler;
pub use users::register_user;
pub use venues::{create_venue, search_venues};
