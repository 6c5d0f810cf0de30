//! Repository layer for the venue service.
//!
//! Storage sits behind async traits so handlers and services never see the
//! backing store. The shipped implementations keep everything in memory.

pub mod users;
pub mod venues;

use thiserror::Error;

pub use users::{InMemoryUserRepository, UserRepository};
pub use venues::{InMemoryVenueRepository, VenueRepository};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),
}
