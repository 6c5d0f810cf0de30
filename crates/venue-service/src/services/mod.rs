//! Service layer for the venue service.
//!
//! # Components
//!
//! - `identity` - HTTP client for the identity provider
//! - `users` - registration and password sign-in
//! - `venues` - venue validation, creation and search

pub mod identity;
pub mod users;
pub mod venues;

pub use identity::{
    IdentityError, IdentityProvider, IdentityToolkitClient, RefreshedTokens, SignInResponse,
};
pub use users::UserService;
pub use venues::VenueService;
