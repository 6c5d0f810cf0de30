//! ID token authentication.
//!
//! Dependency order: `keys` (signing key cache) -> `verifier` (token
//! checks) -> the request gates in `crate::middleware`.

pub mod claims;
pub mod error;
pub mod keys;
pub mod verifier;

pub use claims::{AuthenticatedIdentity, IdTokenClaims};
pub use error::{AuthError, KeyCacheError};
pub use keys::{KeyCache, KeySet, SigningKey};
pub use verifier::TokenVerifier;
