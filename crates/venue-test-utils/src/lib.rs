//! # Venue Test Utilities
//!
//! Shared test utilities for the venue service.
//!
//! This crate provides:
//! - Deterministic RSA key fixtures (`crypto_fixtures`)
//! - ID token builders and tampering helpers (`token_builders`)
//! - Identity provider mocks on a wiremock server (`idp_mock`)
//! - Server test harness (`TestVenueServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use venue_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let idp = wiremock::MockServer::start().await;
//!     mount_primary_keys(&idp).await;
//!     let server = TestVenueServer::spawn(&idp).await?;
//!
//!     let response = reqwest::get(format!("{}/health", server.url())).await?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod idp_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use idp_mock::*;
pub use server_harness::*;
pub use token_builders::*;
