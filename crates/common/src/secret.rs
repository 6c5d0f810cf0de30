//! Secret types for values that must never reach a log line.
//!
//! Re-exports [`secrecy`] so every crate in the workspace uses the same
//! wrapper. `SecretString` redacts itself in `Debug`, so structs that derive
//! `Debug` stay safe to trace.
//!
//! Wrap these in `SecretString`:
//! - the identity provider API key
//! - user passwords on the login and registration forms
//! - refresh tokens, both from cookies and from refresh-grant responses
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginForm {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let form = LoginForm {
//!     email: "player@example.com".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{form:?}").contains("hunter2"));
//! assert_eq!(form.password.expose_secret(), "hunter2");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
