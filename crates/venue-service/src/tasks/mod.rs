//! Background tasks for the venue service.
//!
//! - `key_refresh` - periodic signing key refresh

pub mod key_refresh;

pub use key_refresh::start_key_refresh;
