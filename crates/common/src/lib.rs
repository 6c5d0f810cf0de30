//! Common utilities and types shared across the Courtside components.

#![warn(clippy::pedantic)]

/// Module for injectable wall-clock time
pub mod clock;

/// Module for JWT structure utilities (size limits, header parsing, constants)
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;
