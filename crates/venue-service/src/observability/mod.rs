//! Observability for the venue service.
//!
//! Provides metric definitions and the Prometheus recorder setup.

pub mod metrics;
