//! Shared utilities.

pub mod backoff;
pub mod telemetry;

pub use backoff::RetryPolicy;
pub use telemetry::init_tracing;
