//! Configuration models for schedulers, retry policies and stores.

pub mod scheduler;

pub use scheduler::{RetryConfig, SchedulerConfig, StoreBackendConfig, StoreConfig};
