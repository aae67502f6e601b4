//! Scheduler and store configuration structures.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Discipline;

/// Backing collection realization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// In-process collection; not shared across schedulers.
    #[default]
    InMemory,
    /// In-process list store shared by every collection opened on it.
    MemoryStore,
    /// Redis list store (requires the `redis` feature).
    Redis,
}

/// Retry/backoff parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts allowed; `0` means unbounded.
    pub max_attempts: u32,
    /// Retries that only yield the thread before backing off.
    pub spin_attempts: u32,
    /// First backoff delay in milliseconds.
    pub first_backoff_ms: u64,
    /// Backoff cap in milliseconds.
    pub max_backoff_ms: u64,
    /// Multiplicative growth factor.
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            spin_attempts: 3,
            first_backoff_ms: 1,
            max_backoff_ms: 100,
            factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Policy for contended drain passes: unbounded, capped at 50ms.
    pub const fn drain_default() -> Self {
        Self {
            max_attempts: 0,
            spin_attempts: 3,
            first_backoff_ms: 1,
            max_backoff_ms: 50,
            factor: 2.0,
        }
    }

    /// Policy for re-establishing a lost subscriber connection: unbounded,
    /// 50ms growing to 5s.
    pub const fn reconnect_default() -> Self {
        Self {
            max_attempts: 0,
            spin_attempts: 0,
            first_backoff_ms: 50,
            max_backoff_ms: 5_000,
            factor: 2.0,
        }
    }

    /// Validate retry values.
    pub fn validate(&self) -> Result<(), String> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err("factor must be a finite number >= 1.0".into());
        }
        if self.first_backoff_ms > self.max_backoff_ms {
            return Err("first_backoff_ms must not exceed max_backoff_ms".into());
        }
        Ok(())
    }
}

/// External store and collection selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Which realization to build.
    pub backend: StoreBackendConfig,
    /// Connection URL for the external store.
    pub url: String,
    /// Collection key; also the pub/sub channel name.
    pub key: String,
    /// Database / namespace index.
    pub database: u32,
    /// Removal order.
    pub discipline: Discipline,
    /// Whether to publish and subscribe to change signals.
    pub observable: bool,
    /// Backoff between attempts to re-establish a dropped subscription.
    pub reconnect: RetryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendConfig::InMemory,
            url: "redis://127.0.0.1:6379".into(),
            key: "drain:default".into(),
            database: 0,
            discipline: Discipline::Fifo,
            observable: false,
            reconnect: RetryConfig::reconnect_default(),
        }
    }
}

impl StoreConfig {
    /// Validate store values.
    pub fn validate(&self) -> Result<(), String> {
        if self.key.trim().is_empty() {
            return Err("key must not be empty".into());
        }
        if self.backend == StoreBackendConfig::Redis && self.url.trim().is_empty() {
            return Err("url is required for the redis backend".into());
        }
        if self.observable && self.backend == StoreBackendConfig::InMemory {
            return Err("observable collections need a shared store backend".into());
        }
        self.reconnect
            .validate()
            .map_err(|e| format!("reconnect invalid: {e}"))?;
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Retry policy for `add_and_run`.
    pub add_retry: RetryConfig,
    /// Backoff while the collection reports items that could not be taken.
    pub drain_retry: RetryConfig,
    /// Name prefix for drain and watcher threads.
    pub thread_name: String,
    /// How long `dispose` waits for the drain task, in milliseconds.
    pub dispose_timeout_ms: u64,
    /// Optional store selection used by the builders.
    pub store: Option<StoreConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            add_retry: RetryConfig::default(),
            drain_retry: RetryConfig::drain_default(),
            thread_name: "drain".into(),
            dispose_timeout_ms: 5_000,
            store: None,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `add_and_run` retry policy.
    #[must_use]
    pub fn with_add_retry(mut self, retry: RetryConfig) -> Self {
        self.add_retry = retry;
        self
    }

    /// Set the drain backoff policy.
    #[must_use]
    pub fn with_drain_retry(mut self, retry: RetryConfig) -> Self {
        self.drain_retry = retry;
        self
    }

    /// Set the thread name prefix.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the dispose timeout.
    #[must_use]
    pub fn with_dispose_timeout(mut self, timeout: Duration) -> Self {
        self.dispose_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the store selection.
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = Some(store);
        self
    }

    /// Dispose timeout as a `Duration`.
    pub const fn dispose_timeout(&self) -> Duration {
        Duration::from_millis(self.dispose_timeout_ms)
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_name.trim().is_empty() {
            return Err("thread_name must not be empty".into());
        }
        self.add_retry
            .validate()
            .map_err(|e| format!("add_retry invalid: {e}"))?;
        self.drain_retry
            .validate()
            .map_err(|e| format!("drain_retry invalid: {e}"))?;
        if let Some(store) = &self.store {
            store.validate().map_err(|e| format!("store invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build a configuration from the environment, loading `.env` if present.
    ///
    /// Recognized variables: `DRAIN_THREAD_NAME`, `DRAIN_STORE_BACKEND`
    /// (`in_memory`, `memory_store`, `redis`), `DRAIN_STORE_URL`,
    /// `DRAIN_STORE_KEY`, `DRAIN_STORE_DATABASE`, `DRAIN_DISCIPLINE`
    /// (`fifo`, `lifo`) and `DRAIN_OBSERVABLE`. The store section is only
    /// populated when `DRAIN_STORE_KEY` or `DRAIN_STORE_BACKEND` is set.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        if let Ok(name) = env::var("DRAIN_THREAD_NAME") {
            cfg.thread_name = name;
        }

        let backend = env::var("DRAIN_STORE_BACKEND").ok();
        let key = env::var("DRAIN_STORE_KEY").ok();
        if backend.is_some() || key.is_some() {
            let mut store = StoreConfig::default();
            if let Some(backend) = backend {
                store.backend = parse_enum(&backend, "DRAIN_STORE_BACKEND")?;
            }
            if let Some(key) = key {
                store.key = key;
            }
            if let Ok(url) = env::var("DRAIN_STORE_URL") {
                store.url = url;
            }
            if let Ok(db) = env::var("DRAIN_STORE_DATABASE") {
                store.database = db
                    .trim()
                    .parse()
                    .map_err(|e| format!("DRAIN_STORE_DATABASE: {e}"))?;
            }
            if let Ok(discipline) = env::var("DRAIN_DISCIPLINE") {
                store.discipline = parse_enum(&discipline, "DRAIN_DISCIPLINE")?;
            }
            if let Ok(observable) = env::var("DRAIN_OBSERVABLE") {
                store.observable = matches!(
                    observable.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                );
            }
            cfg.store = Some(store);
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_enum<E: serde::de::DeserializeOwned>(raw: &str, var: &str) -> Result<E, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_ascii_lowercase()))
        .map_err(|e| format!("{var}: {e}"))
}
