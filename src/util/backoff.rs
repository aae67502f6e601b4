//! Bounded retry with exponential backoff.
//!
//! The first `spin_attempts` retries only yield the thread; after that the
//! delay for retry `n` is `first × factor^(n - spin_attempts)`, clamped to
//! `max`. Each delay is derived from the attempt number alone.

use std::thread;
use std::time::Duration;

use crate::config::RetryConfig;

/// Retry policy used for guaranteed adds and contended drain passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed; `0` means unbounded.
    pub max_attempts: u32,
    /// Retries that only yield before backing off.
    pub spin_attempts: u32,
    /// First backoff delay.
    pub first: Duration,
    /// Backoff cap.
    pub max: Duration,
    /// Multiplicative growth factor.
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            spin_attempts: cfg.spin_attempts,
            first: Duration::from_millis(cfg.first_backoff_ms),
            max: Duration::from_millis(cfg.max_backoff_ms),
            factor: cfg.factor,
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempts` were made.
    pub const fn allows(&self, attempts: u32) -> bool {
        self.max_attempts == 0 || attempts < self.max_attempts
    }

    /// Delay before retry number `retry` (0-indexed). `None` means yield only.
    pub fn delay(&self, retry: u32) -> Option<Duration> {
        if retry < self.spin_attempts {
            return None;
        }
        let exp = i32::try_from(retry - self.spin_attempts).unwrap_or(i32::MAX);
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            Some(self.max)
        } else {
            Some(Duration::from_secs_f64(secs))
        }
    }

    /// Block the calling thread before retry number `retry`.
    pub fn pause(&self, retry: u32) {
        match self.delay(retry) {
            Some(delay) if !delay.is_zero() => thread::sleep(delay),
            _ => thread::yield_now(),
        }
    }
}
