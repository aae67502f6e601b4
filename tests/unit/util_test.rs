//! Tests for retry policy utilities

use std::time::Duration;

use prometheus_drain::config::RetryConfig;
use prometheus_drain::util::RetryPolicy;

#[test]
fn test_default_add_policy() {
    let policy = RetryPolicy::default();
    assert!(policy.allows(99));
    assert!(!policy.allows(100));
    assert_eq!(policy.delay(0), None);
    assert_eq!(policy.delay(2), None);
    assert_eq!(policy.delay(3), Some(Duration::from_millis(1)));
    assert_eq!(policy.delay(4), Some(Duration::from_millis(2)));
    assert_eq!(policy.delay(10), Some(Duration::from_millis(100)));
    assert_eq!(policy.delay(u32::MAX), Some(Duration::from_millis(100)));
}

#[test]
fn test_unbounded_policy() {
    let policy = RetryPolicy::from(&RetryConfig::drain_default());
    assert!(policy.allows(u32::MAX));
    assert_eq!(policy.delay(40), Some(Duration::from_millis(50)));
}

#[test]
fn test_pause_during_spin_retries_only_yields() {
    let policy = RetryPolicy::from(&RetryConfig {
        spin_attempts: 5,
        ..RetryConfig::default()
    });
    let started = std::time::Instant::now();
    for retry in 0..5 {
        policy.pause(retry);
    }
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_init_tracing_is_idempotent() {
    prometheus_drain::util::init_tracing();
    prometheus_drain::util::init_tracing();
    tracing::info!("tracing initialized");
}
