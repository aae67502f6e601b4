//! Tests for configuration validation

use std::env;
use std::time::Duration;

use prometheus_drain::config::{RetryConfig, SchedulerConfig, StoreBackendConfig, StoreConfig};
use prometheus_drain::core::Discipline;

#[test]
fn test_scheduler_config_defaults() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.thread_name, "drain");
    assert_eq!(cfg.dispose_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.add_retry.max_attempts, 100);
    assert_eq!(cfg.drain_retry.max_attempts, 0);
    assert!(cfg.store.is_none());
}

#[test]
fn test_builder_methods() {
    let cfg = SchedulerConfig::new()
        .with_thread_name("ingest")
        .with_dispose_timeout(Duration::from_millis(250))
        .with_add_retry(RetryConfig {
            max_attempts: 7,
            ..RetryConfig::default()
        });
    assert_eq!(cfg.thread_name, "ingest");
    assert_eq!(cfg.dispose_timeout_ms, 250);
    assert_eq!(cfg.add_retry.max_attempts, 7);
}

#[test]
fn test_blank_thread_name_rejected() {
    let cfg = SchedulerConfig::new().with_thread_name("  ");
    assert!(cfg.validate().is_err());
}

#[test]
fn test_retry_config_validation() {
    let shrinking = RetryConfig {
        factor: 0.5,
        ..RetryConfig::default()
    };
    assert!(shrinking.validate().is_err());

    let inverted = RetryConfig {
        first_backoff_ms: 500,
        max_backoff_ms: 10,
        ..RetryConfig::default()
    };
    assert!(inverted.validate().is_err());

    let cfg = SchedulerConfig::new().with_drain_retry(inverted);
    let err = cfg.validate().unwrap_err();
    assert!(err.starts_with("drain_retry invalid"), "{err}");
}

#[test]
fn test_store_config_validation() {
    let valid = StoreConfig {
        backend: StoreBackendConfig::Redis,
        observable: true,
        ..StoreConfig::default()
    };
    assert!(valid.validate().is_ok());

    let no_key = StoreConfig {
        key: String::new(),
        ..StoreConfig::default()
    };
    assert!(no_key.validate().is_err());

    let no_url = StoreConfig {
        backend: StoreBackendConfig::Redis,
        url: " ".to_string(),
        ..StoreConfig::default()
    };
    assert!(no_url.validate().is_err());

    let local_observable = StoreConfig {
        backend: StoreBackendConfig::InMemory,
        observable: true,
        ..StoreConfig::default()
    };
    assert!(local_observable.validate().is_err());

    let bad_reconnect = StoreConfig {
        backend: StoreBackendConfig::MemoryStore,
        reconnect: RetryConfig {
            factor: 0.5,
            ..RetryConfig::reconnect_default()
        },
        ..StoreConfig::default()
    };
    let err = bad_reconnect.validate().unwrap_err();
    assert!(err.starts_with("reconnect invalid"), "{err}");
}

#[test]
fn test_from_json_str() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{
            "thread_name": "ingest",
            "add_retry": { "max_attempts": 5 },
            "store": {
                "backend": "memory_store",
                "key": "ingest:jobs",
                "database": 2,
                "discipline": "lifo",
                "observable": true
            }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.thread_name, "ingest");
    assert_eq!(cfg.add_retry.max_attempts, 5);
    assert_eq!(cfg.add_retry.spin_attempts, 3);
    let store = cfg.store.unwrap();
    assert_eq!(store.backend, StoreBackendConfig::MemoryStore);
    assert_eq!(store.key, "ingest:jobs");
    assert_eq!(store.database, 2);
    assert_eq!(store.discipline, Discipline::Lifo);
    assert!(store.observable);
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str("{ not json").is_err());
    assert!(SchedulerConfig::from_json_str(r#"{"thread_name": ""}"#).is_err());
    assert!(
        SchedulerConfig::from_json_str(r#"{"store": {"backend": "in_memory", "observable": true}}"#)
            .is_err()
    );
}

// Every environment-driven case lives in one test: the process environment is
// shared by the tests in this binary.
#[test]
fn test_from_env() {
    let vars = [
        ("DRAIN_THREAD_NAME", "env-drain"),
        ("DRAIN_STORE_BACKEND", "memory_store"),
        ("DRAIN_STORE_KEY", "env:jobs"),
        ("DRAIN_STORE_DATABASE", "3"),
        ("DRAIN_DISCIPLINE", "LIFO"),
        ("DRAIN_OBSERVABLE", "true"),
    ];
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let cfg = SchedulerConfig::from_env().unwrap();
    assert_eq!(cfg.thread_name, "env-drain");
    let store = cfg.store.clone().unwrap();
    assert_eq!(store.backend, StoreBackendConfig::MemoryStore);
    assert_eq!(store.key, "env:jobs");
    assert_eq!(store.database, 3);
    assert_eq!(store.discipline, Discipline::Lifo);
    assert!(store.observable);

    env::set_var("DRAIN_DISCIPLINE", "sideways");
    assert!(SchedulerConfig::from_env().is_err());

    env::set_var("DRAIN_DISCIPLINE", "fifo");
    env::set_var("DRAIN_STORE_DATABASE", "not-a-number");
    assert!(SchedulerConfig::from_env().is_err());

    for (key, _) in vars {
        env::remove_var(key);
    }
    let cfg = SchedulerConfig::from_env().unwrap();
    assert!(cfg.store.is_none());
    assert_eq!(cfg.thread_name, "drain");
}
