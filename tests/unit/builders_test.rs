//! Tests for scheduler and collection builders

use std::sync::Arc;

use prometheus_drain::builders::{build_collection, build_collection_on, build_list_store, SchedulerBuilder};
use prometheus_drain::config::{SchedulerConfig, StoreBackendConfig, StoreConfig};
use prometheus_drain::core::{Discipline, JsonCodec, SchedulerError, SchedulerStatus};
use prometheus_drain::infra::{InMemoryCollection, MemoryListStore};

fn memory_store(key: &str) -> StoreConfig {
    StoreConfig {
        backend: StoreBackendConfig::MemoryStore,
        key: key.to_string(),
        ..StoreConfig::default()
    }
}

#[test]
fn test_missing_callback() {
    let result = SchedulerBuilder::<u32>::new().build();
    assert!(matches!(result, Err(SchedulerError::MissingArgument("callback"))));
}

#[test]
fn test_invalid_config() {
    let result = SchedulerBuilder::<u32>::new()
        .with_config(SchedulerConfig::new().with_thread_name(""))
        .with_callback(|_| Ok(()))
        .build();
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_default_build_uses_in_memory_queue() {
    let scheduler = SchedulerBuilder::<u32>::new()
        .with_callback(|_| Ok(()))
        .build()
        .unwrap();
    assert_eq!(scheduler.status(), SchedulerStatus::Idle);
    assert_eq!(scheduler.collection().discipline(), Discipline::Fifo);
}

#[test]
fn test_build_follows_in_memory_store_discipline() {
    let store = StoreConfig {
        discipline: Discipline::Lifo,
        ..StoreConfig::default()
    };
    let scheduler = SchedulerBuilder::<u32>::new()
        .with_config(SchedulerConfig::new().with_store(store))
        .with_callback(|_| Ok(()))
        .build()
        .unwrap();
    assert_eq!(scheduler.collection().discipline(), Discipline::Lifo);
}

#[test]
fn test_build_with_shared_store_needs_collection() {
    let result = SchedulerBuilder::<u32>::new()
        .with_config(SchedulerConfig::new().with_store(memory_store("jobs")))
        .with_callback(|_| Ok(()))
        .build();
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));

    let scheduler = SchedulerBuilder::<u32>::new()
        .with_config(SchedulerConfig::new().with_store(memory_store("jobs")))
        .with_collection(Arc::new(InMemoryCollection::<u32>::stack()))
        .with_callback(|_| Ok(()))
        .build()
        .unwrap();
    assert_eq!(scheduler.collection().discipline(), Discipline::Lifo);
}

#[test]
fn test_build_collection_in_memory() {
    let cfg = StoreConfig {
        discipline: Discipline::Lifo,
        ..StoreConfig::default()
    };
    let collection = build_collection::<u32, _>(&cfg, JsonCodec::new()).unwrap();
    assert_eq!(collection.discipline(), Discipline::Lifo);
    assert!(collection.watch().unwrap().is_none());
}

#[test]
fn test_build_collection_observable() {
    let cfg = StoreConfig {
        observable: true,
        ..memory_store("observed")
    };
    let collection = build_collection::<u32, _>(&cfg, JsonCodec::new()).unwrap();
    assert!(collection.watch().unwrap().is_some());
}

#[test]
fn test_build_collection_on_shared_store() {
    let store = Arc::new(MemoryListStore::new());
    let cfg = memory_store("shared");
    let a = build_collection_on::<String, _>(store.clone(), &cfg, JsonCodec::new()).unwrap();
    let b = build_collection_on::<String, _>(store, &cfg, JsonCodec::new()).unwrap();
    a.try_add("hello".to_string()).unwrap();
    assert_eq!(b.try_take().as_deref(), Some("hello"));
}

#[test]
fn test_build_list_store() {
    assert!(build_list_store(&memory_store("jobs")).is_ok());
    assert!(matches!(
        build_list_store(&StoreConfig::default()),
        Err(SchedulerError::InvalidConfig(_))
    ));
}

#[cfg(not(feature = "redis"))]
#[test]
fn test_redis_backend_requires_feature() {
    let cfg = StoreConfig {
        backend: StoreBackendConfig::Redis,
        ..StoreConfig::default()
    };
    let result = build_collection::<u32, _>(&cfg, JsonCodec::new());
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}
