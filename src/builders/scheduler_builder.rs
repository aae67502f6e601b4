//! Builders to construct schedulers and collections from configuration.

use std::sync::Arc;

use crate::config::{SchedulerConfig, StoreBackendConfig, StoreConfig};
use crate::core::{AppResult, BackingCollection, Callback, ItemCodec, Scheduler, SchedulerError};
use crate::infra::store::{ListKey, ListStore, MemoryListStore};
use crate::infra::{DurableCollection, InMemoryCollection, ObservableCollection};
use crate::runtime::{Spawn, ThreadSpawner};
use crate::util::RetryPolicy;

/// Step-by-step scheduler construction.
///
/// When no collection is supplied, an in-process collection is created using
/// the discipline of the configured store section (FIFO if absent).
pub struct SchedulerBuilder<T> {
    config: SchedulerConfig,
    collection: Option<Arc<dyn BackingCollection<T>>>,
    callback: Option<Callback<T>>,
    spawner: Option<Arc<dyn Spawn>>,
}

impl<T> Default for SchedulerBuilder<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SchedulerBuilder<T>
where
    T: Clone + Send + 'static,
{
    /// Start with default configuration.
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            collection: None,
            callback: None,
            spawner: None,
        }
    }

    /// Use `config`.
    #[must_use]
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Drain `collection`.
    #[must_use]
    pub fn with_collection(mut self, collection: Arc<dyn BackingCollection<T>>) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Invoke `callback` once per drained item.
    #[must_use]
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) -> AppResult<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Host drain tasks on `spawner` instead of dedicated OS threads.
    #[must_use]
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawn>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::MissingArgument` when no callback was supplied
    /// - `SchedulerError::InvalidConfig` when the configuration is invalid, or
    ///   names a shared store but no collection was supplied
    /// - any error from [`Scheduler::from_parts`]
    pub fn build(self) -> Result<Scheduler<T>, SchedulerError> {
        let callback = self
            .callback
            .ok_or(SchedulerError::MissingArgument("callback"))?;
        self.config
            .validate()
            .map_err(|e| SchedulerError::InvalidConfig(format!("config invalid: {e}")))?;

        let collection: Arc<dyn BackingCollection<T>> = match self.collection {
            Some(collection) => collection,
            None => match &self.config.store {
                None => Arc::new(InMemoryCollection::<T>::queue()),
                Some(store) if store.backend == StoreBackendConfig::InMemory => {
                    Arc::new(InMemoryCollection::<T>::new(store.discipline))
                }
                Some(store) => {
                    return Err(SchedulerError::InvalidConfig(format!(
                        "{:?} backend needs a codec; build the collection with build_collection",
                        store.backend
                    )))
                }
            },
        };
        let spawner: Arc<dyn Spawn> = match self.spawner {
            Some(spawner) => spawner,
            None => Arc::new(ThreadSpawner::new()),
        };

        Scheduler::from_parts(collection, callback, spawner, &self.config)
    }
}

/// Open the list store named by `cfg`. Each call to the `MemoryStore` backend
/// yields a fresh store; share one by passing it to [`build_collection_on`].
///
/// # Errors
///
/// - `SchedulerError::InvalidConfig` for the `InMemory` backend, or for
///   `Redis` when the `redis` feature is disabled
/// - `SchedulerError::Collection` when the store URL is rejected
pub fn build_list_store(cfg: &StoreConfig) -> Result<Arc<dyn ListStore>, SchedulerError> {
    match cfg.backend {
        StoreBackendConfig::InMemory => Err(SchedulerError::InvalidConfig(
            "in_memory backend has no list store".into(),
        )),
        StoreBackendConfig::MemoryStore => Ok(Arc::new(MemoryListStore::new())),
        StoreBackendConfig::Redis => open_redis(&cfg.url),
    }
}

#[cfg(feature = "redis")]
fn open_redis(url: &str) -> Result<Arc<dyn ListStore>, SchedulerError> {
    let store = crate::infra::store::RedisListStore::open(url)
        .map_err(crate::core::CollectionError::from)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
fn open_redis(_url: &str) -> Result<Arc<dyn ListStore>, SchedulerError> {
    Err(SchedulerError::InvalidConfig(
        "redis backend requires the `redis` feature".into(),
    ))
}

/// Build the collection realization selected by `cfg`.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` when `cfg` is invalid or names an
/// unavailable backend.
pub fn build_collection<T, C>(
    cfg: &StoreConfig,
    codec: C,
) -> Result<Arc<dyn BackingCollection<T>>, SchedulerError>
where
    T: Clone + Send + 'static,
    C: ItemCodec<T> + 'static,
{
    cfg.validate()
        .map_err(|e| SchedulerError::InvalidConfig(format!("store invalid: {e}")))?;
    if cfg.backend == StoreBackendConfig::InMemory {
        return Ok(Arc::new(InMemoryCollection::<T>::new(cfg.discipline)));
    }
    let store = build_list_store(cfg)?;
    build_collection_on(store, cfg, codec)
}

/// Build a durable (or observable) collection on an existing `store`, using
/// the key, database, discipline and observability of `cfg`.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` when `cfg` is invalid.
pub fn build_collection_on<T, C>(
    store: Arc<dyn ListStore>,
    cfg: &StoreConfig,
    codec: C,
) -> Result<Arc<dyn BackingCollection<T>>, SchedulerError>
where
    T: Clone + Send + 'static,
    C: ItemCodec<T> + 'static,
{
    cfg.validate()
        .map_err(|e| SchedulerError::InvalidConfig(format!("store invalid: {e}")))?;
    let list = ListKey::new(cfg.key.clone(), cfg.database);
    if cfg.observable {
        Ok(Arc::new(
            ObservableCollection::<T, C>::new(store, list, cfg.discipline, codec)
                .with_reconnect_policy(RetryPolicy::from(&cfg.reconnect)),
        ))
    } else {
        Ok(Arc::new(DurableCollection::<T, C>::new(
            store,
            list,
            cfg.discipline,
            codec,
        )))
    }
}
