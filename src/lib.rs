//! # Prometheus Drain
//!
//! A single-consumer drain scheduler over pluggable backing collections.
//!
//! Producers hand items to a [`core::Scheduler`]; the scheduler stores them in
//! its collection and makes sure exactly one drain task is running whenever
//! there is work. The drain task takes items one at a time, passes each to a
//! user callback and exits as soon as it observes the collection empty. The
//! next add starts it again.
//!
//! ## Collections
//!
//! - [`infra::InMemoryCollection`]: process-local FIFO queue or LIFO stack
//! - [`infra::DurableCollection`]: a list in an external store addressed by
//!   `(key, database)`, shared by every process that opens it
//! - [`infra::ObservableCollection`]: a durable collection that publishes a
//!   change signal on every add and take, so idle schedulers in other
//!   processes start draining when a peer adds work
//!
//! External stores implement [`infra::ListStore`]. [`infra::MemoryListStore`]
//! is an in-process store; `RedisListStore` (feature `redis`) talks to Redis.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prometheus_drain::builders::SchedulerBuilder;
//!
//! let scheduler = SchedulerBuilder::<String>::new()
//!     .with_callback(|job| {
//!         tracing::info!(%job, "processing");
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let events = scheduler.subscribe();
//! scheduler.add_and_run("thumbnail:42".to_owned())?;
//! ```
//!
//! ## Guarantees
//!
//! - At most one drain task per scheduler at any time
//! - Every successfully added item reaches the callback at most once, and
//!   exactly once while the scheduler stays alive
//! - A failing or panicking callback is reported through
//!   [`core::SchedulerEvent::ItemFailed`] and never stops the drain

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core drain scheduling: collection contract, launch protocol and events.
pub mod core;
/// Configuration models for schedulers, retry policies and stores.
pub mod config;
/// Builders to construct schedulers and collections from configuration.
pub mod builders;
/// Collection realizations and external list stores.
pub mod infra;
/// Runtime adapters hosting drain tasks.
pub mod runtime;
/// Shared utilities.
pub mod util;
