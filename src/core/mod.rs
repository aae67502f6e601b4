//! Core drain scheduling: collection contract, launch protocol and events.

pub mod codec;
pub mod collection;
pub mod error;
pub mod events;
pub mod launch;
pub mod scheduler;

pub use codec::{ItemCodec, JsonCodec};
pub use collection::{BackingCollection, Discipline};
pub use error::{AddError, AppResult, CodecError, CollectionError, SchedulerError, StoreError};
pub use events::{ChangeAction, CollectionNotification, Fanout, SchedulerEvent};
pub use launch::LoopPhase;
pub use scheduler::{Callback, Scheduler, SchedulerStats, SchedulerStatus};
