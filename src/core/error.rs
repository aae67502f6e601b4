//! Error types for scheduler, collection, store and codec operations.

use std::fmt;

use thiserror::Error;

/// Errors produced by the scheduling core.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler was disposed; it no longer accepts calls.
    #[error("scheduler has been disposed")]
    Disposed,
    /// A required argument was not supplied.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The drain task could not be started.
    #[error("failed to spawn drain task: {0}")]
    Spawn(String),
    /// The drain task panicked outside the per-item boundary.
    #[error("drain task panicked: {0}")]
    Panicked(String),
    /// The backing collection broke its contract.
    #[error("collection error: {0}")]
    Collection(#[from] CollectionError),
}

/// Errors surfaced by backing collections.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The external store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// An item could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Errors produced by external list stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
    /// The subscription channel was closed.
    #[error("subscription closed")]
    Closed,
    /// Redis client failure.
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Errors produced while converting items to and from byte payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Encoding failed.
    #[error("encode failed: {0}")]
    Encode(String),
    /// Decoding failed.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Failure to hand an item to the scheduler. The item is always returned.
pub enum AddError<T> {
    /// The scheduler was disposed before the item was added.
    Disposed(T),
    /// A single add attempt failed.
    Rejected(T),
    /// The retry policy gave up.
    Exhausted {
        /// The item that could not be added.
        item: T,
        /// How many attempts were made.
        attempts: u32,
    },
}

impl<T> AddError<T> {
    /// Recover the item that was not added.
    pub fn into_item(self) -> T {
        match self {
            Self::Disposed(item) | Self::Rejected(item) | Self::Exhausted { item, .. } => item,
        }
    }

    /// Whether the failure was caused by a disposed scheduler.
    pub const fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed(_))
    }
}

impl<T> fmt::Debug for AddError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disposed(_) => f.write_str("Disposed(..)"),
            Self::Rejected(_) => f.write_str("Rejected(..)"),
            Self::Exhausted { attempts, .. } => f
                .debug_struct("Exhausted")
                .field("attempts", attempts)
                .finish_non_exhaustive(),
        }
    }
}

impl<T> fmt::Display for AddError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disposed(_) => write!(f, "scheduler has been disposed"),
            Self::Rejected(_) => write!(f, "backing collection rejected the item"),
            Self::Exhausted { attempts, .. } => {
                write!(f, "backing collection rejected the item after {attempts} attempts")
            }
        }
    }
}

impl<T> std::error::Error for AddError<T> {}

/// Application-facing result using anyhow for callbacks and higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
