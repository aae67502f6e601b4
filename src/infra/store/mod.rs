//! External ordered-list stores with atomic push/pop and publish/subscribe.
//!
//! A [`ListStore`] is the only thing durable collections know about the
//! backing store: lists addressed by `(key, database)` with atomic push and
//! pop at either end, plus fire-and-forget pub/sub channels.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use crate::core::StoreError;

pub use memory::MemoryListStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisListStore;

/// Address of a list inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListKey {
    /// List key.
    pub key: String,
    /// Database / namespace index.
    pub database: u32,
}

impl ListKey {
    /// Create a list address.
    pub fn new(key: impl Into<String>, database: u32) -> Self {
        Self {
            key: key.into(),
            database,
        }
    }

    /// Pub/sub channel carrying change signals for this list.
    pub fn channel(&self) -> &str {
        &self.key
    }
}

/// Live subscription to a pub/sub channel. Dropping it unsubscribes.
pub struct Subscription {
    receiver: Receiver<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl Subscription {
    /// Wrap a message receiver; `closed` is raised when the subscription drops.
    pub const fn new(receiver: Receiver<Vec<u8>>, closed: Arc<AtomicBool>) -> Self {
        Self { receiver, closed }
    }

    /// Receiver yielding raw published messages.
    pub const fn receiver(&self) -> &Receiver<Vec<u8>> {
        &self.receiver
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Ordered list store with atomic single-element operations.
///
/// Negative indices count from the tail: `-1` is the last element.
pub trait ListStore: Send + Sync {
    /// Append at the tail; returns the new length.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or rejects the command.
    fn push_back(&self, list: &ListKey, payload: &[u8]) -> Result<usize, StoreError>;

    /// Atomically remove and return the head element.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or rejects the command.
    fn pop_front(&self, list: &ListKey) -> Result<Option<Vec<u8>>, StoreError>;

    /// Atomically remove and return the tail element.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or rejects the command.
    fn pop_back(&self, list: &ListKey) -> Result<Option<Vec<u8>>, StoreError>;

    /// Read the element at `index` without removing it.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or rejects the command.
    fn index(&self, list: &ListKey, index: isize) -> Result<Option<Vec<u8>>, StoreError>;

    /// Current length.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or rejects the command.
    fn len(&self, list: &ListKey) -> Result<usize, StoreError>;

    /// Every element, head first.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or rejects the command.
    fn range(&self, list: &ListKey) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Delete the list.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or rejects the command.
    fn delete(&self, list: &ListKey) -> Result<(), StoreError>;

    /// Publish `message` on `channel`; returns how many subscribers got it.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or rejects the command.
    fn publish(&self, channel: &str, message: &[u8]) -> Result<usize, StoreError>;

    /// Subscribe to `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error when the subscriber connection cannot be established.
    fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError>;
}
