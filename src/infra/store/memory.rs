//! In-process list store.
//!
//! Clones share the same lists and channels, so several collections (or
//! several schedulers standing in for separate processes) opened on one
//! `MemoryListStore` observe the same sequence and receive each other's
//! change signals. Each operation takes one short lock, which gives the same
//! single-operation atomicity a networked store provides.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;

use super::{ListKey, ListStore, Subscription};
use crate::core::StoreError;

#[derive(Default)]
struct Shared {
    lists: Mutex<HashMap<ListKey, VecDeque<Vec<u8>>>>,
    channels: Mutex<HashMap<String, Vec<Sender<Vec<u8>>>>>,
}

/// Shared in-process list store.
#[derive(Clone, Default)]
pub struct MemoryListStore {
    shared: Arc<Shared>,
}

impl MemoryListStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.shared
            .channels
            .lock()
            .get(channel)
            .map_or(0, Vec::len)
    }
}

fn resolve(len: usize, index: isize) -> Option<usize> {
    if index >= 0 {
        let i = index.unsigned_abs();
        (i < len).then_some(i)
    } else {
        len.checked_sub(index.unsigned_abs())
    }
}

impl ListStore for MemoryListStore {
    fn push_back(&self, list: &ListKey, payload: &[u8]) -> Result<usize, StoreError> {
        let mut lists = self.shared.lists.lock();
        let entry = lists.entry(list.clone()).or_default();
        entry.push_back(payload.to_vec());
        Ok(entry.len())
    }

    fn pop_front(&self, list: &ListKey) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .shared
            .lists
            .lock()
            .get_mut(list)
            .and_then(VecDeque::pop_front))
    }

    fn pop_back(&self, list: &ListKey) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .shared
            .lists
            .lock()
            .get_mut(list)
            .and_then(VecDeque::pop_back))
    }

    fn index(&self, list: &ListKey, index: isize) -> Result<Option<Vec<u8>>, StoreError> {
        let lists = self.shared.lists.lock();
        Ok(lists.get(list).and_then(|entries| {
            resolve(entries.len(), index).and_then(|i| entries.get(i).cloned())
        }))
    }

    fn len(&self, list: &ListKey) -> Result<usize, StoreError> {
        Ok(self.shared.lists.lock().get(list).map_or(0, VecDeque::len))
    }

    fn range(&self, list: &ListKey) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .shared
            .lists
            .lock()
            .get(list)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn delete(&self, list: &ListKey) -> Result<(), StoreError> {
        self.shared.lists.lock().remove(list);
        Ok(())
    }

    fn publish(&self, channel: &str, message: &[u8]) -> Result<usize, StoreError> {
        let mut channels = self.shared.channels.lock();
        let Some(subscribers) = channels.get_mut(channel) else {
            return Ok(0);
        };
        subscribers.retain(|tx| tx.send(message.to_vec()).is_ok());
        Ok(subscribers.len())
    }

    fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let (tx, rx) = unbounded();
        self.shared
            .channels
            .lock()
            .entry(channel.to_owned())
            .or_default()
            .push(tx);
        Ok(Subscription::new(rx, Arc::new(AtomicBool::new(false))))
    }
}
