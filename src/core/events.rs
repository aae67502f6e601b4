//! Scheduler events, collection notifications and the subscriber fan-out
//! that delivers them.
//!
//! Every subscriber gets its own unbounded `crossbeam-channel` queue. Emitting
//! never blocks, disconnected subscribers are pruned on the next emit, and an
//! emit with no subscribers is not an error.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;

/// Kind of mutation announced by a change signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// An item was added.
    Added,
    /// An item was removed.
    Removed,
}

/// Local notification raised by an observable collection for each received
/// change signal. These are advisory: receivers must re-query the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionNotification<T> {
    /// The collection changed.
    Changed {
        /// The affected item.
        item: T,
        /// What happened to it.
        action: ChangeAction,
    },
    /// The collection's length may have changed.
    CountChanged,
    /// The subscriber connection was re-established after it dropped. Signals
    /// published while it was down were missed.
    Resubscribed,
}

/// Events produced by a scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerEvent<T> {
    /// A drain task started.
    Started {
        /// Sequence number of the drain run.
        run: u64,
    },
    /// The callback failed for one item; draining continues.
    ItemFailed {
        /// The item the callback failed on.
        item: T,
        /// The failure raised by the callback.
        error: Arc<anyhow::Error>,
    },
    /// The drain task failed outside the per-item boundary and stopped.
    Fatal {
        /// The failure that stopped the loop.
        error: Arc<SchedulerError>,
    },
    /// The drain task finished without a fault.
    Completed {
        /// Sequence number of the drain run.
        run: u64,
        /// Items handed to the callback during this run.
        processed: u64,
    },
}

/// Explicit subscriber list with non-blocking fan-out.
pub struct Fanout<E> {
    subscribers: Mutex<Vec<Sender<E>>>,
}

impl<E> Fanout<E> {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Number of registered subscribers (including ones not yet pruned).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Drop every subscriber, disconnecting their receivers.
    pub fn close(&self) {
        self.subscribers.lock().clear();
    }
}

impl<E: Clone> Fanout<E> {
    /// Deliver `event` to every live subscriber; returns how many received it.
    pub fn emit(&self, event: &E) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        subscribers.len()
    }
}

impl<E> Default for Fanout<E> {
    fn default() -> Self {
        Self::new()
    }
}
