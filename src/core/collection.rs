//! Backing collection capability set drained by the scheduler.

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use crate::core::{CollectionError, CollectionNotification};

/// Removal order of a collection, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    /// Queue: take returns the oldest item.
    #[default]
    Fifo,
    /// Stack: take returns the newest item.
    Lifo,
}

/// Ordered, unbounded collection of items under a single [`Discipline`].
///
/// Add, take and peek never fail loudly. Transport or codec failures are
/// logged by the realization and reported as `Err(item)` / `None`, because
/// the scheduler treats those results as ordinary "try again" / "empty"
/// outcomes. `count` and the maintenance operations return errors; a failing
/// `count` is treated by the scheduler as fatal for the current drain run.
pub trait BackingCollection<T>: Send + Sync {
    /// Removal order of this collection.
    fn discipline(&self) -> Discipline;

    /// Append `item` at the discipline-defined end.
    ///
    /// # Errors
    ///
    /// Hands the item back when the underlying operation failed transiently.
    fn try_add(&self, item: T) -> Result<(), T>;

    /// Remove and return the next item; `None` when empty.
    fn try_take(&self) -> Option<T>;

    /// Return the next item without removing it; `None` when empty.
    fn try_peek(&self) -> Option<T>;

    /// Current length. Durable realizations query the store on every call.
    ///
    /// # Errors
    ///
    /// Returns an error when the length cannot be determined.
    fn count(&self) -> Result<usize, CollectionError>;

    /// Remove every item.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying store rejects the operation.
    fn clear(&self) -> Result<(), CollectionError>;

    /// Best-effort copy of the contents in take order.
    ///
    /// # Errors
    ///
    /// Returns an error when the contents cannot be read.
    fn snapshot(&self) -> Result<Vec<T>, CollectionError>;

    /// Whether the collection is currently empty.
    ///
    /// # Errors
    ///
    /// Propagates [`BackingCollection::count`] failures.
    fn is_empty(&self) -> Result<bool, CollectionError> {
        Ok(self.count()? == 0)
    }

    /// Subscribe to change notifications raised by other holders of the same
    /// collection. Collections that are not observable return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error when the subscription cannot be established.
    fn watch(&self) -> Result<Option<Receiver<CollectionNotification<T>>>, CollectionError> {
        Ok(None)
    }
}
