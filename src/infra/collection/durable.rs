//! Durable collection over an external list store.
//!
//! Both disciplines push at the tail. FIFO pops and peeks the head, LIFO pops
//! and peeks the tail (index `-1`). Items cross the store boundary as codec
//! payloads; an absent or null payload means "empty", never a default item.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::core::{BackingCollection, CollectionError, Discipline, ItemCodec};
use crate::infra::store::{ListKey, ListStore};

/// Collection persisted in a [`ListStore`] under `(key, database)`.
///
/// Every instance opened on the same store and list observes the same
/// sequence; concurrent takers are serialized by the store's atomic pop.
pub struct DurableCollection<T, C> {
    store: Arc<dyn ListStore>,
    list: ListKey,
    discipline: Discipline,
    codec: C,
    discarded: AtomicU64,
    _item: PhantomData<fn() -> T>,
}

impl<T, C> DurableCollection<T, C>
where
    C: ItemCodec<T>,
{
    /// Open a collection on `store` at `list`.
    pub fn new(store: Arc<dyn ListStore>, list: ListKey, discipline: Discipline, codec: C) -> Self {
        debug!(key = %list.key, database = list.database, ?discipline, "opening durable collection");
        Self {
            store,
            list,
            discipline,
            codec,
            discarded: AtomicU64::new(0),
            _item: PhantomData,
        }
    }

    /// Address of the backing list.
    pub const fn list(&self) -> &ListKey {
        &self.list
    }

    /// The underlying store handle.
    pub fn store(&self) -> &Arc<dyn ListStore> {
        &self.store
    }

    /// The item codec.
    pub const fn codec(&self) -> &C {
        &self.codec
    }

    /// Popped payloads that could not be decoded and were lost.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Push `item`, returning the encoded payload that was stored.
    pub(crate) fn push_encoded(&self, item: T) -> Result<Vec<u8>, T> {
        let payload = match self.codec.encode(&item) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %self.list.key, error = %e, "failed to encode item");
                return Err(item);
            }
        };
        match self.store.push_back(&self.list, &payload) {
            Ok(_) => Ok(payload),
            Err(e) => {
                warn!(key = %self.list.key, error = %e, "failed to push item");
                Err(item)
            }
        }
    }

    /// Pop the next item along with its raw payload.
    pub(crate) fn take_encoded(&self) -> Option<(T, Vec<u8>)> {
        let popped = match self.discipline {
            Discipline::Fifo => self.store.pop_front(&self.list),
            Discipline::Lifo => self.store.pop_back(&self.list),
        };
        let payload = match popped {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.list.key, error = %e, "failed to pop item");
                return None;
            }
        };
        match self.codec.decode(&payload) {
            Ok(Some(item)) => Some((item, payload)),
            Ok(None) => None,
            Err(e) => {
                // the payload is already gone from the store
                let discarded = self.discarded.fetch_add(1, Ordering::Relaxed) + 1;
                error!(
                    key = %self.list.key,
                    bytes = payload.len(),
                    discarded,
                    error = %e,
                    "discarding undecodable item"
                );
                None
            }
        }
    }

    const fn peek_index(&self) -> isize {
        match self.discipline {
            Discipline::Fifo => 0,
            Discipline::Lifo => -1,
        }
    }
}

impl<T, C> BackingCollection<T> for DurableCollection<T, C>
where
    T: Send,
    C: ItemCodec<T>,
{
    fn discipline(&self) -> Discipline {
        self.discipline
    }

    fn try_add(&self, item: T) -> Result<(), T> {
        self.push_encoded(item).map(drop)
    }

    fn try_take(&self) -> Option<T> {
        self.take_encoded().map(|(item, _)| item)
    }

    fn try_peek(&self) -> Option<T> {
        match self.store.index(&self.list, self.peek_index()) {
            Ok(Some(payload)) => self.codec.decode(&payload).unwrap_or_else(|e| {
                warn!(key = %self.list.key, error = %e, "failed to decode peeked item");
                None
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %self.list.key, error = %e, "failed to peek item");
                None
            }
        }
    }

    fn count(&self) -> Result<usize, CollectionError> {
        Ok(self.store.len(&self.list)?)
    }

    fn clear(&self) -> Result<(), CollectionError> {
        Ok(self.store.delete(&self.list)?)
    }

    fn snapshot(&self) -> Result<Vec<T>, CollectionError> {
        let payloads = self.store.range(&self.list)?;
        let mut items: Vec<T> = payloads
            .iter()
            .filter_map(|payload| match self.codec.decode(payload) {
                Ok(item) => item,
                Err(e) => {
                    warn!(key = %self.list.key, error = %e, "skipping undecodable item in snapshot");
                    None
                }
            })
            .collect();
        if self.discipline == Discipline::Lifo {
            items.reverse();
        }
        Ok(items)
    }
}
