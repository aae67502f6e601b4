//! In-process backing collection.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::core::{BackingCollection, CollectionError, Discipline};

/// In-memory collection with queue or stack discipline.
///
/// Items are added at the back; FIFO takes from the front, LIFO from the back.
pub struct InMemoryCollection<T> {
    discipline: Discipline,
    items: Mutex<VecDeque<T>>,
}

impl<T> InMemoryCollection<T> {
    /// Create an empty collection.
    pub fn new(discipline: Discipline) -> Self {
        Self {
            discipline,
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Create an empty FIFO collection.
    pub fn queue() -> Self {
        Self::new(Discipline::Fifo)
    }

    /// Create an empty LIFO collection.
    pub fn stack() -> Self {
        Self::new(Discipline::Lifo)
    }
}

impl<T> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self::queue()
    }
}

impl<T> BackingCollection<T> for InMemoryCollection<T>
where
    T: Clone + Send,
{
    fn discipline(&self) -> Discipline {
        self.discipline
    }

    fn try_add(&self, item: T) -> Result<(), T> {
        self.items.lock().push_back(item);
        Ok(())
    }

    fn try_take(&self) -> Option<T> {
        let mut items = self.items.lock();
        match self.discipline {
            Discipline::Fifo => items.pop_front(),
            Discipline::Lifo => items.pop_back(),
        }
    }

    fn try_peek(&self) -> Option<T> {
        let items = self.items.lock();
        match self.discipline {
            Discipline::Fifo => items.front().cloned(),
            Discipline::Lifo => items.back().cloned(),
        }
    }

    fn count(&self) -> Result<usize, CollectionError> {
        Ok(self.items.lock().len())
    }

    fn clear(&self) -> Result<(), CollectionError> {
        self.items.lock().clear();
        Ok(())
    }

    fn snapshot(&self) -> Result<Vec<T>, CollectionError> {
        let items = self.items.lock();
        Ok(match self.discipline {
            Discipline::Fifo => items.iter().cloned().collect(),
            Discipline::Lifo => items.iter().rev().cloned().collect(),
        })
    }
}
