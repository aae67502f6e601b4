//! Infrastructure adapters: collection realizations and external list stores.

pub mod collection;
pub mod store;

pub use collection::{DurableCollection, InMemoryCollection, ObservableCollection};
pub use store::{ListKey, ListStore, MemoryListStore};
#[cfg(feature = "redis")]
pub use store::RedisListStore;
