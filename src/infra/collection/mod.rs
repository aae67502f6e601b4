//! Backing collection realizations.

pub mod durable;
pub mod memory;
pub mod observable;

pub use durable::DurableCollection;
pub use memory::InMemoryCollection;
pub use observable::{ChangeSignal, ObservableCollection};
