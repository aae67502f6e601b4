//! Builders to construct schedulers and collections from configuration.

pub mod scheduler_builder;

pub use scheduler_builder::{
    build_collection, build_collection_on, build_list_store, SchedulerBuilder,
};
