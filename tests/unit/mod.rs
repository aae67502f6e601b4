//! Unit tests for individual components

mod builders_test;
mod codec_test;
mod collection_test;
mod config_test;
mod error_test;
mod util_test;
