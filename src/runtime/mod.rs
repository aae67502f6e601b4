//! Runtime adapters that host drain tasks.
//!
//! Drain loops block on store I/O and on user callbacks, so they always run on
//! a blocking-capable executor: a dedicated OS thread by default, or Tokio's
//! blocking pool when the `tokio-runtime` feature is enabled.

pub mod thread_spawner;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;

pub use thread_spawner::ThreadSpawner;
#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;

/// Boxed blocking job handed to a spawner.
pub type BlockingJob = Box<dyn FnOnce() + Send + 'static>;

/// Abstraction for starting blocking work on a runtime.
pub trait Spawn: Send + Sync {
    /// Run `job` on a blocking-capable executor. `name` labels the unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error when the executor could not accept the job.
    fn spawn_blocking(&self, name: &str, job: BlockingJob) -> std::io::Result<()>;
}
