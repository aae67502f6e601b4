//! Tokio runtime spawner implementation.

use std::sync::Arc;

use super::{BlockingJob, Spawn};

/// Spawner that runs drain tasks on a Tokio runtime's blocking pool.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Arc<tokio::runtime::Handle>,
}

impl TokioSpawner {
    /// Create a `TokioSpawner` from a tokio runtime handle.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Create a `TokioSpawner` for the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a Tokio runtime.
    pub fn current() -> std::io::Result<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(std::io::Error::other)
    }
}

impl Spawn for TokioSpawner {
    fn spawn_blocking(&self, name: &str, job: BlockingJob) -> std::io::Result<()> {
        tracing::trace!(task = name, "spawning on tokio blocking pool");
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}
