//! Dedicated OS thread spawner.

use std::thread;

use super::{BlockingJob, Spawn};

/// Spawns every job on its own named OS thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadSpawner {
    stack_size: Option<usize>,
}

impl ThreadSpawner {
    /// Create a spawner using the platform default stack size.
    pub const fn new() -> Self {
        Self { stack_size: None }
    }

    /// Create a spawner with an explicit stack size in bytes.
    pub const fn with_stack_size(stack_size: usize) -> Self {
        Self {
            stack_size: Some(stack_size),
        }
    }
}

impl Spawn for ThreadSpawner {
    fn spawn_blocking(&self, name: &str, job: BlockingJob) -> std::io::Result<()> {
        let mut builder = thread::Builder::new().name(name.to_owned());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn(job).map(drop)
    }
}
