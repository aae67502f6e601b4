//! Single-consumer scheduling core.
//!
//! A [`Scheduler`] owns one backing collection and one callback, and keeps at
//! most one drain task running. The drain task starts itself when work is
//! added (locally, or announced by an observable collection) and stops itself
//! once it observes the collection empty.
//!
//! # Design
//!
//! - **Single launch path**: local adds, `run()` and change notifications all
//!   go through the same launch attempt on the shared [`LaunchState`]
//! - **No lost wake-ups**: the drain task only finishes through a
//!   compare-and-swap that fails if any launcher announced work since its last
//!   pass started
//! - **Ordered hand-over**: a finishing task reports its outcome before it
//!   releases the phase, so runs never overlap
//! - **Fault boundaries**: callback failures are reported per item and never
//!   stop the loop; faults from the collection stop the run and are reported
//!   as fatal

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::core::launch::{CancelHandle, LaunchState, LoopPhase};
use crate::core::{
    AddError, AppResult, BackingCollection, ChangeAction, CollectionNotification, Fanout,
    SchedulerError, SchedulerEvent,
};
use crate::runtime::{Spawn, ThreadSpawner};
use crate::util::RetryPolicy;

/// User callback invoked once per drained item.
pub type Callback<T> = Arc<dyn Fn(T) -> AppResult<()> + Send + Sync>;

/// Externally visible scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerStatus {
    /// No drain task; new work starts one.
    Idle,
    /// A drain task was launched but has not started draining.
    LaunchPending,
    /// A drain task is active.
    Running,
    /// `stop()` is in effect; adds are accepted but do not launch.
    Stopped,
    /// The scheduler was disposed.
    Disposed,
}

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Drain tasks launched.
    pub launches: u64,
    /// Items handed to the callback.
    pub processed: u64,
    /// Items whose callback failed.
    pub item_failures: u64,
    /// Drain runs stopped by a fatal fault (including failed launches).
    pub fatal_errors: u64,
    /// Drain runs that finished without a fault.
    pub completed_runs: u64,
}

#[derive(Debug, Default)]
struct Counters {
    launches: AtomicU64,
    processed: AtomicU64,
    item_failures: AtomicU64,
    fatal_errors: AtomicU64,
    completed_runs: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            launches: self.launches.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            item_failures: self.item_failures.load(Ordering::Relaxed),
            fatal_errors: self.fatal_errors.load(Ordering::Relaxed),
            completed_runs: self.completed_runs.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Exit {
    Drained,
    Cancelled,
}

struct Inner<T> {
    id: Uuid,
    collection: Arc<dyn BackingCollection<T>>,
    callback: Callback<T>,
    spawner: Arc<dyn Spawn>,
    add_retry: RetryPolicy,
    drain_retry: RetryPolicy,
    thread_name: String,
    state: LaunchState,
    cancel: CancelHandle,
    events: Fanout<SchedulerEvent<T>>,
    counters: Counters,
    drain_thread: Mutex<Option<ThreadId>>,
    idle_lock: Mutex<()>,
    idle_signal: Condvar,
}

impl<T> Inner<T>
where
    T: Clone + Send + 'static,
{
    /// The launch decision. Returns `Ok(true)` when this call started a drain task.
    fn launch(self: &Arc<Self>) -> Result<bool, SchedulerError> {
        if self.cancel.check()? {
            debug!(scheduler = %self.id, "scheduler stopped; launch deferred");
            return Ok(false);
        }
        if !self.state.request() {
            return Ok(false);
        }

        let run = self.counters.launches.fetch_add(1, Ordering::Relaxed) + 1;
        let name = format!("{}-{run}", self.thread_name);
        let inner = Arc::clone(self);
        if let Err(e) = self
            .spawner
            .spawn_blocking(&name, Box::new(move || inner.drain_task(run)))
        {
            let message = e.to_string();
            error!(scheduler = %self.id, run, error = %message, "failed to spawn drain task");
            self.state.reset();
            self.counters.fatal_errors.fetch_add(1, Ordering::Relaxed);
            self.events.emit(&SchedulerEvent::Fatal {
                error: Arc::new(SchedulerError::Spawn(message.clone())),
            });
            self.notify_idle();
            return Err(SchedulerError::Spawn(message));
        }
        debug!(scheduler = %self.id, run, "drain task launched");
        Ok(true)
    }

    fn drain_task(self: Arc<Self>, first_run: u64) {
        let thread_id = thread::current().id();
        *self.drain_thread.lock() = Some(thread_id);

        let mut run = first_run;
        loop {
            self.drain_run(run);
            if !self.state.settle() {
                break;
            }
            run = self.counters.launches.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(scheduler = %self.id, run, "work announced while finishing; draining again");
        }

        {
            let mut current = self.drain_thread.lock();
            if *current == Some(thread_id) {
                *current = None;
            }
        }
        self.notify_idle();
    }

    /// One drain run, from `Started` to its `Completed` or `Fatal` event. The
    /// phase stays non-idle until the caller settles it.
    fn drain_run(&self, run: u64) {
        let span = info_span!("drain", scheduler = %self.id, run);
        let _enter = span.enter();
        self.events.emit(&SchedulerEvent::Started { run });
        debug!("drain task started");

        let mut processed = 0_u64;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.drain(&mut processed)));

        match outcome {
            Ok(Ok(exit)) => {
                self.counters.completed_runs.fetch_add(1, Ordering::Relaxed);
                info!(processed, ?exit, "drain task completed");
                self.events.emit(&SchedulerEvent::Completed { run, processed });
            }
            Ok(Err(err)) => self.fail(err),
            Err(payload) => self.fail(SchedulerError::Panicked(panic_message(&*payload))),
        }
    }

    fn drain(&self, processed: &mut u64) -> Result<Exit, SchedulerError> {
        let mut misses = 0_u32;
        loop {
            self.state.begin_pass();

            if self.cancel.is_cancelled() {
                if self.state.try_finish() {
                    return Ok(Exit::Cancelled);
                }
                continue;
            }

            if let Some(item) = self.collection.try_take() {
                misses = 0;
                *processed += 1;
                self.counters.processed.fetch_add(1, Ordering::Relaxed);
                self.invoke(item);
                continue;
            }

            if self.collection.count()? == 0 {
                if self.state.try_finish() {
                    return Ok(Exit::Drained);
                }
                continue;
            }

            // items remain but the take came back empty: a peer won the pop,
            // or the store failed transiently
            debug!(misses, "contended take");
            self.drain_retry.pause(misses);
            misses = misses.saturating_add(1);
        }
    }

    fn invoke(&self, item: T) {
        let callback = &self.callback;
        let result = panic::catch_unwind(AssertUnwindSafe(|| callback(item.clone())));
        let error = match result {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => {
                anyhow::anyhow!("callback panicked: {}", panic_message(&*payload))
            }
        };
        self.counters.item_failures.fetch_add(1, Ordering::Relaxed);
        warn!(error = %error, "callback failed");
        self.events.emit(&SchedulerEvent::ItemFailed {
            item,
            error: Arc::new(error),
        });
    }

    fn fail(&self, err: SchedulerError) {
        self.state.abort();
        self.counters.fatal_errors.fetch_add(1, Ordering::Relaxed);
        error!(error = %err, "drain task failed");
        self.events.emit(&SchedulerEvent::Fatal {
            error: Arc::new(err),
        });
    }

    fn notify_idle(&self) {
        let _guard = self.idle_lock.lock();
        self.idle_signal.notify_all();
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.idle_lock.lock();
        while self.state.phase() != LoopPhase::Idle {
            if self.idle_signal.wait_until(&mut guard, deadline).timed_out() {
                return self.state.phase() == LoopPhase::Idle;
            }
        }
        true
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

struct Watcher {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

/// Feeds "item added" notifications from an observable collection into the
/// scheduler's launch decision.
fn spawn_watcher<T>(
    inner: &Arc<Inner<T>>,
    notifications: Receiver<CollectionNotification<T>>,
) -> Result<Watcher, SchedulerError>
where
    T: Clone + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
    let weak: Weak<Inner<T>> = Arc::downgrade(inner);
    let id = inner.id;

    let handle = thread::Builder::new()
        .name(format!("{}-watch", inner.thread_name))
        .spawn(move || {
            loop {
                let notification = select! {
                    recv(notifications) -> msg => msg.ok(),
                    recv(shutdown_rx) -> _ => None,
                };
                let Some(notification) = notification else {
                    break;
                };
                let wake = match notification {
                    CollectionNotification::Changed {
                        action: ChangeAction::Added,
                        ..
                    } => "drain launched by change signal",
                    // anything added while disconnected is still waiting
                    CollectionNotification::Resubscribed => "drain launched after resubscribe",
                    _ => continue,
                };
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                match inner.launch() {
                    Ok(true) => debug!(scheduler = %id, "{wake}"),
                    Ok(false) => {}
                    Err(SchedulerError::Disposed) => break,
                    Err(e) => warn!(scheduler = %id, error = %e, "launch from change signal failed"),
                }
            }
            debug!(scheduler = %id, "change watcher stopped");
        })
        .map_err(|e| SchedulerError::Spawn(e.to_string()))?;

    Ok(Watcher {
        shutdown: Some(shutdown_tx),
        handle: Some(handle),
    })
}

/// Single-consumer drain scheduler.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use prometheus_drain::core::Scheduler;
/// use prometheus_drain::infra::InMemoryCollection;
///
/// let scheduler = Scheduler::new(Arc::new(InMemoryCollection::queue()), |job: String| {
///     println!("processing {job}");
///     Ok(())
/// })?;
/// scheduler.add_and_run("resize".to_owned())?;
/// ```
pub struct Scheduler<T>
where
    T: Clone + Send + 'static,
{
    inner: Arc<Inner<T>>,
    watcher: Mutex<Option<Watcher>>,
    dispose_timeout: Duration,
}

impl<T> Scheduler<T>
where
    T: Clone + Send + 'static,
{
    /// Create a scheduler with default configuration, draining on OS threads.
    ///
    /// # Errors
    ///
    /// Fails when the collection's change subscription cannot be established.
    pub fn new<F>(collection: Arc<dyn BackingCollection<T>>, callback: F) -> Result<Self, SchedulerError>
    where
        F: Fn(T) -> AppResult<()> + Send + Sync + 'static,
    {
        Self::from_parts(
            collection,
            Arc::new(callback),
            Arc::new(ThreadSpawner::new()),
            &SchedulerConfig::default(),
        )
    }

    /// Create a scheduler from explicit parts.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` if the configuration is invalid
    /// - `SchedulerError::Collection` if the change subscription fails
    /// - `SchedulerError::Spawn` if the watcher thread cannot be started
    pub fn from_parts(
        collection: Arc<dyn BackingCollection<T>>,
        callback: Callback<T>,
        spawner: Arc<dyn Spawn>,
        config: &SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        let notifications = collection.watch()?;
        let discipline = collection.discipline();

        let inner = Arc::new(Inner {
            id: Uuid::new_v4(),
            collection,
            callback,
            spawner,
            add_retry: RetryPolicy::from(&config.add_retry),
            drain_retry: RetryPolicy::from(&config.drain_retry),
            thread_name: config.thread_name.clone(),
            state: LaunchState::new(),
            cancel: CancelHandle::new(),
            events: Fanout::new(),
            counters: Counters::default(),
            drain_thread: Mutex::new(None),
            idle_lock: Mutex::new(()),
            idle_signal: Condvar::new(),
        });

        let watcher = notifications
            .map(|rx| spawn_watcher(&inner, rx))
            .transpose()?;

        info!(
            scheduler = %inner.id,
            ?discipline,
            observable = watcher.is_some(),
            "scheduler created"
        );

        Ok(Self {
            inner,
            watcher: Mutex::new(watcher),
            dispose_timeout: config.dispose_timeout(),
        })
    }

    /// Unique identifier of this scheduler instance.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// The collection being drained.
    pub fn collection(&self) -> &Arc<dyn BackingCollection<T>> {
        &self.inner.collection
    }

    /// Register an event subscriber. Events with no subscribers are dropped.
    pub fn subscribe(&self) -> Receiver<SchedulerEvent<T>> {
        self.inner.events.subscribe()
    }

    /// Current state.
    pub fn status(&self) -> SchedulerStatus {
        if self.inner.cancel.is_disposed() {
            return SchedulerStatus::Disposed;
        }
        match self.inner.state.phase() {
            LoopPhase::LaunchPending => SchedulerStatus::LaunchPending,
            LoopPhase::Running => SchedulerStatus::Running,
            LoopPhase::Idle if self.inner.cancel.is_cancelled() => SchedulerStatus::Stopped,
            LoopPhase::Idle => SchedulerStatus::Idle,
        }
    }

    /// Counter snapshot.
    pub fn stats(&self) -> SchedulerStats {
        self.inner.counters.snapshot()
    }

    /// Start draining if no drain task is active. Clears a previous `stop()`.
    ///
    /// Returns `Ok(true)` when this call launched the drain task.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::Disposed` after `dispose()`
    /// - `SchedulerError::Spawn` if the drain task could not be started
    pub fn run(&self) -> Result<bool, SchedulerError> {
        self.inner.cancel.resume()?;
        self.inner.launch()
    }

    /// Add `item`, retrying per the configured policy, then start draining.
    ///
    /// # Errors
    ///
    /// - `AddError::Disposed` after `dispose()`
    /// - `AddError::Exhausted` when every allowed attempt failed
    pub fn add_and_run(&self, item: T) -> Result<(), AddError<T>> {
        if self.inner.cancel.is_disposed() {
            return Err(AddError::Disposed(item));
        }
        let policy = self.inner.add_retry;
        let mut item = item;
        let mut attempts = 0_u32;
        loop {
            attempts = attempts.saturating_add(1);
            match self.inner.collection.try_add(item) {
                Ok(()) => break,
                Err(rejected) => {
                    if !policy.allows(attempts) {
                        warn!(scheduler = %self.inner.id, attempts, "giving up on add");
                        return Err(AddError::Exhausted {
                            item: rejected,
                            attempts,
                        });
                    }
                    policy.pause(attempts - 1);
                    item = rejected;
                }
            }
        }
        self.launch_after_add();
        Ok(())
    }

    /// Add `item` with a single attempt, then start draining.
    ///
    /// # Errors
    ///
    /// - `AddError::Disposed` after `dispose()`
    /// - `AddError::Rejected` when the attempt failed
    pub fn try_add_and_run(&self, item: T) -> Result<(), AddError<T>> {
        if self.inner.cancel.is_disposed() {
            return Err(AddError::Disposed(item));
        }
        self.inner
            .collection
            .try_add(item)
            .map_err(AddError::Rejected)?;
        self.launch_after_add();
        Ok(())
    }

    /// Ask the drain task to stop at its next iteration boundary. A callback in
    /// progress completes first. Idempotent; `run()` resumes.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Disposed` after `dispose()`.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        self.inner.cancel.stop()?;
        debug!(scheduler = %self.inner.id, "stop requested");
        Ok(())
    }

    /// Block until no drain task is active or `timeout` elapses.
    /// Returns whether the scheduler is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.inner.wait_idle(timeout)
    }

    /// Stop draining, release the change watcher and invalidate the
    /// cancellation handle. Waits up to the configured dispose timeout for the
    /// drain task. Idempotent.
    pub fn dispose(&self) {
        if !self.inner.cancel.dispose() {
            return;
        }

        if let Some(mut watcher) = self.watcher.lock().take() {
            drop(watcher.shutdown.take());
            if let Some(handle) = watcher.handle.take() {
                let _ = handle.join();
            }
        }

        let on_drain_thread = *self.inner.drain_thread.lock() == Some(thread::current().id());
        if !on_drain_thread && !self.inner.wait_idle(self.dispose_timeout) {
            warn!(
                scheduler = %self.inner.id,
                timeout_ms = u64::try_from(self.dispose_timeout.as_millis()).unwrap_or(u64::MAX),
                "drain task still running after dispose timeout"
            );
        }
        self.inner.events.close();
        info!(scheduler = %self.inner.id, "scheduler disposed");
    }

    fn launch_after_add(&self) {
        // the item is in; loop-level failures are reported through events
        match self.inner.launch() {
            Ok(_) | Err(SchedulerError::Disposed) => {}
            Err(e) => debug!(scheduler = %self.inner.id, error = %e, "launch after add failed"),
        }
    }
}

impl<T> Drop for Scheduler<T>
where
    T: Clone + Send + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}
