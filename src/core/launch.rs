//! Launch state machine and cancellation handle of a scheduler.
//!
//! The loop phase lives in one atomic tagged value so that "the drain task has
//! finished" and "a drain task is still active" can never be observed
//! inconsistently by a concurrent launcher:
//!
//! ```text
//!   IDLE ──request()──► PENDING ──begin_pass()──► RUNNING ──try_finish()──► FINISHING ──settle()──► IDLE
//!                          ▲                        │  ▲                       │
//!                          │            request()   ▼  │ begin_pass()          │ request()
//!                          │                       RESCAN                      ▼
//!                          └──────────────────── settle() ─────────────────  REARM
//! ```
//!
//! A launcher that loses the `IDLE → PENDING` race either finds a task pending
//! (which has not looked at the collection yet) or flags `RUNNING → RESCAN`,
//! which makes the loop's `RUNNING → FINISHING` exchange fail so that it takes
//! another pass. A task in `FINISHING` has stopped draining but still owns the
//! phase until it has reported its outcome; work announced meanwhile flags
//! `REARM`, and the same task starts another run instead of going idle.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;

const IDLE: u8 = 0;
const PENDING: u8 = 1;
const RUNNING: u8 = 2;
const RESCAN: u8 = 3;
const FINISHING: u8 = 4;
const REARM: u8 = 5;

/// Externally visible phase of the drain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    /// No drain task is active.
    Idle,
    /// A drain task was launched and has not started its first pass.
    LaunchPending,
    /// A drain task is draining.
    Running,
}

/// Tagged loop phase shared by launchers and the drain task.
#[derive(Debug)]
pub(crate) struct LaunchState(AtomicU8);

impl LaunchState {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    /// Announce new work. Returns `true` when the caller won the launch and
    /// must start a drain task.
    pub(crate) fn request(&self) -> bool {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            let next = match current {
                IDLE => PENDING,
                RUNNING => RESCAN,
                FINISHING => REARM,
                _ => return false,
            };
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next == PENDING,
                Err(actual) => current = actual,
            }
        }
    }

    /// Called by the drain task at the top of every pass; clears a pending rescan.
    pub(crate) fn begin_pass(&self) {
        self.0.store(RUNNING, Ordering::SeqCst);
    }

    /// Called by the drain task once it observed nothing to do. Fails when new
    /// work was announced since the last [`LaunchState::begin_pass`]; on
    /// success the task must report its outcome and then [`LaunchState::settle`].
    pub(crate) fn try_finish(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, FINISHING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Leave the drain loop after a fault. A rescan requested during the
    /// failed run is kept as a rearm so that [`LaunchState::settle`] relaunches once.
    pub(crate) fn abort(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| match current {
                RESCAN => Some(REARM),
                FINISHING | REARM => None,
                _ => Some(FINISHING),
            });
    }

    /// Release the phase once the finished run has been reported. Returns
    /// `true` when work was announced meanwhile; the phase is then `PENDING`
    /// and the caller owns the next run.
    pub(crate) fn settle(&self) -> bool {
        match self
            .0
            .compare_exchange(FINISHING, IDLE, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => false,
            // only a launcher moves FINISHING, and only to REARM
            Err(_) => {
                self.0.store(PENDING, Ordering::SeqCst);
                true
            }
        }
    }

    /// Force the phase back to idle after a failed launch.
    pub(crate) fn reset(&self) {
        self.0.store(IDLE, Ordering::SeqCst);
    }

    pub(crate) fn phase(&self) -> LoopPhase {
        match self.0.load(Ordering::SeqCst) {
            IDLE => LoopPhase::Idle,
            PENDING => LoopPhase::LaunchPending,
            _ => LoopPhase::Running,
        }
    }
}

const ACTIVE: u8 = 0;
const STOPPED: u8 = 1;
const DISPOSED: u8 = 2;

/// Cooperative cancellation handle.
///
/// `stop` is resumable through `resume`; `dispose` is terminal and makes every
/// later `check` fail.
#[derive(Debug)]
pub(crate) struct CancelHandle(AtomicU8);

impl CancelHandle {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(ACTIVE))
    }

    /// Fails once disposed; otherwise reports whether a stop is in effect.
    pub(crate) fn check(&self) -> Result<bool, SchedulerError> {
        match self.0.load(Ordering::SeqCst) {
            ACTIVE => Ok(false),
            STOPPED => Ok(true),
            _ => Err(SchedulerError::Disposed),
        }
    }

    pub(crate) fn stop(&self) -> Result<(), SchedulerError> {
        self.transition(ACTIVE, STOPPED)
    }

    pub(crate) fn resume(&self) -> Result<(), SchedulerError> {
        self.transition(STOPPED, ACTIVE)
    }

    /// Returns `true` the first time it is called.
    pub(crate) fn dispose(&self) -> bool {
        self.0.swap(DISPOSED, Ordering::SeqCst) != DISPOSED
    }

    /// Whether the drain loop should wind down.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst) != ACTIVE
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.0.load(Ordering::SeqCst) == DISPOSED
    }

    fn transition(&self, from: u8, to: u8) -> Result<(), SchedulerError> {
        match self
            .0
            .compare_exchange(from, to, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Ok(()),
            Err(DISPOSED) => Err(SchedulerError::Disposed),
            // already in the target state
            Err(_) => Ok(()),
        }
    }
}
