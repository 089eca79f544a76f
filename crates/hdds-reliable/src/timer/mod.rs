// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timer service used by the reliability engine
//!
//! Heartbeat, nack-supression, initial-heartbeat and nack-response events are
//! all one-shot timers that a callback may re-arm.
//!
//! # Cancellation
//!
//! Every [`TimerHandle`] carries a generation counter bumped by each
//! `restart` and `cancel`. An armed expiry remembers the generation it was
//! armed with; when it comes due with a different generation it is dropped
//! without running the callback. Cancelling from any thread is therefore a
//! single atomic increment.
//!
//! # Implementations
//!
//! | Service | Use |
//! |---------|-----|
//! | [`TimerThread`] | Production: one `hdds-timer` thread, crossbeam command channel |
//! | [`ManualTimerService`] | Tests: virtual clock driven by `advance()` |

mod manual;
mod thread;

pub use manual::ManualTimerService;
pub use thread::TimerThread;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Sender;
use parking_lot::Mutex;

/// What to do after a callback ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Leave the timer disarmed.
    Stop,
    /// Fire again after the current interval.
    Rearm,
}

/// Timer body. Runs on the service's thread (or inside `advance`).
pub type TimerCallback = Arc<dyn Fn() -> TimerAction + Send + Sync>;

pub(crate) struct TimerState {
    generation: AtomicU64,
    armed: AtomicBool,
    interval: Mutex<Duration>,
    callback: TimerCallback,
}

impl TimerState {
    fn new(interval: Duration, callback: TimerCallback) -> Self {
        Self {
            generation: AtomicU64::new(0),
            armed: AtomicBool::new(false),
            interval: Mutex::new(interval),
            callback,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        *self.interval.lock()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Run an expiry armed with `generation`.
    ///
    /// Returns the delay of the next expiry when the callback asked to be
    /// re-armed and nobody restarted or cancelled the timer meanwhile.
    pub(crate) fn fire(&self, generation: u64) -> Option<Duration> {
        if !self.is_current(generation) {
            return None;
        }
        let action = (self.callback)();
        if !self.is_current(generation) {
            // Restarted or cancelled from inside the callback.
            return None;
        }
        match action {
            TimerAction::Rearm => {
                let interval = self.interval();
                if interval.is_zero() {
                    log::debug!("[timer] zero interval, not re-arming");
                    self.armed.store(false, Ordering::Release);
                    return None;
                }
                Some(interval)
            }
            TimerAction::Stop => {
                self.armed.store(false, Ordering::Release);
                None
            }
        }
    }
}

pub(crate) enum TimerCommand {
    Arm {
        state: Arc<TimerState>,
        generation: u64,
        delay: Duration,
    },
    Shutdown,
}

/// Handle to one timer. Cloning shares the same timer.
#[derive(Clone)]
pub struct TimerHandle {
    state: Arc<TimerState>,
    tx: Sender<TimerCommand>,
}

impl TimerHandle {
    pub(crate) fn new(interval: Duration, callback: TimerCallback, tx: Sender<TimerCommand>) -> Self {
        Self {
            state: Arc::new(TimerState::new(interval, callback)),
            tx,
        }
    }

    /// Arm (or re-arm) the timer, optionally with a new interval.
    ///
    /// Any pending expiry is superseded.
    pub fn restart(&self, interval: Option<Duration>) {
        if let Some(interval) = interval {
            *self.state.interval.lock() = interval;
        }
        let generation = self.state.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.armed.store(true, Ordering::Release);
        let cmd = TimerCommand::Arm {
            state: Arc::clone(&self.state),
            generation,
            delay: self.state.interval(),
        };
        if self.tx.send(cmd).is_err() {
            log::debug!("[timer] service stopped, timer not armed");
            self.state.armed.store(false, Ordering::Release);
        }
    }

    /// Disarm; a pending expiry will not run.
    pub fn cancel(&self) {
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        self.state.armed.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.state.armed.load(Ordering::Acquire)
    }

    pub fn interval(&self) -> Duration {
        self.state.interval()
    }

    /// Change the interval used by the next `restart(None)` or re-arm.
    pub fn set_interval(&self, interval: Duration) {
        *self.state.interval.lock() = interval;
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("interval", &self.interval())
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Schedules callbacks after an interval.
pub trait TimerService: Send + Sync {
    /// New disarmed timer.
    fn create(&self, interval: Duration, callback: TimerCallback) -> TimerHandle;

    /// New timer, armed at once.
    fn schedule(&self, interval: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = self.create(interval, callback);
        handle.restart(None);
        handle
    }

    fn cancel(&self, handle: &TimerHandle) {
        handle.cancel();
    }

    fn restart(&self, handle: &TimerHandle, interval: Option<Duration>) {
        handle.restart(interval);
    }
}
