// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Background timer thread.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use super::{TimerCallback, TimerCommand, TimerHandle, TimerService, TimerState};

struct Pending {
    deadline: Instant,
    order: u64,
    generation: u64,
    state: Arc<TimerState>,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.order == other.order
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.order.cmp(&other.order))
    }
}

/// Production timer service: one `hdds-timer` thread.
///
/// Dropping the service stops the thread; armed timers are discarded.
pub struct TimerThread {
    tx: Sender<TimerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl TimerThread {
    pub fn spawn() -> Self {
        let (tx, rx) = channel::unbounded();

        #[allow(clippy::expect_used)] // thread spawn failure is unrecoverable
        let thread = thread::Builder::new()
            .name("hdds-timer".into())
            .spawn(move || timer_loop(rx))
            .expect("failed to spawn timer thread");

        Self {
            tx,
            thread: Some(thread),
        }
    }
}

impl TimerService for TimerThread {
    fn create(&self, interval: Duration, callback: TimerCallback) -> TimerHandle {
        TimerHandle::new(interval, callback, self.tx.clone())
    }
}

impl Drop for TimerThread {
    fn drop(&mut self) {
        let _ = self.tx.send(TimerCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            // The last owner may be a callback running on the timer thread.
            if handle.thread().id() == thread::current().id() {
                return;
            }
            let _ = handle.join();
        }
    }
}

fn timer_loop(rx: Receiver<TimerCommand>) {
    log::debug!("[timer] Timer thread started");

    let mut heap: BinaryHeap<Reverse<Pending>> = BinaryHeap::new();
    let mut order = 0u64;

    loop {
        let cmd = match heap.peek() {
            Some(Reverse(next)) => rx.recv_deadline(next.deadline),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match cmd {
            Ok(TimerCommand::Arm {
                state,
                generation,
                delay,
            }) => {
                order += 1;
                heap.push(Reverse(Pending {
                    deadline: Instant::now() + delay,
                    order,
                    generation,
                    state,
                }));
            }
            Ok(TimerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        while heap.peek().is_some_and(|Reverse(next)| next.deadline <= now) {
            let Some(Reverse(due)) = heap.pop() else {
                break;
            };
            if let Some(delay) = due.state.fire(due.generation) {
                order += 1;
                heap.push(Reverse(Pending {
                    deadline: Instant::now() + delay,
                    order,
                    generation: due.generation,
                    state: due.state,
                }));
            }
        }
    }

    log::debug!("[timer] Timer thread stopped ({} pending dropped)", heap.len());
}
