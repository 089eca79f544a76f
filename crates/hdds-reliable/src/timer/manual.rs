// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Virtual-clock timer service for deterministic tests.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use super::{TimerCallback, TimerCommand, TimerHandle, TimerService, TimerState};

struct Pending {
    deadline: Duration,
    order: u64,
    generation: u64,
    state: Arc<TimerState>,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        (self.deadline, self.order) == (other.deadline, other.order)
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.deadline, self.order).cmp(&(other.deadline, other.order))
    }
}

#[derive(Default)]
struct Clock {
    now: Duration,
    order: u64,
    heap: BinaryHeap<Reverse<Pending>>,
}

impl Clock {
    fn push(&mut self, deadline: Duration, generation: u64, state: Arc<TimerState>) {
        self.order += 1;
        self.heap.push(Reverse(Pending {
            deadline,
            order: self.order,
            generation,
            state,
        }));
    }
}

/// Timer service whose clock only moves in [`advance`](Self::advance).
///
/// Callbacks run on the calling thread, in deadline order, with the virtual
/// clock set to their deadline.
pub struct ManualTimerService {
    tx: Sender<TimerCommand>,
    rx: Receiver<TimerCommand>,
    clock: Mutex<Clock>,
}

impl ManualTimerService {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            tx,
            rx,
            clock: Mutex::new(Clock::default()),
        }
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    fn drain_commands(&self, clock: &mut Clock) {
        while let Ok(cmd) = self.rx.try_recv() {
            if let TimerCommand::Arm {
                state,
                generation,
                delay,
            } = cmd
            {
                let deadline = clock.now + delay;
                clock.push(deadline, generation, state);
            }
        }
    }

    /// Move the clock forward by `by`, firing every expiry that comes due.
    ///
    /// Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut fired = 0;

        loop {
            let due = {
                let mut clock = self.clock.lock();
                self.drain_commands(&mut clock);
                match clock.heap.peek() {
                    Some(Reverse(next)) if next.deadline <= target => {
                        let due = clock.heap.pop().map(|Reverse(p)| p);
                        if let Some(p) = &due {
                            clock.now = clock.now.max(p.deadline);
                        }
                        due
                    }
                    _ => None,
                }
            };
            let Some(due) = due else {
                break;
            };

            // Lock released: callbacks may restart timers.
            if due.state.is_current(due.generation) {
                fired += 1;
            }
            if let Some(delay) = due.state.fire(due.generation) {
                let mut clock = self.clock.lock();
                let deadline = clock.now + delay;
                clock.push(deadline, due.generation, due.state);
            }
        }

        let mut clock = self.clock.lock();
        clock.now = clock.now.max(target);
        fired
    }

    /// Expiries queued (including stale ones not yet discarded).
    pub fn pending(&self) -> usize {
        let mut clock = self.clock.lock();
        self.drain_commands(&mut clock);
        clock.heap.len()
    }
}

impl Default for ManualTimerService {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerService for ManualTimerService {
    fn create(&self, interval: Duration, callback: TimerCallback) -> TimerHandle {
        TimerHandle::new(interval, callback, self.tx.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerAction;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn counter(action: TimerAction) -> (Arc<AtomicU32>, TimerCallback) {
        let hits = Arc::new(AtomicU32::new(0));
        let hits_cb = Arc::clone(&hits);
        (
            hits,
            Arc::new(move || {
                hits_cb.fetch_add(1, Ordering::Relaxed);
                action
            }),
        )
    }

    #[test]
    fn test_fires_at_deadline() {
        let timers = ManualTimerService::new();
        let (hits, cb) = counter(TimerAction::Stop);
        let handle = timers.schedule(ms(10), cb);

        assert_eq!(timers.advance(ms(9)), 0);
        assert!(handle.is_armed());
        assert_eq!(timers.advance(ms(1)), 1);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert!(!handle.is_armed());
        assert_eq!(timers.now(), ms(10));
    }

    #[test]
    fn test_cancel_prevents_callback() {
        let timers = ManualTimerService::new();
        let (hits, cb) = counter(TimerAction::Stop);
        let handle = timers.schedule(ms(10), cb);
        timers.cancel(&handle);

        timers.advance(ms(100));
        assert_eq!(hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_rearm_fires_once_per_interval() {
        let timers = ManualTimerService::new();
        let (hits, cb) = counter(TimerAction::Rearm);
        let handle = timers.schedule(ms(10), cb);

        timers.advance(ms(35));
        assert_eq!(hits.load(Ordering::Relaxed), 3);
        assert!(handle.is_armed());

        handle.cancel();
        timers.advance(ms(50));
        assert_eq!(hits.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_restart_supersedes_pending_expiry() {
        let timers = ManualTimerService::new();
        let (hits, cb) = counter(TimerAction::Stop);
        let handle = timers.schedule(ms(10), cb);

        timers.advance(ms(5));
        timers.restart(&handle, Some(ms(20)));
        timers.advance(ms(10));
        assert_eq!(hits.load(Ordering::Relaxed), 0);

        timers.advance(ms(10));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_deadline_order() {
        let timers = ManualTimerService::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (tag, delay) in [(1u8, 30u64), (2, 10), (3, 20)] {
            let order = Arc::clone(&order);
            timers.schedule(
                ms(delay),
                Arc::new(move || {
                    order.lock().push(tag);
                    TimerAction::Stop
                }),
            );
        }
        timers.advance(ms(30));
        assert_eq!(*order.lock(), vec![2, 3, 1]);
    }
}
