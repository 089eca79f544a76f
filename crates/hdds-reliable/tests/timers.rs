// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Timer services: cancellation, re-arming, and a writer driven by the
//! real `hdds-timer` thread.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hdds_reliable::reliability::{AckNackMsg, SequenceNumberSet};
use hdds_reliable::timer::TimerCallback;
use hdds_reliable::{
    ChangeKind, Destination, Durability, Guid, History, ManualTimerService, MessageSender,
    ReaderProxyData, Reliability, StatefulWriter, TimerAction, TimerService, TimerThread,
    WriterAttributes, WriterSubmessage, WriterTimes,
};
use parking_lot::Mutex;

fn counting(action: TimerAction) -> (Arc<AtomicU32>, TimerCallback) {
    let hits = Arc::new(AtomicU32::new(0));
    let hits_cb = Arc::clone(&hits);
    let callback: TimerCallback = Arc::new(move || {
        hits_cb.fetch_add(1, Ordering::Relaxed);
        action
    });
    (hits, callback)
}

/// Poll `cond` until it holds or `timeout` elapses.
fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[test]
fn cancelled_timer_never_fires() {
    let timers = ManualTimerService::new();
    let (hits, callback) = counting(TimerAction::Stop);
    let handle = timers.schedule(Duration::from_millis(10), callback);
    timers.cancel(&handle);

    timers.advance(Duration::from_millis(100));
    assert_eq!(hits.load(Ordering::Relaxed), 0);
    assert!(!handle.is_armed());
}

#[test]
fn rearmed_timer_fires_once_per_interval() {
    let timers = ManualTimerService::new();
    let (hits, callback) = counting(TimerAction::Rearm);
    let handle = timers.schedule(Duration::from_millis(10), callback);

    timers.advance(Duration::from_millis(45));
    assert_eq!(hits.load(Ordering::Relaxed), 4);

    timers.restart(&handle, Some(Duration::from_millis(20)));
    timers.advance(Duration::from_millis(45));
    // Restart superseded the pending 10 ms expiry.
    assert_eq!(hits.load(Ordering::Relaxed), 6);
}

#[test]
fn timer_thread_rearms_until_cancelled() {
    let timers = TimerThread::spawn();
    let (hits, callback) = counting(TimerAction::Rearm);
    let handle = timers.schedule(Duration::from_millis(5), callback);

    assert!(wait_until(Duration::from_secs(5), || hits.load(Ordering::Relaxed) >= 3));
    handle.cancel();

    // A callback already running may still complete.
    thread::sleep(Duration::from_millis(20));
    let settled = hits.load(Ordering::Relaxed);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(hits.load(Ordering::Relaxed), settled);
}

#[derive(Default)]
struct CollectingSender {
    sent: Mutex<Vec<WriterSubmessage>>,
}

impl MessageSender for CollectingSender {
    fn send(&self, _destination: &Destination, msg: &WriterSubmessage) -> hdds_reliable::Result<()> {
        self.sent.lock().push(msg.clone());
        Ok(())
    }
}

#[test]
fn writer_on_timer_thread_resends_after_nack_response_delay() {
    let sender = Arc::new(CollectingSender::default());
    let writer_guid = Guid::new([0x0C; 12], [0, 0, 0x01, 0x03]);
    let reader_guid = Guid::new([0x0D; 12], [0, 0, 0x01, 0x04]);
    let times = WriterTimes {
        nack_response_delay: Duration::from_millis(5),
        ..WriterTimes::default()
    };
    let writer = StatefulWriter::new(
        writer_guid,
        WriterAttributes::reliable(Durability::Volatile, History::KeepLast(4)).with_times(times),
        sender.clone(),
        Arc::new(TimerThread::spawn()),
    )
    .expect("valid attributes");

    writer
        .matched_reader_add(ReaderProxyData::new(
            reader_guid,
            Reliability::Reliable,
            Durability::Volatile,
        ))
        .expect("match");
    writer
        .write(ChangeKind::Alive, [0; 16], b"payload".to_vec())
        .expect("write");

    // Zero nack supression: the change becomes UNACKNOWLEDGED on the timer thread.
    let unacked = wait_until(Duration::from_secs(5), || {
        writer
            .reader_snapshot(&reader_guid)
            .and_then(|s| s.status_of(1))
            .is_some_and(|status| status == hdds_reliable::ChangeStatus::Unacknowledged)
    });
    assert!(unacked);
    let data_before = count_data(&sender);

    let nack = AckNackMsg {
        reader_guid,
        writer_guid,
        reader_sn_state: SequenceNumberSet::from_sequences(1, &[1]).expect("in window"),
        count: 1,
        final_flag: false,
    };
    assert!(writer.process_acknack(&nack));
    assert!(wait_until(Duration::from_secs(5), || count_data(&sender) > data_before));

    drop(writer);
}

fn count_data(sender: &CollectingSender) -> usize {
    sender
        .sent
        .lock()
        .iter()
        .filter(|m| matches!(m, WriterSubmessage::Data(_)))
        .count()
}
