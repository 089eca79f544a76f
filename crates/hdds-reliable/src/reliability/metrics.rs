// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metrics for the stateful writer
//!
//! Counts submessages sent and received, retransmissions, dropped duplicates
//! and transport failures.
//!
//! # Thread Safety
//!
//! All counters are `AtomicU64` updated with `Relaxed` ordering; a snapshot is
//! a set of independent loads, not a consistent cut.

use std::sync::atomic::{AtomicU64, Ordering};

/// Writer-side reliability counters.
#[derive(Debug, Default)]
pub struct WriterMetrics {
    data_sent: AtomicU64,
    data_frags_sent: AtomicU64,
    /// Changes re-sent after a NACK (ACKNACK or NACKFRAG).
    resends: AtomicU64,
    heartbeats_sent: AtomicU64,
    gaps_sent: AtomicU64,
    /// Largest single GAP (sequence numbers covered).
    max_gap_size: AtomicU64,
    acknacks_received: AtomicU64,
    /// Duplicate or stale ACKNACK count.
    acknacks_dropped: AtomicU64,
    nackfrags_received: AtomicU64,
    nackfrags_dropped: AtomicU64,
    send_failures: AtomicU64,
    /// Changes a reader ledger refused (capacity).
    ledger_rejections: AtomicU64,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_data(&self) {
        self.data_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_data_frag(&self) {
        self.data_frags_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resends(&self, count: u64) {
        self.resends.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_heartbeat(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// One GAP submessage covering `gap_size` sequence numbers.
    pub fn record_gap(&self, gap_size: u64) {
        self.gaps_sent.fetch_add(1, Ordering::Relaxed);
        self.update_max_gap_size(gap_size);
    }

    fn update_max_gap_size(&self, new_size: u64) {
        let mut current = self.max_gap_size.load(Ordering::Relaxed);
        while new_size > current {
            match self.max_gap_size.compare_exchange_weak(
                current,
                new_size,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn record_acknack(&self, accepted: bool) {
        if accepted {
            self.acknacks_received.fetch_add(1, Ordering::Relaxed);
        } else {
            self.acknacks_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_nackfrag(&self, accepted: bool) {
        if accepted {
            self.nackfrags_received.fetch_add(1, Ordering::Relaxed);
        } else {
            self.nackfrags_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ledger_rejection(&self) {
        self.ledger_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WriterMetricsSnapshot {
        WriterMetricsSnapshot {
            data_sent: self.data_sent.load(Ordering::Relaxed),
            data_frags_sent: self.data_frags_sent.load(Ordering::Relaxed),
            resends: self.resends.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            gaps_sent: self.gaps_sent.load(Ordering::Relaxed),
            max_gap_size: self.max_gap_size.load(Ordering::Relaxed),
            acknacks_received: self.acknacks_received.load(Ordering::Relaxed),
            acknacks_dropped: self.acknacks_dropped.load(Ordering::Relaxed),
            nackfrags_received: self.nackfrags_received.load(Ordering::Relaxed),
            nackfrags_dropped: self.nackfrags_dropped.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            ledger_rejections: self.ledger_rejections.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`WriterMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterMetricsSnapshot {
    pub data_sent: u64,
    pub data_frags_sent: u64,
    pub resends: u64,
    pub heartbeats_sent: u64,
    pub gaps_sent: u64,
    pub max_gap_size: u64,
    pub acknacks_received: u64,
    pub acknacks_dropped: u64,
    pub nackfrags_received: u64,
    pub nackfrags_dropped: u64,
    pub send_failures: u64,
    pub ledger_rejections: u64,
}
