// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Write-history shared by every reader proxy of one writer
//!
//! Thread-safe ordered store of `Arc<CacheChange>` keyed by sequence number.
//! Enforces QoS ResourceLimits (max_samples, max_quota_bytes, per-instance
//! depth) via oldest-first eviction for KEEP_LAST, or insert rejection for
//! KEEP_ALL.
//!
//! Eviction never calls into reader proxies: `add_change` hands the evicted
//! sequence numbers back so the writer can notify proxies after this lock is
//! released.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use super::seq::SeqNumGenerator;
use crate::qos::{History, ResourceLimits, LENGTH_UNLIMITED};
use crate::types::{CacheChange, ChangeKind, Guid, InstanceHandle, SequenceNumber};
use crate::{Error, Result};

/// Read access to a writer's history, as needed by reader proxies.
pub trait WriteHistory: Send + Sync {
    /// Change with sequence number `seq`, if still held.
    fn get(&self, seq: SequenceNumber) -> Option<Arc<CacheChange>>;

    /// Oldest sequence number still held (`None` when empty).
    fn min_sequence(&self) -> Option<SequenceNumber>;

    /// Sequence number the next accepted change will receive.
    fn next_sequence_number(&self) -> SequenceNumber;
}

/// History cache for writer-side retransmission and late-joiner replay.
pub struct HistoryCache {
    writer_guid: Guid,
    ring: Mutex<VecDeque<Arc<CacheChange>>>,
    seq_gen: SeqNumGenerator,
    quota_bytes: AtomicUsize,
    history_kind: History,
    limits: ResourceLimits,
}

impl HistoryCache {
    pub fn new(writer_guid: Guid, history_kind: History, limits: ResourceLimits) -> Self {
        Self {
            writer_guid,
            ring: Mutex::new(VecDeque::new()),
            seq_gen: SeqNumGenerator::new(),
            quota_bytes: AtomicUsize::new(0),
            history_kind,
            limits,
        }
    }

    fn ring(&self) -> MutexGuard<'_, VecDeque<Arc<CacheChange>>> {
        match self.ring.lock() {
            Ok(lock) => lock,
            Err(e) => {
                log::debug!("[history] Lock poisoned, recovering");
                e.into_inner()
            }
        }
    }

    /// Accept a new change and assign its sequence number.
    ///
    /// Returns the stored change and the sequence numbers evicted to make
    /// room (KEEP_LAST only, oldest first).
    ///
    /// # Errors
    ///
    /// - `Error::WouldBlock` when KEEP_ALL limits are reached
    /// - `Error::ResourceLimitExceeded` when a new instance would exceed `max_instances`
    pub fn add_change(
        &self,
        kind: ChangeKind,
        instance_handle: InstanceHandle,
        payload: Vec<u8>,
        fragment_size: u32,
    ) -> Result<(Arc<CacheChange>, Vec<SequenceNumber>)> {
        let len = payload.len();
        let mut ring = self.ring();
        let mut evicted = Vec::new();

        let is_new_instance = !ring.iter().any(|c| c.instance_handle == instance_handle);
        if is_new_instance
            && self.limits.max_instances != LENGTH_UNLIMITED
            && count_instances(&ring) >= self.limits.max_instances
        {
            return Err(Error::ResourceLimitExceeded(format!(
                "max_instances ({})",
                self.limits.max_instances
            )));
        }

        match self.history_kind {
            History::KeepAll => {
                let next_quota = self.quota_bytes.load(Ordering::Relaxed).saturating_add(len);
                let per_instance = ring
                    .iter()
                    .filter(|c| c.instance_handle == instance_handle)
                    .count();
                if ring.len() >= self.limits.max_samples
                    || next_quota > self.limits.max_quota_bytes
                    || per_instance >= self.limits.max_samples_per_instance
                {
                    return Err(Error::WouldBlock);
                }
            }
            History::KeepLast(depth) => {
                let depth = (depth as usize).min(self.limits.max_samples_per_instance);
                while ring
                    .iter()
                    .filter(|c| c.instance_handle == instance_handle)
                    .count()
                    >= depth
                {
                    let Some(pos) = ring.iter().position(|c| c.instance_handle == instance_handle)
                    else {
                        break;
                    };
                    if let Some(old) = self.take_at(&mut ring, pos) {
                        evicted.push(old);
                    }
                }
                while ring.len() >= self.limits.max_samples
                    || (!ring.is_empty()
                        && self.quota_bytes.load(Ordering::Relaxed).saturating_add(len)
                            > self.limits.max_quota_bytes)
                {
                    match self.take_at(&mut ring, 0) {
                        Some(old) => evicted.push(old),
                        None => break,
                    }
                }
            }
        }

        let change = Arc::new(CacheChange {
            kind,
            writer_guid: self.writer_guid,
            instance_handle,
            sequence_number: self.seq_gen.next(),
            payload,
            fragment_size,
            source_timestamp_ns: now_ns(),
        });
        ring.push_back(Arc::clone(&change));
        self.quota_bytes.fetch_add(len, Ordering::Relaxed);

        evicted.sort_unstable();
        Ok((change, evicted))
    }

    fn take_at(&self, ring: &mut VecDeque<Arc<CacheChange>>, pos: usize) -> Option<SequenceNumber> {
        let change = ring.remove(pos)?;
        self.quota_bytes
            .fetch_sub(change.payload.len(), Ordering::Relaxed);
        Some(change.sequence_number)
    }

    /// Remove one change (lifespan expiry, explicit removal).
    pub fn remove_change(&self, seq: SequenceNumber) -> Option<Arc<CacheChange>> {
        let mut ring = self.ring();
        let pos = ring
            .binary_search_by_key(&seq, |c| c.sequence_number)
            .ok()?;
        let change = ring.remove(pos)?;
        self.quota_bytes
            .fetch_sub(change.payload.len(), Ordering::Relaxed);
        Some(change)
    }

    /// Remove all changes with `sequence_number <= acked_seq`.
    ///
    /// Returns the removed sequence numbers.
    pub fn remove_acknowledged(&self, acked_seq: SequenceNumber) -> Vec<SequenceNumber> {
        let mut ring = self.ring();
        let mut removed = Vec::new();
        while ring
            .front()
            .is_some_and(|front| front.sequence_number <= acked_seq)
        {
            match self.take_at(&mut ring, 0) {
                Some(seq) => removed.push(seq),
                None => break,
            }
        }
        removed
    }

    /// Changes with `sequence_number > after`, oldest first.
    pub fn changes_after(&self, after: SequenceNumber) -> Vec<Arc<CacheChange>> {
        self.ring()
            .iter()
            .filter(|c| c.sequence_number > after)
            .cloned()
            .collect()
    }

    /// Sequence numbers currently held, oldest first.
    pub fn sequences(&self) -> Vec<SequenceNumber> {
        self.ring().iter().map(|c| c.sequence_number).collect()
    }

    /// Newest sequence number ever assigned (0 if none), held or not.
    pub fn last_sequence_number(&self) -> SequenceNumber {
        self.seq_gen.last()
    }

    pub fn len(&self) -> usize {
        self.ring().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring().is_empty()
    }

    /// Current quota usage in bytes.
    pub fn quota_bytes(&self) -> usize {
        self.quota_bytes.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn history_kind(&self) -> History {
        self.history_kind
    }

    #[must_use]
    pub fn resource_limits(&self) -> ResourceLimits {
        self.limits
    }
}

impl WriteHistory for HistoryCache {
    fn get(&self, seq: SequenceNumber) -> Option<Arc<CacheChange>> {
        let ring = self.ring();
        let pos = ring
            .binary_search_by_key(&seq, |c| c.sequence_number)
            .ok()?;
        ring.get(pos).cloned()
    }

    fn min_sequence(&self) -> Option<SequenceNumber> {
        self.ring().front().map(|c| c.sequence_number)
    }

    fn next_sequence_number(&self) -> SequenceNumber {
        self.seq_gen.current()
    }
}

fn count_instances(ring: &VecDeque<Arc<CacheChange>>) -> usize {
    let mut keys: Vec<&InstanceHandle> = Vec::new();
    for change in ring {
        if !keys.contains(&&change.instance_handle) {
            keys.push(&change.instance_handle);
        }
    }
    keys.len()
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// ============================================================================
// TESTS
// ============================================================================
