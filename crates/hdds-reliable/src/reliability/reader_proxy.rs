// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ReaderProxy - a stateful writer's view of one matched reader
//!
//! Wraps the reader's [`SequenceLedger`] with the RTPS per-change state
//! machine, the ACKNACK/NACKFRAG duplicate guards and the two per-reader
//! timers (nack supression, initial heartbeat).
//!
//! ```text
//!              deliver (reliable remote)          nack-supression timeout
//!   UNSENT ──────────────────────────────▶ UNDERWAY ─────────────────────▶ UNACKNOWLEDGED
//!     ▲                                       │                                │
//!     │ acknack response                      │ ACKNACK base > seq             │ NACK
//!     │                                       ▼                                ▼
//!   REQUESTED ◀─────────────────────────── (folded into low mark) ◀────── REQUESTED
//! ```
//!
//! The proxy is not synchronized; the writer keeps each one behind its own
//! `parking_lot::Mutex`.

use std::sync::Arc;
use std::time::Duration;

use super::change_for_reader::{ChangeForReader, ChangeStatus};
use super::gap_builder::GapBuilder;
use super::history_cache::WriteHistory;
use super::ledger::SequenceLedger;
use super::messages::{FragmentNumberSet, SequenceNumberSet};
use crate::qos::{Durability, Reliability};
use crate::timer::TimerHandle;
use crate::types::{FragmentNumber, Guid, Locator, SequenceNumber};
use crate::Result;

/// Match-time description of a reader (as produced by discovery).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderProxyData {
    pub guid: Guid,
    pub reliability: Reliability,
    pub durability: Durability,
    /// Reader lives in the same process (intra-process delivery).
    pub is_local: bool,
    pub unicast_locators: Vec<Locator>,
    pub multicast_locators: Vec<Locator>,
    pub expects_inline_qos: bool,
}

impl ReaderProxyData {
    pub fn new(guid: Guid, reliability: Reliability, durability: Durability) -> Self {
        Self {
            guid,
            reliability,
            durability,
            ..Self::default()
        }
    }

    pub fn local(mut self) -> Self {
        self.is_local = true;
        self
    }

    pub fn with_unicast(mut self, locator: Locator) -> Self {
        self.unicast_locators.push(locator);
        self
    }

    pub fn with_multicast(mut self, locator: Locator) -> Self {
        self.multicast_locators.push(locator);
        self
    }

    pub fn with_inline_qos(mut self, expects_inline_qos: bool) -> Self {
        self.expects_inline_qos = expects_inline_qos;
        self
    }

    pub fn is_reliable(&self) -> bool {
        matches!(self.reliability, Reliability::Reliable)
    }
}

/// Per-reader timers, created by the writer.
#[derive(Debug, Clone)]
pub struct ProxyTimers {
    pub nack_supression: TimerHandle,
    pub initial_heartbeat: TimerHandle,
}

impl ProxyTimers {
    pub fn new(nack_supression: TimerHandle, initial_heartbeat: TimerHandle) -> Self {
        Self {
            nack_supression,
            initial_heartbeat,
        }
    }

    fn cancel(&self) {
        self.nack_supression.cancel();
        self.initial_heartbeat.cancel();
    }
}

/// Result of [`ReaderProxy::change_is_unsent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsentChange {
    /// First fragment still to send (fragmented changes only).
    pub next_fragment: Option<FragmentNumber>,
    /// A GAP `[gap_start, seq)` must precede the first delivery.
    pub gap_start: Option<SequenceNumber>,
}

pub struct ReaderProxy {
    data: ReaderProxyData,
    ledger: SequenceLedger,
    history: Arc<dyn WriteHistory>,
    timers: Option<ProxyTimers>,
    timers_enabled: bool,
    active: bool,
    next_expected_acknack_count: u32,
    last_nackfrag_count: u32,
    /// Sequence numbers folded into the low mark since the last `take_acknowledged`.
    acknowledged: Vec<SequenceNumber>,
}

impl ReaderProxy {
    /// Inactive proxy; call [`start`](Self::start) to match a reader.
    pub fn new(history: Arc<dyn WriteHistory>, max_changes: usize) -> Self {
        Self {
            data: ReaderProxyData::default(),
            ledger: SequenceLedger::new(max_changes),
            history,
            timers: None,
            timers_enabled: false,
            active: false,
            next_expected_acknack_count: 0,
            last_nackfrag_count: 0,
            acknowledged: Vec::new(),
        }
    }

    pub fn with_timers(mut self, timers: ProxyTimers) -> Self {
        self.timers = Some(timers);
        self
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Match `data` and seed the low mark from the history.
    pub fn start(&mut self, data: ReaderProxyData) {
        self.data = data;
        self.active = true;
        self.next_expected_acknack_count = 0;
        self.last_nackfrag_count = 0;
        self.acknowledged.clear();

        if self.data.durability.is_volatile() {
            let next = self.history.next_sequence_number();
            self.ledger.reset(next.saturating_sub(1));
        } else {
            self.ledger.reset(0);
            self.acked_changes_set(0);
        }

        self.timers_enabled = !self.data.is_local && self.data.is_reliable();
        if self.data.is_reliable() {
            if let Some(timers) = &self.timers {
                timers.initial_heartbeat.restart(None);
            }
        }

        log::debug!(
            "[reader_proxy] started {} ({:?}, {:?}, local={}, low_mark={})",
            self.data.guid,
            self.data.reliability,
            self.data.durability,
            self.data.is_local,
            self.ledger.low_mark()
        );
    }

    /// Unmatch: disable timers and forget all state.
    pub fn stop(&mut self) {
        self.active = false;
        self.timers_enabled = false;
        if let Some(timers) = &self.timers {
            timers.cancel();
        }
        self.ledger.reset(0);
        self.next_expected_acknack_count = 0;
        self.last_nackfrag_count = 0;
        self.acknowledged.clear();
        log::debug!("[reader_proxy] stopped {}", self.data.guid);
    }

    /// Refresh locators and inline-QoS of an already matched reader.
    ///
    /// Reliability and durability are fixed at match time.
    pub fn update(&mut self, data: &ReaderProxyData) -> bool {
        if data.guid != self.data.guid {
            return false;
        }
        self.data.unicast_locators = data.unicast_locators.clone();
        self.data.multicast_locators = data.multicast_locators.clone();
        self.data.expects_inline_qos = data.expects_inline_qos;
        true
    }

    pub fn update_nack_supression_interval(&self, interval: Duration) {
        if let Some(timers) = &self.timers {
            timers.nack_supression.set_interval(interval);
        }
    }

    // ========================================================================
    // Ledger mutation
    // ========================================================================

    /// Track a new change for this reader.
    ///
    /// Irrelevant changes get no entry: they become a hole, or settle the low
    /// mark at once when nothing else is pending for a best-effort reader.
    ///
    /// # Errors
    ///
    /// `Error::ResourceLimitExceeded` when the ledger is full.
    pub fn add_change(
        &mut self,
        change: ChangeForReader,
        is_relevant: bool,
        restart_nack_supression: bool,
    ) -> Result<()> {
        if restart_nack_supression {
            self.restart_nack_supression();
        }

        let seq = change.sequence_number();
        if change.status() == ChangeStatus::Acknowledged && self.ledger.is_empty() {
            self.ledger.skip(seq, true);
            return Ok(());
        }
        if !is_relevant {
            self.ledger.skip(seq, !self.data.is_reliable());
            return Ok(());
        }
        self.ledger.push(change).map(|_| ())
    }

    /// The reader acknowledged every sequence number strictly below `seq`.
    ///
    /// `seq == 0` on a non-volatile reader replays the history still held
    /// (late joiner). Returns `true` if the low mark changed.
    pub fn acked_changes_set(&mut self, seq: SequenceNumber) -> bool {
        let before = self.ledger.low_mark();
        if seq > before {
            let erased = self.ledger.acknowledge_below(seq);
            self.acknowledged.extend(erased);
        } else if seq == 0 && !self.data.durability.is_volatile() {
            let min_seq = self
                .history
                .min_sequence()
                .unwrap_or_else(|| self.history.next_sequence_number());
            let history = Arc::clone(&self.history);
            let pulled = self
                .ledger
                .rewind(min_seq, |s| history.get(s).map(|c| c.fragment_count()));
            if pulled > 0 {
                log::debug!(
                    "[reader_proxy] {} replaying {} changes from {}",
                    self.data.guid,
                    pulled,
                    min_seq
                );
            }
        }
        self.ledger.low_mark() != before
    }

    /// Drain sequence numbers folded into the low mark since the last call.
    pub fn take_acknowledged(&mut self) -> Vec<SequenceNumber> {
        std::mem::take(&mut self.acknowledged)
    }

    /// Apply NACKs; unavailable requested changes go to `gap_out`.
    pub fn requested_changes_set(
        &mut self,
        seq_set: &SequenceNumberSet,
        gap_out: &mut GapBuilder,
    ) -> bool {
        let min_seq = self.history.min_sequence();
        self.ledger.requested_changes_set(seq_set, gap_out, min_seq)
    }

    /// Record the outcome of sending an UNSENT change.
    ///
    /// Returns `false`, leaving the entry untouched, when the change is no
    /// longer tracked or is no longer UNSENT (a concurrent delivery or a NACK
    /// got there first).
    pub fn from_unsent_to_status(
        &mut self,
        seq: SequenceNumber,
        status: ChangeStatus,
        restart_nack_supression: bool,
        delivered: bool,
    ) -> bool {
        let Some(entry) = self.ledger.find_mut(seq) else {
            return false;
        };
        if entry.status() != ChangeStatus::Unsent {
            log::trace!(
                "[reader_proxy] {} for {} is {:?}, not UNSENT",
                seq,
                self.data.guid,
                entry.status()
            );
            return false;
        }
        if delivered {
            entry.set_delivered();
        }

        if restart_nack_supression {
            self.restart_nack_supression();
        }

        // Only holes lie between the low mark and the first entry.
        if status == ChangeStatus::Acknowledged && self.ledger.first_sequence() == Some(seq) {
            self.acked_changes_set(seq + 1);
            return true;
        }

        if let Some(entry) = self.ledger.find_mut(seq) {
            entry.set_status(status);
        }
        true
    }

    /// Clear one fragment; `Some(true)` when it was the last unsent one.
    pub fn mark_fragment_as_sent_for_change(
        &mut self,
        seq: SequenceNumber,
        frag: FragmentNumber,
    ) -> Option<bool> {
        self.ledger
            .find_mut(seq)
            .map(|entry| entry.mark_fragment_sent(frag))
    }

    /// Nack-supression timeout: UNDERWAY becomes UNACKNOWLEDGED.
    ///
    /// Returns `true` if any change was converted.
    pub fn perform_nack_supression(&mut self) -> bool {
        self.ledger.convert_status(
            ChangeStatus::Underway,
            ChangeStatus::Unacknowledged,
            |_| {},
        ) > 0
    }

    /// ACKNACK response: REQUESTED becomes UNSENT, `on_resend` per change.
    pub fn perform_acknack_response<F>(&mut self, mut on_resend: F) -> usize
    where
        F: FnMut(SequenceNumber),
    {
        self.ledger.convert_status(
            ChangeStatus::Requested,
            ChangeStatus::Unsent,
            |entry| on_resend(entry.sequence_number()),
        )
    }

    /// Initial (preemptive) ACKNACK.
    ///
    /// A local reader gets every UNACKNOWLEDGED change back to UNSENT. Returns
    /// `true` when the writer should react: deliver for a local reader that
    /// had pending changes, heartbeat for a remote one.
    pub fn process_initial_acknack<F>(&mut self, mut on_unsent: F) -> bool
    where
        F: FnMut(SequenceNumber),
    {
        if self.data.is_local {
            return self.ledger.convert_status(
                ChangeStatus::Unacknowledged,
                ChangeStatus::Unsent,
                |entry| on_unsent(entry.sequence_number()),
            ) > 0;
        }
        true
    }

    /// The history dropped `seq`.
    ///
    /// Returns `true` when a GAP must be sent: a local reader was still
    /// waiting for it.
    pub fn change_has_been_removed(&mut self, seq: SequenceNumber) -> bool {
        match self.ledger.first_sequence() {
            Some(first) if seq >= first => {}
            _ => return false,
        }
        let Some(removed) = self.ledger.remove(seq) else {
            return false;
        };

        let needs_gap =
            self.data.is_local && removed.status() == ChangeStatus::Unacknowledged;

        if seq == self.ledger.low_mark() + 1 {
            self.acked_changes_set(seq + 1);
        }
        needs_gap
    }

    /// Accept an ACKNACK `count` only if newer than every one seen before.
    pub fn check_and_set_acknack_count(&mut self, count: u32) -> bool {
        if count >= self.next_expected_acknack_count {
            self.next_expected_acknack_count = count.wrapping_add(1);
            true
        } else {
            false
        }
    }

    /// NACKFRAG: re-mark `frag_set` of `seq` unsent.
    ///
    /// An UNSENT change keeps its status (a resend is already scheduled).
    pub fn requested_fragment_set(
        &mut self,
        seq: SequenceNumber,
        frag_set: &FragmentNumberSet,
    ) -> bool {
        let Some(entry) = self.ledger.find_mut(seq) else {
            return false;
        };
        entry.mark_fragments_unsent(frag_set);
        if entry.status() != ChangeStatus::Unsent {
            entry.set_status(ChangeStatus::Requested);
        }
        true
    }

    pub fn process_nack_frag(
        &mut self,
        reader_guid: Guid,
        count: u32,
        seq: SequenceNumber,
        frag_set: &FragmentNumberSet,
    ) -> bool {
        if reader_guid != self.data.guid || count <= self.last_nackfrag_count {
            return false;
        }
        self.last_nackfrag_count = count;
        self.requested_fragment_set(seq, frag_set)
    }

    fn restart_nack_supression(&self) {
        if !self.timers_enabled {
            return;
        }
        if let Some(timers) = &self.timers {
            timers.nack_supression.restart(None);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn change_is_acked(&self, seq: SequenceNumber) -> bool {
        self.ledger.change_is_acked(seq)
    }

    /// Anything the reader still has to acknowledge, or learn about by GAP.
    pub fn has_unacknowledged(&self, first_seq_in_history: SequenceNumber) -> bool {
        first_seq_in_history > self.ledger.low_mark() + 1
            || self.ledger.count_with_status(ChangeStatus::Unacknowledged) > 0
    }

    /// Delivery decision for `seq`; `None` unless it is UNSENT.
    pub fn change_is_unsent(
        &self,
        seq: SequenceNumber,
        min_seq_in_history: SequenceNumber,
    ) -> Option<UnsentChange> {
        let entry = self.ledger.find(seq)?;
        if entry.status() != ChangeStatus::Unsent {
            return None;
        }

        let gap_start = if entry.is_delivered() {
            None
        } else {
            let after_previous = self
                .ledger
                .previous_sequence(seq)
                .map_or(self.ledger.low_mark() + 1, |prev| prev + 1);
            let start = after_previous.max(min_seq_in_history);
            (start < seq).then_some(start)
        };

        Some(UnsentChange {
            next_fragment: entry.next_unsent_fragment(),
            gap_start,
        })
    }

    /// Every tracked change is acknowledged (holes included).
    pub fn all_acked(&self) -> bool {
        self.ledger
            .iter()
            .all(|entry| entry.status() == ChangeStatus::Acknowledged)
    }

    pub fn has_been_delivered(&self, seq: SequenceNumber) -> Option<bool> {
        self.ledger.find(seq).map(ChangeForReader::is_delivered)
    }

    /// Sequence numbers currently UNSENT, in order.
    pub fn unsent_changes(&self) -> Vec<SequenceNumber> {
        self.ledger.sequences_with_status(ChangeStatus::Unsent)
    }

    /// Fragments of `seq` still to send.
    pub fn unsent_fragments(&self, seq: SequenceNumber) -> Vec<FragmentNumber> {
        self.ledger
            .find(seq)
            .map(|entry| entry.unsent_fragments().iter().collect())
            .unwrap_or_default()
    }

    pub fn status_of(&self, seq: SequenceNumber) -> Option<ChangeStatus> {
        self.ledger.find(seq).map(ChangeForReader::status)
    }

    pub fn ledger(&self) -> &SequenceLedger {
        &self.ledger
    }

    pub fn has_changes(&self) -> bool {
        !self.ledger.is_empty()
    }

    pub fn changes_low_mark(&self) -> SequenceNumber {
        self.ledger.low_mark()
    }

    pub fn guid(&self) -> Guid {
        self.data.guid
    }

    pub fn data(&self) -> &ReaderProxyData {
        &self.data
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn timers_enabled(&self) -> bool {
        self.timers_enabled
    }

    pub fn is_local_reader(&self) -> bool {
        self.data.is_local
    }

    pub fn is_reliable(&self) -> bool {
        self.data.is_reliable()
    }

    pub fn durability_kind(&self) -> Durability {
        self.data.durability
    }

    pub fn expects_inline_qos(&self) -> bool {
        self.data.expects_inline_qos
    }

    pub fn locators(&self) -> impl Iterator<Item = &Locator> {
        self.data
            .unicast_locators
            .iter()
            .chain(self.data.multicast_locators.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::{History, ResourceLimits};
    use crate::reliability::HistoryCache;
    use crate::types::ChangeKind;

    fn reader(n: u8) -> Guid {
        Guid::new([n; 12], [0, 0, 0x12, 0x07])
    }

    fn history_with(count: usize) -> Arc<HistoryCache> {
        let cache = HistoryCache::new(
            Guid::new([9; 12], [0, 0, 0x11, 0x02]),
            History::KeepAll,
            ResourceLimits::default(),
        );
        for _ in 0..count {
            cache
                .add_change(ChangeKind::Alive, [0; 16], vec![1, 2, 3], 0)
                .expect("history accepts");
        }
        Arc::new(cache)
    }

    fn started(data: ReaderProxyData, history: Arc<HistoryCache>) -> ReaderProxy {
        let mut proxy = ReaderProxy::new(history, 64);
        proxy.start(data);
        proxy
    }

    #[test]
    fn test_volatile_start_skips_history() {
        let proxy = started(
            ReaderProxyData::new(reader(1), Reliability::Reliable, Durability::Volatile),
            history_with(4),
        );
        assert_eq!(proxy.changes_low_mark(), 4);
        assert!(!proxy.has_changes());
        assert!(proxy.timers_enabled());
    }

    #[test]
    fn test_transient_local_start_seeds_below_history() {
        let history = history_with(4);
        history.remove_acknowledged(1);
        let proxy = started(
            ReaderProxyData::new(reader(1), Reliability::Reliable, Durability::TransientLocal),
            history,
        );
        assert_eq!(proxy.changes_low_mark(), 1);
    }

    #[test]
    fn test_best_effort_irrelevant_settles() {
        let mut proxy = started(
            ReaderProxyData::new(reader(2), Reliability::BestEffort, Durability::Volatile),
            history_with(0),
        );
        proxy
            .add_change(ChangeForReader::new(1, 0), false, false)
            .expect("add");
        assert_eq!(proxy.changes_low_mark(), 1);
        assert!(!proxy.timers_enabled());
    }

    #[test]
    fn test_nack_supression_converts_underway() {
        let mut proxy = started(
            ReaderProxyData::new(reader(3), Reliability::Reliable, Durability::Volatile),
            history_with(0),
        );
        for seq in 1..=2 {
            proxy
                .add_change(ChangeForReader::new(seq, 0), true, false)
                .expect("add");
            assert!(proxy.from_unsent_to_status(seq, ChangeStatus::Underway, false, true));
        }
        assert!(!proxy.has_unacknowledged(0));
        assert!(proxy.perform_nack_supression());
        assert!(proxy.has_unacknowledged(0));
        assert!(!proxy.perform_nack_supression());
    }

    #[test]
    fn test_acknack_count_guard() {
        let mut proxy = ReaderProxy::new(history_with(0), 8);
        assert!(proxy.check_and_set_acknack_count(1));
        assert!(!proxy.check_and_set_acknack_count(1));
        assert!(!proxy.check_and_set_acknack_count(0));
        assert!(proxy.check_and_set_acknack_count(5));
        assert!(!proxy.check_and_set_acknack_count(3));
    }

    #[test]
    fn test_nackfrag_guard_and_unsent_heuristic() {
        let mut proxy = started(
            ReaderProxyData::new(reader(4), Reliability::Reliable, Durability::Volatile),
            history_with(0),
        );
        proxy
            .add_change(ChangeForReader::new(1, 3), true, false)
            .expect("add");
        for frag in 1..=3 {
            proxy.mark_fragment_as_sent_for_change(1, frag);
        }
        let frags = FragmentNumberSet::from_fragments(2, &[2]).expect("set");

        // Still UNSENT: fragments re-marked, status kept.
        assert!(proxy.process_nack_frag(reader(4), 1, 1, &frags));
        assert_eq!(proxy.status_of(1), Some(ChangeStatus::Unsent));
        assert_eq!(proxy.unsent_fragments(1), vec![2]);
        assert_eq!(
            proxy.change_is_unsent(1, 1).and_then(|u| u.next_fragment),
            Some(2)
        );

        // Duplicate count ignored.
        assert!(!proxy.process_nack_frag(reader(4), 1, 1, &frags));
        // Wrong reader ignored.
        assert!(!proxy.process_nack_frag(reader(5), 2, 1, &frags));

        proxy.mark_fragment_as_sent_for_change(1, 2);
        proxy.from_unsent_to_status(1, ChangeStatus::Unacknowledged, false, true);
        assert!(proxy.process_nack_frag(reader(4), 2, 1, &frags));
        assert_eq!(proxy.status_of(1), Some(ChangeStatus::Requested));
    }

    #[test]
    fn test_late_delivery_outcome_keeps_requested() {
        let mut proxy = started(
            ReaderProxyData::new(reader(5), Reliability::Reliable, Durability::Volatile),
            history_with(0),
        );
        proxy
            .add_change(ChangeForReader::new(1, 0), true, false)
            .expect("add");
        assert!(proxy.from_unsent_to_status(1, ChangeStatus::Underway, false, true));
        proxy.perform_nack_supression();
        let set = SequenceNumberSet::from_sequences(1, &[1]).expect("set");
        let mut gaps = GapBuilder::new();
        assert!(proxy.requested_changes_set(&set, &mut gaps));

        // A delivery that read the change as UNSENT before the NACK lands late.
        assert!(!proxy.from_unsent_to_status(1, ChangeStatus::Underway, true, true));
        assert!(!proxy.from_unsent_to_status(1, ChangeStatus::Acknowledged, false, true));
        assert_eq!(proxy.status_of(1), Some(ChangeStatus::Requested));
        assert_eq!(proxy.changes_low_mark(), 0);
    }

    #[test]
    fn test_change_removed_local_gap() {
        let mut proxy = started(
            ReaderProxyData::new(reader(6), Reliability::Reliable, Durability::Volatile).local(),
            history_with(0),
        );
        for seq in 1..=3 {
            proxy
                .add_change(ChangeForReader::new(seq, 0), true, false)
                .expect("add");
            proxy.from_unsent_to_status(seq, ChangeStatus::Unacknowledged, false, true);
        }
        assert!(proxy.change_has_been_removed(1));
        assert_eq!(proxy.changes_low_mark(), 1);
        assert!(!proxy.change_has_been_removed(1));
        assert!(!proxy.change_has_been_removed(9));
        assert_eq!(proxy.ledger().len(), 2);
    }

    #[test]
    fn test_change_is_unsent_reports_gap_once() {
        let mut proxy = started(
            ReaderProxyData::new(reader(7), Reliability::Reliable, Durability::Volatile),
            history_with(0),
        );
        proxy
            .add_change(ChangeForReader::new(1, 0), true, false)
            .expect("add");
        proxy
            .add_change(ChangeForReader::new(2, 0), false, false)
            .expect("hole");
        proxy
            .add_change(ChangeForReader::new(3, 0), true, false)
            .expect("add");

        let unsent = proxy.change_is_unsent(3, 1).expect("unsent");
        assert_eq!(unsent.gap_start, Some(2));
        assert_eq!(unsent.next_fragment, None);
        assert_eq!(proxy.change_is_unsent(1, 1).map(|u| u.gap_start), Some(None));

        proxy.from_unsent_to_status(3, ChangeStatus::Unsent, false, true);
        assert_eq!(proxy.change_is_unsent(3, 1).map(|u| u.gap_start), Some(None));
        assert_eq!(proxy.has_been_delivered(3), Some(true));
    }

    #[test]
    fn test_update_keeps_qos() {
        let data = ReaderProxyData::new(reader(8), Reliability::Reliable, Durability::Volatile);
        let mut proxy = started(data.clone(), history_with(0));

        let mut refreshed = data.with_inline_qos(true);
        refreshed.reliability = Reliability::BestEffort;
        refreshed = refreshed.with_unicast(Locator::new(1, 7400, [0; 16]));
        assert!(proxy.update(&refreshed));
        assert!(proxy.is_reliable());
        assert!(proxy.expects_inline_qos());
        assert_eq!(proxy.locators().count(), 1);

        let other = ReaderProxyData::new(reader(9), Reliability::Reliable, Durability::Volatile);
        assert!(!proxy.update(&other));
    }
}
