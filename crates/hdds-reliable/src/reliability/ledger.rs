// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-reader acknowledgement ledger
//!
//! Ordered `ChangeForReader` entries above a low mark. Everything at or below
//! `low_mark` is settled for the reader; a sequence number between the low
//! mark and the last entry that has no entry is a hole (filtered out or
//! removed) and counts as acknowledged.
//!
//! Not synchronized: the owning [`ReaderProxy`](super::ReaderProxy) holds the
//! lock for every call.

use std::collections::VecDeque;

use super::change_for_reader::{ChangeForReader, ChangeStatus};
use super::gap_builder::GapBuilder;
use super::messages::SequenceNumberSet;
use crate::types::SequenceNumber;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct SequenceLedger {
    entries: VecDeque<ChangeForReader>,
    low_mark: SequenceNumber,
    /// Highest sequence number ever offered to this ledger (entry or hole).
    last_seen: SequenceNumber,
    capacity: usize,
}

impl SequenceLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            low_mark: 0,
            last_seen: 0,
            capacity,
        }
    }

    /// Highest contiguous settled sequence number.
    pub fn low_mark(&self) -> SequenceNumber {
        self.low_mark
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn first_sequence(&self) -> Option<SequenceNumber> {
        self.entries.front().map(ChangeForReader::sequence_number)
    }

    pub fn last_sequence(&self) -> Option<SequenceNumber> {
        self.entries.back().map(ChangeForReader::sequence_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeForReader> {
        self.entries.iter()
    }

    /// Binary search by sequence number.
    fn position(&self, seq: SequenceNumber) -> std::result::Result<usize, usize> {
        self.entries
            .binary_search_by_key(&seq, ChangeForReader::sequence_number)
    }

    pub fn find(&self, seq: SequenceNumber) -> Option<&ChangeForReader> {
        self.position(seq).ok().and_then(|i| self.entries.get(i))
    }

    pub fn find_mut(&mut self, seq: SequenceNumber) -> Option<&mut ChangeForReader> {
        match self.position(seq) {
            Ok(i) => self.entries.get_mut(i),
            Err(_) => None,
        }
    }

    /// Entry immediately before `seq` (by position), if any.
    pub fn previous_sequence(&self, seq: SequenceNumber) -> Option<SequenceNumber> {
        let idx = match self.position(seq) {
            Ok(i) | Err(i) => i,
        };
        idx.checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(ChangeForReader::sequence_number)
    }

    /// Reset to an empty ledger with the given low mark.
    pub fn reset(&mut self, low_mark: SequenceNumber) {
        self.entries.clear();
        self.low_mark = low_mark;
        self.last_seen = low_mark;
    }

    fn accepts(&self, seq: SequenceNumber) -> bool {
        seq > self.low_mark && self.last_sequence().map_or(true, |last| seq > last)
    }

    /// Append an entry at the end of the ledger.
    ///
    /// Returns `Ok(false)` when the entry violates ordering (caller bug); the
    /// entry is discarded and debug builds panic.
    ///
    /// # Errors
    ///
    /// `Error::ResourceLimitExceeded` when the ledger is at capacity. The
    /// ledger is left untouched.
    pub fn push(&mut self, entry: ChangeForReader) -> Result<bool> {
        let seq = entry.sequence_number();
        if !self.accepts(seq) {
            log::error!(
                "[reader_proxy] out-of-order change {} (low_mark={}, last={:?}), discarded",
                seq,
                self.low_mark,
                self.last_sequence()
            );
            debug_assert!(false, "ledger entries must be added in increasing order");
            return Ok(false);
        }
        if self.entries.len() >= self.capacity {
            return Err(Error::ResourceLimitExceeded(format!(
                "reader ledger full ({} changes)",
                self.capacity
            )));
        }
        self.last_seen = self.last_seen.max(seq);
        self.entries.push_back(entry);
        Ok(true)
    }

    /// Record a change that gets no entry (irrelevant for this reader).
    ///
    /// With `settle_if_empty` and an empty ledger the low mark moves to `seq`;
    /// otherwise `seq` becomes a hole. Returns `true` if the low mark moved.
    pub fn skip(&mut self, seq: SequenceNumber, settle_if_empty: bool) -> bool {
        if !self.accepts(seq) {
            log::error!(
                "[reader_proxy] out-of-order skipped change {} (low_mark={})",
                seq,
                self.low_mark
            );
            debug_assert!(false, "ledger entries must be added in increasing order");
            return false;
        }
        self.last_seen = self.last_seen.max(seq);
        if settle_if_empty && self.entries.is_empty() {
            self.low_mark = seq;
            return true;
        }
        false
    }

    /// Everything strictly below `seq` is acknowledged.
    ///
    /// Erases entries below `seq`, keeps folding leading entries that are
    /// already ACKNOWLEDGED (skipping holes), then sets the low mark. Older or equal
    /// values are a no-op. Returns the erased entries' sequence numbers.
    pub fn acknowledge_below(&mut self, seq: SequenceNumber) -> Vec<SequenceNumber> {
        if seq <= self.low_mark {
            return Vec::new();
        }

        let mut erased = Vec::new();
        while let Some(front) = self.entries.front() {
            if front.sequence_number() >= seq {
                break;
            }
            erased.push(front.sequence_number());
            self.entries.pop_front();
        }

        // Holes before an ACKNOWLEDGED entry are settled with it.
        let mut future_low_mark = seq;
        while let Some(front) = self.entries.front() {
            if front.status() != ChangeStatus::Acknowledged {
                break;
            }
            future_low_mark = front.sequence_number() + 1;
            erased.push(front.sequence_number());
            self.entries.pop_front();
        }

        self.low_mark = future_low_mark - 1;
        self.last_seen = self.last_seen.max(self.low_mark);
        erased
    }

    /// Late-joiner replay: move the low mark back to `min_seq - 1` and pull
    /// the history changes in `[min_seq, old low mark]` back as UNACKNOWLEDGED.
    ///
    /// `fetch(seq)` returns the fragment count of a change the history still
    /// holds, `None` when it is gone (skipped). Returns the number of entries
    /// pulled back.
    pub fn rewind<F>(&mut self, min_seq: SequenceNumber, mut fetch: F) -> usize
    where
        F: FnMut(SequenceNumber) -> Option<u32>,
    {
        let old_low_mark = self.low_mark;
        let mut pulled = Vec::new();
        for seq in min_seq.max(1)..=old_low_mark {
            if self.position(seq).is_ok() {
                continue;
            }
            if let Some(fragment_count) = fetch(seq) {
                pulled.push(
                    ChangeForReader::new(seq, fragment_count)
                        .with_status(ChangeStatus::Unacknowledged),
                );
            }
        }

        let count = pulled.len();
        if count > 0 {
            let mut merged: Vec<ChangeForReader> = self.entries.drain(..).collect();
            merged.extend(pulled);
            merged.sort_by_key(ChangeForReader::sequence_number);
            self.entries = merged.into();
        }

        self.low_mark = min_seq.max(1) - 1;
        // A forward jump settles whatever lies at or below the new mark.
        while self
            .entries
            .front()
            .is_some_and(|front| front.sequence_number() <= self.low_mark)
        {
            self.entries.pop_front();
        }
        self.last_seen = self.last_seen.max(self.low_mark);
        count
    }

    /// True if `seq` needs no further delivery to this reader.
    pub fn change_is_acked(&self, seq: SequenceNumber) -> bool {
        if seq <= self.low_mark || self.entries.is_empty() {
            return true;
        }
        match self.find(seq) {
            Some(entry) => entry.status() == ChangeStatus::Acknowledged,
            None => true,
        }
    }

    /// Apply the NACKed part of an ACKNACK.
    ///
    /// UNACKNOWLEDGED entries become REQUESTED with every fragment unsent.
    /// Requested numbers above the low mark that have no entry can never be
    /// supplied and go to `gap_out`. Returns `true` if any entry was promoted.
    pub fn requested_changes_set(
        &mut self,
        seq_set: &SequenceNumberSet,
        gap_out: &mut GapBuilder,
        min_seq_in_history: Option<SequenceNumber>,
    ) -> bool {
        let mut any_requested = false;
        for seq in seq_set.iter() {
            if seq <= self.low_mark {
                continue;
            }
            match self.position(seq) {
                Ok(i) => {
                    if let Some(entry) = self.entries.get_mut(i) {
                        if entry.status() == ChangeStatus::Unacknowledged {
                            entry.set_status(ChangeStatus::Requested);
                            entry.mark_all_fragments_unsent();
                            any_requested = true;
                        }
                    }
                }
                Err(_) => {
                    let evicted = min_seq_in_history.is_some_and(|min| seq < min);
                    if evicted || seq <= self.last_seen {
                        log::trace!(
                            "[reader_proxy] GAP for requested {} ({})",
                            seq,
                            if evicted { "no longer in history" } else { "irrelevant" }
                        );
                        gap_out.add(seq);
                    }
                }
            }
        }
        any_requested
    }

    /// Remove the entry for `seq`, if present.
    pub fn remove(&mut self, seq: SequenceNumber) -> Option<ChangeForReader> {
        let i = self.position(seq).ok()?;
        self.entries.remove(i)
    }

    /// Set every entry in `from` to `to`, calling `on_change` for each one.
    pub fn convert_status<F>(&mut self, from: ChangeStatus, to: ChangeStatus, mut on_change: F) -> usize
    where
        F: FnMut(&ChangeForReader),
    {
        let mut count = 0;
        for entry in self.entries.iter_mut().filter(|e| e.status() == from) {
            entry.set_status(to);
            on_change(entry);
            count += 1;
        }
        count
    }

    pub fn count_with_status(&self, status: ChangeStatus) -> usize {
        self.entries.iter().filter(|e| e.status() == status).count()
    }

    pub fn sequences_with_status(&self, status: ChangeStatus) -> Vec<SequenceNumber> {
        self.entries
            .iter()
            .filter(|e| e.status() == status)
            .map(ChangeForReader::sequence_number)
            .collect()
    }
}
