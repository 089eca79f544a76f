// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-reader delivery status of one change.

use std::fmt;

use super::messages::FragmentNumberSet;
use crate::types::{FragmentNumber, SequenceNumber};

/// Delivery status of a change for one reader.
///
/// ```text
/// UNSENT -> UNDERWAY -> UNACKNOWLEDGED -> REQUESTED -> UNSENT
///                   \-> ACKNOWLEDGED (then folded into the low mark)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeStatus {
    Unsent,
    Unacknowledged,
    Requested,
    Underway,
    Acknowledged,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeStatus::Unsent => "UNSENT",
            ChangeStatus::Unacknowledged => "UNACKNOWLEDGED",
            ChangeStatus::Requested => "REQUESTED",
            ChangeStatus::Underway => "UNDERWAY",
            ChangeStatus::Acknowledged => "ACKNOWLEDGED",
        };
        f.write_str(name)
    }
}

/// Growable bitset of fragments still to send (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FragmentSet {
    words: Vec<u64>,
    count: u32,
}

impl FragmentSet {
    /// All of `1..=count` marked unsent.
    pub fn all_unsent(count: u32) -> Self {
        let mut set = Self {
            words: vec![0; (count as usize).div_ceil(64)],
            count,
        };
        set.fill();
        set
    }

    fn fill(&mut self) {
        for frag in 1..=self.count {
            self.insert(frag);
        }
    }

    fn slot(frag: FragmentNumber) -> (usize, u64) {
        let idx = (frag - 1) as usize;
        (idx / 64, 1u64 << (idx % 64))
    }

    fn in_range(&self, frag: FragmentNumber) -> bool {
        frag >= 1 && frag <= self.count
    }

    pub fn insert(&mut self, frag: FragmentNumber) -> bool {
        if !self.in_range(frag) {
            return false;
        }
        let (word, mask) = Self::slot(frag);
        self.words[word] |= mask;
        true
    }

    pub fn remove(&mut self, frag: FragmentNumber) -> bool {
        if !self.in_range(frag) {
            return false;
        }
        let (word, mask) = Self::slot(frag);
        let was_set = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        was_set
    }

    pub fn contains(&self, frag: FragmentNumber) -> bool {
        if !self.in_range(frag) {
            return false;
        }
        let (word, mask) = Self::slot(frag);
        self.words[word] & mask != 0
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Lowest unsent fragment.
    pub fn first(&self) -> Option<FragmentNumber> {
        self.words.iter().enumerate().find_map(|(i, &w)| {
            (w != 0).then(|| (i as u32) * 64 + w.trailing_zeros() + 1)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = FragmentNumber> + '_ {
        (1..=self.count).filter(|&f| self.contains(f))
    }

    /// Total fragments of the change (sent or not).
    pub fn capacity(&self) -> u32 {
        self.count
    }
}

/// Association between a history change and its delivery state for one reader.
///
/// Holds only the sequence number; the payload stays in the write-history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeForReader {
    sequence_number: SequenceNumber,
    status: ChangeStatus,
    delivered: bool,
    unsent_fragments: FragmentSet,
}

impl ChangeForReader {
    /// New entry; `fragment_count == 0` for unfragmented changes.
    pub fn new(sequence_number: SequenceNumber, fragment_count: u32) -> Self {
        Self {
            sequence_number,
            status: ChangeStatus::Unsent,
            delivered: false,
            unsent_fragments: FragmentSet::all_unsent(fragment_count),
        }
    }

    pub fn with_status(mut self, status: ChangeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    pub fn status(&self) -> ChangeStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ChangeStatus) {
        self.status = status;
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered
    }

    pub fn set_delivered(&mut self) {
        self.delivered = true;
    }

    pub fn is_fragmented(&self) -> bool {
        self.unsent_fragments.capacity() > 0
    }

    pub fn unsent_fragments(&self) -> &FragmentSet {
        &self.unsent_fragments
    }

    pub fn next_unsent_fragment(&self) -> Option<FragmentNumber> {
        self.unsent_fragments.first()
    }

    /// Clear one fragment; `true` when no unsent fragment remains afterwards.
    pub fn mark_fragment_sent(&mut self, frag: FragmentNumber) -> bool {
        self.unsent_fragments.remove(frag);
        self.unsent_fragments.is_empty()
    }

    pub fn mark_all_fragments_unsent(&mut self) {
        self.unsent_fragments.fill();
    }

    /// Re-mark the requested fragments; out-of-range numbers are ignored.
    pub fn mark_fragments_unsent(&mut self, frags: &FragmentNumberSet) {
        for frag in frags.iter() {
            self.unsent_fragments.insert(frag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_set_bounds() {
        let mut set = FragmentSet::all_unsent(70);
        assert_eq!(set.first(), Some(1));
        assert!(set.contains(70));
        assert!(!set.contains(0));
        assert!(!set.contains(71));
        assert!(!set.insert(71));

        for f in 1..=64 {
            set.remove(f);
        }
        assert_eq!(set.first(), Some(65));
        assert_eq!(set.iter().count(), 6);
    }

    #[test]
    fn test_fragment_independence() {
        let mut change = ChangeForReader::new(9, 3);
        change.set_status(ChangeStatus::Unsent);

        assert!(!change.mark_fragment_sent(2));
        assert_eq!(change.unsent_fragments().iter().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(change.status(), ChangeStatus::Unsent);

        assert!(!change.mark_fragment_sent(1));
        assert!(change.mark_fragment_sent(3));
        assert!(change.unsent_fragments().is_empty());

        change.mark_all_fragments_unsent();
        assert_eq!(change.next_unsent_fragment(), Some(1));
    }

    #[test]
    fn test_mark_requested_fragments() {
        let mut change = ChangeForReader::new(4, 4);
        for f in 1..=4 {
            change.mark_fragment_sent(f);
        }
        let nack = FragmentNumberSet::from_fragments(2, &[2, 4, 9]).expect("set");
        change.mark_fragments_unsent(&nack);
        assert_eq!(change.unsent_fragments().iter().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_unfragmented_change() {
        let change = ChangeForReader::new(1, 0);
        assert!(!change.is_fragmented());
        assert_eq!(change.next_unsent_fragment(), None);
        assert!(!change.is_delivered());
    }
}
