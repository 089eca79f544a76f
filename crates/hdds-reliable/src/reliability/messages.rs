// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS reliability submessages exchanged by a stateful writer
//!
//! - HEARTBEAT: Writer announces available sequence range
//! - GAP: Writer declares lost/unavailable sequences
//! - DATA / DATA_FRAG: Writer sends a change (whole or one fragment)
//! - ACKNACK: Reader acknowledges and requests sequences
//! - NACKFRAG: Reader requests missing fragments of one change
//!
//! These are decoded values; CDR encoding is done by the transport layer.

use std::sync::Arc;

use super::RtpsRange;
use crate::types::{CacheChange, FragmentNumber, Guid, SequenceNumber};

/// Maximum bitmap bits in a number set (RTPS limit).
pub const MAX_BITMAP_BITS: u32 = 256;
pub const WORD_BITS: u32 = 32;
pub const BITMAP_WORDS: usize = 8;

/// Fixed 256-bit MSB-first bitmap shared by both number-set kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Bitmap {
    num_bits: u32,
    words: [u32; BITMAP_WORDS],
}

impl Bitmap {
    fn set(&mut self, offset: u64) -> bool {
        if offset >= u64::from(MAX_BITMAP_BITS) {
            return false;
        }
        let offset = offset as u32;
        let word = (offset / WORD_BITS) as usize;
        let bit = offset % WORD_BITS;
        self.words[word] |= 1 << (31 - bit);
        self.num_bits = self.num_bits.max(offset + 1);
        true
    }

    fn is_set(&self, offset: u32) -> bool {
        if offset >= self.num_bits {
            return false;
        }
        let word = (offset / WORD_BITS) as usize;
        let bit = offset % WORD_BITS;
        self.words[word] & (1 << (31 - bit)) != 0
    }

    fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.num_bits).filter(|&off| self.is_set(off))
    }

    fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }
}

// ============================================================================
// SequenceNumberSet
// ============================================================================

/// RTPS SequenceNumberSet: a base plus up to 256 following sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceNumberSet {
    base: SequenceNumber,
    bitmap: Bitmap,
}

impl SequenceNumberSet {
    /// Maximum number of bitmap bits (RTPS limit).
    pub const MAX_BITS: u32 = MAX_BITMAP_BITS;

    /// Create an empty set with the provided base sequence number.
    pub fn empty(base: SequenceNumber) -> Self {
        Self {
            base,
            bitmap: Bitmap::default(),
        }
    }

    /// Create from explicit sequence numbers (must be >= base and < base + 256).
    pub fn from_sequences(base: SequenceNumber, sequences: &[SequenceNumber]) -> Option<Self> {
        let mut set = Self::empty(base);
        for &seq in sequences {
            if !set.add(seq) {
                return None;
            }
        }
        Some(set)
    }

    /// Insert one sequence number; `false` when outside `[base, base + 256)`.
    pub fn add(&mut self, seq: SequenceNumber) -> bool {
        match seq.checked_sub(self.base) {
            Some(offset) => self.bitmap.set(offset),
            None => false,
        }
    }

    /// Base sequence number of the set.
    ///
    /// In an ACKNACK, every sequence strictly below the base is acknowledged.
    pub fn base(&self) -> SequenceNumber {
        self.base
    }

    /// Number of bitmap bits actually used.
    pub fn num_bits(&self) -> u32 {
        self.bitmap.num_bits
    }

    pub fn contains(&self, seq: SequenceNumber) -> bool {
        match seq.checked_sub(self.base) {
            Some(offset) if offset < u64::from(MAX_BITMAP_BITS) => {
                self.bitmap.is_set(offset as u32)
            }
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    /// Iterate through all sequence numbers contained in the set (ascending).
    pub fn iter(&self) -> impl Iterator<Item = SequenceNumber> + '_ {
        self.bitmap
            .offsets()
            .map(move |off| self.base + SequenceNumber::from(off))
    }
}

// ============================================================================
// FragmentNumberSet
// ============================================================================

/// RTPS FragmentNumberSet (1-based fragment numbers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentNumberSet {
    base: FragmentNumber,
    bitmap: Bitmap,
}

impl FragmentNumberSet {
    pub fn empty(base: FragmentNumber) -> Self {
        Self {
            base,
            bitmap: Bitmap::default(),
        }
    }

    pub fn from_fragments(base: FragmentNumber, fragments: &[FragmentNumber]) -> Option<Self> {
        let mut set = Self::empty(base);
        for &frag in fragments {
            if !set.add(frag) {
                return None;
            }
        }
        Some(set)
    }

    pub fn add(&mut self, frag: FragmentNumber) -> bool {
        match frag.checked_sub(self.base) {
            Some(offset) => self.bitmap.set(u64::from(offset)),
            None => false,
        }
    }

    pub fn base(&self) -> FragmentNumber {
        self.base
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FragmentNumber> + '_ {
        self.bitmap
            .offsets()
            .map(move |off| self.base.saturating_add(off))
    }
}

// ============================================================================
// Outgoing submessages
// ============================================================================

/// Heartbeat message (RTPS HEARTBEAT submessage, DDS-RTPS v2.5 Sec.8.3.7.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatMsg {
    pub writer_guid: Guid,
    /// `Guid::unknown()` when addressed to every matched reader.
    pub reader_guid: Guid,
    /// First (oldest) sequence number still available.
    pub first_seq: SequenceNumber,
    /// Last (newest) sequence number written.
    pub last_seq: SequenceNumber,
    /// Monotonic heartbeat counter (anti-replay).
    pub count: u32,
    /// Reader need not answer unless it misses data.
    pub final_flag: bool,
    pub liveliness_flag: bool,
}

/// GAP message (RTPS GAP submessage, DDS-RTPS v2.5 Sec.8.3.7.4).
///
/// Sequences `[gap_start, gap_list.base)` plus the ones set in `gap_list`
/// are irrelevant to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapMsg {
    pub writer_guid: Guid,
    pub reader_guid: Guid,
    pub gap_start: SequenceNumber,
    pub gap_list: SequenceNumberSet,
}

impl GapMsg {
    /// GAP covering the contiguous range `[start, end)` with an empty bitmap.
    pub fn from_range(writer_guid: Guid, reader_guid: Guid, range: &RtpsRange) -> Self {
        Self {
            writer_guid,
            reader_guid,
            gap_start: range.start(),
            gap_list: SequenceNumberSet::empty(range.end()),
        }
    }

    /// Expand into explicit sequence numbers.
    pub fn lost_sequences(&self) -> Vec<SequenceNumber> {
        let mut seqs: Vec<SequenceNumber> = (self.gap_start..self.gap_list.base()).collect();
        seqs.extend(self.gap_list.iter());
        seqs.sort_unstable();
        seqs.dedup();
        seqs
    }
}

/// DATA submessage carrying one whole change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMsg {
    pub writer_guid: Guid,
    pub reader_guid: Guid,
    pub change: Arc<CacheChange>,
    pub inline_qos: bool,
}

/// DATA_FRAG submessage carrying one fragment of a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFragMsg {
    pub writer_guid: Guid,
    pub reader_guid: Guid,
    pub change: Arc<CacheChange>,
    /// 1-based fragment carried by this submessage.
    pub fragment_number: FragmentNumber,
    pub fragment_size: u32,
    pub sample_size: u32,
    pub inline_qos: bool,
}

impl DataFragMsg {
    pub fn fragment(&self) -> &[u8] {
        self.change.fragment(self.fragment_number).unwrap_or(&[])
    }
}

// ============================================================================
// Incoming submessages
// ============================================================================

/// ACKNACK message (RTPS ACKNACK submessage, DDS-RTPS v2.5 Sec.8.3.7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckNackMsg {
    pub reader_guid: Guid,
    pub writer_guid: Guid,
    /// `base` acknowledges everything below it; set bits are NACKs.
    pub reader_sn_state: SequenceNumberSet,
    pub count: u32,
    pub final_flag: bool,
}

/// NACKFRAG message (RTPS NACKFRAG submessage, DDS-RTPS v2.5 Sec.8.3.7.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NackFragMsg {
    pub reader_guid: Guid,
    pub writer_guid: Guid,
    pub writer_sn: SequenceNumber,
    pub fragment_number_state: FragmentNumberSet,
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_set_membership() {
        let set = SequenceNumberSet::from_sequences(10, &[10, 12, 265]).expect("in window");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![10, 12, 265]);
        assert!(set.contains(12));
        assert!(!set.contains(11));
        assert!(!set.contains(9));
        assert_eq!(set.num_bits(), 256);
    }

    #[test]
    fn test_sequence_set_rejects_out_of_window() {
        assert!(SequenceNumberSet::from_sequences(10, &[9]).is_none());
        assert!(SequenceNumberSet::from_sequences(10, &[266]).is_none());

        let mut set = SequenceNumberSet::empty(1);
        assert!(set.is_empty());
        assert!(set.add(1));
        assert!(!set.is_empty());
    }

    #[test]
    fn test_fragment_set() {
        let set = FragmentNumberSet::from_fragments(2, &[2, 5]).expect("in window");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 5]);
        assert!(FragmentNumberSet::from_fragments(2, &[1]).is_none());
    }

    #[test]
    fn test_gap_from_range() {
        let writer = Guid::new([1; 12], [0, 0, 1, 3]);
        let reader = Guid::new([2; 12], [0, 0, 1, 4]);
        let gap = GapMsg::from_range(writer, reader, &RtpsRange::from_inclusive(7, 9));
        assert_eq!(gap.gap_start, 7);
        assert_eq!(gap.gap_list.base(), 10);
        assert!(gap.gap_list.is_empty());
        assert_eq!(gap.lost_sequences(), vec![7, 8, 9]);
    }
}
