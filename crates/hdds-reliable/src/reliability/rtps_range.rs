// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS sequence number range abstraction
//!
//! Half-open `[start, end)` ranges, the shape GAP submessages carry on the
//! wire (`gap_start` .. `gap_list.base`).

use std::ops::Range;

use crate::types::SequenceNumber;

/// RTPS sequence number range (exclusive boundaries `[start, end)`)
///
/// Two ranges `A` and `B` are contiguous when `A.end == B.start`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RtpsRange {
    inner: Range<SequenceNumber>,
}

impl RtpsRange {
    /// Create range from exclusive boundaries `[start, end)`
    pub fn new(start: SequenceNumber, end: SequenceNumber) -> Self {
        assert!(start < end, "RTPS range must be non-empty");
        Self { inner: start..end }
    }

    /// Non-panicking `new` for boundaries derived from peer input.
    pub fn checked(start: SequenceNumber, end: SequenceNumber) -> Option<Self> {
        (start < end).then_some(Self { inner: start..end })
    }

    /// Create range from inclusive boundaries `[start, end_inclusive]`
    #[allow(clippy::range_plus_one)]
    pub fn from_inclusive(start: SequenceNumber, end_inclusive: SequenceNumber) -> Self {
        assert!(start <= end_inclusive, "Inclusive range must be valid");
        Self {
            inner: start..(end_inclusive + 1),
        }
    }

    /// Create single-element range `[seq, seq+1)`
    #[allow(clippy::range_plus_one)]
    pub fn from_sequence(seq: SequenceNumber) -> Self {
        Self {
            inner: seq..(seq + 1),
        }
    }

    /// Start of range (inclusive)
    pub fn start(&self) -> SequenceNumber {
        self.inner.start
    }

    /// End of range (exclusive)
    pub fn end(&self) -> SequenceNumber {
        self.inner.end
    }

    /// Last sequence in the range (inclusive)
    pub fn last(&self) -> SequenceNumber {
        self.inner.end - 1
    }

    /// Grow the range by one when `seq` is exactly its end.
    ///
    /// Returns `false` (range unchanged) for any other value.
    pub fn extend_with(&mut self, seq: SequenceNumber) -> bool {
        if seq == self.inner.end {
            self.inner.end += 1;
            true
        } else {
            false
        }
    }

    pub fn as_range(&self) -> &Range<SequenceNumber> {
        &self.inner
    }

    pub fn contains(&self, seq: SequenceNumber) -> bool {
        self.inner.contains(&seq)
    }

    pub fn is_single(&self) -> bool {
        self.inner.end == self.inner.start + 1
    }

    pub fn iter_sequences(&self) -> impl Iterator<Item = SequenceNumber> {
        self.inner.clone()
    }

    /// Number of sequences in range
    pub fn len(&self) -> u64 {
        self.inner.end - self.inner.start
    }

    /// Always false (range must be non-empty by construction)
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl From<Range<SequenceNumber>> for RtpsRange {
    fn from(range: Range<SequenceNumber>) -> Self {
        assert!(!range.is_empty(), "RTPS range must be non-empty");
        Self { inner: range }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtps_range_from_inclusive() {
        let r = RtpsRange::from_inclusive(7, 7);
        assert_eq!(r.as_range(), &(7..8));
        assert!(r.is_single());
        assert_eq!(r.last(), 7);
    }

    #[test]
    fn test_rtps_range_extend() {
        let mut r = RtpsRange::from_sequence(5);
        assert!(r.extend_with(6));
        assert!(r.extend_with(7));
        assert!(!r.extend_with(9));
        assert!(!r.extend_with(6));
        assert_eq!(r.iter_sequences().collect::<Vec<_>>(), vec![5, 6, 7]);
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn test_rtps_range_checked() {
        assert!(RtpsRange::checked(4, 4).is_none());
        assert!(RtpsRange::checked(5, 4).is_none());
        assert_eq!(RtpsRange::checked(4, 6).map(|r| r.len()), Some(2));
    }

    #[test]
    #[should_panic(expected = "RTPS range must be non-empty")]
    fn test_rtps_range_new_empty() {
        let _r = RtpsRange::new(10, 10);
    }
}
