// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Accumulates sequence numbers into contiguous GAP ranges.

use super::RtpsRange;
use crate::types::SequenceNumber;

/// Collects increasing sequence numbers and groups them into ranges.
///
/// Each returned range becomes one GAP submessage.
#[derive(Debug, Default, Clone)]
pub struct GapBuilder {
    ranges: Vec<RtpsRange>,
}

impl GapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `seq`; extends the current range when contiguous.
    ///
    /// Values not greater than the last one added are ignored.
    pub fn add(&mut self, seq: SequenceNumber) {
        if let Some(last) = self.ranges.last_mut() {
            if seq < last.end() {
                return;
            }
            if last.extend_with(seq) {
                return;
            }
        }
        self.ranges.push(RtpsRange::from_sequence(seq));
    }

    /// Add every number of `[start, end)`.
    pub fn add_range(&mut self, start: SequenceNumber, end: SequenceNumber) {
        for seq in start..end {
            self.add(seq);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total sequence numbers collected.
    pub fn len(&self) -> u64 {
        self.ranges.iter().map(RtpsRange::len).sum()
    }

    pub fn build(self) -> Vec<RtpsRange> {
        self.ranges
    }
}
