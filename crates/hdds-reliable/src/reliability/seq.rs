// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-writer sequence numbering.
//!
//! Sequence numbers start at 1; 0 is reserved for "unknown".

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::SequenceNumber;

/// Sequence number generator (per-writer)
///
/// # Thread Safety
///
/// `next()` is a single `fetch_add`, safe from any number of writer threads.
/// Callers that must also keep insertion order (the history) assign under
/// their own lock.
#[derive(Debug)]
pub struct SeqNumGenerator {
    /// Next sequence number to assign
    next: AtomicU64,
}

impl SeqNumGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Assign the next sequence number.
    #[inline]
    pub fn next(&self) -> SequenceNumber {
        // fetch_add returns OLD value, so result is the seq we should use
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The sequence number the next call to `next()` will return.
    #[inline]
    pub fn current(&self) -> SequenceNumber {
        self.next.load(Ordering::Relaxed)
    }

    /// Highest sequence number handed out so far (0 if none).
    #[inline]
    pub fn last(&self) -> SequenceNumber {
        self.current().saturating_sub(1)
    }
}

impl Default for SeqNumGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_seqgen_starts_at_one() {
        let gen = SeqNumGenerator::new();
        assert_eq!(gen.last(), 0);
        assert_eq!(gen.next(), 1, "First sequence number should be 1");
        assert_eq!(gen.current(), 2);
        assert_eq!(gen.last(), 1);
    }

    #[test]
    fn test_seqgen_thread_safety() {
        let gen = Arc::new(SeqNumGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gen = Arc::clone(&gen);
                thread::spawn(move || (0..10_000).map(|_| gen.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for seq in handle.join().expect("Thread should complete successfully") {
                assert!(seen.insert(seq), "Duplicate sequence number: {}", seq);
            }
        }
        assert_eq!(seen.len(), 40_000);
        assert_eq!(gen.last(), 40_000);
    }
}
