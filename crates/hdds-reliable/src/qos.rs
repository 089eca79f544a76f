// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS policies that shape reliable delivery.
//!
//! Policy parsing and compatibility checks belong to the DDS layer; the
//! engine only consumes the resolved values.

/// Special value meaning "no limit" (DDS LENGTH_UNLIMITED).
pub const LENGTH_UNLIMITED: usize = usize::MAX;

/// Reliability policy
///
/// Determines delivery guarantees for samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Reliability {
    /// Fire-and-forget (no ACKs, no retransmission)
    ///
    /// A change is settled as soon as it has been sent once.
    #[default]
    BestEffort,
    /// Reliable delivery with NACK-driven retransmission
    ///
    /// Writer keeps changes in the history until every reader acknowledged them.
    Reliable,
}

/// History policy
///
/// Determines how many samples to keep in queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum History {
    /// Keep last N samples per instance (bounded queue, drops oldest)
    KeepLast(u32),
    /// Keep all samples within resource limits.
    ///
    /// Inserts fail with `Error::WouldBlock` once the limits are reached.
    KeepAll,
}

impl Default for History {
    fn default() -> Self {
        Self::KeepLast(10)
    }
}

/// Durability policy
///
/// Ordered so that `kind >= Durability::TransientLocal` means "replays history".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Durability {
    /// No replay to late joiners.
    #[default]
    Volatile,
    /// Late-joining readers receive the writer's cached history.
    TransientLocal,
    /// Like TransientLocal, history outlives the writer via a durability service.
    Transient,
    /// History survives process restarts.
    Persistent,
}

impl Durability {
    pub fn is_volatile(self) -> bool {
        matches!(self, Durability::Volatile)
    }
}

/// Resource limits for the write-history
///
/// Controls queue sizes, instance limits, and memory quotas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum total samples across all instances
    pub max_samples: usize,
    /// Maximum distinct instances
    pub max_instances: usize,
    /// Maximum samples per instance
    pub max_samples_per_instance: usize,
    /// Maximum total payload bytes held by the history
    pub max_quota_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_samples: 5_000,
            max_instances: LENGTH_UNLIMITED,
            max_samples_per_instance: LENGTH_UNLIMITED,
            max_quota_bytes: 100_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(Reliability::default(), Reliability::BestEffort);
        assert_eq!(History::default(), History::KeepLast(10));
        assert_eq!(Durability::default(), Durability::Volatile);
        assert_eq!(ResourceLimits::default().max_instances, LENGTH_UNLIMITED);
    }

    #[test]
    fn test_durability_ordering() {
        assert!(Durability::TransientLocal > Durability::Volatile);
        assert!(Durability::Persistent >= Durability::TransientLocal);
        assert!(Durability::Volatile.is_volatile());
        assert!(!Durability::Transient.is_volatile());
    }
}
