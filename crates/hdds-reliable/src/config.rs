// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer configuration - reliability timing and resource attributes
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: default constants below (RTPS reliable-writer timings)
//! - **Level 2 (Dynamic)**: [`WriterTimes`] hot-swapped at runtime by
//!   `StatefulWriter::update_times` (held in an `ArcSwap`)
//!
//! # Environment overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `HDDS_HEARTBEAT_PERIOD_MS` | [`WriterTimes::heartbeat_period`] |
//! | `HDDS_NACK_RESPONSE_DELAY_MS` | [`WriterTimes::nack_response_delay`] |
//! | `HDDS_NACK_SUPRESSION_MS` | [`WriterTimes::nack_supression_duration`] |
//! | `HDDS_INITIAL_HEARTBEAT_MS` | [`WriterTimes::initial_heartbeat_delay`] |

use std::time::Duration;

use crate::qos::{Durability, History, Reliability, ResourceLimits, LENGTH_UNLIMITED};
use crate::{Error, Result};

// =======================================================================
// Reliable writer timings
// =======================================================================

/// Period of the writer's HEARTBEAT while changes remain unacknowledged.
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(3);

/// Delay before answering an ACKNACK that requested changes.
///
/// Gives several readers the chance to NACK the same change so it is resent once.
pub const DEFAULT_NACK_RESPONSE_DELAY: Duration = Duration::from_millis(5);

/// Grace period during which an UNDERWAY change cannot be nacked.
pub const DEFAULT_NACK_SUPRESSION_DURATION: Duration = Duration::ZERO;

/// Delay of the first directed HEARTBEAT after a reader is matched.
pub const DEFAULT_INITIAL_HEARTBEAT_DELAY: Duration = Duration::from_millis(12);

// =======================================================================
// Payload / matching limits
// =======================================================================

/// Bytes per DATA_FRAG when fragmentation is enabled.
pub const DEFAULT_FRAGMENT_SIZE: u32 = 1024;

/// Maximum readers one writer tracks at the same time.
pub const DEFAULT_MAX_MATCHED_READERS: usize = 64;

/// Env var names for [`WriterTimes::from_env`].
pub const ENV_HEARTBEAT_PERIOD_MS: &str = "HDDS_HEARTBEAT_PERIOD_MS";
pub const ENV_NACK_RESPONSE_DELAY_MS: &str = "HDDS_NACK_RESPONSE_DELAY_MS";
pub const ENV_NACK_SUPRESSION_MS: &str = "HDDS_NACK_SUPRESSION_MS";
pub const ENV_INITIAL_HEARTBEAT_MS: &str = "HDDS_INITIAL_HEARTBEAT_MS";

/// Reliability timings of one writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriterTimes {
    pub heartbeat_period: Duration,
    pub nack_response_delay: Duration,
    pub nack_supression_duration: Duration,
    pub initial_heartbeat_delay: Duration,
}

impl Default for WriterTimes {
    fn default() -> Self {
        Self {
            heartbeat_period: DEFAULT_HEARTBEAT_PERIOD,
            nack_response_delay: DEFAULT_NACK_RESPONSE_DELAY,
            nack_supression_duration: DEFAULT_NACK_SUPRESSION_DURATION,
            initial_heartbeat_delay: DEFAULT_INITIAL_HEARTBEAT_DELAY,
        }
    }
}

impl WriterTimes {
    /// Defaults with `HDDS_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply millisecond overrides looked up by env var name.
    ///
    /// Unparsable values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &str| -> Option<Duration> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(_) => {
                    log::debug!("[config] ignoring {}={:?} (not a millisecond count)", key, raw);
                    None
                }
            }
        };

        if let Some(d) = millis(ENV_HEARTBEAT_PERIOD_MS) {
            self.heartbeat_period = d;
        }
        if let Some(d) = millis(ENV_NACK_RESPONSE_DELAY_MS) {
            self.nack_response_delay = d;
        }
        if let Some(d) = millis(ENV_NACK_SUPRESSION_MS) {
            self.nack_supression_duration = d;
        }
        if let Some(d) = millis(ENV_INITIAL_HEARTBEAT_MS) {
            self.initial_heartbeat_delay = d;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_period.is_zero() {
            return Err(Error::Config("heartbeat_period must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Static attributes of a stateful writer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriterAttributes {
    pub reliability: Reliability,
    pub durability: Durability,
    pub history: History,
    pub resource_limits: ResourceLimits,
    /// Payloads larger than this are sent as DATA_FRAG (0 disables fragmentation).
    pub fragment_size: u32,
    pub max_matched_readers: usize,
    pub times: WriterTimes,
}

impl Default for WriterAttributes {
    fn default() -> Self {
        Self {
            reliability: Reliability::Reliable,
            durability: Durability::Volatile,
            history: History::default(),
            resource_limits: ResourceLimits::default(),
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            max_matched_readers: DEFAULT_MAX_MATCHED_READERS,
            times: WriterTimes::default(),
        }
    }
}

impl WriterAttributes {
    /// Reliable writer with the given durability and history depth.
    pub fn reliable(durability: Durability, history: History) -> Self {
        Self {
            durability,
            history,
            ..Self::default()
        }
    }

    /// Best-effort writer (no heartbeats, no acknack processing).
    pub fn best_effort() -> Self {
        Self {
            reliability: Reliability::BestEffort,
            ..Self::default()
        }
    }

    pub fn with_times(mut self, times: WriterTimes) -> Self {
        self.times = times;
        self
    }

    pub fn with_fragment_size(mut self, fragment_size: u32) -> Self {
        self.fragment_size = fragment_size;
        self
    }

    pub fn with_resource_limits(mut self, limits: ResourceLimits) -> Self {
        self.resource_limits = limits;
        self
    }

    pub fn is_reliable(&self) -> bool {
        matches!(self.reliability, Reliability::Reliable)
    }

    /// Upper bound on ledger entries per reader.
    ///
    /// A reader can never track more changes than the history holds.
    pub fn max_changes_per_reader(&self) -> usize {
        match self.history {
            History::KeepAll => self.resource_limits.max_samples,
            History::KeepLast(depth) => {
                let per_instance = depth as usize;
                if self.resource_limits.max_instances == LENGTH_UNLIMITED {
                    self.resource_limits.max_samples
                } else {
                    per_instance
                        .saturating_mul(self.resource_limits.max_instances)
                        .min(self.resource_limits.max_samples)
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let History::KeepLast(0) = self.history {
            return Err(Error::InvalidQos("KEEP_LAST depth must be > 0".to_string()));
        }
        if self.resource_limits.max_samples == 0 {
            return Err(Error::InvalidQos("max_samples must be > 0".to_string()));
        }
        if self.max_matched_readers == 0 {
            return Err(Error::Config("max_matched_readers must be > 0".to_string()));
        }
        self.times.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_overrides_applied() {
        let env: HashMap<&str, &str> = [
            (ENV_HEARTBEAT_PERIOD_MS, "250"),
            (ENV_NACK_SUPRESSION_MS, " 40 "),
        ]
        .into_iter()
        .collect();

        let times = WriterTimes::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(times.heartbeat_period, Duration::from_millis(250));
        assert_eq!(times.nack_supression_duration, Duration::from_millis(40));
        assert_eq!(times.nack_response_delay, DEFAULT_NACK_RESPONSE_DELAY);
        assert_eq!(times.initial_heartbeat_delay, DEFAULT_INITIAL_HEARTBEAT_DELAY);
    }

    #[test]
    fn test_bad_override_ignored() {
        let times = WriterTimes::default().with_overrides(|k| {
            (k == ENV_HEARTBEAT_PERIOD_MS).then(|| "fast".to_string())
        });
        assert_eq!(times.heartbeat_period, DEFAULT_HEARTBEAT_PERIOD);
    }

    #[test]
    fn test_validate() {
        assert!(WriterAttributes::default().validate().is_ok());

        let attrs = WriterAttributes::reliable(Durability::Volatile, History::KeepLast(0));
        assert!(matches!(attrs.validate(), Err(Error::InvalidQos(_))));

        let attrs = WriterAttributes::default().with_times(WriterTimes {
            heartbeat_period: Duration::ZERO,
            ..WriterTimes::default()
        });
        assert!(matches!(attrs.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_max_changes_per_reader() {
        let mut attrs = WriterAttributes::reliable(Durability::Volatile, History::KeepLast(4));
        attrs.resource_limits.max_samples = 100;
        assert_eq!(attrs.max_changes_per_reader(), 100);

        attrs.resource_limits.max_instances = 2;
        assert_eq!(attrs.max_changes_per_reader(), 8);

        attrs.history = History::KeepAll;
        assert_eq!(attrs.max_changes_per_reader(), 100);
    }
}
