// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hdds-reliable - RTPS stateful writer reliability engine
//!
//! Per-matched-reader delivery tracking for a reliable RTPS writer: which
//! samples each remote reader still needs, which it asked for again, and
//! which can never be supplied and must be announced with a GAP.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                          StatefulWriter                             |
//! |   write() | process_acknack() | process_nack_frag() | heartbeats    |
//! +---------------------------------------------------------------------+
//! |       ReaderProxy (one per matched reader, own lock + timers)       |
//! |   SequenceLedger -> ChangeForReader { status, fragments }           |
//! +---------------------------------------------------------------------+
//! |  HistoryCache (Arc<CacheChange>) | TimerService | MessageSender     |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StatefulWriter`] | Coordinator owning the history and all reader proxies |
//! | [`ReaderProxy`] | Per-reader state machine (UNSENT/UNDERWAY/ACKNOWLEDGED/...) |
//! | [`SequenceLedger`] | Ordered per-sequence delivery status with the low mark |
//! | [`GapBuilder`] | Collapses irrecoverable sequence numbers into GAP ranges |
//! | [`HistoryCache`] | Shared write-history with KEEP_LAST / KEEP_ALL limits |
//! | [`TimerThread`] | Background timer service for heartbeat and nack timers |
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hdds_reliable::{
//!     ChangeKind, Guid, ManualTimerService, MessageSender, StatefulWriter, WriterAttributes,
//! };
//!
//! # fn run(sender: Arc<dyn MessageSender>) -> hdds_reliable::Result<()> {
//! let timers = Arc::new(ManualTimerService::new());
//! let guid = Guid::new([1; 12], [0, 0, 1, 0x03]);
//! let writer = StatefulWriter::new(guid, WriterAttributes::default(), sender, timers)?;
//! let seq = writer.write(ChangeKind::Alive, [0; 16], b"hello".to_vec())?;
//! assert_eq!(seq, 1);
//! # Ok(())
//! # }
//! ```

/// Writer configuration (times, attributes, env overrides).
pub mod config;
mod error;
/// QoS policies consumed by the writer and its proxies.
pub mod qos;
/// Reliable protocol state: ledger, reader proxy, GAP building, history.
pub mod reliability;
/// Timer services for heartbeat, nack-supression and nack-response events.
pub mod timer;
mod types;
/// Stateful writer coordinator and its collaborator seams.
pub mod writer;

pub use config::{WriterAttributes, WriterTimes};
pub use error::{Error, Result};
pub use qos::{Durability, History, Reliability, ResourceLimits};
pub use reliability::{
    ChangeForReader, ChangeStatus, GapBuilder, HistoryCache, ReaderProxy, ReaderProxyData,
    SequenceLedger, WriteHistory,
};
pub use timer::{ManualTimerService, TimerAction, TimerHandle, TimerService, TimerThread};
pub use types::{
    CacheChange, ChangeKind, FragmentNumber, Guid, InstanceHandle, Locator, SequenceNumber,
    SEQUENCE_NUMBER_UNKNOWN,
};
pub use writer::{
    Destination, MessageSender, ReaderDataFilter, ReaderSnapshot, StatefulWriter, WriterListener,
    WriterSubmessage,
};
