// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # RTPS Reliable Protocol - writer side
//!
//! Per-reader acknowledgement tracking and retransmission decisions for a
//! stateful writer.
//!
//! ## Protocol Flow
//!
//! ```text
//! Writer                                    Reader
//!   |                                          |
//!   |--- DATA (seq=1) ------------------------>|   1: UNSENT -> UNDERWAY
//!   |--- DATA (seq=2) ----------X (lost)       |   2: UNSENT -> UNDERWAY
//!   |                                          |
//!   |   (nack supression expires)              |   1,2: UNACKNOWLEDGED
//!   |--- HEARTBEAT (first=1, last=2) -------->|
//!   |<-- ACKNACK (base=2, missing: [2]) ------|   1 folded, low_mark=1
//!   |                                          |   2: REQUESTED
//!   |   (nack response delay)                  |   2: UNSENT
//!   |--- DATA (seq=2) [retransmit] ---------->|
//!   |<-- ACKNACK (base=3) --------------------|   low_mark=2
//! ```
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | `ReaderProxy` | Per-reader state machine, duplicate guards, timers |
//! | `SequenceLedger` | Ordered `ChangeForReader` entries above the low mark |
//! | `GapBuilder` | Groups unavailable sequence numbers into GAP ranges |
//! | `HistoryCache` | Shared write-history, KEEP_LAST / KEEP_ALL limits |
//! | `WriterMetrics` | Observability counters (DATA, GAP, HEARTBEAT, drops) |
//!
//! ## See Also
//!
//! - [RTPS v2.5 Sec.8.4.9](https://www.omg.org/spec/DDSI-RTPS/2.5/) - Stateful Writer Behavior

// Core types
mod change_for_reader;
mod ledger;
mod rtps_range;
mod seq;

// Protocol messages
mod messages;

// Per-reader state
mod gap_builder;
mod reader_proxy;

// History cache
mod history_cache;

mod metrics;

// ============================================================================
// Public re-exports
// ============================================================================

pub use change_for_reader::{ChangeForReader, ChangeStatus, FragmentSet};
pub use gap_builder::GapBuilder;
pub use history_cache::{HistoryCache, WriteHistory};
pub use ledger::SequenceLedger;
pub use messages::{
    AckNackMsg, DataFragMsg, DataMsg, FragmentNumberSet, GapMsg, HeartbeatMsg, NackFragMsg,
    SequenceNumberSet, MAX_BITMAP_BITS,
};
pub use metrics::{WriterMetrics, WriterMetricsSnapshot};
pub use reader_proxy::{ProxyTimers, ReaderProxy, ReaderProxyData, UnsentChange};
pub use rtps_range::RtpsRange;
pub use seq::SeqNumGenerator;
