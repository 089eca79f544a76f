// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collaborator seams of the stateful writer: transport, listener, filter.

use crate::reliability::{DataFragMsg, DataMsg, GapMsg, HeartbeatMsg, ReaderProxy};
use crate::types::{CacheChange, Guid, Locator, SequenceNumber};
use crate::Result;

/// Where a submessage goes: one matched reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub reader_guid: Guid,
    pub unicast_locators: Vec<Locator>,
    pub multicast_locators: Vec<Locator>,
    /// Intra-process reader; the transport may short-circuit the network.
    pub is_local: bool,
}

impl Destination {
    pub(crate) fn for_proxy(proxy: &ReaderProxy) -> Self {
        let data = proxy.data();
        Self {
            reader_guid: data.guid,
            unicast_locators: data.unicast_locators.clone(),
            multicast_locators: data.multicast_locators.clone(),
            is_local: data.is_local,
        }
    }
}

/// Submessages a stateful writer emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterSubmessage {
    Data(DataMsg),
    DataFrag(DataFragMsg),
    Heartbeat(HeartbeatMsg),
    Gap(GapMsg),
}

impl WriterSubmessage {
    pub fn kind_name(&self) -> &'static str {
        match self {
            WriterSubmessage::Data(_) => "DATA",
            WriterSubmessage::DataFrag(_) => "DATA_FRAG",
            WriterSubmessage::Heartbeat(_) => "HEARTBEAT",
            WriterSubmessage::Gap(_) => "GAP",
        }
    }

    /// Sequence number carried by DATA / DATA_FRAG.
    pub fn sequence_number(&self) -> Option<SequenceNumber> {
        match self {
            WriterSubmessage::Data(m) => Some(m.change.sequence_number),
            WriterSubmessage::DataFrag(m) => Some(m.change.sequence_number),
            WriterSubmessage::Heartbeat(_) | WriterSubmessage::Gap(_) => None,
        }
    }
}

/// Outbound transport.
///
/// Encoding to CDR and the choice of socket belong to the implementation.
/// An `Err` leaves the change pending; the writer retries on its next pass.
pub trait MessageSender: Send + Sync {
    fn send(&self, destination: &Destination, msg: &WriterSubmessage) -> Result<()>;
}

/// Writer-side events.
///
/// Callbacks run on the thread that caused them (writer, receive or timer
/// thread) with no proxy lock held.
pub trait WriterListener: Send + Sync {
    /// `reader` acknowledged `seq`.
    fn on_data_acknowledged(&self, reader: Guid, seq: SequenceNumber) {
        let _ = (reader, seq);
    }

    /// `seq` will be sent again to `reader` after a NACK.
    fn on_resend_data(&self, reader: Guid, seq: SequenceNumber) {
        let _ = (reader, seq);
    }

    fn on_reader_matched(&self, reader: Guid) {
        let _ = reader;
    }

    fn on_reader_unmatched(&self, reader: Guid) {
        let _ = reader;
    }
}

/// Decides per reader whether a change is relevant (content / time filters).
///
/// Irrelevant changes are announced to the reader with a GAP instead of DATA.
pub trait ReaderDataFilter: Send + Sync {
    fn is_relevant(&self, change: &CacheChange, reader: &Guid) -> bool;
}

impl<F> ReaderDataFilter for F
where
    F: Fn(&CacheChange, &Guid) -> bool + Send + Sync,
{
    fn is_relevant(&self, change: &CacheChange, reader: &Guid) -> bool {
        self(change, reader)
    }
}
