// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identity and sample types shared by the history, the ledger and the writer.

use std::fmt;
use std::net::SocketAddr;

/// RTPS sequence number (writer-local, starts at 1).
pub type SequenceNumber = u64;

/// RTPS fragment number (1-based within one change).
pub type FragmentNumber = u32;

/// Key hash identifying an instance of a keyed topic (all zeros when unkeyed).
pub type InstanceHandle = [u8; 16];

/// Sentinel for "no sequence number".
pub const SEQUENCE_NUMBER_UNKNOWN: SequenceNumber = 0;

/// RTPS GUID (Globally Unique Identifier)
///
/// 16-byte identifier: 12-byte participant prefix + 4-byte entity ID.
///
/// # Display Format
/// Hex with dots: "01.0f.ac.10.00.00.00.00.00.00.00.01.00.00.01.c1"
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct Guid {
    pub prefix: [u8; 12],
    pub entity_id: [u8; 4],
}

impl Guid {
    /// Create GUID from separate prefix and entity ID
    pub const fn new(prefix: [u8; 12], entity_id: [u8; 4]) -> Self {
        Self { prefix, entity_id }
    }

    /// Create GUID from raw bytes (16 bytes total)
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut prefix = [0u8; 12];
        let mut entity_id = [0u8; 4];
        prefix.copy_from_slice(&bytes[0..12]);
        entity_id.copy_from_slice(&bytes[12..16]);
        Self { prefix, entity_id }
    }

    /// Convert GUID to 16-byte array
    pub fn as_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..12].copy_from_slice(&self.prefix);
        bytes[12..16].copy_from_slice(&self.entity_id);
        bytes
    }

    /// GUID_UNKNOWN (all zeros)
    pub const fn unknown() -> Self {
        Self {
            prefix: [0; 12],
            entity_id: [0; 4],
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.prefix.iter().all(|&b| b == 0) && self.entity_id.iter().all(|&b| b == 0)
    }

    /// True when both GUIDs live in the same participant.
    pub fn same_participant(&self, other: &Guid) -> bool {
        self.prefix == other.prefix
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.prefix.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        for byte in &self.entity_id {
            write!(f, ".{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

/// Kind of change carried by a [`CacheChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeKind {
    #[default]
    Alive,
    NotAliveDisposed,
    NotAliveUnregistered,
    NotAliveDisposedUnregistered,
}

impl ChangeKind {
    /// True for the NOT_ALIVE variants (no serialized data, only key + status).
    pub fn is_not_alive(self) -> bool {
        !matches!(self, ChangeKind::Alive)
    }
}

/// RTPS locator kinds.
pub const LOCATOR_KIND_UDPV4: i32 = 1;
pub const LOCATOR_KIND_UDPV6: i32 = 2;

/// Network address where a reader can be reached.
///
/// IPv4 addresses are stored in the last 4 bytes of `address`, as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    pub kind: i32,
    pub port: u32,
    pub address: [u8; 16],
}

impl Locator {
    pub fn new(kind: i32, port: u32, address: [u8; 16]) -> Self {
        Self {
            kind,
            port,
            address,
        }
    }
}

impl From<SocketAddr> for Locator {
    fn from(addr: SocketAddr) -> Self {
        let mut address = [0u8; 16];
        let kind = match addr {
            SocketAddr::V4(v4) => {
                address[12..16].copy_from_slice(&v4.ip().octets());
                LOCATOR_KIND_UDPV4
            }
            SocketAddr::V6(v6) => {
                address.copy_from_slice(&v6.ip().octets());
                LOCATOR_KIND_UDPV6
            }
        };
        Self {
            kind,
            port: u32::from(addr.port()),
            address,
        }
    }
}

/// One written sample, owned by the write-history and shared through `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheChange {
    pub kind: ChangeKind,
    pub writer_guid: Guid,
    pub instance_handle: InstanceHandle,
    pub sequence_number: SequenceNumber,
    pub payload: Vec<u8>,
    /// 0 = sent as a single DATA, otherwise bytes per DATA_FRAG.
    pub fragment_size: u32,
    pub source_timestamp_ns: u64,
}

impl CacheChange {
    pub fn is_fragmented(&self) -> bool {
        self.fragment_size > 0
    }

    /// Number of DATA_FRAG submessages needed (0 when unfragmented).
    pub fn fragment_count(&self) -> u32 {
        fragment_count(self.payload.len(), self.fragment_size)
    }

    /// Payload bytes of fragment `frag` (1-based).
    pub fn fragment(&self, frag: FragmentNumber) -> Option<&[u8]> {
        if frag == 0 || frag > self.fragment_count() {
            return None;
        }
        let size = self.fragment_size as usize;
        let start = (frag as usize - 1) * size;
        let end = (start + size).min(self.payload.len());
        self.payload.get(start..end)
    }
}

/// ceil(len / fragment_size), with an empty payload still needing one fragment.
pub(crate) fn fragment_count(len: usize, fragment_size: u32) -> u32 {
    if fragment_size == 0 {
        return 0;
    }
    let size = fragment_size as usize;
    let count = len.div_ceil(size).max(1);
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(len: usize, fragment_size: u32) -> CacheChange {
        CacheChange {
            kind: ChangeKind::Alive,
            writer_guid: Guid::unknown(),
            instance_handle: [0; 16],
            sequence_number: 1,
            payload: (0..len).map(|i| i as u8).collect(),
            fragment_size,
            source_timestamp_ns: 0,
        }
    }

    #[test]
    fn test_guid_display() {
        let guid = Guid::from_bytes([1, 15, 172, 16, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 193]);
        assert_eq!(guid.to_string(), "01.0f.ac.10.00.00.00.00.00.00.00.01.00.00.01.c1");
        assert_eq!(Guid::from_bytes(guid.as_bytes()), guid);
        assert!(Guid::unknown().is_unknown());
    }

    #[test]
    fn test_fragment_count() {
        assert_eq!(change(100, 0).fragment_count(), 0);
        assert_eq!(change(100, 40).fragment_count(), 3);
        assert_eq!(change(120, 40).fragment_count(), 3);
        assert_eq!(change(0, 40).fragment_count(), 1);
    }

    #[test]
    fn test_fragment_slices() {
        let c = change(100, 40);
        assert_eq!(c.fragment(1).map(<[u8]>::len), Some(40));
        assert_eq!(c.fragment(3).map(<[u8]>::len), Some(20));
        assert_eq!(c.fragment(3).and_then(|f| f.first().copied()), Some(80));
        assert!(c.fragment(0).is_none());
        assert!(c.fragment(4).is_none());
    }

    #[test]
    fn test_locator_from_socket_addr() {
        let addr: SocketAddr = "192.168.1.10:7411".parse().expect("addr");
        let loc = Locator::from(addr);
        assert_eq!(loc.kind, LOCATOR_KIND_UDPV4);
        assert_eq!(loc.port, 7411);
        assert_eq!(&loc.address[12..], &[192, 168, 1, 10]);
    }
}
