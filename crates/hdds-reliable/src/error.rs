// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::types::Guid;

/// Errors returned by the reliability engine.
///
/// Protocol noise (duplicate ACKNACK counts, stale sequence numbers) is never
/// reported through this type; those paths return `false`/`None` and move on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Writer attributes or times are inconsistent.
    Config(String),
    /// QoS policy is invalid (e.g., KEEP_LAST depth of zero).
    InvalidQos(String),

    // ========================================================================
    // State Errors
    // ========================================================================
    /// Invalid state for the requested operation.
    InvalidState(String),
    /// Reader GUID is not matched with this writer.
    UnknownReader(Guid),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Transport refused or failed to carry a submessage.
    TransportError(String),
    /// Send operation failed.
    SendFailed(String),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// KEEP_ALL history is full and the sample cannot be accepted yet.
    WouldBlock,
    /// Resource limit exceeded (ledger capacity, matched readers, etc.).
    ResourceLimitExceeded(String),
    /// Not every matched reader acknowledged in time.
    WriteTimeout,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidQos(msg) => write!(f, "Invalid QoS: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::UnknownReader(guid) => write!(f, "Unknown reader: {}", guid),
            Error::TransportError(msg) => write!(f, "Transport error: {}", msg),
            Error::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            Error::WouldBlock => write!(f, "Operation would block"),
            Error::ResourceLimitExceeded(msg) => write!(f, "Resource limit exceeded: {}", msg),
            Error::WriteTimeout => write!(f, "Write timeout"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for results using the crate `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = Error::ResourceLimitExceeded("ledger full (16 changes)".to_string());
        assert_eq!(
            err.to_string(),
            "Resource limit exceeded: ledger full (16 changes)"
        );
        assert_eq!(Error::WouldBlock.to_string(), "Operation would block");
    }

    #[test]
    fn unknown_reader_shows_guid() {
        let guid = Guid::new([0xAA; 12], [0, 0, 0, 7]);
        let msg = Error::UnknownReader(guid).to_string();
        assert!(msg.starts_with("Unknown reader: aa.aa"));
        assert!(msg.ends_with("00.00.00.07"));
    }
}
