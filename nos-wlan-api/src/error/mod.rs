//! Error handling for the WLAN transmit path
//!
//! Nothing here is fatal to the subsystem: every error describes a frame or
//! request that was refused, and the caller decides what to count or free.

use core::fmt;

use crate::buffer::PacketBuffer;
use crate::core::types::VdevId;

/// Common error type used throughout the transmit path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    /// No virtual interface with this id is attached
    InterfaceNotFound(VdevId),
    /// A virtual interface with this id is already attached
    InterfaceExists(VdevId),
    /// Interface was detached while the request was in flight
    InterfaceDetached(VdevId),
    /// Every stats ring slot is pinned
    PoolExhausted,
    /// Per-packet statistics are switched off
    StatsDisabled,
    /// Configuration value out of range
    InvalidConfig(&'static str),
    /// Configuration option name not recognized
    UnknownOption,
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::InterfaceNotFound(id) => write!(f, "Interface {} not found", id),
            TxError::InterfaceExists(id) => write!(f, "Interface {} already attached", id),
            TxError::InterfaceDetached(id) => write!(f, "Interface {} detached", id),
            TxError::PoolExhausted => write!(f, "Stats ring exhausted"),
            TxError::StatsDisabled => write!(f, "Per-packet stats disabled"),
            TxError::InvalidConfig(msg) => write!(f, "Configuration error: {}", msg),
            TxError::UnknownOption => write!(f, "Unknown configuration option"),
        }
    }
}

/// Result type for operations that can fail
pub type Result<T> = core::result::Result<T, TxError>;

/// A frame the hardware (or an admission check) refused, handed back to
/// the caller.
#[derive(Debug)]
pub struct Rejected(pub PacketBuffer);

impl Rejected {
    /// Take the refused frame back
    pub fn into_inner(self) -> PacketBuffer {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_display() {
        assert_eq!(TxError::InterfaceNotFound(3).to_string(), "Interface 3 not found");
        assert_eq!(
            TxError::InvalidConfig("max_q_depth must be non-zero").to_string(),
            "Configuration error: max_q_depth must be non-zero"
        );
    }

    #[test]
    fn test_rejected_returns_buffer() {
        let buf = PacketBuffer::new(7, alloc::vec![1, 2, 3]);
        let rejected = Rejected(buf);
        assert_eq!(rejected.into_inner().id(), 7);
    }
}
