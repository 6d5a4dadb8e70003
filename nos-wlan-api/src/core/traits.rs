//! Contracts the transmit engine consumes from its collaborators
//!
//! Implementations are injected into the engine at construction time as
//! `Arc<dyn Trait>`; none of them are expected to block.

use crate::buffer::PacketBuffer;
use crate::core::types::{Milliseconds, PacketInfo};
use crate::error::Rejected;

/// The hardware descriptor pool and the "send one frame now" primitive
pub trait HwTxTarget: Send + Sync {
    /// Hand one frame to the hardware.
    ///
    /// On refusal the frame is handed back so the caller decides whether it
    /// is dropped or retried.
    fn submit(&self, buf: PacketBuffer) -> core::result::Result<(), Rejected>;

    /// Number of currently unallocated hardware tx descriptors
    fn free_descriptor_count(&self) -> u32;
}

/// Transport header inspection
pub trait TransportClassifier: Send + Sync {
    /// Classify a frame and extract its TCP 4-tuple.
    ///
    /// Must never fail: anything unparsable is reported as `NoTcp`.
    fn classify(&self, buf: &PacketBuffer) -> PacketInfo;
}

/// Monotonic millisecond clock
pub trait TxClock: Send + Sync {
    fn now_ms(&self) -> Milliseconds;
}
