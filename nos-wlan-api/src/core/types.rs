//! Core types used throughout the WLAN transmit path

use core::fmt;

use bitflags::bitflags;

/// Virtual interface identifier type
pub type VdevId = u8;

/// Per-packet identifier (the tx descriptor id the completion refers to)
pub type PacketId = u32;

/// Time in milliseconds
pub type Milliseconds = u64;

bitflags! {
    /// Independent reasons forcing a virtual interface's traffic into its
    /// backlog queue. Any non-empty set pauses the interface.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PauseReason: u32 {
        /// Firmware asked the host to stop sending
        const FW                = 1 << 0;
        /// Peer not yet authorized; only EAPOL/WAPI may pass
        const PEER_UNAUTHORIZED = 1 << 1;
        /// Host flow control towards the upper layer
        const TX_FLOW_CONTROL   = 1 << 2;
        /// Thermal mitigation
        const THERMAL           = 1 << 3;
        /// Interface is being stopped
        const VDEV_STOP         = 1 << 4;
        /// Device standby; the backlog restart timer stays off
        const VDEV_SUSPEND      = 1 << 5;
    }
}

impl PauseReason {
    /// True when the set consists of nothing but `PEER_UNAUTHORIZED`
    pub fn is_only_unauthorized(&self) -> bool {
        *self == PauseReason::PEER_UNAUTHORIZED
    }
}

/// MAC address (48-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr {
    bytes: [u8; 6],
}

impl MacAddr {
    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    /// Get MAC address as bytes
    pub fn bytes(&self) -> [u8; 6] {
        self.bytes
    }

    /// Get zero MAC address
    pub const fn zero() -> Self {
        Self { bytes: [0; 6] }
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Identifies one TCP stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlowKey {
    pub src_ip: u32,
    pub dst_ip: u32,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FlowKey {
    pub const fn new(src_ip: u32, dst_ip: u32, src_port: u16, dst_port: u16) -> Self {
        Self { src_ip, dst_ip, src_port, dst_port }
    }

    /// Cheap additive hash of the 4-tuple, masked by the caller
    pub fn stream_hash(&self) -> u32 {
        (self.dst_port as u32)
            .wrapping_add(self.dst_ip)
            .wrapping_add(self.src_port as u32)
            .wrapping_add(self.src_ip)
    }
}

/// Transport classification of an outbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Not IPv4/TCP, or the header could not be parsed
    NoTcp,
    /// TCP segment carrying payload or flags other than a bare ACK
    TcpData,
    /// TCP segment with only the ACK flag and no payload
    TcpPureAck,
}

/// Result of classifying one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketInfo {
    pub kind: PacketKind,
    pub flow: FlowKey,
    /// Acknowledgement number, meaningful for `TcpPureAck` only
    pub ack_number: u32,
}

impl PacketInfo {
    pub const fn no_tcp() -> Self {
        Self {
            kind: PacketKind::NoTcp,
            flow: FlowKey::new(0, 0, 0, 0),
            ack_number: 0,
        }
    }

    pub fn is_pure_ack(&self) -> bool {
        self.kind == PacketKind::TcpPureAck
    }
}

/// Thermal throttle level of the physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ThrottleLevel {
    /// Throttling disabled
    Level0,
    Level1,
    Level2,
    Level3,
}

/// Current phase of the throttle duty cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottlePhase {
    On,
    Off,
}
