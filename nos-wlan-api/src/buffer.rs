//! Outbound packet buffers
//!
//! A `PacketBuffer` is one 802.3-framed frame on its way to the radio. It
//! is deliberately not `Clone`: a frame is owned by exactly one stage of
//! the transmit path at a time and dropping it is what "free" means.

use alloc::vec::Vec;

use bitflags::bitflags;

use crate::core::types::PacketId;

/// Length of an Ethernet II header
pub const ETH_HDR_LEN: usize = 14;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_EAPOL: u16 = 0x888E;
const ETHERTYPE_WAPI: u16 = 0x88B4;
const IPPROTO_UDP: u8 = 17;
const DHCP_SERVER_PORT: u16 = 67;
const DHCP_CLIENT_PORT: u16 = 68;

bitflags! {
    /// Latency classes recognized from the frame headers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PacketFlags: u8 {
        const EAPOL = 0b0000_0001;
        const WAPI  = 0b0000_0010;
        const DHCP  = 0b0000_0100;
    }
}

/// A chain of frames moved through the path as one unit
pub type BufferList = Vec<PacketBuffer>;

/// One outbound frame
#[derive(Debug)]
pub struct PacketBuffer {
    id: PacketId,
    data: Vec<u8>,
    tid: u8,
    flags: PacketFlags,
}

impl PacketBuffer {
    /// Wrap frame bytes; latency-class flags are detected from the headers
    pub fn new(id: PacketId, data: Vec<u8>) -> Self {
        let flags = detect_flags(&data);
        Self { id, data, tid: 0, flags }
    }

    /// Create a packet buffer from existing data
    pub fn from_bytes(id: PacketId, data: &[u8]) -> Self {
        Self::new(id, data.to_vec())
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    /// Get packet data as slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get packet length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Traffic identifier (802.11 TID)
    pub fn tid(&self) -> u8 {
        self.tid
    }

    pub fn set_tid(&mut self, tid: u8) {
        self.tid = tid;
    }

    pub fn flags(&self) -> PacketFlags {
        self.flags
    }

    /// Override the detected flags (frames built by an upper layer that
    /// already knows their class)
    pub fn with_flags(mut self, flags: PacketFlags) -> Self {
        self.flags = flags;
        self
    }

    /// EAPOL or WAPI: allowed through a link paused only for authorization
    pub fn is_auth_exchange(&self) -> bool {
        self.flags.intersects(PacketFlags::EAPOL | PacketFlags::WAPI)
    }

    /// Frames that skip bundling and may use the reserved descriptors
    pub fn is_latency_sensitive(&self) -> bool {
        !self.flags.is_empty()
    }
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn detect_flags(data: &[u8]) -> PacketFlags {
    let Some(ethertype) = read_u16(data, 12) else {
        return PacketFlags::empty();
    };

    match ethertype {
        ETHERTYPE_EAPOL => PacketFlags::EAPOL,
        ETHERTYPE_WAPI => PacketFlags::WAPI,
        ETHERTYPE_IPV4 if is_dhcp(data) => PacketFlags::DHCP,
        _ => PacketFlags::empty(),
    }
}

fn is_dhcp(data: &[u8]) -> bool {
    let Some(&ver_ihl) = data.get(ETH_HDR_LEN) else {
        return false;
    };
    if data.get(ETH_HDR_LEN + 9) != Some(&IPPROTO_UDP) {
        return false;
    }
    let udp = ETH_HDR_LEN + ((ver_ihl & 0x0f) as usize) * 4;
    match (read_u16(data, udp), read_u16(data, udp + 2)) {
        (Some(src), Some(dst)) => {
            matches!(
                (src, dst),
                (DHCP_CLIENT_PORT, DHCP_SERVER_PORT) | (DHCP_SERVER_PORT, DHCP_CLIENT_PORT)
            )
        }
        _ => false,
    }
}
