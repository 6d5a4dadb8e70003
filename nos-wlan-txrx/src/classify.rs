//! Ethernet/IPv4/TCP header classifier
//!
//! Used by the ACK coalescer to tell pure ACKs from data segments. Any
//! frame that is not a complete IPv4/TCP header chain is `NoTcp`.

use nos_wlan_api::buffer::ETH_HDR_LEN;
use nos_wlan_api::{FlowKey, PacketBuffer, PacketInfo, PacketKind, TransportClassifier};

const ETHERTYPE_IPV4: u16 = 0x0800;
const IPPROTO_TCP: u8 = 6;
const IPV4_MIN_HDR_LEN: usize = 20;
const TCP_MIN_HDR_LEN: usize = 20;

const TCP_FLAG_ACK: u8 = 0x10;
/// FIN, SYN, RST, PSH, ACK, URG
const TCP_FLAGS_MASK: u8 = 0x3f;

/// Default `TransportClassifier` for Ethernet II framed traffic
#[derive(Debug, Default, Clone, Copy)]
pub struct EthernetTcpClassifier;

impl EthernetTcpClassifier {
    pub const fn new() -> Self {
        Self
    }

    fn parse(data: &[u8]) -> Option<PacketInfo> {
        let ethertype = be16(data, 12)?;
        if ethertype != ETHERTYPE_IPV4 {
            return None;
        }

        let ip = data.get(ETH_HDR_LEN..)?;
        let ver_ihl = *ip.first()?;
        if ver_ihl >> 4 != 4 {
            return None;
        }
        let ip_hdr_len = usize::from(ver_ihl & 0x0f) * 4;
        if ip_hdr_len < IPV4_MIN_HDR_LEN || ip.len() < ip_hdr_len {
            return None;
        }
        if *ip.get(9)? != IPPROTO_TCP {
            return None;
        }
        // Total length, not the frame length: short frames carry padding
        let ip_total_len = usize::from(be16(ip, 2)?);
        if ip_total_len < ip_hdr_len || ip_total_len > ip.len() {
            return None;
        }
        let src_ip = be32(ip, 12)?;
        let dst_ip = be32(ip, 16)?;

        let tcp = ip.get(ip_hdr_len..ip_total_len)?;
        if tcp.len() < TCP_MIN_HDR_LEN {
            return None;
        }
        let tcp_hdr_len = usize::from(tcp[12] >> 4) * 4;
        if tcp_hdr_len < TCP_MIN_HDR_LEN || tcp.len() < tcp_hdr_len {
            return None;
        }

        let flow = FlowKey::new(src_ip, dst_ip, be16(tcp, 0)?, be16(tcp, 2)?);
        let ack_number = be32(tcp, 8)?;
        let flags = tcp[13] & TCP_FLAGS_MASK;
        let payload_len = tcp.len() - tcp_hdr_len;

        let kind = if flags == TCP_FLAG_ACK && payload_len == 0 {
            PacketKind::TcpPureAck
        } else {
            PacketKind::TcpData
        };

        Some(PacketInfo { kind, flow, ack_number })
    }
}

impl TransportClassifier for EthernetTcpClassifier {
    fn classify(&self, buf: &PacketBuffer) -> PacketInfo {
        Self::parse(buf.data()).unwrap_or_else(PacketInfo::no_tcp)
    }
}

fn be16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn be32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Build an Ethernet/IPv4/TCP frame for the unit tests
#[cfg(test)]
pub(crate) fn tcp_frame(flow: FlowKey, ack: u32, flags: u8, payload: usize) -> alloc::vec::Vec<u8> {
    let mut frame = alloc::vec![0u8; ETH_HDR_LEN + IPV4_MIN_HDR_LEN + TCP_MIN_HDR_LEN + payload];
    frame[12..14].copy_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
    let ip = &mut frame[ETH_HDR_LEN..];
    ip[0] = 0x45;
    let total = (IPV4_MIN_HDR_LEN + TCP_MIN_HDR_LEN + payload) as u16;
    ip[2..4].copy_from_slice(&total.to_be_bytes());
    ip[9] = IPPROTO_TCP;
    ip[12..16].copy_from_slice(&flow.src_ip.to_be_bytes());
    ip[16..20].copy_from_slice(&flow.dst_ip.to_be_bytes());
    let tcp = &mut ip[IPV4_MIN_HDR_LEN..];
    tcp[0..2].copy_from_slice(&flow.src_port.to_be_bytes());
    tcp[2..4].copy_from_slice(&flow.dst_port.to_be_bytes());
    tcp[8..12].copy_from_slice(&ack.to_be_bytes());
    tcp[12] = 5 << 4;
    tcp[13] = flags;
    frame
}
