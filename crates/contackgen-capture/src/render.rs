//! Textual packet representation
//!
//! Frames are decoded with `etherparse` and rendered as one header block per
//! decoded layer:
//!
//! ```text
//! [Ethernet Header (14 bytes)]
//!   Destination address: 02:42:ac:11:00:02
//!   Source address: 02:42:ac:11:00:01
//!   Type: 0x0800 (IPv4)
//! [IPv4 Header (20 bytes)]
//!   Version: 4 (IPv4)
//!   IHL: 5 (20 [bytes])
//!   ...
//! ```
//!
//! The feature extractor matches its field patterns against these lines, so
//! label spelling here is part of the extraction contract. IP addresses are
//! written with a leading `/` to keep them apart from MAC addresses.

use crate::source::{Frame, LinkKind};
use etherparse::{LinkSlice, NetSlice, SlicedPacket, TransportSlice};
use std::fmt::Display;

/// Block marker present in every UDP datagram's representation
pub const UDP_MARKER: &str = "[UDP Header";

/// Block marker present in every TCP segment's representation
pub const TCP_MARKER: &str = "[TCP Header";

struct Text(String);

impl Text {
    fn header(&mut self, name: &str, len: usize) {
        self.0.push('[');
        self.0.push_str(name);
        self.0.push_str(" Header (");
        self.0.push_str(&len.to_string());
        self.0.push_str(" bytes)]\n");
    }

    fn field(&mut self, label: &str, value: impl Display) {
        self.0.push_str("  ");
        self.0.push_str(label);
        self.0.push_str(": ");
        self.0.push_str(&value.to_string());
        self.0.push('\n');
    }
}

fn mac(bytes: [u8; 6]) -> String {
    hex_bytes(&bytes)
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn ether_type_name(code: u16) -> &'static str {
    match code {
        0x0800 => "IPv4",
        0x0806 => "ARP",
        0x86dd => "IPv6",
        0x8100 => "IEEE802.1Q VLAN",
        _ => "unknown",
    }
}

fn ip_protocol_name(number: u8) -> &'static str {
    match number {
        1 => "ICMPv4",
        6 => "TCP",
        17 => "UDP",
        58 => "ICMPv6",
        _ => "unknown",
    }
}

/// Render a frame into its textual representation
///
/// Frames that cannot be decoded, or whose link type is not supported,
/// render as an empty string.
#[must_use]
pub fn render(frame: &Frame) -> String {
    let sliced = match frame.link {
        LinkKind::Ethernet => SlicedPacket::from_ethernet(&frame.data).ok(),
        LinkKind::LinuxSll => SlicedPacket::from_linux_sll(&frame.data).ok(),
        LinkKind::RawIp => SlicedPacket::from_ip(&frame.data).ok(),
        LinkKind::Other(_) => None,
    };
    let Some(sliced) = sliced else {
        return String::new();
    };

    let mut out = Text(String::with_capacity(512));

    match &sliced.link {
        Some(LinkSlice::Ethernet2(eth)) => {
            let ether_type = eth.ether_type().0;
            out.header("Ethernet", 14);
            out.field("Destination address", mac(eth.destination()));
            out.field("Source address", mac(eth.source()));
            out.field(
                "Type",
                format!("0x{ether_type:04x} ({})", ether_type_name(ether_type)),
            );
        }
        Some(LinkSlice::LinuxSll(sll)) => {
            // The SLL protocol field carries the ether type for IP traffic.
            let protocol = u16::from(sll.protocol_type());
            out.header("Linux SLL", 16);
            out.field("Packet type", u16::from(sll.packet_type()));
            out.field("Sender address", hex_bytes(sll.sender_address()));
            out.field(
                "Type",
                format!("0x{protocol:04x} ({})", ether_type_name(protocol)),
            );
        }
        _ => {}
    }

    match &sliced.net {
        Some(NetSlice::Ipv4(ipv4)) => {
            let h = ipv4.header();
            let protocol = h.protocol().0;
            let header_len = usize::from(h.ihl()) * 4;
            out.header("IPv4", header_len);
            out.field("Version", format!("{} (IPv4)", h.version()));
            out.field("IHL", format!("{} ({header_len} [bytes])", h.ihl()));
            out.field("Total length", format!("{} [bytes]", h.total_len()));
            out.field("Identification", h.identification());
            out.field(
                "Flags",
                format!(
                    "(Reserved, Don't Fragment, More Fragment) = (false, {}, {})",
                    h.dont_fragment(),
                    h.more_fragments()
                ),
            );
            let offset = h.fragments_offset().value();
            out.field(
                "Fragment offset",
                format!("{offset} ({} [bytes])", u32::from(offset) * 8),
            );
            out.field("TTL", h.ttl());
            out.field(
                "Protocol",
                format!("{protocol} ({})", ip_protocol_name(protocol)),
            );
            out.field("Header checksum", format!("0x{:04x}", h.header_checksum()));
            out.field("Source address", format!("/{}", h.source_addr()));
            out.field("Destination address", format!("/{}", h.destination_addr()));
        }
        Some(NetSlice::Ipv6(ipv6)) => {
            let h = ipv6.header();
            let next = h.next_header().0;
            out.header("IPv6", 40);
            out.field("Version", format!("{} (IPv6)", h.version()));
            out.field("Traffic Class", format!("0x{:02x}", h.traffic_class()));
            out.field("Payload length", format!("{} [bytes]", h.payload_length()));
            out.field("Next Header", format!("{next} ({})", ip_protocol_name(next)));
            out.field("Hop Limit", h.hop_limit());
            out.field("Source address", format!("/{}", h.source_addr()));
            out.field("Destination address", format!("/{}", h.destination_addr()));
        }
        _ => {}
    }

    match &sliced.transport {
        Some(TransportSlice::Udp(udp)) => {
            out.header("UDP", 8);
            out.field("Source port", udp.source_port());
            out.field("Destination port", udp.destination_port());
            out.field("Length", format!("{} [bytes]", udp.length()));
            out.field("Checksum", format!("0x{:04x}", udp.checksum()));
        }
        Some(TransportSlice::Tcp(tcp)) => {
            out.header("TCP", usize::from(tcp.data_offset()) * 4);
            out.field("Source port", tcp.source_port());
            out.field("Destination port", tcp.destination_port());
            out.field("Sequence Number", tcp.sequence_number());
            out.field("Acknowledgment Number", tcp.acknowledgment_number());
            out.field("Window", tcp.window_size());
            out.field("Checksum", format!("0x{:04x}", tcp.checksum()));
        }
        _ => {}
    }

    out.0
}
