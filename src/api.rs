//! Value-returning entry points for callers holding raw packet bytes.
//!
//! Each function takes the bytes and the length the caller claims for
//! them, decodes the packet from scratch and returns a plain value.
//! Nothing here fails: an absent buffer, an undecodable packet or a
//! missing field all produce `""` or `0`.
//!
//! A port of `0` is therefore ambiguous between "no TCP/UDP layer" and a
//! literal port 0. Callers needing the distinction should use
//! [`DecodedPacket::port`](crate::protocol::DecodedPacket::port).

use crate::extract::Direction;
use crate::pcap::RawPacket;
use crate::protocol::{decode, DecodedPacket};

/// All extracted fields of one packet, decoded once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketSummary {
    pub src_addr: String,
    pub dst_addr: String,
    pub src_port: u16,
    pub dst_port: u16,
    /// `"TCP"`, `"UDP"` or `"Unknown"`.
    pub protocol: &'static str,
    pub server_name: String,
    /// `"sni"` or `"host"` when a server name was found, else `""`.
    pub name_source: &'static str,
}

impl PacketSummary {
    /// Marshal the fields of an already decoded packet.
    pub fn from_decoded(decoded: &DecodedPacket<'_>) -> Self {
        let server_name = decoded.server_name();

        Self {
            src_addr: address(decoded, Direction::Source),
            dst_addr: address(decoded, Direction::Destination),
            src_port: decoded.port(Direction::Source).unwrap_or(0),
            dst_port: decoded.port(Direction::Destination).unwrap_or(0),
            protocol: decoded.transport().as_str(),
            server_name: server_name
                .map(|found| found.name.to_string())
                .unwrap_or_default(),
            name_source: server_name
                .map(|found| found.source.as_str())
                .unwrap_or_default(),
        }
    }
}

fn with_packet<T>(
    bytes: Option<&[u8]>,
    length: usize,
    f: impl FnOnce(&DecodedPacket<'_>) -> T,
) -> T {
    let packet = RawPacket::ingest(bytes, length);
    f(&decode(&packet))
}

fn address(decoded: &DecodedPacket<'_>, direction: Direction) -> String {
    decoded
        .ip_address(direction)
        .map(|addr| addr.to_string())
        .unwrap_or_default()
}

/// Source IP address in dotted-decimal or canonical IPv6 form.
pub fn source_address(bytes: Option<&[u8]>, length: usize) -> String {
    with_packet(bytes, length, |decoded| address(decoded, Direction::Source))
}

/// Destination IP address in dotted-decimal or canonical IPv6 form.
pub fn destination_address(bytes: Option<&[u8]>, length: usize) -> String {
    with_packet(bytes, length, |decoded| address(decoded, Direction::Destination))
}

/// TCP or UDP source port, 0 when there is none.
pub fn source_port(bytes: Option<&[u8]>, length: usize) -> u16 {
    with_packet(bytes, length, |decoded| {
        decoded.port(Direction::Source).unwrap_or(0)
    })
}

/// TCP or UDP destination port, 0 when there is none.
pub fn destination_port(bytes: Option<&[u8]>, length: usize) -> u16 {
    with_packet(bytes, length, |decoded| {
        decoded.port(Direction::Destination).unwrap_or(0)
    })
}

/// TLS SNI host name, else the HTTP `Host` header, else `""`.
pub fn server_name(bytes: Option<&[u8]>, length: usize) -> String {
    with_packet(bytes, length, |decoded| {
        decoded
            .server_name()
            .map(|found| found.name.to_string())
            .unwrap_or_default()
    })
}

/// `"TCP"`, `"UDP"` or `"Unknown"`.
pub fn protocol_label(bytes: Option<&[u8]>, length: usize) -> String {
    with_packet(bytes, length, |decoded| decoded.transport().as_str().to_string())
}

/// Decode once and extract every field.
pub fn summarize(bytes: Option<&[u8]>, length: usize) -> PacketSummary {
    with_packet(bytes, length, PacketSummary::from_decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::{ClientHelloBuilder, Ipv4Builder, TcpBuilder, UdpBuilder};

    fn tls_packet(name: &str) -> Vec<u8> {
        let tls = ClientHelloBuilder::new().server_name(name).build();
        let tcp = TcpBuilder::new()
            .src_port(50123)
            .dst_port(443)
            .psh_ack()
            .payload(tls)
            .build();
        Ipv4Builder::new().tcp().payload(tcp).build()
    }

    #[test]
    fn test_boundary_functions() {
        let packet = tls_packet("example.com");
        let bytes = Some(packet.as_slice());
        let len = packet.len();

        assert_eq!(source_address(bytes, len), "192.168.1.1");
        assert_eq!(destination_address(bytes, len), "192.168.1.2");
        assert_eq!(source_port(bytes, len), 50123);
        assert_eq!(destination_port(bytes, len), 443);
        assert_eq!(protocol_label(bytes, len), "TCP");
        assert_eq!(server_name(bytes, len), "example.com");
    }

    #[test]
    fn test_absent_buffer_defaults() {
        assert_eq!(source_address(None, 0), "");
        assert_eq!(destination_address(None, 64), "");
        assert_eq!(source_port(None, 0), 0);
        assert_eq!(destination_port(None, 0), 0);
        assert_eq!(protocol_label(None, 0), "Unknown");
        assert_eq!(server_name(None, 0), "");
        assert_eq!(
            summarize(None, 0),
            PacketSummary {
                protocol: "Unknown",
                ..PacketSummary::default()
            }
        );
    }

    #[test]
    fn test_claimed_length_limits_view() {
        let udp = UdpBuilder::new().src_port(4000).dst_port(53).build();
        let packet = Ipv4Builder::new().udp().payload(udp).build();

        // Only the IP header is claimed
        assert_eq!(source_address(Some(packet.as_slice()), 20), "192.168.1.1");
        assert_eq!(source_port(Some(packet.as_slice()), 20), 0);
        assert_eq!(protocol_label(Some(packet.as_slice()), 20), "Unknown");

        // Overstated length is clamped to the buffer
        assert_eq!(source_port(Some(packet.as_slice()), 4096), 4000);
    }

    #[test]
    fn test_summarize_matches_individual_calls() {
        let packet = tls_packet("summary.example");
        let bytes = Some(packet.as_slice());

        let summary = summarize(bytes, packet.len());

        assert_eq!(summary.src_addr, source_address(bytes, packet.len()));
        assert_eq!(summary.dst_port, destination_port(bytes, packet.len()));
        assert_eq!(summary.protocol, "TCP");
        assert_eq!(summary.server_name, "summary.example");
        assert_eq!(summary.name_source, "sni");
    }
}
