//! Protocol parsing framework.
//!
//! This module provides:
//! - [`Protocol`] trait for implementing parsers
//! - [`ProtocolRegistry`] for managing registered parsers
//! - [`decode`], which turns a [`RawPacket`] into a [`DecodedPacket`]
//!
//! ## Supported Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet II |
//! | Network | IPv4, IPv6 (with extension headers) |
//! | Transport | TCP, UDP |
//! | Application | TLS records (ClientHello / ServerHello), HTTP/1.x requests |
//!
//! ## Example
//!
//! ```rust
//! use pktmeta::pcap::RawPacket;
//! use pktmeta::protocol::decode;
//!
//! let packet_data: &[u8] = &[
//!     0x45, 0x00, 0x00, 0x14, 0x00, 0x01, 0x00, 0x00, 0x40, 0x01, 0x00, 0x00,
//!     10, 0, 0, 1, // src
//!     10, 0, 0, 2, // dst
//! ];
//!
//! let decoded = decode(&RawPacket::ingest(Some(packet_data), packet_data.len()));
//! assert_eq!(decoded.protocol_names(), vec!["ipv4"]);
//! ```

mod context;
mod layer;
mod registry;

// Protocol implementations
mod ethernet;
mod http;
mod ipv4;
mod ipv6;
mod tcp;
mod tls;
mod udp;

// Test utilities (only compiled for tests)
#[cfg(test)]
pub mod test_utils;

pub use context::{HintEntry, ParseContext, ParseResult};
pub use layer::{
    DecodedLayer, DecodedPacket, EthernetLayer, HttpHeader, HttpRequestLayer, Ipv4Layer,
    Ipv6Layer, Layer, TcpLayer, TlsHandshakeLayer, TlsRecordLayer, UdpLayer, MAX_LAYERS,
};
pub use registry::{BuiltinProtocol, Protocol, ProtocolRegistry};

// Re-export protocol implementations
pub use ethernet::EthernetProtocol;
pub use http::HttpProtocol;
pub use ipv4::Ipv4Protocol;
pub use ipv6::Ipv6Protocol;
pub use tcp::TcpProtocol;
pub use tls::TlsProtocol;
pub use udp::UdpProtocol;

// Re-export TLS message types and protocol constants
pub use ethernet::ethertype;
pub use http::MAX_HEADERS as HTTP_MAX_HEADERS;
pub use ipv6::next_header;
pub use tcp::flags as tcp_flags;
pub use tls::{
    extension_type as tls_extension_type, handshake_type as tls_handshake_type,
    parse_client_hello, parse_handshake_messages, parse_server_hello,
    record_type as tls_record_type, ClientHello, Extension, HandshakeMessage, ServerHello,
    TlsVersion,
};

use crate::pcap::RawPacket;

/// Create a registry with all built-in protocol parsers.
pub fn default_registry() -> ProtocolRegistry {
    let mut registry = ProtocolRegistry::new();

    // Layer 2
    registry.register(EthernetProtocol);

    // Layer 3
    registry.register(Ipv4Protocol);
    registry.register(Ipv6Protocol);

    // Layer 4
    registry.register(TcpProtocol);
    registry.register(UdpProtocol);

    // Application layer, TCP payload only
    registry.register(TlsProtocol);
    registry.register(HttpProtocol);

    registry
}

/// Decode a packet with the built-in parsers.
///
/// Never fails: decoding stops at the first byte no parser accepts and the
/// layers decoded so far are returned.
pub fn decode<'a>(packet: &RawPacket<'a>) -> DecodedPacket<'a> {
    decode_with(&default_registry(), packet)
}

/// Decode a packet through all protocol layers with the given registry.
///
/// At each step every parser accepting the context is tried, highest
/// priority first, and the first successful parse is kept. Rejections are
/// traced, not returned.
pub fn decode_with<'a>(registry: &ProtocolRegistry, packet: &RawPacket<'a>) -> DecodedPacket<'a> {
    let mut decoded = DecodedPacket::new();
    let mut context = ParseContext::for_packet(packet);
    let mut remaining = packet.data();

    'layers: while !remaining.is_empty() && decoded.len() < MAX_LAYERS {
        for parser in registry.candidates(&context) {
            let result = parser.parse(remaining, &context);

            let Some(layer) = result.layer else {
                if let Some(error) = &result.error {
                    tracing::trace!(
                        parser = parser.name(),
                        offset = context.offset,
                        %error,
                        "layer rejected"
                    );
                }
                continue;
            };

            decoded.push(DecodedLayer {
                layer,
                offset: context.offset,
                header_len: result.header_len,
            });

            // Update context for next layer
            context.parent_protocol = Some(parser.name());
            context.hints = result.child_hints;
            context.offset += result.header_len;

            if result.header_len == 0 {
                break 'layers;
            }
            remaining = result.remaining;
            continue 'layers;
        }

        // No parser accepted the remaining bytes
        break;
    }

    decoded
}
