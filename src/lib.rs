//! pktmeta - Extract connection metadata from raw packets.
//!
//! Given the bytes of one packet, this library decodes its layer stack
//! (IPv4/IPv6, TCP/UDP, TLS handshake or HTTP request) and reports the
//! addresses, ports, transport protocol and the server name the packet is
//! addressed to, taken from TLS SNI or the HTTP `Host` header.
//!
//! # Example
//!
//! ```
//! let packet: &[u8] = &[
//!     0x45, 0x00, 0x00, 0x1c, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00,
//!     10, 0, 0, 1, // src
//!     10, 0, 0, 2, // dst
//!     0x30, 0x39, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00, // UDP 12345 -> 53
//! ];
//!
//! assert_eq!(pktmeta::api::source_address(Some(packet), packet.len()), "10.0.0.1");
//! assert_eq!(pktmeta::api::destination_port(Some(packet), packet.len()), 53);
//! assert_eq!(pktmeta::api::protocol_label(Some(packet), packet.len()), "UDP");
//! assert_eq!(pktmeta::api::server_name(Some(packet), packet.len()), "");
//! ```

pub mod api;
pub mod cli;
pub mod error;
pub mod extract;
pub mod pcap;
pub mod protocol;

pub use api::PacketSummary;
pub use error::{Error, Result};
pub use extract::{Direction, NameSource, ServerName, Transport};
