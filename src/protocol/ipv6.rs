//! IPv6 protocol parser with extension header support.

use etherparse::Ipv6HeaderSlice;
use smallvec::SmallVec;

use super::ethernet::ethertype;
use super::{Ipv6Layer, Layer, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;

/// Fixed IPv6 header length.
const HEADER_LEN: usize = 40;

/// IPv6 Next Header values for extension headers.
pub mod next_header {
    pub const HOP_BY_HOP: u8 = 0;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const ROUTING: u8 = 43;
    pub const FRAGMENT: u8 = 44;
    pub const AH: u8 = 51;
    pub const NO_NEXT_HEADER: u8 = 59;
    pub const DESTINATION: u8 = 60;
    pub const MOBILITY: u8 = 135;
}

/// Check if a next header value is an extension header.
fn is_extension_header(nh: u8) -> bool {
    matches!(
        nh,
        next_header::HOP_BY_HOP
            | next_header::ROUTING
            | next_header::FRAGMENT
            | next_header::DESTINATION
            | next_header::AH
            | next_header::MOBILITY
    )
}

/// IPv6 protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Protocol;

impl Protocol for Ipv6Protocol {
    fn name(&self) -> &'static str {
        "ipv6"
    }

    fn display_name(&self) -> &'static str {
        "IPv6"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == ethertype::IPV6 as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        if data.len() < HEADER_LEN {
            return ParseResult::error(
                ProtocolError::PacketTooShort {
                    protocol: "ipv6",
                    needed: HEADER_LEN,
                    have: data.len(),
                },
                data,
            );
        }

        match Ipv6HeaderSlice::from_slice(data) {
            Ok(ipv6) => {
                let payload_len = ipv6.payload_length();
                // A zero payload length means a jumbogram; use what is there
                let payload_end = if payload_len == 0 {
                    data.len()
                } else {
                    (HEADER_LEN + payload_len as usize).min(data.len())
                };
                let payload = &data[HEADER_LEN..payload_end];

                let first_next_header = ipv6.next_header().0;
                let walk = walk_extension_headers(first_next_header, payload);

                let mut child_hints = SmallVec::new();
                let later_fragment = matches!(walk.fragment_offset, Some(offset) if offset != 0);
                if !later_fragment && !is_extension_header(walk.upper_protocol) {
                    child_hints.push(("ip_protocol", walk.upper_protocol as u64));
                }
                child_hints.push(("ip_version", 6));

                let header_len = HEADER_LEN + walk.consumed;
                let layer = Layer::Ipv6(Ipv6Layer {
                    src: ipv6.source_addr(),
                    dst: ipv6.destination_addr(),
                    next_header: first_next_header,
                    upper_protocol: walk.upper_protocol,
                    hop_limit: ipv6.hop_limit(),
                    payload_len,
                    flow_label: ipv6.flow_label().value(),
                    extension_headers: walk.headers,
                    fragment_offset: walk.fragment_offset,
                });
                ParseResult::success(layer, header_len, &payload[walk.consumed..], child_hints)
            }
            Err(e) => ParseResult::error(
                ProtocolError::InvalidField {
                    protocol: "ipv6",
                    field: "header",
                    reason: e.to_string(),
                },
                data,
            ),
        }
    }

    fn child_protocols(&self) -> &[&'static str] {
        &["tcp", "udp"]
    }
}

/// Outcome of walking the extension header chain.
#[derive(Debug, Default)]
struct ExtensionWalk {
    /// Protocol following the last complete extension header.
    upper_protocol: u8,
    /// Bytes taken by the extension headers.
    consumed: usize,
    headers: SmallVec<[u8; 4]>,
    fragment_offset: Option<u16>,
}

/// Follow extension headers until an upper-layer protocol is reached.
///
/// A header that runs past the payload ends the walk; `upper_protocol` is
/// then still an extension header type and nothing is chained after it.
fn walk_extension_headers(first_nh: u8, data: &[u8]) -> ExtensionWalk {
    let mut walk = ExtensionWalk {
        upper_protocol: first_nh,
        ..Default::default()
    };

    while is_extension_header(walk.upper_protocol) && walk.consumed < data.len() {
        let rest = &data[walk.consumed..];
        let parsed = match walk.upper_protocol {
            next_header::FRAGMENT => parse_fragment_header(rest).map(|(nh, len, offset)| {
                walk.fragment_offset = Some(offset);
                (nh, len)
            }),
            next_header::AH => parse_ah_header(rest),
            // Hop-by-hop, routing, destination options and mobility share a layout
            _ => parse_generic_ext_header(rest),
        };

        match parsed {
            Some((next_nh, consumed)) => {
                walk.headers.push(walk.upper_protocol);
                walk.upper_protocol = next_nh;
                walk.consumed += consumed;
            }
            None => break,
        }
    }

    walk
}

/// Parse a generic extension header (Hop-by-Hop, Routing, Destination Options, Mobility).
/// Returns (next_header, bytes_consumed) or None if parsing fails.
fn parse_generic_ext_header(data: &[u8]) -> Option<(u8, usize)> {
    if data.len() < 2 {
        return None;
    }

    let next_header = data[0];
    // Length is in units of 8 octets, not including the first 8 octets
    let total_len = (data[1] as usize + 1) * 8;

    if data.len() < total_len {
        return None;
    }

    Some((next_header, total_len))
}

/// Parse a Fragment Header.
/// Returns (next_header, bytes_consumed, fragment_offset) or None if parsing fails.
fn parse_fragment_header(data: &[u8]) -> Option<(u8, usize, u16)> {
    // Fragment header is exactly 8 bytes
    if data.len() < 8 {
        return None;
    }

    let next_header = data[0];
    let frag_offset = u16::from_be_bytes([data[2], data[3]]) >> 3;

    Some((next_header, 8, frag_offset))
}

/// Parse an Authentication Header.
/// Returns (next_header, bytes_consumed) or None if parsing fails.
fn parse_ah_header(data: &[u8]) -> Option<(u8, usize)> {
    if data.len() < 8 {
        return None;
    }

    let next_header = data[0];
    // AH length = (payload_len + 2) * 4 bytes
    let total_len = (data[1] as usize + 2) * 4;

    if data.len() < total_len {
        return None;
    }

    Some((next_header, total_len))
}
