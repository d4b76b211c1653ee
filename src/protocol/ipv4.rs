//! IPv4 protocol parser.

use smallvec::SmallVec;

use etherparse::Ipv4HeaderSlice;

use super::ethernet::ethertype;
use super::{Ipv4Layer, Layer, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;

/// Minimum IPv4 header length (IHL = 5).
const MIN_HEADER_LEN: usize = 20;

/// IPv4 protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Protocol;

impl Protocol for Ipv4Protocol {
    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn display_name(&self) -> &'static str {
        "IPv4"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == ethertype::IPV4 as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        if data.len() < MIN_HEADER_LEN {
            return ParseResult::error(
                ProtocolError::PacketTooShort {
                    protocol: "ipv4",
                    needed: MIN_HEADER_LEN,
                    have: data.len(),
                },
                data,
            );
        }

        match Ipv4HeaderSlice::from_slice(data) {
            Ok(ipv4) => {
                let header_len = ipv4.slice().len();
                let protocol = ipv4.protocol().0;
                let fragment_offset = ipv4.fragments_offset().value();

                if (ipv4.total_len() as usize) < header_len {
                    return ParseResult::error(
                        ProtocolError::InvalidField {
                            protocol: "ipv4",
                            field: "total_length",
                            reason: format!(
                                "{} is smaller than the {header_len}-byte header",
                                ipv4.total_len()
                            ),
                        },
                        data,
                    );
                }

                // Drop link-layer padding; keep what a short capture still holds
                let payload_end = (ipv4.total_len() as usize).min(data.len());
                let payload = &data[header_len..payload_end.max(header_len)];

                let mut child_hints = SmallVec::new();
                if fragment_offset == 0 {
                    child_hints.push(("ip_protocol", protocol as u64));
                }
                child_hints.push(("ip_version", 4));

                let layer = Layer::Ipv4(Ipv4Layer {
                    src: ipv4.source_addr(),
                    dst: ipv4.destination_addr(),
                    protocol,
                    ttl: ipv4.ttl(),
                    total_len: ipv4.total_len(),
                    identification: ipv4.identification(),
                    dont_fragment: ipv4.dont_fragment(),
                    more_fragments: ipv4.more_fragments(),
                    fragment_offset,
                });
                ParseResult::success(layer, header_len, payload, child_hints)
            }
            Err(e) => ParseResult::error(
                ProtocolError::InvalidField {
                    protocol: "ipv4",
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
