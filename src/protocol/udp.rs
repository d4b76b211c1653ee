//! UDP protocol parser.

use smallvec::SmallVec;

use etherparse::UdpHeaderSlice;

use super::{Layer, ParseContext, ParseResult, Protocol, UdpLayer};
use crate::error::ProtocolError;

/// IP protocol number for UDP.
pub const IP_PROTO_UDP: u8 = 17;

/// UDP header is always 8 bytes.
const HEADER_LEN: usize = 8;

/// UDP protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct UdpProtocol;

impl Protocol for UdpProtocol {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn display_name(&self) -> &'static str {
        "UDP"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == IP_PROTO_UDP as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        match UdpHeaderSlice::from_slice(data) {
            Ok(udp) => {
                let length = udp.length();

                // Honor the length field only when it is consistent with the header
                let payload_end = if (length as usize) >= HEADER_LEN {
                    (length as usize).min(data.len())
                } else {
                    data.len()
                };

                let mut child_hints = SmallVec::new();
                child_hints.push(("src_port", udp.source_port() as u64));
                child_hints.push(("dst_port", udp.destination_port() as u64));
                child_hints.push(("transport", IP_PROTO_UDP as u64));

                let layer = Layer::Udp(UdpLayer {
                    src_port: udp.source_port(),
                    dst_port: udp.destination_port(),
                    length,
                    checksum: udp.checksum(),
                });
                ParseResult::success(layer, HEADER_LEN, &data[HEADER_LEN..payload_end], child_hints)
            }
            Err(_) => ParseResult::error(
                ProtocolError::PacketTooShort {
                    protocol: "udp",
                    needed: HEADER_LEN,
                    have: data.len(),
                },
                data,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcap::LinkType;
    use crate::protocol::test_utils::UdpBuilder;

    fn udp_context() -> ParseContext {
        let mut context = ParseContext::new(LinkType::Raw);
        context.insert_hint("ip_protocol", 17);
        context
    }

    #[test]
    fn test_parse_udp() {
        let header = [
            0x30, 0x39, // Src port: 12345
            0x00, 0x35, // Dst port: 53
            0x00, 0x0c, // Length: 12
            0x00, 0x00, // Checksum
            0xde, 0xad, 0xbe, 0xef, // Payload
        ];

        let parser = UdpProtocol;
        let result = parser.parse(&header, &udp_context());

        assert!(result.is_ok());
        assert_eq!(result.remaining, &[0xde, 0xad, 0xbe, 0xef]);
        match result.layer {
            Some(Layer::Udp(udp)) => {
                assert_eq!(udp.src_port, 12345);
                assert_eq!(udp.dst_port, 53);
                assert_eq!(udp.length, 12);
            }
            other => panic!("expected udp layer, got {other:?}"),
        }
    }

    #[test]
    fn test_can_parse_udp() {
        let parser = UdpProtocol;

        assert!(parser.can_parse(&ParseContext::new(LinkType::Raw)).is_none());

        let mut tcp = ParseContext::new(LinkType::Raw);
        tcp.insert_hint("ip_protocol", 6);
        assert!(parser.can_parse(&tcp).is_none());

        assert!(parser.can_parse(&udp_context()).is_some());
    }

    #[test]
    fn test_parse_udp_too_short() {
        let short_header = [0x30, 0x39, 0x00];

        let result = UdpProtocol.parse(&short_header, &udp_context());

        assert!(!result.is_ok());
    }

    #[test]
    fn test_udp_child_hints() {
        let datagram = UdpBuilder::new().src_port(5353).dst_port(5353).build();

        let result = UdpProtocol.parse(&datagram, &udp_context());

        assert_eq!(result.hint("src_port"), Some(5353));
        assert_eq!(result.hint("dst_port"), Some(5353));
        assert_eq!(result.hint("transport"), Some(17));
    }

    #[test]
    fn test_payload_bounded_by_length_field() {
        let mut datagram = UdpBuilder::new().payload(vec![1, 2, 3]).build();
        datagram.extend_from_slice(&[0xFF; 5]);

        let result = UdpProtocol.parse(&datagram, &udp_context());

        assert_eq!(result.remaining, &[1, 2, 3]);
    }

    #[test]
    fn test_inconsistent_length_field_ignored() {
        let mut datagram = UdpBuilder::new().payload(vec![1, 2, 3]).build();
        datagram[4] = 0x00;
        datagram[5] = 0x02; // Shorter than the header itself

        let result = UdpProtocol.parse(&datagram, &udp_context());

        assert!(result.is_ok());
        assert_eq!(result.remaining, &[1, 2, 3]);
    }

    #[test]
    fn test_udp_minimal_header() {
        let datagram = UdpBuilder::new().build();

        let result = UdpProtocol.parse(&datagram, &udp_context());

        assert!(result.is_ok());
        assert!(result.remaining.is_empty());
    }
}
