//! Ethernet II protocol parser.

use smallvec::SmallVec;

use etherparse::Ethernet2HeaderSlice;

use super::{EthernetLayer, Layer, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::pcap::LinkType;

/// Ethernet II header length.
const HEADER_LEN: usize = 14;

/// EtherType values the decoder follows.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const IPV6: u16 = 0x86DD;
}

/// Ethernet II protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct EthernetProtocol;

impl Protocol for EthernetProtocol {
    fn name(&self) -> &'static str {
        "ethernet"
    }

    fn display_name(&self) -> &'static str {
        "Ethernet II"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        // Only as the first layer of an Ethernet-framed packet
        if context.is_root() && context.link_type == LinkType::Ethernet {
            Some(100)
        } else {
            None
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        match Ethernet2HeaderSlice::from_slice(data) {
            Ok(eth) => {
                let ethertype = eth.ether_type().0;

                let mut child_hints = SmallVec::new();
                child_hints.push(("ethertype", ethertype as u64));

                let layer = Layer::Ethernet(EthernetLayer {
                    dst_mac: eth.destination(),
                    src_mac: eth.source(),
                    ethertype,
                });
                ParseResult::success(layer, HEADER_LEN, &data[HEADER_LEN..], child_hints)
            }
            Err(_) => ParseResult::error(
                ProtocolError::PacketTooShort {
                    protocol: "ethernet",
                    needed: HEADER_LEN,
                    have: data.len(),
                },
                data,
            ),
        }
    }

    fn child_protocols(&self) -> &[&'static str] {
        &["ipv4", "ipv6"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::EthernetBuilder;

    #[test]
    fn test_parse_ethernet() {
        let frame = EthernetBuilder::new()
            .src_mac([0x00, 0x11, 0x22, 0x33, 0x44, 0x55])
            .ipv6()
            .payload(vec![0x60, 0x00])
            .build();

        let parser = EthernetProtocol;
        let context = ParseContext::new(LinkType::Ethernet);

        let result = parser.parse(&frame, &context);

        assert!(result.is_ok());
        assert_eq!(result.header_len, 14);
        assert_eq!(result.hint("ethertype"), Some(0x86DD));
        assert_eq!(result.remaining, &[0x60, 0x00]);
        match result.layer {
            Some(Layer::Ethernet(eth)) => {
                assert_eq!(eth.src_mac, [0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
                assert_eq!(eth.dst_mac, [0xff; 6]);
            }
            other => panic!("expected ethernet layer, got {other:?}"),
        }
    }

    #[test]
    fn test_can_parse_only_at_root_of_ethernet_link() {
        let parser = EthernetProtocol;

        assert_eq!(parser.can_parse(&ParseContext::new(LinkType::Ethernet)), Some(100));
        assert!(parser.can_parse(&ParseContext::new(LinkType::Raw)).is_none());

        let mut nested = ParseContext::new(LinkType::Ethernet);
        nested.parent_protocol = Some("ethernet");
        assert!(parser.can_parse(&nested).is_none());
    }

    #[test]
    fn test_ethernet_too_short() {
        let short = [0u8; 10];

        let parser = EthernetProtocol;
        let context = ParseContext::new(LinkType::Ethernet);

        let result = parser.parse(&short, &context);

        assert!(!result.is_ok());
        assert_eq!(
            result.error,
            Some(ProtocolError::PacketTooShort {
                protocol: "ethernet",
                needed: 14,
                have: 10,
            })
        );
    }
}
