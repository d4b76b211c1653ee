//! Parse context and result types.

use smallvec::SmallVec;

use super::ethernet::ethertype;
use super::Layer;
use crate::error::ProtocolError;
use crate::pcap::{LinkType, RawPacket};

/// Hint entry for child protocol detection: (hint_name, value).
pub type HintEntry = (&'static str, u64);

/// Context passed through the parsing chain.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Framing at the start of the packet.
    pub link_type: LinkType,

    /// Parent protocol that identified this protocol.
    pub parent_protocol: Option<&'static str>,

    /// Protocol-specific hints (e.g., ethertype, IP protocol number).
    pub hints: SmallVec<[HintEntry; 4]>,

    /// Offset into the original packet where this protocol's data starts.
    pub offset: usize,
}

impl ParseContext {
    /// Create a new parse context for a packet with the given link type.
    pub fn new(link_type: LinkType) -> Self {
        Self {
            link_type,
            parent_protocol: None,
            hints: SmallVec::new(),
            offset: 0,
        }
    }

    /// Create the root context for a packet.
    ///
    /// Raw link types carry no framing, so the network layer is selected
    /// here: by the version nibble for [`LinkType::Raw`], by the fixed
    /// family for [`LinkType::Ipv4`] and [`LinkType::Ipv6`].
    pub fn for_packet(packet: &RawPacket<'_>) -> Self {
        let mut context = Self::new(packet.link_type);

        let root_ethertype = match packet.link_type {
            LinkType::Ethernet => None,
            LinkType::Ipv4 => Some(ethertype::IPV4),
            LinkType::Ipv6 => Some(ethertype::IPV6),
            LinkType::Raw => match packet.data().first().map(|b| b >> 4) {
                Some(4) => Some(ethertype::IPV4),
                Some(6) => Some(ethertype::IPV6),
                _ => None,
            },
        };
        if let Some(et) = root_ethertype {
            context.insert_hint("ethertype", et as u64);
        }

        context
    }

    /// Get a hint value by key (linear search, but N is small).
    #[inline]
    pub fn hint(&self, key: &str) -> Option<u64> {
        self.hints.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Insert a hint value (appends, may create duplicates).
    #[inline]
    pub fn insert_hint(&mut self, key: &'static str, value: u64) {
        self.hints.push((key, value));
    }

    /// Check if we're at the start of the packet (no parent protocol).
    pub fn is_root(&self) -> bool {
        self.parent_protocol.is_none()
    }
}

/// Result of parsing a protocol layer.
///
/// The lifetime `'data` ties the decoded layer and the remaining bytes to
/// the packet buffer, so nothing is copied out of it.
#[derive(Debug, Clone)]
pub struct ParseResult<'data> {
    /// The decoded layer, `None` when the parser rejected its input.
    pub layer: Option<Layer<'data>>,

    /// Bytes occupied by this layer's own header.
    pub header_len: usize,

    /// Remaining unparsed bytes (payload for next layer).
    ///
    /// Not necessarily the tail of the input: IPv4 and UDP cut the payload
    /// to their declared lengths.
    pub remaining: &'data [u8],

    /// Hints for child protocol identification. Typically 2-4 entries.
    pub child_hints: SmallVec<[HintEntry; 4]>,

    /// Why the parser rejected its input.
    pub error: Option<ProtocolError>,
}

impl<'data> ParseResult<'data> {
    /// Create a successful parse result.
    pub fn success(
        layer: Layer<'data>,
        header_len: usize,
        remaining: &'data [u8],
        child_hints: SmallVec<[HintEntry; 4]>,
    ) -> Self {
        Self {
            layer: Some(layer),
            header_len,
            remaining,
            child_hints,
            error: None,
        }
    }

    /// Create an error parse result.
    pub fn error(error: ProtocolError, remaining: &'data [u8]) -> Self {
        Self {
            layer: None,
            header_len: 0,
            remaining,
            child_hints: SmallVec::new(),
            error: Some(error),
        }
    }

    /// Get a child hint value by name.
    pub fn hint(&self, name: &str) -> Option<u64> {
        self.child_hints
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
    }

    /// Check if parsing was successful.
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.layer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Layer, UdpLayer};

    #[test]
    fn test_context_hint_access() {
        let mut ctx = ParseContext::new(LinkType::Raw);
        ctx.insert_hint("ip_protocol", 6);
        ctx.insert_hint("dst_port", 80);

        assert_eq!(ctx.hint("ip_protocol"), Some(6));
        assert_eq!(ctx.hint("dst_port"), Some(80));
        assert_eq!(ctx.hint("nonexistent"), None);
    }

    #[test]
    fn test_root_context_from_version_nibble() {
        let v4 = [0x45u8, 0x00];
        let ctx = ParseContext::for_packet(&RawPacket::new(0, 2, LinkType::Raw, &v4));
        assert_eq!(ctx.hint("ethertype"), Some(0x0800));
        assert!(ctx.is_root());

        let v6 = [0x60u8, 0x00];
        let ctx = ParseContext::for_packet(&RawPacket::new(0, 2, LinkType::Raw, &v6));
        assert_eq!(ctx.hint("ethertype"), Some(0x86DD));

        let garbage = [0x12u8, 0x34];
        let ctx = ParseContext::for_packet(&RawPacket::new(0, 2, LinkType::Raw, &garbage));
        assert_eq!(ctx.hint("ethertype"), None);

        let ctx = ParseContext::for_packet(&RawPacket::new(0, 0, LinkType::Raw, &[]));
        assert!(ctx.hints.is_empty());
    }

    #[test]
    fn test_root_context_fixed_family() {
        // The fixed family wins over the version nibble
        let data = [0x45u8];
        let ctx = ParseContext::for_packet(&RawPacket::new(0, 1, LinkType::Ipv6, &data));
        assert_eq!(ctx.hint("ethertype"), Some(0x86DD));

        let ctx = ParseContext::for_packet(&RawPacket::new(0, 1, LinkType::Ethernet, &data));
        assert_eq!(ctx.hint("ethertype"), None);
    }

    #[test]
    fn test_hint_count_stays_inline() {
        let mut ctx = ParseContext::new(LinkType::Raw);
        ctx.insert_hint("transport", 6);
        ctx.insert_hint("src_port", 12345);
        ctx.insert_hint("dst_port", 443);

        assert!(!ctx.hints.spilled());
    }

    #[test]
    fn test_parse_result_success() {
        let layer = Layer::Udp(UdpLayer {
            src_port: 5353,
            dst_port: 53,
            length: 8,
            checksum: 0,
        });
        let mut hints = SmallVec::new();
        hints.push(("transport", 17u64));

        let result = ParseResult::success(layer, 8, &[], hints);

        assert!(result.is_ok());
        assert_eq!(result.header_len, 8);
        assert_eq!(result.hint("transport"), Some(17));
    }

    #[test]
    fn test_parse_result_error() {
        let error = ProtocolError::PacketTooShort {
            protocol: "udp",
            needed: 8,
            have: 3,
        };
        let result = ParseResult::error(error.clone(), &[1, 2, 3]);

        assert!(!result.is_ok());
        assert!(result.layer.is_none());
        assert_eq!(result.error, Some(error));
        assert_eq!(result.remaining, &[1, 2, 3]);
    }
}
