//! Decoded layer types.
//!
//! A [`DecodedPacket`] is an ordered stack of [`Layer`]s, root to leaf.
//! Every variant borrows from the packet buffer it was decoded from.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use smallvec::SmallVec;

use super::tls::{HandshakeMessage, TlsVersion};

/// Maximum number of layers kept for one packet.
pub const MAX_LAYERS: usize = 16;

/// Ethernet II header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetLayer {
    pub dst_mac: [u8; 6],
    pub src_mac: [u8; 6],
    pub ethertype: u16,
}

/// IPv4 header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Layer {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: u8,
    pub ttl: u8,
    pub total_len: u16,
    pub identification: u16,
    pub dont_fragment: bool,
    pub more_fragments: bool,
    /// Fragment offset in 8-byte units.
    pub fragment_offset: u16,
}

impl Ipv4Layer {
    /// Check if this is a non-first fragment (no transport header follows).
    pub fn is_later_fragment(&self) -> bool {
        self.fragment_offset != 0
    }
}

/// IPv6 fixed header plus the outcome of the extension header walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Layer {
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
    /// Next header of the fixed header.
    pub next_header: u8,
    /// Upper-layer protocol after walking extension headers.
    pub upper_protocol: u8,
    pub hop_limit: u8,
    pub payload_len: u16,
    pub flow_label: u32,
    /// Extension header types, in order.
    pub extension_headers: SmallVec<[u8; 4]>,
    /// Fragment offset from a fragment header, if any.
    pub fragment_offset: Option<u16>,
}

impl Ipv6Layer {
    /// Check if this is a non-first fragment (no transport header follows).
    pub fn is_later_fragment(&self) -> bool {
        matches!(self.fragment_offset, Some(offset) if offset != 0)
    }
}

/// TCP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpLayer {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    /// Flag bits, FIN = 0x01 through CWR = 0x80.
    pub flags: u8,
    pub window: u16,
    pub header_len: u8,
}

/// UDP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpLayer {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
}

/// One TLS record carrying handshake messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsHandshakeLayer<'a> {
    pub version: TlsVersion,
    pub messages: Vec<HandshakeMessage<'a>>,
}

impl<'a> TlsHandshakeLayer<'a> {
    /// Host name from the first ClientHello carrying a server_name extension.
    pub fn server_name(&self) -> Option<&'a str> {
        self.messages.iter().find_map(|message| match message {
            HandshakeMessage::ClientHello(hello) => hello.server_name(),
            _ => None,
        })
    }
}

/// One TLS record of a non-handshake content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsRecordLayer {
    pub content_type: u8,
    pub version: TlsVersion,
    pub length: u16,
}

/// HTTP header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpHeader<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

/// HTTP request line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequestLayer<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Minor version of HTTP/1.x, `None` when the request line was cut short.
    pub version: Option<u8>,
    pub headers: Vec<HttpHeader<'a>>,
    /// False when the segment ended before the blank line.
    pub complete: bool,
}

impl<'a> HttpRequestLayer<'a> {
    /// Value of the first header whose name matches, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value)
    }
}

/// A decoded protocol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer<'a> {
    Ethernet(EthernetLayer),
    Ipv4(Ipv4Layer),
    Ipv6(Ipv6Layer),
    Tcp(TcpLayer),
    Udp(UdpLayer),
    TlsHandshake(TlsHandshakeLayer<'a>),
    TlsRecord(TlsRecordLayer),
    HttpRequest(HttpRequestLayer<'a>),
}

impl Layer<'_> {
    /// Short protocol name, matching the parser that produced the layer.
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Ethernet(_) => "ethernet",
            Layer::Ipv4(_) => "ipv4",
            Layer::Ipv6(_) => "ipv6",
            Layer::Tcp(_) => "tcp",
            Layer::Udp(_) => "udp",
            Layer::TlsHandshake(_) | Layer::TlsRecord(_) => "tls",
            Layer::HttpRequest(_) => "http",
        }
    }
}

impl fmt::Display for Layer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Ethernet(eth) => write!(
                f,
                "Ethernet {} -> {} type 0x{:04x}",
                format_mac(&eth.src_mac),
                format_mac(&eth.dst_mac),
                eth.ethertype
            ),
            Layer::Ipv4(ip) => {
                write!(f, "IPv4 {} -> {} proto {} ttl {}", ip.src, ip.dst, ip.protocol, ip.ttl)?;
                if ip.more_fragments || ip.fragment_offset != 0 {
                    write!(f, " frag {}", ip.fragment_offset)?;
                }
                Ok(())
            }
            Layer::Ipv6(ip) => write!(
                f,
                "IPv6 {} -> {} next {} hlim {}",
                ip.src, ip.dst, ip.upper_protocol, ip.hop_limit
            ),
            Layer::Tcp(tcp) => write!(
                f,
                "TCP {} -> {} [{}] seq {} win {}",
                tcp.src_port,
                tcp.dst_port,
                format_tcp_flags(tcp.flags),
                tcp.seq,
                tcp.window
            ),
            Layer::Udp(udp) => write!(f, "UDP {} -> {} len {}", udp.src_port, udp.dst_port, udp.length),
            Layer::TlsHandshake(tls) => {
                write!(f, "TLS {} Handshake", tls.version)?;
                for message in &tls.messages {
                    write!(f, " {}", message.name())?;
                }
                if let Some(sni) = tls.server_name() {
                    write!(f, " sni={sni}")?;
                }
                Ok(())
            }
            Layer::TlsRecord(record) => write!(
                f,
                "TLS {} {} ({} bytes)",
                record.version,
                content_type_name(record.content_type),
                record.length
            ),
            Layer::HttpRequest(http) => {
                write!(f, "HTTP {} {}", http.method, http.path)?;
                if let Some(host) = http.header("Host") {
                    write!(f, " host={host}")?;
                }
                if !http.complete {
                    write!(f, " (partial)")?;
                }
                Ok(())
            }
        }
    }
}

fn format_mac(mac: &[u8; 6]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}

/// Format TCP flags as a string (e.g., "SYN,ACK").
fn format_tcp_flags(flags: u8) -> String {
    const NAMES: [(u8, &str); 8] = [
        (0x01, "FIN"),
        (0x02, "SYN"),
        (0x04, "RST"),
        (0x08, "PSH"),
        (0x10, "ACK"),
        (0x20, "URG"),
        (0x40, "ECE"),
        (0x80, "CWR"),
    ];

    let set: Vec<&str> = NAMES
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    set.join(",")
}

fn content_type_name(content_type: u8) -> &'static str {
    match content_type {
        20 => "ChangeCipherSpec",
        21 => "Alert",
        22 => "Handshake",
        23 => "ApplicationData",
        24 => "Heartbeat",
        _ => "Unknown",
    }
}

/// A layer and where it sits in the packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLayer<'a> {
    pub layer: Layer<'a>,
    /// Byte offset of the layer's header in the packet.
    pub offset: usize,
    /// Length of the layer's own header.
    pub header_len: usize,
}

/// The layer stack of one packet, root to leaf.
///
/// Layers are contiguous, non-overlapping slices of the packet buffer and
/// the stack holds at most one network layer and one transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedPacket<'a> {
    layers: SmallVec<[DecodedLayer<'a>; 4]>,
}

impl<'a> DecodedPacket<'a> {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, layer: DecodedLayer<'a>) {
        self.layers.push(layer);
    }

    /// Iterate over the layers, root first.
    pub fn layers(&self) -> impl Iterator<Item = &Layer<'a>> {
        self.layers.iter().map(|d| &d.layer)
    }

    /// Iterate over the layers with their positions.
    pub fn decoded_layers(&self) -> &[DecodedLayer<'a>] {
        &self.layers
    }

    /// Number of decoded layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check if nothing was decoded.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Short names of the decoded layers, e.g. `["ipv4", "tcp", "tls"]`.
    pub fn protocol_names(&self) -> Vec<&'static str> {
        self.layers().map(Layer::name).collect()
    }
}
