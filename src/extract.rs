//! Field extraction from a decoded layer stack.
//!
//! Every lookup is best effort: a missing layer or field yields `None`
//! (or [`Transport::Unknown`]) and never an error.

use std::fmt;
use std::net::IpAddr;

use crate::protocol::{DecodedPacket, Layer};

/// Which endpoint of the packet a lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Source,
    Destination,
}

/// Transport protocol found in a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Tcp,
    Udp,
    Unknown,
}

impl Transport {
    /// Label reported across the API boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "TCP",
            Transport::Udp => "UDP",
            Transport::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a server name was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameSource {
    /// TLS ClientHello server_name extension.
    Sni,
    /// HTTP request `Host` header.
    HostHeader,
}

impl NameSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameSource::Sni => "sni",
            NameSource::HostHeader => "host",
        }
    }
}

impl fmt::Display for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server name together with the layer it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerName<'a> {
    pub name: &'a str,
    pub source: NameSource,
}

impl<'a> DecodedPacket<'a> {
    /// Address of the network layer for the given direction.
    ///
    /// IPv4 is preferred over IPv6, though the decoder never yields both.
    pub fn ip_address(&self, direction: Direction) -> Option<IpAddr> {
        let ipv4 = self.layers().find_map(|layer| match layer {
            Layer::Ipv4(ip) => Some(match direction {
                Direction::Source => IpAddr::V4(ip.src),
                Direction::Destination => IpAddr::V4(ip.dst),
            }),
            _ => None,
        });

        ipv4.or_else(|| {
            self.layers().find_map(|layer| match layer {
                Layer::Ipv6(ip) => Some(match direction {
                    Direction::Source => IpAddr::V6(ip.src),
                    Direction::Destination => IpAddr::V6(ip.dst),
                }),
                _ => None,
            })
        })
    }

    /// Port of the transport layer for the given direction.
    ///
    /// `None` means there is no TCP or UDP layer; `Some(0)` is a real
    /// port 0.
    pub fn port(&self, direction: Direction) -> Option<u16> {
        let (src, dst) = self.layers().find_map(|layer| match layer {
            Layer::Tcp(tcp) => Some((tcp.src_port, tcp.dst_port)),
            Layer::Udp(udp) => Some((udp.src_port, udp.dst_port)),
            _ => None,
        })?;

        Some(match direction {
            Direction::Source => src,
            Direction::Destination => dst,
        })
    }

    pub fn transport(&self) -> Transport {
        if self.layers().any(|layer| matches!(layer, Layer::Tcp(_))) {
            Transport::Tcp
        } else if self.layers().any(|layer| matches!(layer, Layer::Udp(_))) {
            Transport::Udp
        } else {
            Transport::Unknown
        }
    }

    /// SNI host name from the first ClientHello in the stack.
    pub fn tls_server_name(&self) -> Option<&'a str> {
        self.layers().find_map(|layer| match layer {
            Layer::TlsHandshake(tls) => tls.server_name(),
            _ => None,
        })
    }

    /// `Host` header of the HTTP request, if any.
    pub fn http_host(&self) -> Option<&'a str> {
        self.layers().find_map(|layer| match layer {
            Layer::HttpRequest(http) => http.header("Host"),
            _ => None,
        })
    }

    /// Server name the packet is addressed to, SNI first.
    pub fn server_name(&self) -> Option<ServerName<'a>> {
        let found = match self.tls_server_name() {
            Some(name) => ServerName {
                name,
                source: NameSource::Sni,
            },
            None => ServerName {
                name: self.http_host()?,
                source: NameSource::HostHeader,
            },
        };

        tracing::debug!(
            server_name = found.name,
            source = %found.source,
            "server name extracted"
        );
        Some(found)
    }
}
