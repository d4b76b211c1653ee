//! TCP protocol parser.

use smallvec::SmallVec;

use etherparse::TcpHeaderSlice;

use super::{Layer, ParseContext, ParseResult, Protocol, TcpLayer};
use crate::error::ProtocolError;

/// IP protocol number for TCP.
pub const IP_PROTO_TCP: u8 = 6;

/// Minimum TCP header length (data offset = 5).
const MIN_HEADER_LEN: usize = 20;

/// TCP flags bit positions.
pub mod flags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
    pub const ECE: u8 = 0x40;
    pub const CWR: u8 = 0x80;
}

/// TCP protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct TcpProtocol;

impl Protocol for TcpProtocol {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn display_name(&self) -> &'static str {
        "TCP"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == IP_PROTO_TCP as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        if data.len() < MIN_HEADER_LEN {
            return ParseResult::error(
                ProtocolError::PacketTooShort {
                    protocol: "tcp",
                    needed: MIN_HEADER_LEN,
                    have: data.len(),
                },
                data,
            );
        }

        match TcpHeaderSlice::from_slice(data) {
            Ok(tcp) => {
                let mut tcp_flags = 0u8;
                for (set, bit) in [
                    (tcp.fin(), flags::FIN),
                    (tcp.syn(), flags::SYN),
                    (tcp.rst(), flags::RST),
                    (tcp.psh(), flags::PSH),
                    (tcp.ack(), flags::ACK),
                    (tcp.urg(), flags::URG),
                    (tcp.ece(), flags::ECE),
                    (tcp.cwr(), flags::CWR),
                ] {
                    if set {
                        tcp_flags |= bit;
                    }
                }

                let header_len = tcp.slice().len();

                let mut child_hints = SmallVec::new();
                child_hints.push(("src_port", tcp.source_port() as u64));
                child_hints.push(("dst_port", tcp.destination_port() as u64));
                child_hints.push(("transport", IP_PROTO_TCP as u64));

                let layer = Layer::Tcp(TcpLayer {
                    src_port: tcp.source_port(),
                    dst_port: tcp.destination_port(),
                    seq: tcp.sequence_number(),
                    ack: tcp.acknowledgment_number(),
                    flags: tcp_flags,
                    window: tcp.window_size(),
                    header_len: header_len as u8,
                });
                ParseResult::success(layer, header_len, &data[header_len..], child_hints)
            }
            Err(e) => ParseResult::error(
                ProtocolError::InvalidField {
                    protocol: "tcp",
                    field: "header",
                    reason: e.to_string(),
                },
                data,
            ),
        }
    }

    fn child_protocols(&self) -> &[&'static str] {
        &["tls", "http"]
    }
}
