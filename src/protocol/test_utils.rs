//! Packet builders for parser unit tests.
//!
//! Each builder emits the wire bytes of one layer with its payload
//! appended, so stacks are built inside out.

use std::net::{Ipv4Addr, Ipv6Addr};

use super::ethernet::ethertype;
use super::tls::{extension_type, handshake_type, record_type};

/// Ethernet II frame builder.
pub struct EthernetBuilder {
    dst_mac: [u8; 6],
    src_mac: [u8; 6],
    ethertype: u16,
    payload: Vec<u8>,
}

impl EthernetBuilder {
    pub fn new() -> Self {
        Self {
            dst_mac: [0xff; 6],
            src_mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            ethertype: ethertype::IPV4,
            payload: Vec::new(),
        }
    }

    pub fn src_mac(mut self, mac: [u8; 6]) -> Self {
        self.src_mac = mac;
        self
    }

    pub fn ipv6(mut self) -> Self {
        self.ethertype = ethertype::IPV6;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(14 + self.payload.len());
        frame.extend_from_slice(&self.dst_mac);
        frame.extend_from_slice(&self.src_mac);
        frame.extend_from_slice(&self.ethertype.to_be_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }
}

/// IPv4 header builder (no options, checksum left zero).
pub struct Ipv4Builder {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    protocol: u8,
    fragment_offset: u16,
    payload: Vec<u8>,
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self {
            src: Ipv4Addr::new(192, 168, 1, 1),
            dst: Ipv4Addr::new(192, 168, 1, 2),
            protocol: 6,
            fragment_offset: 0,
            payload: Vec::new(),
        }
    }

    pub fn src(mut self, src: Ipv4Addr) -> Self {
        self.src = src;
        self
    }

    pub fn dst(mut self, dst: Ipv4Addr) -> Self {
        self.dst = dst;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn tcp(self) -> Self {
        self.protocol(6)
    }

    pub fn udp(self) -> Self {
        self.protocol(17)
    }

    /// Fragment offset in 8-byte units.
    pub fn fragment_offset(mut self, offset: u16) -> Self {
        self.fragment_offset = offset & 0x1FFF;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_len = (20 + self.payload.len()) as u16;
        let flags_fragment = if self.fragment_offset == 0 {
            0x4000 // DF
        } else {
            self.fragment_offset
        };

        let mut packet = Vec::with_capacity(total_len as usize);
        packet.push(0x45);
        packet.push(0x00);
        packet.extend_from_slice(&total_len.to_be_bytes());
        packet.extend_from_slice(&[0x00, 0x01]); // Identification
        packet.extend_from_slice(&flags_fragment.to_be_bytes());
        packet.push(64); // TTL
        packet.push(self.protocol);
        packet.extend_from_slice(&[0x00, 0x00]); // Checksum
        packet.extend_from_slice(&self.src.octets());
        packet.extend_from_slice(&self.dst.octets());
        packet.extend_from_slice(&self.payload);
        packet
    }
}

/// IPv6 fixed header builder.
pub struct Ipv6Builder {
    src: Ipv6Addr,
    dst: Ipv6Addr,
    next_header: u8,
    payload: Vec<u8>,
}

impl Ipv6Builder {
    pub fn new() -> Self {
        Self {
            src: Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1),
            dst: Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 2),
            next_header: 6,
            payload: Vec::new(),
        }
    }

    pub fn src(mut self, src: Ipv6Addr) -> Self {
        self.src = src;
        self
    }

    pub fn dst(mut self, dst: Ipv6Addr) -> Self {
        self.dst = dst;
        self
    }

    pub fn next_header(mut self, next_header: u8) -> Self {
        self.next_header = next_header;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(40 + self.payload.len());
        packet.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
        packet.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        packet.push(self.next_header);
        packet.push(64); // Hop limit
        packet.extend_from_slice(&self.src.octets());
        packet.extend_from_slice(&self.dst.octets());
        packet.extend_from_slice(&self.payload);
        packet
    }
}

/// TCP segment builder (20-byte header, no options).
pub struct TcpBuilder {
    src_port: u16,
    dst_port: u16,
    flags: u8,
    payload: Vec<u8>,
}

impl TcpBuilder {
    pub fn new() -> Self {
        Self {
            src_port: 49152,
            dst_port: 80,
            flags: 0x10, // ACK
            payload: Vec::new(),
        }
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn syn(mut self) -> Self {
        self.flags = 0x02;
        self
    }

    pub fn psh_ack(mut self) -> Self {
        self.flags = 0x18;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut segment = Vec::with_capacity(20 + self.payload.len());
        segment.extend_from_slice(&self.src_port.to_be_bytes());
        segment.extend_from_slice(&self.dst_port.to_be_bytes());
        segment.extend_from_slice(&1u32.to_be_bytes()); // Seq
        segment.extend_from_slice(&0u32.to_be_bytes()); // Ack
        segment.push(0x50); // Data offset: 5
        segment.push(self.flags);
        segment.extend_from_slice(&65535u16.to_be_bytes()); // Window
        segment.extend_from_slice(&[0x00, 0x00]); // Checksum
        segment.extend_from_slice(&[0x00, 0x00]); // Urgent pointer
        segment.extend_from_slice(&self.payload);
        segment
    }
}

/// UDP datagram builder.
pub struct UdpBuilder {
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
}

impl UdpBuilder {
    pub fn new() -> Self {
        Self {
            src_port: 12345,
            dst_port: 53,
            payload: Vec::new(),
        }
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let length = (8 + self.payload.len()) as u16;
        let mut datagram = Vec::with_capacity(length as usize);
        datagram.extend_from_slice(&self.src_port.to_be_bytes());
        datagram.extend_from_slice(&self.dst_port.to_be_bytes());
        datagram.extend_from_slice(&length.to_be_bytes());
        datagram.extend_from_slice(&[0x00, 0x00]); // Checksum
        datagram.extend_from_slice(&self.payload);
        datagram
    }
}

/// TLS ClientHello record builder.
///
/// Extensions are written in the order SNI, ALPN, supported_versions,
/// then raw extensions as added.
pub struct ClientHelloBuilder {
    server_name: Option<String>,
    alpn: Vec<String>,
    supported_versions: Vec<u16>,
    raw_extensions: Vec<(u16, Vec<u8>)>,
}

impl ClientHelloBuilder {
    pub fn new() -> Self {
        Self {
            server_name: None,
            alpn: Vec::new(),
            supported_versions: Vec::new(),
            raw_extensions: Vec::new(),
        }
    }

    pub fn server_name(mut self, name: &str) -> Self {
        self.server_name = Some(name.to_string());
        self
    }

    pub fn alpn(mut self, protocols: &[&str]) -> Self {
        self.alpn = protocols.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn supported_versions(mut self, versions: &[u16]) -> Self {
        self.supported_versions = versions.to_vec();
        self
    }

    pub fn raw_extension(mut self, extension_type: u16, data: Vec<u8>) -> Self {
        self.raw_extensions.push((extension_type, data));
        self
    }

    fn extensions(&self) -> Vec<u8> {
        let mut extensions = Vec::new();

        if let Some(name) = &self.server_name {
            let mut list = vec![0x00]; // host_name
            list.extend_from_slice(&(name.len() as u16).to_be_bytes());
            list.extend_from_slice(name.as_bytes());
            let mut data = (list.len() as u16).to_be_bytes().to_vec();
            data.extend_from_slice(&list);
            push_extension(&mut extensions, extension_type::SERVER_NAME, &data);
        }

        if !self.alpn.is_empty() {
            let mut list = Vec::new();
            for protocol in &self.alpn {
                list.push(protocol.len() as u8);
                list.extend_from_slice(protocol.as_bytes());
            }
            let mut data = (list.len() as u16).to_be_bytes().to_vec();
            data.extend_from_slice(&list);
            push_extension(&mut extensions, extension_type::ALPN, &data);
        }

        if !self.supported_versions.is_empty() {
            let mut data = vec![(self.supported_versions.len() * 2) as u8];
            for version in &self.supported_versions {
                data.extend_from_slice(&version.to_be_bytes());
            }
            push_extension(&mut extensions, extension_type::SUPPORTED_VERSIONS, &data);
        }

        for (extension_type, data) in &self.raw_extensions {
            push_extension(&mut extensions, *extension_type, data);
        }

        extensions
    }

    /// Build the complete record: record header, handshake header and body.
    pub fn build(self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&[0x03, 0x03]); // Version: TLS 1.2
        body.extend_from_slice(&[0x42; 32]); // Random
        body.push(0x00); // Session ID (0 length)
        let suites: [u16; 3] = [0x1301, 0xC02F, 0xC030];
        body.extend_from_slice(&((suites.len() * 2) as u16).to_be_bytes());
        for suite in suites {
            body.extend_from_slice(&suite.to_be_bytes());
        }
        body.extend_from_slice(&[0x01, 0x00]); // Compression: null

        let extensions = self.extensions();
        body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
        body.extend_from_slice(&extensions);

        let mut record = vec![record_type::HANDSHAKE, 0x03, 0x01];
        record.extend_from_slice(&((body.len() + 4) as u16).to_be_bytes());
        record.push(handshake_type::CLIENT_HELLO);
        record.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        record.extend_from_slice(&body);
        record
    }
}

fn push_extension(out: &mut Vec<u8>, extension_type: u16, data: &[u8]) {
    out.extend_from_slice(&extension_type.to_be_bytes());
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
}

/// Collects formatted `tracing` output for assertions on log events.
#[derive(Clone, Default)]
pub struct LogCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl LogCapture {
    /// Run `f` with a subscriber writing every event at `TRACE` and above
    /// into this capture.
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
