//! TLS protocol parser.
//!
//! Parses TLS records found at the start of a TCP payload. Handshake
//! records are split into messages, and ClientHello/ServerHello are
//! decoded down to their extensions so the Server Name Indication can be
//! read. Other record types are kept as bare record headers.
//!
//! Detection is content based: a TCP payload is only accepted as TLS when
//! the record header is plausible and the whole record is present.

use std::fmt;

use smallvec::SmallVec;

use super::{Layer, ParseContext, ParseResult, Protocol, TlsHandshakeLayer, TlsRecordLayer};
use crate::error::ProtocolError;

/// TLS record header length: type (1) + version (2) + length (2).
const RECORD_HEADER_LEN: usize = 5;

/// Largest record length accepted (2^14 plus the ciphertext expansion allowance).
const MAX_RECORD_LEN: usize = 16384 + 2048;

/// TLS record types.
pub mod record_type {
    pub const CHANGE_CIPHER_SPEC: u8 = 20;
    pub const ALERT: u8 = 21;
    pub const HANDSHAKE: u8 = 22;
    pub const APPLICATION_DATA: u8 = 23;
    pub const HEARTBEAT: u8 = 24;
}

/// TLS handshake types.
pub mod handshake_type {
    pub const HELLO_REQUEST: u8 = 0;
    pub const CLIENT_HELLO: u8 = 1;
    pub const SERVER_HELLO: u8 = 2;
    pub const NEW_SESSION_TICKET: u8 = 4;
    pub const ENCRYPTED_EXTENSIONS: u8 = 8;
    pub const CERTIFICATE: u8 = 11;
    pub const SERVER_KEY_EXCHANGE: u8 = 12;
    pub const CERTIFICATE_REQUEST: u8 = 13;
    pub const SERVER_HELLO_DONE: u8 = 14;
    pub const CERTIFICATE_VERIFY: u8 = 15;
    pub const CLIENT_KEY_EXCHANGE: u8 = 16;
    pub const FINISHED: u8 = 20;
}

/// TLS extension types.
pub mod extension_type {
    pub const SERVER_NAME: u16 = 0;
    pub const ALPN: u16 = 16;
    pub const SUPPORTED_VERSIONS: u16 = 43;
}

/// Protocol version as carried on the wire (major << 8 | minor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TlsVersion(pub u16);

impl TlsVersion {
    pub fn new(major: u8, minor: u8) -> Self {
        Self(u16::from_be_bytes([major, minor]))
    }

    pub fn major(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn minor(&self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.major(), self.minor()) {
            (3, 0) => write!(f, "SSL 3.0"),
            (3, 1) => write!(f, "TLS 1.0"),
            (3, 2) => write!(f, "TLS 1.1"),
            (3, 3) => write!(f, "TLS 1.2"),
            (3, 4) => write!(f, "TLS 1.3"),
            (major, minor) => write!(f, "Unknown ({major}.{minor})"),
        }
    }
}

/// A handshake extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension<'a> {
    /// server_name (0), first host_name entry.
    ServerName { host_name: &'a str },
    /// application_layer_protocol_negotiation (16).
    Alpn(Vec<&'a str>),
    /// supported_versions (43).
    SupportedVersions(Vec<TlsVersion>),
    /// Anything else, or a known extension that did not parse.
    Unknown { extension_type: u16, data: &'a [u8] },
}

/// ClientHello message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello<'a> {
    pub version: TlsVersion,
    pub random: &'a [u8],
    pub session_id: &'a [u8],
    pub cipher_suites: Vec<u16>,
    pub compression_methods: &'a [u8],
    pub extensions: Vec<Extension<'a>>,
}

impl<'a> ClientHello<'a> {
    /// Host name from the server_name extension.
    pub fn server_name(&self) -> Option<&'a str> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::ServerName { host_name } => Some(*host_name),
            _ => None,
        })
    }
}

/// ServerHello message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello<'a> {
    pub version: TlsVersion,
    pub random: &'a [u8],
    pub session_id: &'a [u8],
    pub cipher_suite: u16,
    pub compression_method: u8,
    pub extensions: Vec<Extension<'a>>,
}

/// One handshake message inside a handshake record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeMessage<'a> {
    ClientHello(ClientHello<'a>),
    ServerHello(ServerHello<'a>),
    Other { handshake_type: u8, body: &'a [u8] },
}

impl HandshakeMessage<'_> {
    /// Handshake type number.
    pub fn handshake_type(&self) -> u8 {
        match self {
            HandshakeMessage::ClientHello(_) => handshake_type::CLIENT_HELLO,
            HandshakeMessage::ServerHello(_) => handshake_type::SERVER_HELLO,
            HandshakeMessage::Other { handshake_type, .. } => *handshake_type,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.handshake_type() {
            handshake_type::HELLO_REQUEST => "HelloRequest",
            handshake_type::CLIENT_HELLO => "ClientHello",
            handshake_type::SERVER_HELLO => "ServerHello",
            handshake_type::NEW_SESSION_TICKET => "NewSessionTicket",
            handshake_type::ENCRYPTED_EXTENSIONS => "EncryptedExtensions",
            handshake_type::CERTIFICATE => "Certificate",
            handshake_type::SERVER_KEY_EXCHANGE => "ServerKeyExchange",
            handshake_type::CERTIFICATE_REQUEST => "CertificateRequest",
            handshake_type::SERVER_HELLO_DONE => "ServerHelloDone",
            handshake_type::CERTIFICATE_VERIFY => "CertificateVerify",
            handshake_type::CLIENT_KEY_EXCHANGE => "ClientKeyExchange",
            handshake_type::FINISHED => "Finished",
            _ => "Unknown",
        }
    }
}

/// TLS protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct TlsProtocol;

impl Protocol for TlsProtocol {
    fn name(&self) -> &'static str {
        "tls"
    }

    fn display_name(&self) -> &'static str {
        "TLS"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        // A record already parsed from this payload: the next one is TLS too
        if context.hint("tls_record").is_some() {
            return Some(100);
        }

        match context.hint("transport") {
            Some(6) => Some(60),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        if data.len() < RECORD_HEADER_LEN {
            return ParseResult::error(
                ProtocolError::PacketTooShort {
                    protocol: "tls",
                    needed: RECORD_HEADER_LEN,
                    have: data.len(),
                },
                data,
            );
        }

        let content_type = data[0];
        if !(record_type::CHANGE_CIPHER_SPEC..=record_type::HEARTBEAT).contains(&content_type) {
            return ParseResult::error(
                ProtocolError::InvalidField {
                    protocol: "tls",
                    field: "content_type",
                    reason: format!("{content_type} is not a TLS record type"),
                },
                data,
            );
        }

        let version = TlsVersion::new(data[1], data[2]);
        if version.major() != 3 || version.minor() > 4 {
            return ParseResult::error(
                ProtocolError::InvalidField {
                    protocol: "tls",
                    field: "version",
                    reason: version.to_string(),
                },
                data,
            );
        }

        let record_len = u16::from_be_bytes([data[3], data[4]]) as usize;
        if record_len > MAX_RECORD_LEN {
            return ParseResult::error(
                ProtocolError::InvalidField {
                    protocol: "tls",
                    field: "length",
                    reason: format!("{record_len} exceeds {MAX_RECORD_LEN}"),
                },
                data,
            );
        }

        let record_end = RECORD_HEADER_LEN + record_len;
        if data.len() < record_end {
            return ParseResult::error(
                ProtocolError::Truncated {
                    protocol: "tls",
                    declared: record_end,
                    available: data.len(),
                },
                data,
            );
        }

        let record_data = &data[RECORD_HEADER_LEN..record_end];
        let layer = if content_type == record_type::HANDSHAKE {
            Layer::TlsHandshake(TlsHandshakeLayer {
                version,
                messages: parse_handshake_messages(record_data),
            })
        } else {
            Layer::TlsRecord(TlsRecordLayer {
                content_type,
                version,
                length: record_len as u16,
            })
        };

        let mut child_hints = SmallVec::new();
        child_hints.push(("tls_record", content_type as u64));

        ParseResult::success(layer, record_end, &data[record_end..], child_hints)
    }
}

/// Split a handshake record into messages.
///
/// A message whose declared length runs past the record ends the walk.
pub fn parse_handshake_messages(data: &[u8]) -> Vec<HandshakeMessage<'_>> {
    let mut messages = Vec::new();
    let mut offset = 0;

    while offset + 4 <= data.len() {
        let msg_type = data[offset];
        // Handshake length (3 bytes)
        let msg_len = ((data[offset + 1] as usize) << 16)
            | ((data[offset + 2] as usize) << 8)
            | (data[offset + 3] as usize);
        offset += 4;

        if offset + msg_len > data.len() {
            break;
        }

        let body = &data[offset..offset + msg_len];
        let parsed = match msg_type {
            handshake_type::CLIENT_HELLO => parse_client_hello(body).map(HandshakeMessage::ClientHello),
            handshake_type::SERVER_HELLO => parse_server_hello(body).map(HandshakeMessage::ServerHello),
            _ => None,
        };
        messages.push(parsed.unwrap_or(HandshakeMessage::Other {
            handshake_type: msg_type,
            body,
        }));

        offset += msg_len;
    }

    messages
}

/// Bounds-checked reader over a message body.
struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(len)?;
        let slice = self.data.get(self.offset..end)?;
        self.offset = end;
        Some(slice)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    /// A vector prefixed by a one-byte length.
    fn vec8(&mut self) -> Option<&'a [u8]> {
        let len = self.u8()? as usize;
        self.take(len)
    }

    /// A vector prefixed by a two-byte length.
    fn vec16(&mut self) -> Option<&'a [u8]> {
        let len = self.u16()? as usize;
        self.take(len)
    }

    fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }
}

/// Parse a ClientHello body.
pub fn parse_client_hello(data: &[u8]) -> Option<ClientHello<'_>> {
    let mut cursor = Cursor::new(data);

    let version = TlsVersion(cursor.u16()?);
    let random = cursor.take(32)?;
    let session_id = cursor.vec8()?;
    let cipher_suites = cursor
        .vec16()?
        .chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
        .collect();
    let compression_methods = cursor.vec8()?;

    // Extensions are optional before TLS 1.2
    let extensions = if cursor.is_empty() {
        Vec::new()
    } else {
        parse_extensions(cursor.vec16()?, true)
    };

    Some(ClientHello {
        version,
        random,
        session_id,
        cipher_suites,
        compression_methods,
        extensions,
    })
}

/// Parse a ServerHello body.
pub fn parse_server_hello(data: &[u8]) -> Option<ServerHello<'_>> {
    let mut cursor = Cursor::new(data);

    let version = TlsVersion(cursor.u16()?);
    let random = cursor.take(32)?;
    let session_id = cursor.vec8()?;
    let cipher_suite = cursor.u16()?;
    let compression_method = cursor.u8()?;

    let extensions = if cursor.is_empty() {
        Vec::new()
    } else {
        parse_extensions(cursor.vec16()?, false)
    };

    Some(ServerHello {
        version,
        random,
        session_id,
        cipher_suite,
        compression_method,
        extensions,
    })
}

/// Parse an extension block.
///
/// `from_client` selects the supported_versions layout (a list in the
/// ClientHello, a single version in the ServerHello).
fn parse_extensions(data: &[u8], from_client: bool) -> Vec<Extension<'_>> {
    let mut extensions = Vec::new();
    let mut offset = 0;

    while offset + 4 <= data.len() {
        let ext_type = u16::from_be_bytes([data[offset], data[offset + 1]]);
        let ext_len = u16::from_be_bytes([data[offset + 2], data[offset + 3]]) as usize;
        offset += 4;

        if offset + ext_len > data.len() {
            break;
        }

        let ext_data = &data[offset..offset + ext_len];
        let parsed = match ext_type {
            extension_type::SERVER_NAME => {
                parse_sni_extension(ext_data).map(|host_name| Extension::ServerName { host_name })
            }
            extension_type::ALPN => parse_alpn_extension(ext_data).map(Extension::Alpn),
            extension_type::SUPPORTED_VERSIONS => {
                parse_supported_versions(ext_data, from_client).map(Extension::SupportedVersions)
            }
            _ => None,
        };
        extensions.push(parsed.unwrap_or(Extension::Unknown {
            extension_type: ext_type,
            data: ext_data,
        }));

        offset += ext_len;
    }

    extensions
}

/// Parse the SNI extension and extract the server name.
fn parse_sni_extension(data: &[u8]) -> Option<&str> {
    // SNI extension format:
    // - Server Name List Length (2 bytes)
    // - Server Name Type (1 byte) - 0 = hostname
    // - Server Name Length (2 bytes)
    // - Server Name (variable)
    let mut list = Cursor::new(Cursor::new(data).vec16()?);

    while !list.is_empty() {
        let name_type = list.u8()?;
        let name = list.vec16()?;

        if name_type == 0 {
            return std::str::from_utf8(name).ok().filter(|host| !host.is_empty());
        }
    }

    None
}

/// Parse the ALPN protocol name list.
fn parse_alpn_extension(data: &[u8]) -> Option<Vec<&str>> {
    let mut list = Cursor::new(Cursor::new(data).vec16()?);
    let mut protocols = Vec::new();

    while !list.is_empty() {
        protocols.push(std::str::from_utf8(list.vec8()?).ok()?);
    }

    Some(protocols)
}

fn parse_supported_versions(data: &[u8], from_client: bool) -> Option<Vec<TlsVersion>> {
    let mut cursor = Cursor::new(data);

    if from_client {
        let list = cursor.vec8()?;
        Some(
            list.chunks_exact(2)
                .map(|chunk| TlsVersion(u16::from_be_bytes([chunk[0], chunk[1]])))
                .collect(),
        )
    } else {
        Some(vec![TlsVersion(cursor.u16()?)])
    }
}
