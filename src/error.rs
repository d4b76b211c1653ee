//! Error types for pktmeta.
//!
//! The decoding pipeline itself never returns these across its boundary:
//! [`ProtocolError`] values are produced by individual layer parsers as the
//! reason a layer was rejected, and the decode loop only logs them. The
//! capture-file reader and the CLI are the fallible surfaces.

use thiserror::Error;

/// Main error type for pktmeta operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading a capture file
    #[error("PCAP error: {0}")]
    Pcap(#[from] PcapError),

    /// Error during protocol parsing
    #[error("Protocol parse error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to capture file reading.
#[derive(Error, Debug)]
pub enum PcapError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Invalid PCAP format
    #[error("Invalid PCAP format: {reason}")]
    InvalidFormat { reason: String },

    /// Unsupported link type
    #[error("Unsupported link type: {link_type}")]
    UnsupportedLinkType { link_type: u32 },
}

/// Reasons a layer parser rejects its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet too short for protocol header
    #[error("{protocol}: packet too short (need {needed} bytes, have {have})")]
    PacketTooShort {
        protocol: &'static str,
        needed: usize,
        have: usize,
    },

    /// Invalid header field value
    #[error("{protocol}: invalid {field}: {reason}")]
    InvalidField {
        protocol: &'static str,
        field: &'static str,
        reason: String,
    },

    /// Declared length runs past the available bytes
    #[error("{protocol}: truncated (declared {declared} bytes, have {available})")]
    Truncated {
        protocol: &'static str,
        declared: usize,
        available: usize,
    },
}

impl ProtocolError {
    /// Name of the protocol that rejected the input.
    pub fn protocol(&self) -> &'static str {
        match self {
            ProtocolError::PacketTooShort { protocol, .. }
            | ProtocolError::InvalidField { protocol, .. }
            | ProtocolError::Truncated { protocol, .. } => protocol,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
