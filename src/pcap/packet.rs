//! Raw packet representation.

use std::time::{SystemTime, UNIX_EPOCH};

/// Framing assumed at the start of a packet buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// Raw IP; the version nibble of the first byte selects IPv4 or IPv6.
    Raw,
    /// Raw IPv4 only.
    Ipv4,
    /// Raw IPv6 only.
    Ipv6,
    /// Ethernet II framing.
    Ethernet,
}

/// PCAP link type numbers (tcpdump.org LINKTYPE_* values).
pub mod linktype {
    pub const ETHERNET: u32 = 1;
    /// DLT_RAW on most BSDs.
    pub const DLT_RAW_BSD: u32 = 12;
    /// DLT_RAW on OpenBSD.
    pub const DLT_RAW_OPENBSD: u32 = 14;
    pub const RAW: u32 = 101;
    pub const IPV4: u32 = 228;
    pub const IPV6: u32 = 229;
}

impl LinkType {
    /// Map a capture file link type number, `None` when unsupported.
    pub fn from_pcap(value: u32) -> Option<Self> {
        match value {
            linktype::ETHERNET => Some(LinkType::Ethernet),
            linktype::DLT_RAW_BSD | linktype::DLT_RAW_OPENBSD | linktype::RAW => {
                Some(LinkType::Raw)
            }
            linktype::IPV4 => Some(LinkType::Ipv4),
            linktype::IPV6 => Some(LinkType::Ipv6),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Raw => "raw",
            LinkType::Ipv4 => "ipv4",
            LinkType::Ipv6 => "ipv6",
            LinkType::Ethernet => "ethernet",
        }
    }
}

/// A borrowed view over one captured packet, ready for layered decoding.
///
/// Never owns the bytes: it lives for the duration of one decode call.
#[derive(Debug, Clone, Copy)]
pub struct RawPacket<'a> {
    /// Timestamp in microseconds since epoch.
    pub timestamp_us: i64,

    /// Bytes actually available for decoding.
    pub captured_len: u32,

    /// Length the producer claimed for this packet.
    pub original_len: u32,

    /// Framing at the start of `data`.
    pub link_type: LinkType,

    data: &'a [u8],
}

impl<'a> RawPacket<'a> {
    /// Create a new raw packet view.
    pub fn new(timestamp_us: i64, original_len: u32, link_type: LinkType, data: &'a [u8]) -> Self {
        Self {
            timestamp_us,
            captured_len: data.len() as u32,
            original_len,
            link_type,
            data,
        }
    }

    /// Wrap caller-supplied bytes as a raw IP packet stamped with the current time.
    ///
    /// `length` is the caller's claimed size. The view never extends past the
    /// real bytes: a larger claim is clamped, a smaller claim truncates.
    /// Absent bytes produce an empty packet, which decodes to no layers.
    pub fn ingest(bytes: Option<&'a [u8]>, length: usize) -> Self {
        let timestamp_us = now_us();
        let claimed = u32::try_from(length).unwrap_or(u32::MAX);

        match bytes {
            Some(bytes) => {
                let data = &bytes[..length.min(bytes.len())];
                Self::new(timestamp_us, claimed, LinkType::Raw, data)
            }
            None => {
                tracing::error!(claimed_len = length, "packet is null");
                Self::new(timestamp_us, claimed, LinkType::Raw, &[])
            }
        }
    }

    /// Packet bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Check if the claimed length exceeds the bytes that were available.
    pub fn is_truncated(&self) -> bool {
        self.captured_len < self.original_len
    }

    /// Check if there is nothing to decode.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A packet read from a capture file, owning its bytes.
#[derive(Debug, Clone)]
pub struct CapturedPacket {
    /// Frame number (1-indexed).
    pub frame_number: u64,

    /// Timestamp in microseconds since epoch.
    pub timestamp_us: i64,

    /// Original length on the wire.
    pub original_len: u32,

    /// Link type number from the capture file.
    pub link_type: u32,

    /// Raw packet data.
    pub data: Vec<u8>,
}

impl CapturedPacket {
    /// Borrow as a [`RawPacket`], `None` when the link type is unsupported.
    pub fn as_raw(&self) -> Option<RawPacket<'_>> {
        let link_type = LinkType::from_pcap(self.link_type)?;
        Some(RawPacket::new(
            self.timestamp_us,
            self.original_len,
            link_type,
            &self.data,
        ))
    }
}

fn now_us() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or_default()
}
