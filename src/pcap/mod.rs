//! Packet capture input.
//!
//! This module handles ingesting raw buffers at the boundary and reading
//! PCAP and PCAPNG files into packets for decoding.

mod packet;
mod reader;

pub use packet::{linktype, CapturedPacket, LinkType, RawPacket};
pub use reader::PcapReader;
