//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Turning packets into output rows
//! - Output formatting (table, CSV, JSON)

mod args;
mod output;

pub use args::{parse_hex, Args, HexLinkType, HexPacket};
pub use output::{OutputFormat, OutputFormatter, PacketRow};

use crate::api::PacketSummary;
use crate::pcap::RawPacket;
use crate::protocol::{decode_with, ProtocolRegistry};

/// Decode one packet into an output row.
pub fn packet_row(
    registry: &ProtocolRegistry,
    frame: u64,
    packet: &RawPacket<'_>,
    with_layers: bool,
) -> PacketRow {
    let decoded = decode_with(registry, packet);

    if packet.is_truncated() {
        tracing::debug!(
            frame,
            captured = packet.captured_len,
            original = packet.original_len,
            "packet truncated"
        );
    }

    PacketRow {
        frame,
        summary: PacketSummary::from_decoded(&decoded),
        layers: with_layers.then(|| decoded.protocol_names().join("/")),
    }
}
