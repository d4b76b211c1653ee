//! pktmeta CLI entry point.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pktmeta::cli::{packet_row, Args, OutputFormatter, PacketRow};
use pktmeta::error::PcapError;
use pktmeta::pcap::{LinkType, PcapReader, RawPacket};
use pktmeta::protocol::{default_registry, Protocol, ProtocolRegistry};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();

    // Handle info-only commands
    if args.is_info_only() {
        list_protocols();
        return Ok(());
    }

    let registry = default_registry();
    let limit = args.count.unwrap_or(usize::MAX);

    let rows = match &args.file {
        Some(path) => read_capture(&registry, path, limit, args.layers)?,
        None => {
            let link_type = LinkType::from(args.link_type);
            args.hex
                .iter()
                .take(limit)
                .enumerate()
                .map(|(i, hex)| {
                    let packet = RawPacket::new(0, hex.0.len() as u32, link_type, &hex.0);
                    packet_row(&registry, i as u64 + 1, &packet, args.layers)
                })
                .collect()
        }
    };

    let formatter = OutputFormatter::new(args.format);
    let mut stdout = io::stdout().lock();
    formatter
        .write(&rows, &mut stdout)
        .context("Failed to write output")?;
    stdout.flush().context("Failed to write output")?;

    Ok(())
}

/// Decode up to `limit` packets of a capture file.
fn read_capture(
    registry: &ProtocolRegistry,
    path: &Path,
    limit: usize,
    with_layers: bool,
) -> Result<Vec<PacketRow>> {
    let reader = PcapReader::open(path)
        .with_context(|| format!("Failed to open PCAP file: {}", path.display()))?;

    let mut rows = Vec::new();
    for captured in reader.take(limit) {
        let captured = captured
            .with_context(|| format!("Failed to read PCAP file: {}", path.display()))?;

        match captured.as_raw() {
            Some(packet) => {
                rows.push(packet_row(registry, captured.frame_number, &packet, with_layers));
            }
            None => {
                let reason = PcapError::UnsupportedLinkType {
                    link_type: captured.link_type,
                };
                tracing::warn!(frame = captured.frame_number, "{reason}, skipping packet");
            }
        }
    }

    tracing::info!(packets = rows.len(), file = %path.display(), "capture decoded");
    Ok(rows)
}

fn list_protocols() {
    let registry = default_registry();

    println!("Registered Protocol Parsers ({}):", registry.len());
    println!("{:-<50}", "");

    for parser in registry.all_parsers() {
        println!("  {} ({})", parser.display_name(), parser.name());

        let children = parser.child_protocols();
        if !children.is_empty() {
            println!("    -> Can identify: {}", children.join(", "));
        }
    }
}
