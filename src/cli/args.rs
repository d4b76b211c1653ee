//! Command-line argument definitions.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use super::OutputFormat;
use crate::pcap::LinkType;

/// Framing of packets given with `--hex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HexLinkType {
    /// Raw IP, version taken from the first nibble
    Raw,
    /// Raw IPv4
    Ipv4,
    /// Raw IPv6
    Ipv6,
    /// Ethernet II frame
    Ethernet,
}

impl From<HexLinkType> for LinkType {
    fn from(link_type: HexLinkType) -> Self {
        match link_type {
            HexLinkType::Raw => LinkType::Raw,
            HexLinkType::Ipv4 => LinkType::Ipv4,
            HexLinkType::Ipv6 => LinkType::Ipv6,
            HexLinkType::Ethernet => LinkType::Ethernet,
        }
    }
}

/// Packet bytes given on the command line as hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexPacket(pub Vec<u8>);

/// Parse a hex string, ignoring whitespace, `:` separators and a `0x` prefix.
pub fn parse_hex(input: &str) -> Result<HexPacket, String> {
    let digits: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }

    let bytes = (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex byte at offset {}", i / 2))
        })
        .collect::<Result<Vec<u8>, String>>()?;

    Ok(HexPacket(bytes))
}

/// Extract addresses, ports, transport and server name from packets.
#[derive(Parser, Debug)]
#[command(name = "pktmeta")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// PCAP or PCAPNG file to read (optionally gzip-compressed)
    #[arg(value_name = "FILE", required_unless_present_any = ["hex", "list_protocols"])]
    pub file: Option<PathBuf>,

    /// Decode a packet given as hex instead of reading a file (repeatable)
    #[arg(long = "hex", value_name = "BYTES", value_parser = parse_hex, conflicts_with = "file")]
    pub hex: Vec<HexPacket>,

    /// Framing of --hex packets
    #[arg(long = "link-type", value_enum, default_value = "raw")]
    pub link_type: HexLinkType,

    /// Output format for stdout
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Also print the decoded layer stack of each packet
    #[arg(long = "layers")]
    pub layers: bool,

    /// Stop after this many packets
    #[arg(short = 'c', long = "count", value_name = "N")]
    pub count: Option<usize>,

    /// List registered protocol parsers
    #[arg(long = "list-protocols")]
    pub list_protocols: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Check if this is an info-only command (no packets needed).
    pub fn is_info_only(&self) -> bool {
        self.list_protocols
    }
}
