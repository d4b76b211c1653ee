//! PCAP file reader.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError, PcapNGReader};

use super::CapturedPacket;
use crate::error::{Error, PcapError as OurPcapError};

/// Buffer size for reading PCAP files (64KB).
const BUFFER_SIZE: usize = 65536;

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const MICROS_PER_SEC: u64 = 1_000_000;

/// Reader for PCAP and PCAPNG files, with optional gzip decompression.
pub struct PcapReader {
    inner: ReaderInner,
    frame_number: u64,
    link_type: u32,
    /// Timestamp ticks per second, from the file or interface header.
    ts_units_per_sec: u64,
    /// Seconds added to every pcapng timestamp (`if_tsoffset`).
    ts_offset_secs: i64,
}

enum ReaderInner {
    Legacy(LegacyPcapReader<BufReader<Box<dyn Read + Send>>>),
    Ng(PcapNGReader<BufReader<Box<dyn Read + Send>>>),
}

impl PcapReader {
    /// Open a capture file for reading.
    ///
    /// Gzipped files are detected by extension or magic bytes.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let is_gzipped = is_gzip_file(path)?;

        let mut magic = [0u8; 4];
        open_stream(path, is_gzipped)?
            .read_exact(&mut magic)
            .map_err(|_| {
                Error::Pcap(OurPcapError::InvalidFormat {
                    reason: "File too short to read magic number".to_string(),
                })
            })?;

        // The magic bytes were consumed; start again from the top.
        let stream = open_stream(path, is_gzipped)?;

        match &magic {
            [0xd4, 0xc3, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0xc3, 0xd4]
            | [0x4d, 0x3c, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0x3c, 0x4d] => Self::open_legacy(stream),
            [0x0a, 0x0d, 0x0d, 0x0a] => Self::open_ng(stream),
            _ => Err(Error::Pcap(OurPcapError::InvalidFormat {
                reason: format!("Unknown magic number: {magic:02x?}"),
            })),
        }
    }

    fn open_legacy(reader: BufReader<Box<dyn Read + Send>>) -> Result<Self, Error> {
        let pcap_reader = LegacyPcapReader::new(BUFFER_SIZE, reader).map_err(|e| {
            Error::Pcap(OurPcapError::InvalidFormat {
                reason: format!("Failed to parse PCAP header: {e}"),
            })
        })?;

        Ok(Self {
            inner: ReaderInner::Legacy(pcap_reader),
            frame_number: 0,
            link_type: 1, // Replaced by the global header
            ts_units_per_sec: MICROS_PER_SEC,
            ts_offset_secs: 0,
        })
    }

    fn open_ng(reader: BufReader<Box<dyn Read + Send>>) -> Result<Self, Error> {
        let pcap_reader = PcapNGReader::new(BUFFER_SIZE, reader).map_err(|e| {
            Error::Pcap(OurPcapError::InvalidFormat {
                reason: format!("Failed to parse PCAPNG header: {e}"),
            })
        })?;

        Ok(Self {
            inner: ReaderInner::Ng(pcap_reader),
            frame_number: 0,
            link_type: 1, // Replaced by the interface description block
            ts_units_per_sec: MICROS_PER_SEC,
            ts_offset_secs: 0,
        })
    }

    /// Link type of the most recent header or interface block.
    pub fn link_type(&self) -> u32 {
        self.link_type
    }

    /// Number of packets returned so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }

    /// Read the next packet.
    pub fn next_packet(&mut self) -> Result<Option<CapturedPacket>, Error> {
        if matches!(self.inner, ReaderInner::Legacy(_)) {
            self.next_legacy_impl()
        } else {
            self.next_ng_impl()
        }
    }

    fn next_legacy_impl(&mut self) -> Result<Option<CapturedPacket>, Error> {
        let ReaderInner::Legacy(reader) = &mut self.inner else {
            unreachable!()
        };
        loop {
            match reader.next() {
                Ok((offset, block)) => match block {
                    PcapBlockOwned::Legacy(packet) => {
                        self.frame_number += 1;
                        let timestamp_us = (packet.ts_sec as i64) * MICROS_PER_SEC as i64
                            + ticks_to_micros(packet.ts_usec as u64, self.ts_units_per_sec);

                        let captured = CapturedPacket {
                            frame_number: self.frame_number,
                            timestamp_us,
                            original_len: packet.origlen,
                            link_type: self.link_type,
                            data: packet.data.to_vec(),
                        };

                        reader.consume(offset);
                        return Ok(Some(captured));
                    }
                    PcapBlockOwned::LegacyHeader(header) => {
                        self.link_type = header.network.0 as u32;
                        // The fraction field holds nanoseconds in nanosecond files
                        self.ts_units_per_sec = if header.is_nanosecond_precision() {
                            1_000_000_000
                        } else {
                            MICROS_PER_SEC
                        };
                        reader.consume(offset);
                    }
                    _ => reader.consume(offset),
                },
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| {
                        Error::Pcap(OurPcapError::InvalidFormat {
                            reason: format!("Refill error: {e}"),
                        })
                    })?;
                }
                Err(e) => {
                    return Err(Error::Pcap(OurPcapError::InvalidFormat {
                        reason: format!("Parse error: {e}"),
                    }))
                }
            }
        }
    }

    fn next_ng_impl(&mut self) -> Result<Option<CapturedPacket>, Error> {
        use pcap_parser::pcapng::Block;

        let ReaderInner::Ng(reader) = &mut self.inner else {
            unreachable!()
        };
        loop {
            match reader.next() {
                Ok((offset, PcapBlockOwned::NG(block))) => match block {
                    Block::InterfaceDescription(idb) => {
                        self.link_type = idb.linktype.0 as u32;
                        self.ts_units_per_sec = idb.ts_resolution().unwrap_or(MICROS_PER_SEC);
                        self.ts_offset_secs = idb.ts_offset();
                        reader.consume(offset);
                    }
                    Block::EnhancedPacket(epb) => {
                        self.frame_number += 1;

                        let ticks = ((epb.ts_high as u64) << 32) | (epb.ts_low as u64);
                        let timestamp_us = ticks_to_micros(ticks, self.ts_units_per_sec)
                            .saturating_add(self.ts_offset_secs.saturating_mul(1_000_000));

                        let captured = CapturedPacket {
                            frame_number: self.frame_number,
                            timestamp_us,
                            original_len: epb.origlen,
                            link_type: self.link_type,
                            data: epb.data[..(epb.caplen as usize).min(epb.data.len())].to_vec(),
                        };

                        reader.consume(offset);
                        return Ok(Some(captured));
                    }
                    Block::SimplePacket(spb) => {
                        self.frame_number += 1;

                        let captured = CapturedPacket {
                            frame_number: self.frame_number,
                            timestamp_us: 0,
                            original_len: spb.origlen,
                            link_type: self.link_type,
                            data: spb.data.to_vec(),
                        };

                        reader.consume(offset);
                        return Ok(Some(captured));
                    }
                    _ => reader.consume(offset),
                },
                Ok((offset, _)) => reader.consume(offset),
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| {
                        Error::Pcap(OurPcapError::InvalidFormat {
                            reason: format!("Refill error: {e}"),
                        })
                    })?;
                }
                Err(e) => {
                    return Err(Error::Pcap(OurPcapError::InvalidFormat {
                        reason: format!("Parse error: {e}"),
                    }))
                }
            }
        }
    }
}

impl Iterator for PcapReader {
    type Item = Result<CapturedPacket, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}

/// Convert timestamp ticks to microseconds.
fn ticks_to_micros(ticks: u64, units_per_sec: u64) -> i64 {
    if units_per_sec == 0 {
        return 0;
    }
    let micros = u128::from(ticks) * u128::from(MICROS_PER_SEC) / u128::from(units_per_sec);
    i64::try_from(micros).unwrap_or(i64::MAX)
}

fn open_stream(path: &Path, is_gzipped: bool) -> Result<BufReader<Box<dyn Read + Send>>, Error> {
    let file = File::open(path).map_err(|_| {
        Error::Pcap(OurPcapError::FileNotFound {
            path: path.display().to_string(),
        })
    })?;

    let reader: Box<dyn Read + Send> = if is_gzipped {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    Ok(BufReader::with_capacity(BUFFER_SIZE, reader))
}

/// Check if a file is gzipped by extension or magic bytes.
fn is_gzip_file(path: &Path) -> Result<bool, Error> {
    if let Some(filename) = path.file_name().and_then(|f| f.to_str()) {
        if filename.to_lowercase().ends_with(".gz") {
            return Ok(true);
        }
    }

    let mut file = File::open(path).map_err(|_| {
        Error::Pcap(OurPcapError::FileNotFound {
            path: path.display().to_string(),
        })
    })?;

    let mut magic = [0u8; 2];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        Err(_) => Ok(false),
    }
}
