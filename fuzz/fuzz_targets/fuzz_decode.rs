//! Fuzz target for the decode chain and the boundary API.
//!
//! Arbitrary bytes must never panic, whatever length is claimed for them.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pktmeta::api;
use pktmeta::pcap::{LinkType, RawPacket};
use pktmeta::protocol::decode;

fuzz_target!(|data: &[u8]| {
    for link_type in [LinkType::Raw, LinkType::Ipv4, LinkType::Ipv6, LinkType::Ethernet] {
        let packet = RawPacket::new(0, data.len() as u32, link_type, data);
        let _ = decode(&packet).server_name();
    }

    // Claimed length shorter and longer than the buffer
    let _ = api::summarize(Some(data), data.len() / 2);
    let _ = api::summarize(Some(data), data.len() + 64);
});
