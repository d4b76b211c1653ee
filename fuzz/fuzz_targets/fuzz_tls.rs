//! Fuzz target for the TLS record and handshake parser.
//!
//! The input is placed as the payload of an IPv4/TCP packet so the full
//! chain reaches the TLS parser.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pktmeta::api;
use pktmeta::protocol::parse_handshake_messages;

const IPV4_TCP_HEADER: [u8; 40] = [
    // IPv4 header (20 bytes)
    0x45, 0x00, 0x00, 0x00, // version=4, ihl=5, total_len (patched below)
    0x00, 0x01, 0x40, 0x00, // id=1, DF
    0x40, 0x06, 0x00, 0x00, // ttl=64, protocol=TCP(6), checksum=0
    0x0a, 0x00, 0x00, 0x01, // src ip: 10.0.0.1
    0x0a, 0x00, 0x00, 0x02, // dst ip: 10.0.0.2
    // TCP header (20 bytes)
    0xc3, 0x50, // src_port = 50000
    0x01, 0xbb, // dst_port = 443
    0x00, 0x00, 0x00, 0x01, // seq = 1
    0x00, 0x00, 0x00, 0x00, // ack = 0
    0x50, 0x18, // data_offset=5, flags=PSH|ACK
    0xff, 0xff, // window = 65535
    0x00, 0x00, // checksum = 0
    0x00, 0x00, // urgent_ptr = 0
];

fuzz_target!(|data: &[u8]| {
    // Handshake messages straight from the fuzz data
    let _ = parse_handshake_messages(data);

    // Force a plausible record header so most inputs reach the handshake parser
    let mut record = vec![0x16, 0x03, 0x01];
    record.extend_from_slice(&(data.len().min(u16::MAX as usize) as u16).to_be_bytes());
    record.extend_from_slice(data);

    for payload in [data, record.as_slice()] {
        let mut frame = IPV4_TCP_HEADER.to_vec();
        let total_len = (40 + payload.len()).min(u16::MAX as usize) as u16;
        frame[2..4].copy_from_slice(&total_len.to_be_bytes());
        frame.extend_from_slice(payload);

        let _ = api::server_name(Some(frame.as_slice()), frame.len());
    }
});
