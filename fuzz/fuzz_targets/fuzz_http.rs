//! Fuzz target for the HTTP request parser.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pktmeta::api;

fuzz_target!(|data: &[u8]| {
    // Prefix a request line so the method check passes
    let mut payload = b"GET / HTTP/1.1\r\n".to_vec();
    payload.extend_from_slice(data);

    for payload in [data, payload.as_slice()] {
        let mut frame = vec![
            0x45, 0x00, 0x00, 0x00, 0x00, 0x01, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, // IPv4
            0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x02, // 10.0.0.1 -> 10.0.0.2
            0xc3, 0x50, 0x00, 0x50, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, // TCP -> 80
            0x50, 0x18, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00,
        ];
        let total_len = (40 + payload.len()).min(u16::MAX as usize) as u16;
        frame[2..4].copy_from_slice(&total_len.to_be_bytes());
        frame.extend_from_slice(payload);

        let _ = api::summarize(Some(frame.as_slice()), frame.len());
    }
});
