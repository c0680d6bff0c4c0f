//! Fuzz target: `UidFrameDecoder::push`
//!
//! Drives arbitrary byte sequences from the reader UART into the streaming
//! decoder and asserts that it never panics and never yields an empty or
//! oversized UID, whether the bytes arrive at once or one by one.
//!
//! cargo fuzz run fuzz_uid_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use tagplayer::drivers::uid_frame::UidFrameDecoder;
use tagplayer::nfc::MAX_UID_BYTES;

fuzz_target!(|data: &[u8]| {
    let mut decoder = UidFrameDecoder::new();
    let chunked: Vec<_> = decoder.decode(data).collect();
    for uid in &chunked {
        assert!(!uid.is_empty(), "decoder must not yield an empty UID");
        assert!(uid.len() <= MAX_UID_BYTES, "UID exceeds MAX_UID_BYTES");
    }

    let mut bytewise = UidFrameDecoder::new();
    let single: Vec<_> = data.iter().filter_map(|&b| bytewise.push(b)).collect();
    assert_eq!(chunked, single, "chunking must not change the result");
});
