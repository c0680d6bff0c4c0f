//! Fuzz target: `RawTagPayload::normalize`
//!
//! Feeds arbitrary text and JSON reports through normalization.  Every
//! accepted UID must be non-empty, bounded and stable under re-parsing.
//!
//! cargo fuzz run fuzz_tag_payload

#![no_main]

use libfuzzer_sys::fuzz_target;
use tagplayer::nfc::{MAX_UID_CHARS, RawTagPayload, TagId};

fn check(payload: RawTagPayload) {
    if let Ok(tag) = payload.normalize() {
        assert!(!tag.as_str().is_empty());
        assert!(tag.as_str().len() <= MAX_UID_CHARS);
        assert_eq!(TagId::parse(tag.as_str()), Ok(tag.clone()));
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    check(RawTagPayload::from(text));
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        check(RawTagPayload::from(value));
    }
});
