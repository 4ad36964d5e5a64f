#![no_main]

//! Fuzz target for fingerprint parsing
//!
//! Bit strings and hex strings from untrusted persisted data must never
//! panic, and a parsed fingerprint must compare against itself at distance 0.
//!
//! Run with: cargo +nightly fuzz run fuzz_fingerprint_parse

use cardprint_core::Fingerprint;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(fingerprint) = text.parse::<Fingerprint>() {
        assert_eq!(fingerprint.hamming_distance(&fingerprint).ok(), Some(0));
        assert_eq!(fingerprint.to_bit_string(), text);
    }

    let bit_len = data.len() * 4;
    if let Ok(fingerprint) = Fingerprint::from_hex(text, bit_len) {
        assert_eq!(fingerprint.len(), bit_len);
    }
});
