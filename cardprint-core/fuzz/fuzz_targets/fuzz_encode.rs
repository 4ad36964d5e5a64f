#![no_main]

//! Fuzz target for image validation and difference hashing
//!
//! Any accepted image must hash to exactly the grid's bit count.
//!
//! Run with: cargo +nightly fuzz run fuzz_encode

use cardprint_core::{CanonicalGrid, DifferenceHasher, HashEncoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let grid = CanonicalGrid::card(8).unwrap_or_default();
    let hasher = DifferenceHasher::new(grid);
    if let Ok(fingerprint) = hasher.encode(data) {
        assert_eq!(fingerprint.len(), grid.bit_len());
    }
});
