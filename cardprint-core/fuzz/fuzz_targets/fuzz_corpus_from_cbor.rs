#![no_main]

//! Fuzz target for Corpus::from_cbor()
//!
//! Arbitrary bytes must either load as a validated corpus or fail with an
//! error. A corpus that loads must survive matching against itself.
//!
//! Run with: cargo +nightly fuzz run fuzz_corpus_from_cbor

use cardprint_core::{CandidateSource, Corpus, MatchConfig, MatchEngine};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(corpus) = Corpus::from_cbor(data) else {
        return;
    };
    let Ok(engine) = MatchEngine::new(corpus.fingerprint_grid(), MatchConfig::default()) else {
        return;
    };
    let queries: Vec<_> = corpus
        .candidates(4)
        .filter_map(|r| r.fingerprints.normal.clone())
        .collect();
    for query in queries {
        let _ = engine.find_matches(&query, &corpus);
    }
});
