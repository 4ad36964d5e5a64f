//! Example demonstrating matcher tracing instrumentation.
//!
//! Builds a small synthetic catalog, then matches a mirrored photo of one of
//! its cards with debug-level tracing enabled.
//!
//! Run with: cargo run -p cardprint-core --example match_tracing

use std::io::Cursor;

use cardprint_core::{
    CanonicalGrid, CatalogRecord, Corpus, FingerprintSetBuilder, HashAlgorithm, MatchConfig,
    MatchEngine,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tracing_subscriber::{fmt, EnvFilter};

fn card(seed: u32) -> Vec<u8> {
    let image = GrayImage::from_fn(250, 350, |x, y| {
        let band = (x / (8 + seed)) ^ (y / (12 + seed));
        Luma([((band * 37 + x * seed) % 256) as u8])
    });
    let mut buffer = Cursor::new(Vec::new());
    match DynamicImage::ImageLuma8(image).write_to(&mut buffer, ImageFormat::Png) {
        Ok(()) => buffer.into_inner(),
        Err(e) => panic!("failed to encode synthetic card: {e}"),
    }
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("cardprint_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Cardprint Matching Tracing Demo ===\n");

    let grid = CanonicalGrid::default();
    let builder = FingerprintSetBuilder::with_grid(grid);
    let mut corpus = Corpus::new(grid, HashAlgorithm::Difference);

    for seed in 1..=5u32 {
        match builder.build(&card(seed)) {
            Ok(outcome) => {
                let record = CatalogRecord::new(u64::from(seed)).with_fingerprints(outcome.fingerprints);
                if let Err(e) = corpus.upsert(record) {
                    eprintln!("Failed to store card {seed}: {e}");
                }
            }
            Err(e) => eprintln!("Failed to fingerprint card {seed}: {e}"),
        }
    }

    println!("\nCorpus: {} records on a {} grid\n", corpus.len(), grid);

    // A photo of card 3 taken through a mirror
    let photo = match image::load_from_memory(&card(3)) {
        Ok(image) => image.fliph(),
        Err(e) => {
            eprintln!("Failed to decode photo: {e}");
            return;
        }
    };
    let mut buffer = Cursor::new(Vec::new());
    if let Err(e) = photo.write_to(&mut buffer, ImageFormat::Png) {
        eprintln!("Failed to encode photo: {e}");
        return;
    }

    let engine = match MatchEngine::new(grid, MatchConfig::default()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };

    let outcome = builder
        .build_query(buffer.get_ref())
        .and_then(|query| engine.find_matches(&query, &corpus));

    match outcome {
        Ok(outcome) => {
            println!("\nResults (fallback: {}):", outcome.used_fallback);
            for result in &outcome.results {
                println!(
                    "   #{:<3} {:>6.2}%  distance {:>4}  {}",
                    result.record_id,
                    result.similarity * 100.0,
                    result.hamming_distance,
                    result.matched_orientation
                );
            }
        }
        Err(e) => println!("\nMatch failed: {e}"),
    }
}
