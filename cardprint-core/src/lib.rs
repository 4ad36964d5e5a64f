//! Cardprint Core - Perceptual fingerprinting and matching for trading cards
//!
//! This crate turns card images into fixed-length binary fingerprints and
//! ranks a catalog of reference fingerprints against a photographed query.
//!
//! # Features
//!
//! - Difference hash (dHash) on a card-shaped grid (default 64 x 90 = 5760 bits)
//! - Four fingerprints per reference image (normal, mirrored, upside down,
//!   mirrored upside down) so cards match however they were photographed
//! - Hamming-distance ranking with threshold, fallback and early exit
//! - CBOR and JSON corpus persistence
//! - Parallel batch ingestion (`parallel` feature)
//!
//! # Example
//!
//! ```no_run
//! use cardprint_core::{
//!     CanonicalGrid, CatalogRecord, Corpus, FingerprintSetBuilder, HashAlgorithm, MatchConfig,
//!     MatchEngine,
//! };
//!
//! # fn example() -> cardprint_core::Result<()> {
//! let grid = CanonicalGrid::default();
//! let builder = FingerprintSetBuilder::with_grid(grid);
//!
//! // Index a reference scan under all four orientations
//! let reference = std::fs::read("base1-4.png").unwrap();
//! let outcome = builder.build(&reference)?;
//! let mut corpus = Corpus::new(grid, HashAlgorithm::Difference);
//! corpus.upsert(CatalogRecord::new("4").with_fingerprints(outcome.fingerprints))?;
//!
//! // Match a photo
//! let photo = std::fs::read("photo.jpg").unwrap();
//! let query = builder.build_query(&photo)?;
//! let engine = MatchEngine::new(grid, MatchConfig::default())?;
//! let matches = engine.find_matches(&query, &corpus)?;
//! if let Some(best) = matches.best() {
//!     println!("{} ({:.1}%)", best.record_id, best.similarity * 100.0);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod corpus;
pub mod error;
pub mod fingerprint;
pub mod grid;
pub mod hash;
pub mod matcher;
pub mod normalize;
pub mod orientation;
pub mod record;

// Re-export main types for convenience
pub use builder::{BuildOutcome, FingerprintSet, FingerprintSetBuilder};
pub use config::{EngineConfig, MatchConfig};
pub use corpus::{Corpus, Coverage, CORPUS_FORMAT_VERSION};
pub use error::{CardprintError, Result};
pub use fingerprint::{hamming_distance, similarity_from_distance, Fingerprint};
pub use grid::{CanonicalGrid, PixelGrid, CARD_ASPECT_RATIO, DEFAULT_HASH_WIDTH};
pub use hash::{encoder_for, AverageHasher, DifferenceHasher, HashAlgorithm, HashEncoder};
pub use matcher::{
    CandidateSource, MatchEngine, MatchOutcome, MatchRequest, MatchResponse, MatchResult,
    MatchWarning, ScanStats,
};
pub use normalize::Normalizer;
pub use orientation::{generate_orientations, render_orientation, Orientation};
pub use record::{source_digest, CatalogRecord, RecordId};

#[cfg(feature = "blockhash")]
pub use hash::BlockHasher;
