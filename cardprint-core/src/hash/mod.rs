//! Hash encoders.
//!
//! Every encoder turns one rendering of an image into a fixed-length
//! [`Fingerprint`]. The difference hash is the signal the matcher relies on;
//! the others are auxiliary strategies behind the same [`HashEncoder`] seam.
//!
//! # Usage
//!
//! ```no_run
//! use cardprint_core::hash::{DifferenceHasher, HashEncoder};
//!
//! let image_data = std::fs::read("card.jpg").unwrap();
//! let hasher = DifferenceHasher::default();
//! let fingerprint = hasher.encode(&image_data).unwrap();
//! assert_eq!(fingerprint.len(), 64 * 90);
//! ```

mod average;
#[cfg(feature = "blockhash")]
mod block;
mod difference;

pub use average::AverageHasher;
#[cfg(feature = "blockhash")]
pub use block::BlockHasher;
pub use difference::DifferenceHasher;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{CardprintError, Result};
use crate::fingerprint::Fingerprint;
use crate::grid::CanonicalGrid;
use crate::normalize::Normalizer;

/// Perceptual hash algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// Horizontal gradient hash, `W x H` bits. Used for matching.
    #[default]
    Difference,
    /// Mean-threshold hash, `W x H` bits.
    Average,
    /// Blockhash, 64 bits.
    Blockhash64,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Difference => write!(f, "dHash"),
            Self::Average => write!(f, "aHash"),
            Self::Blockhash64 => write!(f, "Blockhash64"),
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = CardprintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "difference" | "dhash" => Ok(Self::Difference),
            "average" | "ahash" => Ok(Self::Average),
            "blockhash" | "blockhash64" => Ok(Self::Blockhash64),
            other => Err(CardprintError::InvalidConfig(format!(
                "unknown hash algorithm: {other}"
            ))),
        }
    }
}

/// Converts image renderings into fingerprints.
///
/// Implementations are pure and must be thread-safe (`Send + Sync`) so batch
/// ingestion can share one encoder across worker threads.
pub trait HashEncoder: Send + Sync {
    /// Which algorithm this encoder implements.
    fn algorithm(&self) -> HashAlgorithm;

    /// Length of every fingerprint this encoder produces.
    fn bit_len(&self) -> usize;

    /// Normalizer used to validate and decode raw bytes.
    fn normalizer(&self) -> &Normalizer;

    /// Compute the fingerprint of an already decoded image.
    fn encode_image(&self, image: &DynamicImage) -> Result<Fingerprint>;

    /// Compute the fingerprint of raw image bytes.
    ///
    /// The magic-byte signature is checked before any decode attempt.
    fn encode(&self, image_data: &[u8]) -> Result<Fingerprint> {
        let image = self.normalizer().decode(image_data)?;
        self.encode_image(&image)
    }
}

/// Create a boxed encoder for `algorithm` on `grid`.
pub fn encoder_for(algorithm: HashAlgorithm, grid: CanonicalGrid) -> Result<Box<dyn HashEncoder>> {
    match algorithm {
        HashAlgorithm::Difference => Ok(Box::new(DifferenceHasher::new(grid))),
        HashAlgorithm::Average => Ok(Box::new(AverageHasher::new(grid))),
        #[cfg(feature = "blockhash")]
        HashAlgorithm::Blockhash64 => Ok(Box::new(BlockHasher::new(grid))),
        #[cfg(not(feature = "blockhash"))]
        HashAlgorithm::Blockhash64 => Err(CardprintError::InvalidConfig(
            "Blockhash64 requires the `blockhash` feature".into(),
        )),
    }
}

impl<E: HashEncoder + ?Sized> HashEncoder for Box<E> {
    fn algorithm(&self) -> HashAlgorithm {
        (**self).algorithm()
    }

    fn bit_len(&self) -> usize {
        (**self).bit_len()
    }

    fn normalizer(&self) -> &Normalizer {
        (**self).normalizer()
    }

    fn encode_image(&self, image: &DynamicImage) -> Result<Fingerprint> {
        (**self).encode_image(image)
    }

    fn encode(&self, image_data: &[u8]) -> Result<Fingerprint> {
        (**self).encode(image_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm_default() {
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Difference);
    }

    #[test]
    fn test_hash_algorithm_parse() {
        assert_eq!("dhash".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Difference);
        assert_eq!("Average".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Average);
        assert_eq!(
            "blockhash".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Blockhash64
        );
        assert!("wavelet".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_encoder_for_reports_bit_len() {
        let grid = CanonicalGrid::default();
        let encoder = encoder_for(HashAlgorithm::Difference, grid).unwrap();
        assert_eq!(encoder.algorithm(), HashAlgorithm::Difference);
        assert_eq!(encoder.bit_len(), grid.bit_len());

        let encoder = encoder_for(HashAlgorithm::Average, grid).unwrap();
        assert_eq!(encoder.bit_len(), grid.bit_len());
    }
}
