//! Average hash (aHash).
//!
//! Auxiliary signal: each cell of the canonical `W x H` grid becomes 1 when
//! it is strictly brighter than the grid mean.

use image::DynamicImage;

use super::{HashAlgorithm, HashEncoder};
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::grid::{CanonicalGrid, PixelGrid};
use crate::normalize::Normalizer;

#[derive(Debug, Clone, Copy)]
pub struct AverageHasher {
    grid: CanonicalGrid,
    normalizer: Normalizer,
}

impl Default for AverageHasher {
    fn default() -> Self {
        Self::new(CanonicalGrid::default())
    }
}

impl AverageHasher {
    pub fn new(grid: CanonicalGrid) -> Self {
        Self {
            grid,
            normalizer: Normalizer::for_grid(grid),
        }
    }

    /// Hash a pre-normalized pixel grid of any size.
    pub fn encode_grid(&self, pixels: &PixelGrid) -> Fingerprint {
        let raw = pixels.as_raw();
        if raw.is_empty() {
            return Fingerprint::from_bits(std::iter::empty());
        }

        let sum: u64 = raw.iter().map(|&v| u64::from(v)).sum();
        let count = raw.len() as u64;

        // v > sum / count, kept in integers
        Fingerprint::from_bits(raw.iter().map(|&v| u64::from(v) * count > sum))
    }
}

impl HashEncoder for AverageHasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Average
    }

    fn bit_len(&self) -> usize {
        self.grid.bit_len()
    }

    fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    fn encode_image(&self, image: &DynamicImage) -> Result<Fingerprint> {
        let pixels = self
            .normalizer
            .normalize_image(image, self.grid.width, self.grid.height);
        Ok(self.encode_grid(&pixels))
    }
}
