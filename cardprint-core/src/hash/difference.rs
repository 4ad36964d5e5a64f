//! Difference hash (dHash).
//!
//! The image is normalized to `(W + 1) x H` so that each of the `W` cells in a
//! row can be compared with its right-hand neighbour:
//!
//! ```text
//! bit(x, y) = 1  if  intensity(x, y) > intensity(x + 1, y)
//! ```
//!
//! Bits are concatenated row-major. A perfectly uniform image therefore hashes
//! to all zeros whatever its brightness, since no comparison is ever strictly
//! greater. That is a known blind spot of the algorithm, not a defect.

use image::DynamicImage;
use tracing::debug;

use super::{HashAlgorithm, HashEncoder};
use crate::error::{CardprintError, Result};
use crate::fingerprint::Fingerprint;
use crate::grid::{CanonicalGrid, PixelGrid};
use crate::normalize::Normalizer;

/// Difference hash encoder for one canonical grid.
#[derive(Debug, Clone, Copy)]
pub struct DifferenceHasher {
    grid: CanonicalGrid,
    normalizer: Normalizer,
}

impl Default for DifferenceHasher {
    fn default() -> Self {
        Self::new(CanonicalGrid::default())
    }
}

impl DifferenceHasher {
    pub fn new(grid: CanonicalGrid) -> Self {
        Self {
            grid,
            normalizer: Normalizer::for_grid(grid),
        }
    }

    /// Replace the normalizer (e.g. to relax the minimum source size).
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn grid(&self) -> CanonicalGrid {
        self.grid
    }

    /// Hash a pre-normalized `(W + 1) x H` pixel grid.
    pub fn encode_grid(&self, pixels: &PixelGrid) -> Result<Fingerprint> {
        let (width, height) = (self.grid.width, self.grid.height);
        if pixels.width() != width + 1 || pixels.height() != height {
            return Err(CardprintError::Decode(format!(
                "difference hash needs a {}x{height} grid, got {}x{}",
                width + 1,
                pixels.width(),
                pixels.height()
            )));
        }

        let fingerprint = Fingerprint::from_bits((0..height).flat_map(|y| {
            pixels
                .row(y)
                .windows(2)
                .map(|pair| pair[0] > pair[1])
        }));

        debug_assert_eq!(fingerprint.len(), self.grid.bit_len());
        Ok(fingerprint)
    }
}

impl HashEncoder for DifferenceHasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Difference
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
            .normalize_image(image, self.grid.width + 1, self.grid.height);
        let fingerprint = self.encode_grid(&pixels)?;
        debug!(
            bits = fingerprint.len(),
            ones = fingerprint.count_ones(),
            "Computed difference hash"
        );
        Ok(fingerprint)
    }
}
