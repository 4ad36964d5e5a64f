//! Blockhash, 64-bit variant.
//!
//! Auxiliary signal computed by the `blockhash` crate on the card-cropped
//! image. Its length is fixed at 64 bits regardless of the canonical grid.

use blockhash::{blockhash64, Blockhash64};
use image::{DynamicImage, GenericImageView};

use super::{HashAlgorithm, HashEncoder};
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::grid::CanonicalGrid;
use crate::normalize::{card_crop, Normalizer};

/// Blockhash output size in bits.
pub const BLOCKHASH_BITS: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockHasher {
    normalizer: Normalizer,
}

impl BlockHasher {
    pub fn new(grid: CanonicalGrid) -> Self {
        Self {
            normalizer: Normalizer::for_grid(grid),
        }
    }
}

impl HashEncoder for BlockHasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Blockhash64
    }

    fn bit_len(&self) -> usize {
        BLOCKHASH_BITS
    }

    fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    fn encode_image(&self, image: &DynamicImage) -> Result<Fingerprint> {
        let (width, height) = image.dimensions();
        let crop = card_crop(width, height, self.normalizer.aspect_ratio());
        let card = image.crop_imm(crop.x, crop.y, crop.width, crop.height);

        let hash: Blockhash64 = blockhash64(&card);
        let bytes: [u8; 8] = hash.into();
        Fingerprint::from_packed(bytes.to_vec(), BLOCKHASH_BITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blockhash_is_64_bits() {
        let image = DynamicImage::new_rgb8(250, 350);
        let fp = BlockHasher::default().encode_image(&image).unwrap();
        assert_eq!(fp.len(), BLOCKHASH_BITS);
    }

    #[test]
    fn test_blockhash_deterministic() {
        let mut image = image::RgbImage::new(250, 350);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x % 256) as u8, (y % 256) as u8, 90]);
        }
        let image = DynamicImage::ImageRgb8(image);
        let hasher = BlockHasher::default();
        assert_eq!(
            hasher.encode_image(&image).unwrap(),
            hasher.encode_image(&image).unwrap()
        );
    }
}
