//! Canonical grid geometry and grayscale pixel grids.
//!
//! Every fingerprint in a corpus is computed at one fixed grid size. The grid
//! is derived from the physical card aspect ratio so that normalization never
//! distorts the card artwork.

use serde::{Deserialize, Serialize};

use crate::error::{CardprintError, Result};

/// Physical trading card aspect ratio (width / height), 2.5in x 3.5in.
pub const CARD_ASPECT_RATIO: f64 = 2.5 / 3.5;

/// Default fingerprint grid width in cells.
pub const DEFAULT_HASH_WIDTH: u32 = 64;

/// Fixed `W x H` resolution that fingerprints are computed at.
///
/// Changing either dimension invalidates every fingerprint computed with the
/// previous one, so corpora record the grid they were built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalGrid {
    pub width: u32,
    pub height: u32,
}

impl CanonicalGrid {
    /// Create a grid with explicit dimensions.
    ///
    /// Useful for legacy corpora built with a different height rounding
    /// (e.g. 64 x 89).
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CardprintError::InvalidConfig(format!(
                "grid dimensions must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Derive the grid for a card of the given width: `H = round(W / R)`.
    pub fn card(width: u32) -> Result<Self> {
        let height = (f64::from(width) / CARD_ASPECT_RATIO).round() as u32;
        Self::new(width, height)
    }

    /// Number of bits in a fingerprint computed on this grid.
    pub fn bit_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for CanonicalGrid {
    fn default() -> Self {
        Self {
            width: DEFAULT_HASH_WIDTH,
            height: 90,
        }
    }
}

impl std::fmt::Display for CanonicalGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A row-major grid of grayscale intensities.
///
/// Produced fresh for each hash computation and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelGrid {
    /// Wrap row-major intensities. The buffer must hold exactly `width * height` values.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(CardprintError::Decode(format!(
                "pixel buffer holds {} values, expected {expected} for {width}x{height}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Take ownership of a decoded 8-bit grayscale image.
    pub fn from_luma(image: image::GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Intensity at column `x`, row `y`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the grid.
    pub fn intensity(&self, x: u32, y: u32) -> u8 {
        assert!(x < self.width && y < self.height, "({x}, {y}) outside grid");
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// One row of intensities.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_grid_rounds_height() {
        let grid = CanonicalGrid::card(64).unwrap();
        assert_eq!(grid.width, 64);
        // 64 / (2.5 / 3.5) = 89.6
        assert_eq!(grid.height, 90);
        assert_eq!(grid.bit_len(), 5760);
    }

    #[test]
    fn test_default_grid_matches_card_grid() {
        assert_eq!(
            CanonicalGrid::default(),
            CanonicalGrid::card(DEFAULT_HASH_WIDTH).unwrap()
        );
    }

    #[test]
    fn test_zero_grid_rejected() {
        assert!(CanonicalGrid::new(0, 10).is_err());
        assert!(CanonicalGrid::new(10, 0).is_err());
    }

    #[test]
    fn test_grid_display() {
        assert_eq!(CanonicalGrid::new(8, 11).unwrap().to_string(), "8x11");
    }

    #[test]
    fn test_pixel_grid_layout() {
        let grid = PixelGrid::from_raw(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(grid.intensity(0, 0), 1);
        assert_eq!(grid.intensity(2, 1), 6);
        assert_eq!(grid.row(1), &[4, 5, 6]);
    }

    #[test]
    fn test_pixel_grid_wrong_size() {
        assert!(PixelGrid::from_raw(3, 2, vec![0; 5]).is_err());
    }
}
