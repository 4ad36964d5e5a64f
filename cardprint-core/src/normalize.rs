//! Image normalization.
//!
//! Turns arbitrary raster bytes into a grayscale [`PixelGrid`] at a fixed size:
//!
//! 1. Validate the magic-byte signature (before any decode attempt)
//! 2. Decode and reject images below the minimum usable resolution
//! 3. Center-crop to the card aspect ratio
//! 4. Resize with Lanczos3 resampling
//! 5. Convert to single-channel intensities
//!
//! The resampling filter materially affects fingerprint stability. Swapping it
//! for a cheaper filter requires re-validating the similarity thresholds.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::{debug, instrument};

use crate::error::{CardprintError, Result};
use crate::grid::{CanonicalGrid, PixelGrid, CARD_ASPECT_RATIO, DEFAULT_HASH_WIDTH};

/// Raster formats accepted for hashing.
pub const SUPPORTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Resampling filter used for every resize in the hashing pipeline.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// A rectangular region of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Compute the centered crop of a `src_width x src_height` image that matches `aspect_ratio`.
///
/// Images wider than the ratio lose columns, all others lose rows. Margins
/// are split evenly, with the odd pixel (if any) going to the right/bottom.
pub fn card_crop(src_width: u32, src_height: u32, aspect_ratio: f64) -> CropRegion {
    let src_ratio = f64::from(src_width) / f64::from(src_height);

    if src_ratio > aspect_ratio {
        let width = ((f64::from(src_height) * aspect_ratio).round() as u32).clamp(1, src_width);
        CropRegion {
            x: (src_width - width) / 2,
            y: 0,
            width,
            height: src_height,
        }
    } else {
        let height = ((f64::from(src_width) / aspect_ratio).round() as u32).clamp(1, src_height);
        CropRegion {
            x: 0,
            y: (src_height - height) / 2,
            width: src_width,
            height,
        }
    }
}

/// Normalizer configuration and computation.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    aspect_ratio: f64,
    min_dimension: u32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            aspect_ratio: CARD_ASPECT_RATIO,
            min_dimension: DEFAULT_HASH_WIDTH,
        }
    }
}

impl Normalizer {
    /// Normalizer for card images whose sources must be at least `grid.width` on both sides.
    pub fn for_grid(grid: CanonicalGrid) -> Self {
        Self {
            aspect_ratio: CARD_ASPECT_RATIO,
            min_dimension: grid.width,
        }
    }

    /// Override the crop aspect ratio (width / height).
    pub fn with_aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Override the minimum accepted source dimension.
    pub fn with_min_dimension(mut self, min_dimension: u32) -> Self {
        self.min_dimension = min_dimension;
        self
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn min_dimension(&self) -> u32 {
        self.min_dimension
    }

    /// Identify the raster format from its magic bytes.
    pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
        let format = image::guess_format(data)
            .map_err(|_| CardprintError::UnsupportedFormat("unrecognized signature".into()))?;

        if SUPPORTED_FORMATS.contains(&format) {
            Ok(format)
        } else {
            Err(CardprintError::UnsupportedFormat(format!("{format:?}")))
        }
    }

    /// Check if the provided bytes carry a supported image signature.
    pub fn is_supported_format(data: &[u8]) -> bool {
        Self::detect_format(data).is_ok()
    }

    /// Validate and decode raw image bytes.
    pub fn decode(&self, data: &[u8]) -> Result<DynamicImage> {
        let format = Self::detect_format(data)?;
        let image = image::load_from_memory_with_format(data, format)?;

        let (width, height) = image.dimensions();
        if width < self.min_dimension || height < self.min_dimension {
            return Err(CardprintError::ImageTooSmall {
                width,
                height,
                min: self.min_dimension,
            });
        }

        debug!(?format, width, height, "Decoded image");
        Ok(image)
    }

    /// Crop, resize and grayscale an already decoded image.
    pub fn normalize_image(&self, image: &DynamicImage, width: u32, height: u32) -> PixelGrid {
        let (src_width, src_height) = image.dimensions();
        let crop = card_crop(src_width, src_height, self.aspect_ratio);

        let luma = image
            .crop_imm(crop.x, crop.y, crop.width, crop.height)
            .resize_exact(width, height, RESAMPLE_FILTER)
            .to_luma8();

        PixelGrid::from_luma(luma)
    }

    /// Normalize raw image bytes to a `width x height` grayscale grid.
    #[instrument(level = "debug", skip_all, fields(bytes = data.len(), width, height))]
    pub fn normalize_to(&self, data: &[u8], width: u32, height: u32) -> Result<PixelGrid> {
        let image = self.decode(data)?;
        Ok(self.normalize_image(&image, width, height))
    }

    /// Normalize raw image bytes to the canonical grid.
    pub fn normalize(&self, data: &[u8], grid: CanonicalGrid) -> Result<PixelGrid> {
        self.normalize_to(data, grid.width, grid.height)
    }
}
