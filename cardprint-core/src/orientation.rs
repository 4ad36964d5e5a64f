//! Physical card orientations.
//!
//! A reference image is hashed four times, once per orientation. Each
//! rendering is a full-image transform followed by re-encoding, never a
//! permutation of an existing fingerprint's bits: the extra sampling column
//! used by the difference hash does not commute with flips or rotations.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{CardprintError, Result};
use crate::normalize::Normalizer;

/// One of the four physically distinct renderings of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    /// The image as captured.
    Normal,
    /// Horizontal flip.
    Mirrored,
    /// 180 degree rotation.
    UpsideDown,
    /// Horizontal flip and 180 degree rotation.
    MirroredUpsideDown,
}

impl Orientation {
    /// All orientations in canonical order.
    pub const ALL: [Orientation; 4] = [
        Orientation::Normal,
        Orientation::Mirrored,
        Orientation::UpsideDown,
        Orientation::MirroredUpsideDown,
    ];

    /// Stable label used in persisted data and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Mirrored => "mirrored",
            Self::UpsideDown => "upsideDown",
            Self::MirroredUpsideDown => "mirroredUpsideDown",
        }
    }

    /// Apply this orientation to a decoded image.
    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => image.clone(),
            Self::Mirrored => image.fliph(),
            Self::UpsideDown => image.rotate180(),
            Self::MirroredUpsideDown => image.fliph().rotate180(),
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Orientation {
    type Err = CardprintError;

    fn from_str(s: &str) -> Result<Self> {
        Orientation::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CardprintError::InvalidConfig(format!("unknown orientation: {s}")))
    }
}

/// Render one orientation of a decoded image and re-encode it as PNG bytes.
///
/// PNG is lossless, so the rendering adds no artifacts of its own.
pub fn render_orientation(image: &DynamicImage, orientation: Orientation) -> Result<Vec<u8>> {
    let rendered = orientation.apply(image);

    let mut buffer = Cursor::new(Vec::new());
    rendered
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| CardprintError::OrientationRender {
            orientation: orientation.to_string(),
            reason: e.to_string(),
        })?;

    Ok(buffer.into_inner())
}

/// Produce the four orientation renderings of raw image bytes.
///
/// The source is validated and decoded once. Each entry holds independently
/// encoded bytes for that orientation.
#[instrument(level = "debug", skip_all, fields(bytes = image_data.len()))]
pub fn generate_orientations(
    normalizer: &Normalizer,
    image_data: &[u8],
) -> Result<Vec<(Orientation, Vec<u8>)>> {
    let image = normalizer.decode(image_data)?;

    Orientation::ALL
        .into_iter()
        .map(|orientation| {
            let bytes = render_orientation(&image, orientation)?;
            debug!(%orientation, bytes = bytes.len(), "Rendered orientation");
            Ok((orientation, bytes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, GrayImage, Luma};

    fn corner_image() -> DynamicImage {
        let mut img = GrayImage::from_pixel(4, 3, Luma([0]));
        img.put_pixel(0, 0, Luma([255]));
        DynamicImage::ImageLuma8(img)
    }

    fn bright_corner(image: &DynamicImage) -> (u32, u32) {
        let luma = image.to_luma8();
        let (x, y, _) = luma
            .enumerate_pixels()
            .find(|(_, _, p)| p.0[0] == 255)
            .unwrap();
        (x, y)
    }

    #[test]
    fn test_orientation_transforms_move_corner() {
        let img = corner_image();
        assert_eq!(bright_corner(&Orientation::Normal.apply(&img)), (0, 0));
        assert_eq!(bright_corner(&Orientation::Mirrored.apply(&img)), (3, 0));
        assert_eq!(bright_corner(&Orientation::UpsideDown.apply(&img)), (3, 2));
        assert_eq!(
            bright_corner(&Orientation::MirroredUpsideDown.apply(&img)),
            (0, 2)
        );
    }

    #[test]
    fn test_transforms_preserve_dimensions() {
        let img = corner_image();
        for orientation in Orientation::ALL {
            assert_eq!(orientation.apply(&img).dimensions(), (4, 3));
        }
    }

    #[test]
    fn test_label_roundtrip() {
        for orientation in Orientation::ALL {
            assert_eq!(
                orientation.as_str().parse::<Orientation>().unwrap(),
                orientation
            );
        }
        assert!("sideways".parse::<Orientation>().is_err());
    }

    #[test]
    fn test_serde_labels() {
        let json = serde_json::to_string(&Orientation::MirroredUpsideDown).unwrap();
        assert_eq!(json, "\"mirroredUpsideDown\"");
    }

    #[test]
    fn test_generate_orientations_decodes_back() {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(GrayImage::from_pixel(80, 112, Luma([40])))
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();

        let renderings = generate_orientations(&Normalizer::default(), buffer.get_ref()).unwrap();
        assert_eq!(renderings.len(), 4);
        for (orientation, bytes) in &renderings {
            let decoded = image::load_from_memory(bytes).unwrap();
            assert_eq!(decoded.dimensions(), (80, 112), "{orientation}");
        }
    }

    #[test]
    fn test_generate_orientations_rejects_garbage() {
        assert!(generate_orientations(&Normalizer::default(), b"garbage").is_err());
    }
}
