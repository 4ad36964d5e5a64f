//! Fingerprint set construction.
//!
//! Composes the orientation renderer with a [`HashEncoder`] to produce one
//! fingerprint per orientation of a reference image, and a single as-is
//! fingerprint for a query photo.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{CardprintError, Result};
use crate::fingerprint::Fingerprint;
use crate::grid::CanonicalGrid;
use crate::hash::{DifferenceHasher, HashEncoder};
use crate::orientation::{render_orientation, Orientation};

/// Up to four fingerprints, one per orientation.
///
/// An absent slot is a legal state distinct from any computed fingerprint
/// (legacy data, partial ingestion).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirrored: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upside_down: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirrored_upside_down: Option<Fingerprint>,
}

impl FingerprintSet {
    pub fn get(&self, orientation: Orientation) -> Option<&Fingerprint> {
        match orientation {
            Orientation::Normal => self.normal.as_ref(),
            Orientation::Mirrored => self.mirrored.as_ref(),
            Orientation::UpsideDown => self.upside_down.as_ref(),
            Orientation::MirroredUpsideDown => self.mirrored_upside_down.as_ref(),
        }
    }

    pub fn insert(&mut self, orientation: Orientation, fingerprint: Fingerprint) {
        let slot = match orientation {
            Orientation::Normal => &mut self.normal,
            Orientation::Mirrored => &mut self.mirrored,
            Orientation::UpsideDown => &mut self.upside_down,
            Orientation::MirroredUpsideDown => &mut self.mirrored_upside_down,
        };
        *slot = Some(fingerprint);
    }

    /// Builder-style insert.
    pub fn with(mut self, orientation: Orientation, fingerprint: Fingerprint) -> Self {
        self.insert(orientation, fingerprint);
        self
    }

    /// Present fingerprints in canonical orientation order.
    pub fn iter(&self) -> impl Iterator<Item = (Orientation, &Fingerprint)> {
        Orientation::ALL
            .into_iter()
            .filter_map(|o| self.get(o).map(|fp| (o, fp)))
    }

    /// Orientations without a fingerprint.
    pub fn missing(&self) -> Vec<Orientation> {
        Orientation::ALL
            .into_iter()
            .filter(|o| self.get(*o).is_none())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complete(&self) -> bool {
        self.len() == Orientation::ALL.len()
    }
}

/// Result of hashing all orientations of one image.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Successfully computed fingerprints.
    pub fingerprints: FingerprintSet,
    /// Orientations that failed, with the reason.
    pub failed: Vec<(Orientation, CardprintError)>,
}

impl BuildOutcome {
    /// Some but not all orientations were computed.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn failed_orientations(&self) -> Vec<Orientation> {
        self.failed.iter().map(|(o, _)| *o).collect()
    }
}

/// Builds fingerprint sets with a pluggable encoder.
#[derive(Debug, Clone)]
pub struct FingerprintSetBuilder<E = DifferenceHasher> {
    encoder: E,
}

impl FingerprintSetBuilder<DifferenceHasher> {
    /// Difference-hash builder for `grid`.
    pub fn with_grid(grid: CanonicalGrid) -> Self {
        Self::new(DifferenceHasher::new(grid))
    }
}

impl Default for FingerprintSetBuilder<DifferenceHasher> {
    fn default() -> Self {
        Self::with_grid(CanonicalGrid::default())
    }
}

impl<E: HashEncoder> FingerprintSetBuilder<E> {
    pub fn new(encoder: E) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Hash all four orientations of a reference image.
    ///
    /// The source bytes are validated and decoded once; a failure there is
    /// returned as an error. Each orientation is then rendered, re-encoded and
    /// hashed independently. A failing orientation is reported in
    /// [`BuildOutcome::failed`] without discarding the others. If no
    /// orientation succeeds, the first failure is returned as the error.
    #[instrument(level = "debug", skip_all, fields(bytes = image_data.len(), algorithm = %self.encoder.algorithm()))]
    pub fn build(&self, image_data: &[u8]) -> Result<BuildOutcome> {
        let image = self.encoder.normalizer().decode(image_data)?;

        let mut fingerprints = FingerprintSet::default();
        let mut failed = Vec::new();

        for orientation in Orientation::ALL {
            let result = render_orientation(&image, orientation)
                .and_then(|bytes| self.encoder.encode(&bytes));

            match result {
                Ok(fingerprint) => {
                    debug!(%orientation, "Orientation hashed");
                    fingerprints.insert(orientation, fingerprint);
                }
                Err(e) => {
                    warn!(%orientation, error = %e, "Orientation failed");
                    failed.push((orientation, e));
                }
            }
        }

        if fingerprints.is_empty() && !failed.is_empty() {
            return Err(failed.swap_remove(0).1);
        }

        Ok(BuildOutcome {
            fingerprints,
            failed,
        })
    }

    /// Hash a query photo in its photographed orientation only.
    #[instrument(level = "debug", skip_all, fields(bytes = image_data.len()))]
    pub fn build_query(&self, image_data: &[u8]) -> Result<Fingerprint> {
        self.encoder.encode(image_data)
    }

    /// Hash many independent reference images.
    ///
    /// Images are processed in parallel when the `parallel` feature is
    /// enabled. Output order follows input order; a failing image only
    /// affects its own entry.
    pub fn build_batch<K>(&self, items: &[(K, Vec<u8>)]) -> Vec<(K, Result<BuildOutcome>)>
    where
        K: Clone + Send + Sync,
    {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            items
                .par_iter()
                .map(|(key, bytes)| (key.clone(), self.build(bytes)))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            items
                .iter()
                .map(|(key, bytes)| (key.clone(), self.build(bytes)))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn png(image: GrayImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(image)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn builder() -> FingerprintSetBuilder {
        FingerprintSetBuilder::new(DifferenceHasher::default())
    }

    fn fp(bits: &str) -> Fingerprint {
        bits.parse().unwrap()
    }

    #[test]
    fn test_fingerprint_set_slots() {
        let set = FingerprintSet::default()
            .with(Orientation::Normal, fp("01"))
            .with(Orientation::UpsideDown, fp("10"));

        assert_eq!(set.len(), 2);
        assert!(!set.is_complete());
        assert_eq!(
            set.missing(),
            vec![Orientation::Mirrored, Orientation::MirroredUpsideDown]
        );
        let labels: Vec<_> = set.iter().map(|(o, _)| o).collect();
        assert_eq!(labels, vec![Orientation::Normal, Orientation::UpsideDown]);
    }

    #[test]
    fn test_fingerprint_set_json_omits_missing() {
        let set = FingerprintSet::default().with(Orientation::MirroredUpsideDown, fp("1"));
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"mirroredUpsideDown":"1"}"#);
        let restored: FingerprintSet = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, set);
    }

    #[test]
    fn test_build_complete_set() {
        let data = png(GrayImage::from_fn(100, 140, |x, y| Luma([((x * 2 + y) % 256) as u8])));
        let outcome = builder().build(&data).unwrap();

        assert!(!outcome.is_partial());
        assert!(outcome.fingerprints.is_complete());
        for (_, fingerprint) in outcome.fingerprints.iter() {
            assert_eq!(fingerprint.len(), 64 * 90);
        }
    }

    #[test]
    fn test_build_rejects_invalid_source() {
        let err = builder().build(b"nope").unwrap_err();
        assert!(matches!(err, CardprintError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_build_query_matches_normal_orientation() {
        let data = png(GrayImage::from_fn(90, 126, |x, y| Luma([((x * 3) ^ y) as u8])));
        let builder = builder();
        let outcome = builder.build(&data).unwrap();
        let query = builder.build_query(&data).unwrap();
        assert_eq!(outcome.fingerprints.normal.as_ref(), Some(&query));
    }

    /// Difference hasher that rejects renderings by where the bright marker
    /// of `marked_card` ended up.
    struct MarkerRejectingEncoder {
        inner: DifferenceHasher,
        reject_all: bool,
    }

    impl MarkerRejectingEncoder {
        fn marker_corner(image: &DynamicImage) -> &'static str {
            let luma = image.to_luma8();
            let (w, h) = luma.dimensions();
            let corners = [
                ("top-left", 0, 0),
                ("top-right", w - 1, 0),
                ("bottom-right", w - 1, h - 1),
                ("bottom-left", 0, h - 1),
            ];
            corners
                .into_iter()
                .find(|(_, x, y)| luma.get_pixel(*x, *y)[0] > 200)
                .map(|(name, _, _)| name)
                .unwrap_or("none")
        }
    }

    impl HashEncoder for MarkerRejectingEncoder {
        fn algorithm(&self) -> crate::hash::HashAlgorithm {
            self.inner.algorithm()
        }

        fn bit_len(&self) -> usize {
            self.inner.bit_len()
        }

        fn normalizer(&self) -> &crate::normalize::Normalizer {
            self.inner.normalizer()
        }

        fn encode_image(&self, image: &DynamicImage) -> Result<Fingerprint> {
            let corner = Self::marker_corner(image);
            if self.reject_all || corner == "top-left" {
                return Err(CardprintError::Decode(format!("marker at {corner}")));
            }
            self.inner.encode_image(image)
        }
    }

    /// Dark card with a bright block in the top-left corner.
    fn marked_card() -> Vec<u8> {
        png(GrayImage::from_fn(100, 140, |x, y| {
            if x < 20 && y < 20 {
                Luma([250])
            } else {
                Luma([((x + y) % 60) as u8])
            }
        }))
    }

    #[test]
    fn test_build_partial_keeps_other_orientations() {
        let builder = FingerprintSetBuilder::new(MarkerRejectingEncoder {
            inner: DifferenceHasher::default(),
            reject_all: false,
        });
        let outcome = builder.build(&marked_card()).unwrap();

        assert!(outcome.is_partial());
        assert_eq!(outcome.failed_orientations(), vec![Orientation::Normal]);
        assert!(outcome.fingerprints.normal.is_none());
        assert!(outcome.fingerprints.mirrored.is_some());
        assert!(outcome.fingerprints.upside_down.is_some());
        assert!(outcome.fingerprints.mirrored_upside_down.is_some());
        assert_eq!(outcome.fingerprints.missing(), vec![Orientation::Normal]);
    }

    #[test]
    fn test_build_all_orientations_failing_returns_first_error() {
        let builder = FingerprintSetBuilder::new(MarkerRejectingEncoder {
            inner: DifferenceHasher::default(),
            reject_all: true,
        });
        let err = builder.build(&marked_card()).unwrap_err();

        match err {
            CardprintError::Decode(reason) => assert_eq!(reason, "marker at top-left"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_batch_isolates_failures() {
        let good = png(GrayImage::from_pixel(80, 112, Luma([12])));
        let items = vec![
            ("good".to_string(), good),
            ("bad".to_string(), b"not an image".to_vec()),
        ];

        let results = builder().build_batch(&items);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "good");
        assert!(results[0].1.is_ok());
        assert_eq!(results[1].0, "bad");
        assert!(results[1].1.is_err());
    }
}
