//! Similarity matching.
//!
//! Ranks catalog records against a query fingerprint by Hamming distance.
//!
//! # Algorithm
//!
//! For each candidate, in a stable order and bounded by `max_candidates`:
//!
//! 1. Compare the query with every orientation the record holds and keep the
//!    minimum distance (ties go to the earlier orientation)
//! 2. `similarity = 1 - distance / bits`, clamped to `[0, 1]`
//! 3. Stop early once the best distance is confidently excellent and at least
//!    `min_candidates_before_early_exit` candidates have been scanned
//!
//! Results at or above the threshold are returned best first. If none clear
//! it, the best few below-threshold results come back flagged as a fallback.
//!
//! Early exit trades completeness for latency: the scan order carries no
//! relevance signal, so a better match later in the sequence can be missed.

mod source;
mod wire;

pub use source::CandidateSource;
pub use wire::{MatchRequest, MatchResponse};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::MatchConfig;
use crate::error::{CardprintError, Result};
use crate::fingerprint::{similarity_from_distance, Fingerprint};
use crate::grid::CanonicalGrid;
use crate::orientation::Orientation;
use crate::record::{CatalogRecord, RecordId};

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub record_id: RecordId,
    pub similarity: f64,
    pub hamming_distance: u32,
    pub matched_orientation: Orientation,
    pub below_threshold: bool,
}

/// Advisory signals that are not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchWarning {
    /// The candidate set held no usable fingerprints at all.
    #[serde(rename = "no reference data")]
    NoReferenceData,
}

impl std::fmt::Display for MatchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoReferenceData => write!(f, "no reference data"),
        }
    }
}

/// Counters describing one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    /// Candidates visited, inert ones included.
    pub scanned: usize,
    /// Candidates with at least one comparable fingerprint.
    pub compared: usize,
    /// Candidates without any fingerprint.
    pub skipped_inert: usize,
    /// Stored fingerprints skipped because their length differs from the query.
    pub skipped_malformed: usize,
    /// The scan stopped on a confidently excellent match.
    pub early_exit: bool,
}

/// Everything a match request produces.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub results: Vec<MatchResult>,
    pub used_fallback: bool,
    pub warning: Option<MatchWarning>,
    pub stats: ScanStats,
}

impl MatchOutcome {
    /// Best-ranked result, if any.
    pub fn best(&self) -> Option<&MatchResult> {
        self.results.first()
    }
}

/// Stateless matcher for one canonical grid.
///
/// Concurrent requests share nothing; the engine never mutates candidates.
#[derive(Debug, Clone, Copy)]
pub struct MatchEngine {
    grid: CanonicalGrid,
    config: MatchConfig,
}

impl MatchEngine {
    pub fn new(grid: CanonicalGrid, config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { grid, config })
    }

    pub fn grid(&self) -> CanonicalGrid {
        self.grid
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Reject empty or wrongly sized query fingerprints.
    pub fn validate_query(&self, query: &Fingerprint) -> Result<()> {
        if query.is_empty() {
            return Err(CardprintError::QueryFingerprint(
                "query fingerprint is empty".into(),
            ));
        }
        let expected = self.grid.bit_len();
        if query.len() != expected {
            return Err(CardprintError::QueryFingerprint(format!(
                "expected {expected} bits for a {} grid, got {}",
                self.grid,
                query.len()
            )));
        }
        Ok(())
    }

    /// Rank candidates with the configured threshold and result limit.
    pub fn find_matches<S>(&self, query: &Fingerprint, source: &S) -> Result<MatchOutcome>
    where
        S: CandidateSource + ?Sized,
    {
        self.find_matches_with(query, source, self.config.threshold, self.config.max_results)
    }

    /// Rank candidates with an explicit threshold and result limit.
    #[instrument(level = "debug", skip_all, fields(bits = query.len(), threshold, max_results))]
    pub fn find_matches_with<S>(
        &self,
        query: &Fingerprint,
        source: &S,
        threshold: f64,
        max_results: usize,
    ) -> Result<MatchOutcome>
    where
        S: CandidateSource + ?Sized,
    {
        self.validate_query(query)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CardprintError::InvalidConfig(format!(
                "threshold must be within [0, 1], got {threshold}"
            )));
        }
        if max_results == 0 {
            return Err(CardprintError::InvalidConfig(
                "max_results must be at least 1".into(),
            ));
        }

        let bit_len = query.len();
        let excellent_distance = self.config.early_exit_distance_ratio * bit_len as f64;

        let mut stats = ScanStats::default();
        let mut scored: Vec<(RecordId, u32, Orientation)> = Vec::new();
        let mut best_distance: Option<u32> = None;

        for record in source
            .candidates(self.config.max_candidates)
            .take(self.config.max_candidates)
        {
            stats.scanned += 1;

            if let Some((distance, orientation)) = self.score(query, record, &mut stats) {
                stats.compared += 1;
                if best_distance.map_or(true, |best| distance < best) {
                    best_distance = Some(distance);
                }
                scored.push((record.id.clone(), distance, orientation));
            }

            let excellent = best_distance.is_some_and(|d| f64::from(d) < excellent_distance);
            if excellent && stats.scanned >= self.config.min_candidates_before_early_exit {
                debug!(
                    scanned = stats.scanned,
                    best_distance, "Early exit on excellent match"
                );
                stats.early_exit = true;
                break;
            }
        }

        // Lower distance first, then lower record id
        scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let ranked: Vec<MatchResult> = scored
            .into_iter()
            .map(|(record_id, distance, orientation)| {
                let similarity = similarity_from_distance(distance, bit_len);
                MatchResult {
                    record_id,
                    similarity,
                    hamming_distance: distance,
                    matched_orientation: orientation,
                    below_threshold: similarity < threshold,
                }
            })
            .collect();

        let (above, below): (Vec<_>, Vec<_>) =
            ranked.into_iter().partition(|r| !r.below_threshold);

        let (results, used_fallback) = if !above.is_empty() {
            (above.into_iter().take(max_results).collect::<Vec<_>>(), false)
        } else if !below.is_empty() {
            let limit = self.config.fallback_limit.min(max_results);
            (below.into_iter().take(limit).collect(), true)
        } else {
            (Vec::new(), false)
        };

        let warning = (stats.compared == 0).then_some(MatchWarning::NoReferenceData);
        if warning.is_some() {
            warn!(
                candidates = source.candidate_count(),
                "No reference fingerprints to match against"
            );
        }

        info!(
            scanned = stats.scanned,
            compared = stats.compared,
            early_exit = stats.early_exit,
            returned = results.len(),
            used_fallback,
            best_similarity = results.first().map(|r| r.similarity),
            "Match complete"
        );

        Ok(MatchOutcome {
            results,
            used_fallback,
            warning,
            stats,
        })
    }

    /// Serve a wire-level request.
    pub fn handle<S>(&self, request: &MatchRequest, source: &S) -> Result<MatchResponse>
    where
        S: CandidateSource + ?Sized,
    {
        let threshold = request.threshold.unwrap_or(self.config.threshold);
        let max_results = request.max_results.unwrap_or(self.config.max_results).max(1);
        let outcome =
            self.find_matches_with(&request.query_fingerprint, source, threshold, max_results)?;
        Ok(outcome.into())
    }

    /// Minimum distance across the orientations a record holds.
    fn score(
        &self,
        query: &Fingerprint,
        record: &CatalogRecord,
        stats: &mut ScanStats,
    ) -> Option<(u32, Orientation)> {
        if record.is_inert() {
            stats.skipped_inert += 1;
            return None;
        }

        let mut best: Option<(u32, Orientation)> = None;
        for (orientation, fingerprint) in record.fingerprints.iter() {
            match query.hamming_distance(fingerprint) {
                Ok(distance) => {
                    if best.map_or(true, |(d, _)| distance < d) {
                        best = Some((distance, orientation));
                    }
                }
                Err(e) => {
                    warn!(record = %record.id, %orientation, error = %e, "Skipping malformed fingerprint");
                    stats.skipped_malformed += 1;
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FingerprintSet;

    fn grid() -> CanonicalGrid {
        CanonicalGrid::new(4, 5).unwrap()
    }

    /// 20-bit fingerprint with the first `ones` bits set.
    fn fp(ones: usize) -> Fingerprint {
        Fingerprint::from_bits((0..20).map(|i| i < ones))
    }

    fn record(id: u64, fingerprints: FingerprintSet) -> CatalogRecord {
        CatalogRecord::new(id).with_fingerprints(fingerprints)
    }

    fn normal(fingerprint: Fingerprint) -> FingerprintSet {
        FingerprintSet::default().with(Orientation::Normal, fingerprint)
    }

    fn engine(config: MatchConfig) -> MatchEngine {
        MatchEngine::new(grid(), config).unwrap()
    }

    #[test]
    fn test_empty_query_rejected() {
        let err = engine(MatchConfig::default())
            .find_matches(&Fingerprint::from_bits(std::iter::empty()), &Vec::new())
            .unwrap_err();
        assert!(matches!(err, CardprintError::QueryFingerprint(_)));
    }

    #[test]
    fn test_wrong_length_query_rejected_before_scan() {
        let query = Fingerprint::from_bits((0..19).map(|_| false));
        let records = vec![record(1, normal(fp(0)))];
        let err = engine(MatchConfig::default())
            .find_matches(&query, &records)
            .unwrap_err();
        assert!(matches!(err, CardprintError::QueryFingerprint(_)));
    }

    #[test]
    fn test_empty_corpus_warns() {
        let outcome = engine(MatchConfig::default())
            .find_matches(&fp(0), &Vec::new())
            .unwrap();
        assert!(outcome.results.is_empty());
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.warning, Some(MatchWarning::NoReferenceData));
    }

    #[test]
    fn test_inert_records_are_skipped() {
        let records = vec![CatalogRecord::new(1u64), CatalogRecord::new(2u64)];
        let outcome = engine(MatchConfig::default())
            .find_matches(&fp(0), &records)
            .unwrap();
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.stats.skipped_inert, 2);
        assert_eq!(outcome.warning, Some(MatchWarning::NoReferenceData));
    }

    #[test]
    fn test_min_distance_across_orientations() {
        let set = FingerprintSet::default()
            .with(Orientation::Normal, fp(10))
            .with(Orientation::UpsideDown, fp(2))
            .with(Orientation::MirroredUpsideDown, fp(2));
        let outcome = engine(MatchConfig::default())
            .find_matches(&fp(0), &vec![record(7, set)])
            .unwrap();

        let best = outcome.best().unwrap();
        assert_eq!(best.hamming_distance, 2);
        assert_eq!(best.matched_orientation, Orientation::UpsideDown);
        assert!((best.similarity - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_candidate_fingerprint_is_skipped() {
        let set = FingerprintSet::default()
            .with(Orientation::Normal, Fingerprint::from_bits((0..8).map(|_| true)))
            .with(Orientation::Mirrored, fp(4));
        let records = vec![record(1, set), record(2, normal(fp(1)))];

        let outcome = engine(MatchConfig::default())
            .find_matches(&fp(0), &records)
            .unwrap();
        assert_eq!(outcome.stats.skipped_malformed, 1);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[1].matched_orientation, Orientation::Mirrored);
    }

    #[test]
    fn test_ranking_and_tie_break() {
        let records = vec![
            record(30, normal(fp(4))),
            record(10, normal(fp(1))),
            record(20, normal(fp(1))),
        ];
        let outcome = engine(MatchConfig::default())
            .find_matches(&fp(0), &records)
            .unwrap();
        let ids: Vec<&str> = outcome.results.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["10", "20", "30"]);
    }

    #[test]
    fn test_threshold_filters_results() {
        let records = vec![record(1, normal(fp(1))), record(2, normal(fp(12)))];
        let config = MatchConfig::default().with_threshold(0.9);
        let outcome = engine(config).find_matches(&fp(0), &records).unwrap();

        assert!(!outcome.used_fallback);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].record_id.as_str(), "1");
        assert!(!outcome.results[0].below_threshold);
    }

    #[test]
    fn test_fallback_when_nothing_clears_threshold() {
        let records: Vec<CatalogRecord> = (1..=30).map(|id| record(id, normal(fp(12)))).collect();
        let config = MatchConfig::default().with_threshold(0.85);
        let outcome = engine(config).find_matches(&fp(0), &records).unwrap();

        assert!(outcome.used_fallback);
        assert_eq!(outcome.results.len(), 20);
        assert!(outcome.results.iter().all(|r| r.below_threshold));
        assert!(outcome.warning.is_none());
        assert!((outcome.results[0].similarity - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_max_candidates_caps_scan() {
        let records: Vec<CatalogRecord> = (1..=10).map(|id| record(id, normal(fp(5)))).collect();
        let config = MatchConfig::default().with_max_candidates(3);
        let outcome = engine(config).find_matches(&fp(0), &records).unwrap();

        assert_eq!(outcome.stats.scanned, 3);
        let ids: Vec<&str> = outcome.results.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["8", "9", "10"]);
    }

    #[test]
    fn test_early_exit_after_minimum_scan() {
        // Scan order is id descending: 10 is an exact match, found first.
        let mut records: Vec<CatalogRecord> = (1..=9).map(|id| record(id, normal(fp(8)))).collect();
        records.push(record(10, normal(fp(0))));

        let config = MatchConfig::default().with_min_candidates_before_early_exit(4);
        let outcome = engine(config).find_matches(&fp(0), &records).unwrap();

        assert!(outcome.stats.early_exit);
        assert_eq!(outcome.stats.scanned, 4);
        assert_eq!(outcome.best().unwrap().record_id.as_str(), "10");
    }

    #[test]
    fn test_no_early_exit_without_excellent_match() {
        let records: Vec<CatalogRecord> = (1..=10).map(|id| record(id, normal(fp(3)))).collect();
        let config = MatchConfig::default().with_min_candidates_before_early_exit(2);
        let outcome = engine(config).find_matches(&fp(0), &records).unwrap();

        assert!(!outcome.stats.early_exit);
        assert_eq!(outcome.stats.scanned, 10);
    }

    #[test]
    fn test_handle_applies_request_overrides() {
        let records: Vec<CatalogRecord> = (1..=10).map(|id| record(id, normal(fp(1)))).collect();
        let mut request = MatchRequest::new(fp(0));
        request.max_results = Some(3);
        request.threshold = Some(0.5);

        let response = engine(MatchConfig::default()).handle(&request, &records).unwrap();
        assert_eq!(response.results.len(), 3);
        assert!(!response.used_fallback);
        assert!(response.warning.is_none());
    }

    #[test]
    fn test_handle_reports_no_reference_data() {
        let response = engine(MatchConfig::default())
            .handle(&MatchRequest::new(fp(0)), &Vec::new())
            .unwrap();
        assert_eq!(response.warning.as_deref(), Some("no reference data"));
    }

    #[test]
    fn test_handle_rejects_bad_threshold() {
        let mut request = MatchRequest::new(fp(0));
        request.threshold = Some(2.0);
        assert!(engine(MatchConfig::default())
            .handle(&request, &Vec::new())
            .is_err());
    }

    #[test]
    fn test_zero_result_limit_rejected() {
        let records = vec![record(1, normal(fp(0)))];
        let err = engine(MatchConfig::default())
            .find_matches_with(&fp(0), &records, 0.5, 0)
            .unwrap_err();
        assert!(matches!(err, CardprintError::InvalidConfig(_)));
    }
}
