//! Engine configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};

use crate::error::{CardprintError, Result};
use crate::grid::{CanonicalGrid, DEFAULT_HASH_WIDTH};

/// Matching policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    /// Minimum similarity for a result to count as a match (default: 0.15)
    pub threshold: f64,
    /// Hard cap on candidates scanned per request (default: 2000)
    pub max_candidates: usize,
    /// Candidates to scan before an early exit is allowed (default: 500)
    pub min_candidates_before_early_exit: usize,
    /// Normalized distance below which a match is confidently excellent (default: 0.05)
    pub early_exit_distance_ratio: f64,
    /// Results returned when nothing clears the threshold (default: 20)
    pub fallback_limit: usize,
    /// Results returned when matches clear the threshold (default: 50)
    pub max_results: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.15,
            max_candidates: 2000,
            min_candidates_before_early_exit: 500,
            early_exit_distance_ratio: 0.05,
            fallback_limit: 20,
            max_results: 50,
        }
    }
}

impl MatchConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn with_min_candidates_before_early_exit(mut self, min: usize) -> Self {
        self.min_candidates_before_early_exit = min;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Reject values the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(CardprintError::InvalidConfig(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.early_exit_distance_ratio) {
            return Err(CardprintError::InvalidConfig(format!(
                "early exit distance ratio must be within [0, 1], got {}",
                self.early_exit_distance_ratio
            )));
        }
        if self.max_candidates == 0 {
            return Err(CardprintError::InvalidConfig(
                "max candidates must be at least 1".into(),
            ));
        }
        if self.max_results == 0 || self.fallback_limit == 0 {
            return Err(CardprintError::InvalidConfig(
                "result limits must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineConfig {
    pub grid: CanonicalGrid,
    pub matching: MatchConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables: `CARDPRINT_HASH_WIDTH`, `CARDPRINT_MATCH_THRESHOLD`,
    /// `CARDPRINT_MAX_CANDIDATES`, `CARDPRINT_EARLY_EXIT_MIN`,
    /// `CARDPRINT_MAX_RESULTS`. Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = MatchConfig::default();

        let grid = env_parse::<u32>("CARDPRINT_HASH_WIDTH")
            .and_then(|width| CanonicalGrid::card(width).ok())
            .unwrap_or_default();

        let matching = MatchConfig {
            threshold: env_parse("CARDPRINT_MATCH_THRESHOLD").unwrap_or(defaults.threshold),
            max_candidates: env_parse("CARDPRINT_MAX_CANDIDATES")
                .unwrap_or(defaults.max_candidates),
            min_candidates_before_early_exit: env_parse("CARDPRINT_EARLY_EXIT_MIN")
                .unwrap_or(defaults.min_candidates_before_early_exit),
            max_results: env_parse("CARDPRINT_MAX_RESULTS").unwrap_or(defaults.max_results),
            ..defaults
        };

        Self { grid, matching }
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.width < 2 {
            return Err(CardprintError::InvalidConfig(format!(
                "hash width must be at least 2, got {} (default {DEFAULT_HASH_WIDTH})",
                self.grid.width
            )));
        }
        self.matching.validate()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        let config = MatchConfig::default();
        assert_eq!(config.threshold, 0.15);
        assert_eq!(config.max_candidates, 2000);
        assert_eq!(config.min_candidates_before_early_exit, 500);
        assert_eq!(config.fallback_limit, 20);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        assert!(MatchConfig::default().with_threshold(1.5).validate().is_err());
        assert!(MatchConfig::default().with_threshold(-0.1).validate().is_err());
        assert!(MatchConfig::default().with_threshold(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_zero_candidates_rejected() {
        assert!(MatchConfig::default().with_max_candidates(0).validate().is_err());
    }

    #[test]
    fn test_from_env_reads_overrides() {
        std::env::set_var("CARDPRINT_MATCH_THRESHOLD", "0.8");
        std::env::set_var("CARDPRINT_HASH_WIDTH", "32");
        std::env::set_var("CARDPRINT_MAX_CANDIDATES", "not-a-number");

        let config = EngineConfig::from_env();
        assert_eq!(config.matching.threshold, 0.8);
        assert_eq!(config.grid, CanonicalGrid::card(32).unwrap());
        assert_eq!(config.matching.max_candidates, 2000);

        std::env::remove_var("CARDPRINT_MATCH_THRESHOLD");
        std::env::remove_var("CARDPRINT_HASH_WIDTH");
        std::env::remove_var("CARDPRINT_MAX_CANDIDATES");
    }
}
