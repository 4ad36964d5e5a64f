//! Request and response shapes exchanged with an API layer.

use serde::{Deserialize, Serialize};

use super::{MatchOutcome, MatchResult};
use crate::fingerprint::Fingerprint;

/// A match request as received from a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub query_fingerprint: Fingerprint,
    /// Overrides the configured similarity threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Overrides the configured result limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

impl MatchRequest {
    pub fn new(query_fingerprint: Fingerprint) -> Self {
        Self {
            query_fingerprint,
            threshold: None,
            max_results: None,
        }
    }
}

/// A match response as returned to a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub results: Vec<MatchResult>,
    pub used_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<MatchOutcome> for MatchResponse {
    fn from(outcome: MatchOutcome) -> Self {
        Self {
            results: outcome.results,
            used_fallback: outcome.used_fallback,
            warning: outcome.warning.map(|w| w.to_string()),
        }
    }
}
