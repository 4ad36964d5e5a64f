//! Reference corpus storage.
//!
//! A [`Corpus`] is the in-memory catalog the matcher scans. It is stamped
//! with the grid and algorithm its fingerprints were computed with; mixing
//! fingerprints from different grids would make every distance meaningless,
//! so lengths are checked on every insert and on every load.
//!
//! Corpora persist as CBOR (compact) or JSON (human-readable).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::builder::FingerprintSet;
use crate::error::{CardprintError, Result};
use crate::grid::CanonicalGrid;
use crate::hash::HashAlgorithm;
use crate::matcher::CandidateSource;
use crate::orientation::Orientation;
use crate::record::{CatalogRecord, RecordId};

/// Current on-disk corpus format version.
pub const CORPUS_FORMAT_VERSION: u8 = 1;

/// Keyed catalog of reference fingerprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "CorpusFile", try_from = "CorpusFile")]
pub struct Corpus {
    grid: CanonicalGrid,
    algorithm: HashAlgorithm,
    records: BTreeMap<RecordId, CatalogRecord>,
    updated_at: DateTime<Utc>,
}

/// Persisted representation: records as a list, ordered by id.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorpusFile {
    format_version: u8,
    grid: CanonicalGrid,
    algorithm: HashAlgorithm,
    updated_at: DateTime<Utc>,
    records: Vec<CatalogRecord>,
}

impl From<Corpus> for CorpusFile {
    fn from(corpus: Corpus) -> Self {
        Self {
            format_version: CORPUS_FORMAT_VERSION,
            grid: corpus.grid,
            algorithm: corpus.algorithm,
            updated_at: corpus.updated_at,
            records: corpus.records.into_values().collect(),
        }
    }
}

impl TryFrom<CorpusFile> for Corpus {
    type Error = CardprintError;

    fn try_from(file: CorpusFile) -> Result<Self> {
        if file.format_version != CORPUS_FORMAT_VERSION {
            return Err(CardprintError::CorpusMismatch(format!(
                "unsupported corpus format version {} (expected {CORPUS_FORMAT_VERSION})",
                file.format_version
            )));
        }

        let mut records = BTreeMap::new();
        for record in file.records {
            if records.contains_key(&record.id) {
                return Err(CardprintError::CorpusMismatch(format!(
                    "duplicate record id {}",
                    record.id
                )));
            }
            records.insert(record.id.clone(), record);
        }

        let corpus = Self {
            grid: file.grid,
            algorithm: file.algorithm,
            records,
            updated_at: file.updated_at,
        };
        corpus.validate()?;
        Ok(corpus)
    }
}

/// How completely the corpus is fingerprinted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub total: usize,
    /// Records with all four orientations.
    pub complete: usize,
    /// Records with one to three orientations.
    pub partial: usize,
    /// Records with no fingerprints.
    pub inert: usize,
    pub normal: usize,
    pub mirrored: usize,
    pub upside_down: usize,
    pub mirrored_upside_down: usize,
}

impl Coverage {
    /// Records holding a fingerprint for `orientation`.
    pub fn count(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Normal => self.normal,
            Orientation::Mirrored => self.mirrored,
            Orientation::UpsideDown => self.upside_down,
            Orientation::MirroredUpsideDown => self.mirrored_upside_down,
        }
    }
}

impl Corpus {
    pub fn new(grid: CanonicalGrid, algorithm: HashAlgorithm) -> Self {
        Self {
            grid,
            algorithm,
            records: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn grid(&self) -> CanonicalGrid {
        self.grid
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Bit layout of the stored fingerprints, for building a matching engine.
    ///
    /// Blockhash output is always 64 bits (8 x 8) whatever the source grid.
    pub fn fingerprint_grid(&self) -> CanonicalGrid {
        match self.algorithm {
            HashAlgorithm::Blockhash64 => CanonicalGrid {
                width: 8,
                height: 8,
            },
            HashAlgorithm::Difference | HashAlgorithm::Average => self.grid,
        }
    }

    /// Fingerprint length every record must have.
    pub fn expected_bits(&self) -> usize {
        self.fingerprint_grid().bit_len()
    }

    /// Insert or replace a record.
    ///
    /// All four slots are replaced together, so a re-ingest never leaves a
    /// mix of old and new fingerprints. Returns the previous record, if any.
    pub fn upsert(&mut self, record: CatalogRecord) -> Result<Option<CatalogRecord>> {
        self.check_lengths(&record.id, &record.fingerprints)?;

        debug!(id = %record.id, orientations = record.fingerprints.len(), "Upserting record");
        self.updated_at = Utc::now();
        Ok(self.records.insert(record.id.clone(), record))
    }

    pub fn get(&self, id: &RecordId) -> Option<&CatalogRecord> {
        self.records.get(id)
    }

    pub fn remove(&mut self, id: &RecordId) -> Option<CatalogRecord> {
        let removed = self.records.remove(id);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending id order.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = &CatalogRecord> {
        self.records.values()
    }

    /// Check every stored fingerprint against the corpus grid.
    pub fn validate(&self) -> Result<()> {
        for (id, record) in &self.records {
            if *id != record.id {
                return Err(CardprintError::CorpusMismatch(format!(
                    "record keyed {id} carries id {}",
                    record.id
                )));
            }
            self.check_lengths(id, &record.fingerprints)?;
        }
        Ok(())
    }

    /// Fail unless this corpus was built with `grid` and `algorithm`.
    pub fn ensure_compatible(&self, grid: CanonicalGrid, algorithm: HashAlgorithm) -> Result<()> {
        if self.algorithm != algorithm {
            return Err(CardprintError::CorpusMismatch(format!(
                "corpus uses {}, requested {algorithm}",
                self.algorithm
            )));
        }
        if self.algorithm != HashAlgorithm::Blockhash64 && self.grid != grid {
            return Err(CardprintError::CorpusMismatch(format!(
                "corpus grid is {}, requested {grid}",
                self.grid
            )));
        }
        Ok(())
    }

    pub fn coverage(&self) -> Coverage {
        let mut coverage = Coverage {
            total: self.records.len(),
            ..Coverage::default()
        };

        for record in self.records.values() {
            let set = &record.fingerprints;
            match set.len() {
                0 => coverage.inert += 1,
                4 => coverage.complete += 1,
                _ => coverage.partial += 1,
            }
            for (orientation, _) in set.iter() {
                match orientation {
                    Orientation::Normal => coverage.normal += 1,
                    Orientation::Mirrored => coverage.mirrored += 1,
                    Orientation::UpsideDown => coverage.upside_down += 1,
                    Orientation::MirroredUpsideDown => coverage.mirrored_upside_down += 1,
                }
            }
        }
        coverage
    }

    /// Serialize the corpus to CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| CardprintError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize and validate a corpus from CBOR bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let corpus: Self =
            ciborium::from_reader(bytes).map_err(|e| CardprintError::Serialization(e.to_string()))?;
        info!(records = corpus.len(), grid = %corpus.grid, "Loaded corpus");
        Ok(corpus)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CardprintError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let corpus: Self =
            serde_json::from_str(json).map_err(|e| CardprintError::Serialization(e.to_string()))?;
        info!(records = corpus.len(), grid = %corpus.grid, "Loaded corpus");
        Ok(corpus)
    }

    fn check_lengths(&self, id: &RecordId, fingerprints: &FingerprintSet) -> Result<()> {
        let expected = self.expected_bits();
        for (orientation, fingerprint) in fingerprints.iter() {
            if fingerprint.len() != expected {
                return Err(CardprintError::CorpusMismatch(format!(
                    "record {id} {orientation} fingerprint has {} bits, corpus expects {expected}",
                    fingerprint.len()
                )));
            }
        }
        Ok(())
    }
}

impl CandidateSource for Corpus {
    fn candidates(&self, limit: usize) -> Box<dyn Iterator<Item = &CatalogRecord> + '_> {
        Box::new(self.records.values().rev().take(limit))
    }

    fn candidate_count(&self) -> usize {
        self.records.len()
    }
}
