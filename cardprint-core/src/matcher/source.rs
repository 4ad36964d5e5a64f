//! Candidate sources.
//!
//! The engine only needs a bounded, deterministic sequence of records. Keeping
//! that behind [`CandidateSource`] lets an index (BK-tree, popcount buckets)
//! replace the linear scan without touching ranking or threshold policy.

use crate::record::CatalogRecord;

/// A read-only snapshot of catalog records to match against.
pub trait CandidateSource {
    /// Records in scan order (record id descending), at most `limit` of them.
    fn candidates(&self, limit: usize) -> Box<dyn Iterator<Item = &CatalogRecord> + '_>;

    /// Total number of records available, inert ones included.
    fn candidate_count(&self) -> usize;
}

impl CandidateSource for [CatalogRecord] {
    fn candidates(&self, limit: usize) -> Box<dyn Iterator<Item = &CatalogRecord> + '_> {
        let mut ordered: Vec<&CatalogRecord> = self.iter().collect();
        ordered.sort_by(|a, b| b.id.cmp(&a.id));
        ordered.truncate(limit);
        Box::new(ordered.into_iter())
    }

    fn candidate_count(&self) -> usize {
        self.len()
    }
}

impl CandidateSource for Vec<CatalogRecord> {
    fn candidates(&self, limit: usize) -> Box<dyn Iterator<Item = &CatalogRecord> + '_> {
        self.as_slice().candidates(limit)
    }

    fn candidate_count(&self) -> usize {
        self.len()
    }
}
