//! Post-rank hard filtering.
//!
//! Filtering runs after fusion and reranking so the reranker sees the full
//! candidate pool before anything is excluded. AND semantics across all
//! supplied predicates; the order of survivors is preserved.

use ragdb_core::filters::SearchFilters;
use ragdb_core::types::ScoredCandidate;

/// Drops candidates failing any predicate. An empty result is a valid
/// outcome, not an error.
pub fn apply(candidates: Vec<ScoredCandidate>, filters: &SearchFilters) -> Vec<ScoredCandidate> {
    candidates
        .into_iter()
        .filter(|candidate| {
            if let Some(min_score) = filters.min_score {
                if candidate.effective_score() < min_score {
                    return false;
                }
            }
            filters.matches_chunk(&candidate.chunk)
        })
        .collect()
}
