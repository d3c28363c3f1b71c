//! Weighted fusion of the vector and lexical result lists.
//!
//! Candidates are deduplicated by chunk id, each list's scores are min-max
//! normalized independently, and the weighted combination is boosted for
//! candidates both engines agree on. The final order is a total order:
//! score, then original vector rank, then chunk id.

use std::collections::HashMap;

use ragdb_core::config::RetrievalConfig;
use ragdb_core::types::{ChunkId, SearchHit};

/// A candidate after fusion, before chunk resolution.
#[derive(Debug, Clone)]
pub struct FusedHit {
    pub id: ChunkId,
    pub vector_score: Option<f32>,
    pub bm25_score: Option<f32>,
    pub hybrid_score: f32,
    pub in_both: bool,
    vector_rank: Option<usize>,
}

/// Min-max normalize into [0, 1]. A zero score range maps everything to 1.0
/// so a degenerate list never divides by zero.
pub(crate) fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &s in scores {
        min = min.min(s);
        max = max.max(s);
    }
    let range = max - min;
    if range <= 0.0 {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|&s| (s - min) / range).collect()
}

#[derive(Default)]
struct Slot {
    /// (original rank, raw score, normalized score)
    vector: Option<(usize, f32, f32)>,
    /// (raw score, normalized score)
    lexical: Option<(f32, f32)>,
}

pub fn fuse(
    vector_hits: &[SearchHit],
    lexical_hits: &[SearchHit],
    config: &RetrievalConfig,
) -> Vec<FusedHit> {
    let vector_norm = min_max_normalize(
        &vector_hits.iter().map(|h| h.score).collect::<Vec<_>>(),
    );
    let lexical_norm = min_max_normalize(
        &lexical_hits.iter().map(|h| h.score).collect::<Vec<_>>(),
    );

    // Union by id; first-seen order only seeds the map, the sort below
    // imposes the real order.
    let mut order: Vec<ChunkId> = Vec::new();
    let mut slots: HashMap<ChunkId, Slot> = HashMap::new();
    for (rank, hit) in vector_hits.iter().enumerate() {
        let slot = slots.entry(hit.id.clone()).or_insert_with(|| {
            order.push(hit.id.clone());
            Slot::default()
        });
        slot.vector = Some((rank, hit.score, vector_norm[rank]));
    }
    for (rank, hit) in lexical_hits.iter().enumerate() {
        let slot = slots.entry(hit.id.clone()).or_insert_with(|| {
            order.push(hit.id.clone());
            Slot::default()
        });
        slot.lexical = Some((hit.score, lexical_norm[rank]));
    }

    let mut fused: Vec<FusedHit> = order
        .into_iter()
        .map(|id| {
            let slot = &slots[&id];
            let norm_vector = slot.vector.map_or(0.0, |(_, _, n)| n);
            let norm_lexical = slot.lexical.map_or(0.0, |(_, n)| n);
            let mut hybrid_score =
                config.vector_weight * norm_vector + config.bm25_weight * norm_lexical;
            let in_both = slot.vector.is_some() && slot.lexical.is_some();
            if in_both {
                hybrid_score *= config.overlap_boost;
            }
            FusedHit {
                vector_score: slot.vector.map(|(_, raw, _)| raw),
                bm25_score: slot.lexical.map(|(raw, _)| raw),
                hybrid_score,
                in_both,
                vector_rank: slot.vector.map(|(rank, _, _)| rank),
                id,
            }
        })
        .collect();

    fused.sort_by(|a, b| {
        b.hybrid_score
            .total_cmp(&a.hybrid_score)
            .then_with(|| {
                a.vector_rank
                    .unwrap_or(usize::MAX)
                    .cmp(&b.vector_rank.unwrap_or(usize::MAX))
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    fused
}
