//! Multi-factor reranking of fused candidates.
//!
//! The head of the fused list (up to the configured pool size) is rescored
//! as a weighted sum of five sub-scores, each in [0, 1]; the tail keeps its
//! fused order and is appended unchanged. The sort is stable: tied rerank
//! scores preserve the fused order.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use ragdb_core::config::{RerankWeights, RetrievalConfig};
use ragdb_core::types::{Chunk, ScoredCandidate};
use ragdb_lexical::Tokenizer;

use crate::fusion::min_max_normalize;

const SECONDS_PER_DAY: f32 = 86_400.0;
/// Sub-score used when a signal is absent (no timestamp, empty query).
const NEUTRAL_SCORE: f32 = 0.5;

pub struct Reranker {
    weights: RerankWeights,
    half_life_days: f32,
    pool_size: usize,
    tokenizer: Tokenizer,
}

impl Reranker {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            weights: config.rerank_weights,
            half_life_days: config.freshness_half_life_days,
            pool_size: config.rerank_pool_size,
            tokenizer: Tokenizer::default(),
        }
    }

    pub fn rerank(&self, candidates: Vec<ScoredCandidate>, query: &str) -> Vec<ScoredCandidate> {
        self.rerank_at(candidates, query, Utc::now())
    }

    /// Clock-injected variant; `now` anchors the freshness decay.
    pub fn rerank_at(
        &self,
        mut candidates: Vec<ScoredCandidate>,
        query: &str,
        now: DateTime<Utc>,
    ) -> Vec<ScoredCandidate> {
        if candidates.is_empty() {
            return candidates;
        }
        let pool = self.pool_size.min(candidates.len());
        let tail = candidates.split_off(pool);
        let mut head = candidates;

        let base_norm = min_max_normalize(
            &head.iter().map(|c| c.hybrid_score).collect::<Vec<_>>(),
        );
        let query_tokens: HashSet<String> =
            self.tokenizer.tokenize(query).into_iter().collect();

        for (i, candidate) in head.iter_mut().enumerate() {
            let chunk = &candidate.chunk;
            let w = &self.weights;
            let score = w.base * base_norm[i]
                + w.semantic * self.semantic_overlap(&query_tokens, chunk)
                + w.quality * quality(chunk)
                + w.freshness * self.freshness(chunk, now)
                + w.metadata * metadata_completeness(chunk);
            candidate.rerank_score = Some(score);
        }

        // Vec::sort_by is stable, so ties keep the fused order.
        head.sort_by(|a, b| {
            b.rerank_score
                .unwrap_or(f32::NEG_INFINITY)
                .total_cmp(&a.rerank_score.unwrap_or(f32::NEG_INFINITY))
        });
        head.extend(tail);
        head
    }

    /// Overlap coefficient between query tokens and chunk tokens, both run
    /// through the lexical tokenizer.
    fn semantic_overlap(&self, query_tokens: &HashSet<String>, chunk: &Chunk) -> f32 {
        if query_tokens.is_empty() {
            return NEUTRAL_SCORE;
        }
        let chunk_tokens: HashSet<String> =
            self.tokenizer.tokenize(&chunk.text).into_iter().collect();
        let common = query_tokens.intersection(&chunk_tokens).count();
        common as f32 / query_tokens.len() as f32
    }

    fn freshness(&self, chunk: &Chunk, now: DateTime<Utc>) -> f32 {
        let Some(ts) = chunk.updated_at.or(chunk.created_at) else {
            return NEUTRAL_SCORE;
        };
        let age_days = (now - ts).num_seconds().max(0) as f32 / SECONDS_PER_DAY;
        0.5f32.powf(age_days / self.half_life_days)
    }
}

/// Content-quality heuristic: length band, structural markers, and whether
/// the chunk carries a title and section.
fn quality(chunk: &Chunk) -> f32 {
    let char_count = chunk.text.chars().count();
    let length = if char_count < 50 {
        char_count as f32 / 50.0
    } else if char_count <= 2_000 {
        1.0
    } else {
        (2_000.0 / char_count as f32).max(0.2)
    };

    let mut markers = 0usize;
    for line in chunk.text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#')
            || trimmed.starts_with("- ")
            || trimmed.starts_with("* ")
            || trimmed.starts_with("```")
        {
            markers += 1;
        }
    }
    let structure = (markers as f32 / 4.0).min(1.0);

    let titled = match (!chunk.title.is_empty(), !chunk.section.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.5,
        (false, false) => 0.0,
    };

    0.4 * length + 0.3 * structure + 0.3 * titled
}

/// Fraction of the expected metadata fields that are present and non-empty.
fn metadata_completeness(chunk: &Chunk) -> f32 {
    let fields = [
        !chunk.title.is_empty(),
        !chunk.section.is_empty(),
        !chunk.path.is_empty(),
        chunk.line_end >= chunk.line_start && chunk.line_end > 0,
        !chunk.version.is_empty(),
    ];
    fields.iter().filter(|present| **present).count() as f32 / fields.len() as f32
}
