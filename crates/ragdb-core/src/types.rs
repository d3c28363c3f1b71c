//! Domain types shared by the lexical and vector engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// An indexed unit of text from a source document.
///
/// - `id`: globally unique chunk identifier
/// - `doc_id`: stable document identity (file stem or external id)
/// - `path`: original path to the source file
/// - `line_start`/`line_end`: position within the source (`line_end >= line_start`)
/// - `embedding`: fixed-dimension vector, constant per corpus
///
/// Chunks are created at ingestion time and are read-only during
/// retrieval; they are shared as `Arc<Chunk>` and never copied per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub title: String,
    pub section: String,
    pub path: String,
    pub line_start: usize,
    pub line_end: usize,
    pub text: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub doc_type: String,
    pub version: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Meta,
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Lexical,
}

/// The minimal surface returned by both engines.
///
/// `id` matches `Chunk::id`. `score` is engine-specific but higher is
/// always better. `source` labels the origin engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

/// A chunk annotated with retrieval-time scores.
///
/// `hybrid_score` is set by fusion, `rerank_score` by the reranker, and
/// `rank` (1-based) after the final ordering. Candidates live for a single
/// query and are never persisted.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub chunk: Arc<Chunk>,
    pub vector_score: Option<f32>,
    pub bm25_score: Option<f32>,
    pub hybrid_score: f32,
    pub rerank_score: Option<f32>,
    pub rank: usize,
}

impl ScoredCandidate {
    /// The score the caller should rank by: the rerank score when the
    /// reranker ran, otherwise the fused hybrid score.
    pub fn effective_score(&self) -> f32 {
        self.rerank_score.unwrap_or(self.hybrid_score)
    }
}
