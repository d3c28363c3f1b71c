//! Bundled `VectorSearch` implementation: brute-force cosine over the
//! in-process corpus.
//!
//! The retrieval core treats the vector store as an opaque similarity
//! service; a networked store slots in behind the same trait. This one
//! exists so the CLI and tests have a store with no external moving parts.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use tracing::debug;

use ragdb_core::error::{Error, Result};
use ragdb_core::filters::SearchFilters;
use ragdb_core::traits::VectorSearch;
use ragdb_core::types::{Chunk, SearchHit, SourceKind};

pub struct MemoryVectorStore {
    dim: usize,
    entries: RwLock<Vec<Arc<Chunk>>>,
}

impl MemoryVectorStore {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

impl VectorSearch for MemoryVectorStore {
    fn index<'a>(&'a self, chunks: &'a [Arc<Chunk>]) -> BoxFuture<'a, Result<()>> {
        async move {
            for chunk in chunks {
                if chunk.embedding.len() != self.dim {
                    return Err(Error::Operation(format!(
                        "chunk {} has embedding dimension {}, store expects {}",
                        chunk.id,
                        chunk.embedding.len(),
                        self.dim
                    )));
                }
            }
            *self.entries.write() = chunks.to_vec();
            debug!(chunks = chunks.len(), "vector store replaced");
            Ok(())
        }
        .boxed()
    }

    fn search<'a>(
        &'a self,
        query_vec: &'a [f32],
        top_k: usize,
        filter: Option<&'a SearchFilters>,
    ) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
        async move {
            if query_vec.len() != self.dim {
                return Err(Error::RetrievalUnavailable(format!(
                    "query dimension {} does not match store dimension {}",
                    query_vec.len(),
                    self.dim
                )));
            }
            let entries = self.entries.read().clone();
            let mut hits: Vec<SearchHit> = entries
                .iter()
                .filter(|chunk| filter.map_or(true, |f| f.matches_chunk(chunk)))
                .map(|chunk| SearchHit {
                    id: chunk.id.clone(),
                    score: cosine(query_vec, &chunk.embedding),
                    source: SourceKind::Vector,
                })
                .collect();
            hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
            hits.truncate(top_k);
            Ok(hits)
        }
        .boxed()
    }
}
