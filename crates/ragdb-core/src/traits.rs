use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::filters::SearchFilters;
use crate::types::{Chunk, SearchHit};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Keyword scorer over the chunk corpus. `index` replaces any prior index
/// entirely; `search` before the first `index` is a caller error.
pub trait LexicalSearch: Send + Sync {
    fn index(&self, chunks: &[Arc<Chunk>]) -> Result<()>;
    fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SearchFilters>,
    ) -> Result<Vec<SearchHit>>;
}

/// Nearest-neighbor search against a vector store. The store is treated as
/// a black box returning a similarity-ranked list; failures surface as
/// `Error::RetrievalUnavailable` so the caller can degrade to lexical-only
/// ranking.
pub trait VectorSearch: Send + Sync {
    fn index<'a>(&'a self, chunks: &'a [Arc<Chunk>]) -> BoxFuture<'a, Result<()>>;
    fn search<'a>(
        &'a self,
        query_vec: &'a [f32],
        top_k: usize,
        filter: Option<&'a SearchFilters>,
    ) -> BoxFuture<'a, Result<Vec<SearchHit>>>;
}
