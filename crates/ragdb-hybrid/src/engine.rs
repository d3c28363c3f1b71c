//! Hybrid retrieval facade.
//!
//! A query runs the BM25 search and the vector store call concurrently,
//! joins both result lists, then walks the synchronous pipeline: fusion,
//! reranking, filtering, truncation. The vector call carries a deadline;
//! a timeout or store failure degrades the query to lexical-only ranking
//! instead of failing it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use ragdb_core::config::RetrievalConfig;
use ragdb_core::error::{Error, Result};
use ragdb_core::filters::SearchFilters;
use ragdb_core::traits::{Embedder, LexicalSearch, VectorSearch};
use ragdb_core::types::{Chunk, ChunkId, ScoredCandidate, SearchHit};
use ragdb_lexical::{Bm25Index, Bm25Params};

use crate::filter;
use crate::fusion::{self, FusedHit};
use crate::rerank::Reranker;

pub struct HybridRetriever {
    config: RetrievalConfig,
    lexical: Arc<Bm25Index>,
    vector: Arc<dyn VectorSearch>,
    embedder: Arc<dyn Embedder>,
    reranker: Reranker,
    chunks: RwLock<HashMap<ChunkId, Arc<Chunk>>>,
}

impl HybridRetriever {
    pub fn new(
        config: RetrievalConfig,
        vector: Arc<dyn VectorSearch>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        config.validate()?;
        let lexical = Arc::new(Bm25Index::new(Bm25Params {
            k1: config.bm25_k1,
            b: config.bm25_b,
        }));
        let reranker = Reranker::new(&config);
        Ok(Self {
            config,
            lexical,
            vector,
            embedder,
            reranker,
            chunks: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// (Re)index the corpus in both engines. Chunks arriving without an
    /// embedding are embedded here; existing embeddings are kept.
    pub async fn index(&self, mut chunks: Vec<Chunk>) -> Result<()> {
        let mut shared: Vec<Arc<Chunk>> = Vec::with_capacity(chunks.len());
        let mut pending: Vec<usize> = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.embedding.is_empty() {
                pending.push(i);
            }
        }
        if !pending.is_empty() {
            let texts: Vec<String> = pending.iter().map(|&i| chunks[i].text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts)?;
            for (&i, embedding) in pending.iter().zip(embeddings) {
                chunks[i].embedding = embedding;
            }
        }
        for chunk in chunks {
            shared.push(Arc::new(chunk));
        }

        self.lexical.index(&shared)?;
        self.vector.index(&shared).await?;

        let mut map = self.chunks.write();
        map.clear();
        for chunk in &shared {
            map.insert(chunk.id.clone(), Arc::clone(chunk));
        }
        info!(chunks = shared.len(), "corpus indexed");
        Ok(())
    }

    /// The single public retrieval entry point.
    ///
    /// Returns a ranked, possibly empty candidate list. Raises only on
    /// `IndexNotBuilt`/`InvalidConfig`-class errors; an unreachable vector
    /// store is absorbed by the lexical-only degradation path.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<ScoredCandidate>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        // Both engines are asked for twice the final depth so fusion and
        // reranking see candidates beyond the cut line.
        let fetch_k = top_k.saturating_mul(2);

        let lexical_task = {
            let index = Arc::clone(&self.lexical);
            let query = query.to_string();
            let filters = filters.cloned();
            tokio::task::spawn_blocking(move || index.search(&query, fetch_k, filters.as_ref()))
        };
        let vector_future = self.vector_search(query, fetch_k, filters);

        let (lexical_result, vector_result) = tokio::join!(lexical_task, vector_future);
        let lexical_hits = lexical_result
            .map_err(|e| Error::Operation(format!("lexical search task failed: {e}")))??;
        let vector_hits = match vector_result {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "vector search unavailable, degrading to lexical-only ranking");
                Vec::new()
            }
        };

        let fused = fusion::fuse(&vector_hits, &lexical_hits, &self.config);
        let mut candidates = self.resolve(fused);
        if self.config.enable_reranking {
            candidates = self.reranker.rerank(candidates, query);
        }
        if let Some(filters) = filters {
            if self.config.enable_filtering {
                candidates = filter::apply(candidates, filters);
            }
        }
        candidates.truncate(top_k);
        for (i, candidate) in candidates.iter_mut().enumerate() {
            candidate.rank = i + 1;
        }
        debug!(query, results = candidates.len(), "hybrid search complete");
        Ok(candidates)
    }

    async fn vector_search(
        &self,
        query: &str,
        fetch_k: usize,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<SearchHit>> {
        let query_vec = self
            .embedder
            .embed_batch(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Operation("embedder returned no vector".into()))?;
        let deadline = Duration::from_millis(self.config.vector_timeout_ms);
        match timeout(deadline, self.vector.search(&query_vec, fetch_k, filters)).await {
            Ok(result) => result,
            Err(_) => Err(Error::RetrievalUnavailable(format!(
                "timed out after {}ms",
                self.config.vector_timeout_ms
            ))),
        }
    }

    /// Attach shared chunks to fused hits. Hits referencing ids the corpus
    /// map no longer knows are dropped with a warning.
    fn resolve(&self, fused: Vec<FusedHit>) -> Vec<ScoredCandidate> {
        let map = self.chunks.read();
        fused
            .into_iter()
            .filter_map(|hit| {
                let Some(chunk) = map.get(&hit.id) else {
                    warn!(id = %hit.id, "search hit references unknown chunk");
                    return None;
                };
                Some(ScoredCandidate {
                    chunk: Arc::clone(chunk),
                    vector_score: hit.vector_score,
                    bm25_score: hit.bm25_score,
                    hybrid_score: hit.hybrid_score,
                    rerank_score: None,
                    rank: 0,
                })
            })
            .collect()
    }
}
