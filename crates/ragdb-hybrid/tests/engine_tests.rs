use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use ragdb_core::config::RetrievalConfig;
use ragdb_core::error::{Error, Result};
use ragdb_core::filters::SearchFilters;
use ragdb_core::traits::{Embedder, VectorSearch};
use ragdb_core::types::{Chunk, SearchHit, SourceKind};
use ragdb_hybrid::HybridRetriever;

fn chunk(id: &str, text: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        doc_id: id.to_string(),
        title: "Title".to_string(),
        section: "Section".to_string(),
        path: format!("docs/{id}.md"),
        line_start: 1,
        line_end: 10,
        text: text.to_string(),
        embedding: Vec::new(),
        doc_type: "markdown".to_string(),
        version: "1.0".to_string(),
        created_at: None,
        updated_at: None,
        tags: Vec::new(),
        metadata: Default::default(),
    }
}

/// The three-chunk corpus from the retrieval scenario tests.
fn jwt_corpus() -> Vec<Chunk> {
    vec![
        chunk("A", "JWT authentication setup guide"),
        chunk("B", "database migration steps"),
        chunk("C", "JWT token refresh flow"),
    ]
}

fn vector_hit(id: &str, score: f32) -> SearchHit {
    SearchHit {
        id: id.to_string(),
        score,
        source: SourceKind::Vector,
    }
}

struct StubEmbedder {
    dim: usize,
}

impl Embedder for StubEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.1; self.dim]).collect())
    }
}

/// Returns a fixed hit list regardless of the query embedding.
struct StaticVectorStore {
    hits: Vec<SearchHit>,
}

impl VectorSearch for StaticVectorStore {
    fn index<'a>(&'a self, _chunks: &'a [Arc<Chunk>]) -> BoxFuture<'a, Result<()>> {
        async { Ok(()) }.boxed()
    }
    fn search<'a>(
        &'a self,
        _query_vec: &'a [f32],
        top_k: usize,
        _filter: Option<&'a SearchFilters>,
    ) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
        let mut hits = self.hits.clone();
        hits.truncate(top_k);
        async move { Ok(hits) }.boxed()
    }
}

struct FailingVectorStore;

impl VectorSearch for FailingVectorStore {
    fn index<'a>(&'a self, _chunks: &'a [Arc<Chunk>]) -> BoxFuture<'a, Result<()>> {
        async { Ok(()) }.boxed()
    }
    fn search<'a>(
        &'a self,
        _query_vec: &'a [f32],
        _top_k: usize,
        _filter: Option<&'a SearchFilters>,
    ) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
        async { Err(Error::RetrievalUnavailable("connection refused".into())) }.boxed()
    }
}

struct SlowVectorStore {
    delay: Duration,
}

impl VectorSearch for SlowVectorStore {
    fn index<'a>(&'a self, _chunks: &'a [Arc<Chunk>]) -> BoxFuture<'a, Result<()>> {
        async { Ok(()) }.boxed()
    }
    fn search<'a>(
        &'a self,
        _query_vec: &'a [f32],
        _top_k: usize,
        _filter: Option<&'a SearchFilters>,
    ) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
        async move {
            tokio::time::sleep(self.delay).await;
            Ok(Vec::new())
        }
        .boxed()
    }
}

fn retriever(config: RetrievalConfig, vector: Arc<dyn VectorSearch>) -> HybridRetriever {
    HybridRetriever::new(config, vector, Arc::new(StubEmbedder { dim: 4 })).expect("retriever")
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[tokio::test]
async fn jwt_scenario_pins_the_fused_order() {
    // Mock vector similarities: C 0.9, A 0.8, B 0.2. Lexically only A
    // matches a scoring term ("jwt" appears in two of three docs, so its
    // IDF floors at zero). With default weights the boosted overlap puts
    // A first: 1.2 * (0.7 * 0.857 + 0.3 * 1.0) = 1.08, then C at 0.7.
    let config = RetrievalConfig {
        enable_reranking: false,
        ..Default::default()
    };
    let store = Arc::new(StaticVectorStore {
        hits: vec![vector_hit("C", 0.9), vector_hit("A", 0.8), vector_hit("B", 0.2)],
    });
    let engine = retriever(config, store);
    engine.index(jwt_corpus()).await.expect("index");

    let results = engine
        .search("JWT authentication", 3, None)
        .await
        .expect("search");

    let ids: Vec<&str> = results.iter().map(|c| c.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "C", "B"]);
    assert!(approx(results[0].hybrid_score, 1.08));
    assert!(approx(results[1].hybrid_score, 0.7));
    assert!(approx(results[2].hybrid_score, 0.0));
    assert_eq!(results[0].rank, 1);
    assert_eq!(results[2].rank, 3);
}

#[tokio::test]
async fn jwt_scenario_survives_reranking() {
    let store = Arc::new(StaticVectorStore {
        hits: vec![vector_hit("C", 0.9), vector_hit("A", 0.8), vector_hit("B", 0.2)],
    });
    let engine = retriever(RetrievalConfig::default(), store);
    engine.index(jwt_corpus()).await.expect("index");

    let results = engine
        .search("JWT authentication", 3, None)
        .await
        .expect("search");

    let ids: Vec<&str> = results.iter().map(|c| c.chunk.id.as_str()).collect();
    assert_eq!(ids[2], "B", "both JWT chunks stay above the migration doc");
    assert!(ids[..2].contains(&"A"));
    assert!(ids[..2].contains(&"C"));
    assert!(results.iter().all(|c| c.rerank_score.is_some()));
}

#[tokio::test]
async fn failing_vector_store_degrades_to_lexical_only() {
    let config = RetrievalConfig {
        enable_reranking: false,
        ..Default::default()
    };
    let engine = retriever(config, Arc::new(FailingVectorStore));
    engine.index(jwt_corpus()).await.expect("index");

    let results = engine
        .search("JWT authentication", 3, None)
        .await
        .expect("degraded search must not fail");

    assert!(!results.is_empty());
    assert_eq!(results[0].chunk.id, "A");
    // Lexical-only fusion: bm25_weight * normalized score, no boost.
    assert!(approx(results[0].hybrid_score, 0.3));
    assert!(results[0].vector_score.is_none());
}

#[tokio::test]
async fn vector_timeout_degrades_to_lexical_only() {
    let config = RetrievalConfig {
        vector_timeout_ms: 20,
        ..Default::default()
    };
    let store = Arc::new(SlowVectorStore {
        delay: Duration::from_millis(500),
    });
    let engine = retriever(config, store);
    engine.index(jwt_corpus()).await.expect("index");

    let results = engine
        .search("JWT authentication", 3, None)
        .await
        .expect("timeout must degrade, not fail");
    assert!(!results.is_empty());
    assert!(results.iter().all(|c| c.vector_score.is_none()));
}

#[tokio::test]
async fn search_before_index_surfaces_index_not_built() {
    let store = Arc::new(StaticVectorStore { hits: Vec::new() });
    let engine = retriever(RetrievalConfig::default(), store);
    let err = engine.search("anything", 5, None).await.unwrap_err();
    assert!(matches!(err, Error::IndexNotBuilt));
}

#[tokio::test]
async fn min_score_above_everything_filters_all_candidates() {
    let store = Arc::new(StaticVectorStore {
        hits: vec![vector_hit("A", 0.9)],
    });
    let engine = retriever(RetrievalConfig::default(), store);
    engine.index(jwt_corpus()).await.expect("index");

    let filters = SearchFilters {
        min_score: Some(100.0),
        ..Default::default()
    };
    let results = engine
        .search("JWT authentication", 3, Some(&filters))
        .await
        .expect("empty result is not an error");
    assert!(results.is_empty());
}

#[tokio::test]
async fn structural_filters_exclude_mismatched_chunks() {
    let store = Arc::new(StaticVectorStore {
        hits: vec![vector_hit("A", 0.9), vector_hit("C", 0.8)],
    });
    let engine = retriever(RetrievalConfig::default(), store);
    engine.index(jwt_corpus()).await.expect("index");

    let filters = SearchFilters {
        doc_type: Some("text".to_string()),
        ..Default::default()
    };
    let results = engine
        .search("JWT authentication", 3, Some(&filters))
        .await
        .expect("search");
    assert!(results.is_empty(), "corpus is all markdown");

    let filters = SearchFilters {
        doc_type: Some("markdown".to_string()),
        ..Default::default()
    };
    let results = engine
        .search("JWT authentication", 3, Some(&filters))
        .await
        .expect("search");
    assert!(!results.is_empty());
}

#[tokio::test]
async fn repeated_searches_return_identical_results() {
    let store = Arc::new(StaticVectorStore {
        hits: vec![vector_hit("C", 0.9), vector_hit("A", 0.8), vector_hit("B", 0.2)],
    });
    let engine = retriever(RetrievalConfig::default(), store);
    engine.index(jwt_corpus()).await.expect("index");

    let key = |results: &[ragdb_core::types::ScoredCandidate]| {
        results
            .iter()
            .map(|c| (c.chunk.id.clone(), c.effective_score().to_bits()))
            .collect::<Vec<_>>()
    };
    let first = engine
        .search("JWT authentication", 3, None)
        .await
        .expect("search");
    let second = engine
        .search("JWT authentication", 3, None)
        .await
        .expect("search");
    assert_eq!(key(&first), key(&second));
}

#[tokio::test]
async fn zero_top_k_returns_nothing() {
    let store = Arc::new(StaticVectorStore { hits: Vec::new() });
    let engine = retriever(RetrievalConfig::default(), store);
    engine.index(jwt_corpus()).await.expect("index");
    let results = engine.search("JWT", 0, None).await.expect("search");
    assert!(results.is_empty());
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let config = RetrievalConfig {
        vector_weight: 0.9,
        bm25_weight: 0.3,
        ..Default::default()
    };
    let result = HybridRetriever::new(
        config,
        Arc::new(StaticVectorStore { hits: Vec::new() }),
        Arc::new(StubEmbedder { dim: 4 }),
    );
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}
