use std::sync::Arc;

use ragdb_core::error::Error;
use ragdb_core::filters::SearchFilters;
use ragdb_core::traits::LexicalSearch;
use ragdb_core::types::Chunk;
use ragdb_lexical::{Bm25Index, Bm25Params};

fn chunk(id: &str, text: &str) -> Arc<Chunk> {
    Arc::new(Chunk {
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
    })
}

/// Five three-token documents; two contain "cache" so its IDF stays positive.
fn cache_corpus() -> Vec<Arc<Chunk>> {
    vec![
        chunk("d1", "cache cache cache"),
        chunk("d2", "cache miss penalty"),
        chunk("d3", "disk throughput metrics"),
        chunk("d4", "network latency report"),
        chunk("d5", "memory allocation profile"),
    ]
}

#[test]
fn search_before_index_is_a_caller_error() {
    let index = Bm25Index::new(Bm25Params::default());
    assert!(matches!(
        index.search("anything", 10, None),
        Err(Error::IndexNotBuilt)
    ));
}

#[test]
fn empty_corpus_returns_empty_results() {
    let index = Bm25Index::new(Bm25Params::default());
    index.index(&[]).expect("index");
    let hits = index.search("anything", 10, None).expect("search");
    assert!(hits.is_empty());
}

#[test]
fn empty_and_stopword_only_queries_return_nothing() {
    let index = Bm25Index::new(Bm25Params::default());
    index.index(&cache_corpus()).expect("index");
    assert!(index.search("", 10, None).expect("search").is_empty());
    assert!(index.search("   ", 10, None).expect("search").is_empty());
    assert!(index
        .search("the and with", 10, None)
        .expect("search")
        .is_empty());
}

#[test]
fn documents_without_query_terms_are_excluded() {
    let index = Bm25Index::new(Bm25Params::default());
    index.index(&cache_corpus()).expect("index");
    let hits = index.search("cache", 10, None).expect("search");
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["d1", "d2"]);
    assert!(hits.iter().all(|h| h.score > 0.0));
}

#[test]
fn term_frequency_ranks_repeated_terms_higher() {
    let index = Bm25Index::new(Bm25Params::default());
    index.index(&cache_corpus()).expect("index");
    let hits = index.search("cache", 10, None).expect("search");
    assert_eq!(hits[0].id, "d1");
    assert_eq!(hits[1].id, "d2");
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn score_ties_break_by_ascending_chunk_id() {
    let corpus = vec![
        chunk("zz", "zebra habitat"),
        chunk("aa", "zebra habitat"),
        chunk("d3", "disk throughput metrics"),
        chunk("d4", "network latency report"),
        chunk("d5", "memory allocation profile"),
    ];
    let index = Bm25Index::new(Bm25Params::default());
    index.index(&corpus).expect("index");
    let hits = index.search("zebra", 10, None).expect("search");
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["aa", "zz"]);
    assert_eq!(hits[0].score, hits[1].score);
}

#[test]
fn reindexing_the_same_corpus_is_idempotent() {
    let index = Bm25Index::new(Bm25Params::default());
    index.index(&cache_corpus()).expect("index");
    let first: Vec<(String, f32)> = index
        .search("cache miss", 10, None)
        .expect("search")
        .into_iter()
        .map(|h| (h.id, h.score))
        .collect();
    index.index(&cache_corpus()).expect("re-index");
    let second: Vec<(String, f32)> = index
        .search("cache miss", 10, None)
        .expect("search")
        .into_iter()
        .map(|h| (h.id, h.score))
        .collect();
    assert_eq!(first, second);
}

#[test]
fn reindexing_replaces_the_prior_corpus() {
    let index = Bm25Index::new(Bm25Params::default());
    index.index(&cache_corpus()).expect("index");
    assert!(!index.search("cache", 10, None).expect("search").is_empty());

    index
        .index(&[chunk("x1", "completely different content")])
        .expect("re-index");
    assert!(index.search("cache", 10, None).expect("search").is_empty());
}

#[test]
fn repeated_searches_are_deterministic() {
    let index = Bm25Index::new(Bm25Params::default());
    index.index(&cache_corpus()).expect("index");
    let a = index.search("cache miss penalty", 10, None).expect("search");
    let b = index.search("cache miss penalty", 10, None).expect("search");
    let pairs = |hits: &[ragdb_core::types::SearchHit]| {
        hits.iter()
            .map(|h| (h.id.clone(), h.score.to_bits()))
            .collect::<Vec<_>>()
    };
    assert_eq!(pairs(&a), pairs(&b));
}

#[test]
fn top_k_truncates_the_result_list() {
    let index = Bm25Index::new(Bm25Params::default());
    index.index(&cache_corpus()).expect("index");
    let hits = index.search("cache", 1, None).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "d1");
}

#[test]
fn structural_filter_restricts_candidates_before_scoring() {
    let mut corpus = cache_corpus();
    let mut tagged = (*corpus[1]).clone();
    tagged.doc_type = "text".to_string();
    corpus[1] = Arc::new(tagged);

    let index = Bm25Index::new(Bm25Params::default());
    index.index(&corpus).expect("index");

    let filters = SearchFilters {
        doc_type: Some("text".to_string()),
        ..Default::default()
    };
    let hits = index.search("cache", 10, Some(&filters)).expect("search");
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["d2"]);
}
