//! In-memory BM25 index over the chunk corpus.
//!
//! The index is copy-on-rebuild: `index()` builds a complete new snapshot
//! and swaps it in atomically, so concurrent searches always see either the
//! old or the new corpus, never a partial one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use ragdb_core::error::{Error, Result};
use ragdb_core::filters::SearchFilters;
use ragdb_core::traits::LexicalSearch;
use ragdb_core::types::{Chunk, SearchHit, SourceKind};

use crate::tokenize::Tokenizer;

/// BM25 scoring parameters.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// One fully-built generation of the index. Documents are ordered by
/// ascending chunk id, which makes the doc index a deterministic tie-break.
struct Snapshot {
    docs: Vec<Arc<Chunk>>,
    doc_lens: Vec<f32>,
    avg_len: f32,
    /// term -> (doc index, term frequency), doc indices ascending.
    postings: HashMap<String, Vec<(u32, u32)>>,
}

pub struct Bm25Index {
    params: Bm25Params,
    tokenizer: Tokenizer,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl Bm25Index {
    pub fn new(params: Bm25Params) -> Self {
        Self {
            params,
            tokenizer: Tokenizer::default(),
            snapshot: RwLock::new(None),
        }
    }

    fn build_snapshot(&self, chunks: &[Arc<Chunk>]) -> Snapshot {
        let mut docs: Vec<Arc<Chunk>> = chunks.to_vec();
        docs.sort_by(|a, b| a.id.cmp(&b.id));

        let mut postings: HashMap<String, Vec<(u32, u32)>> = HashMap::new();
        let mut doc_lens = Vec::with_capacity(docs.len());
        for (doc_idx, chunk) in docs.iter().enumerate() {
            let tokens = self.tokenizer.tokenize(&chunk.text);
            doc_lens.push(tokens.len() as f32);
            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for (term, count) in tf {
                postings.entry(term).or_default().push((doc_idx as u32, count));
            }
        }
        for list in postings.values_mut() {
            list.sort_by_key(|&(doc, _)| doc);
        }
        let avg_len = if docs.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<f32>() / docs.len() as f32
        };
        Snapshot {
            docs,
            doc_lens,
            avg_len,
            postings,
        }
    }

    fn current(&self) -> Result<Arc<Snapshot>> {
        self.snapshot.read().clone().ok_or(Error::IndexNotBuilt)
    }
}

impl LexicalSearch for Bm25Index {
    /// Rebuild term statistics from scratch and swap the new snapshot in.
    /// Re-indexing the same corpus is idempotent.
    fn index(&self, chunks: &[Arc<Chunk>]) -> Result<()> {
        let snapshot = self.build_snapshot(chunks);
        debug!(
            docs = snapshot.docs.len(),
            terms = snapshot.postings.len(),
            "lexical index rebuilt"
        );
        *self.snapshot.write() = Some(Arc::new(snapshot));
        Ok(())
    }

    fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SearchFilters>,
    ) -> Result<Vec<SearchHit>> {
        let snap = self.current()?;
        if snap.docs.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let terms = self.tokenizer.tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        // Predicate pushdown: structural filters shrink the candidate set
        // before any scoring happens.
        let allowed: Option<Vec<bool>> = filter
            .filter(|f| f.has_structural_predicates())
            .map(|f| snap.docs.iter().map(|c| f.matches_chunk(c)).collect());

        let n = snap.docs.len() as f32;
        let k1 = self.params.k1;
        let b = self.params.b;
        let mut scores: HashMap<u32, f32> = HashMap::new();
        for term in &terms {
            let Some(postings) = snap.postings.get(term) else {
                continue;
            };
            let df = postings.len() as f32;
            // Robertson IDF, floored at zero: a term present in most of the
            // corpus must not push a document's score negative.
            let idf = ((n - df + 0.5) / (df + 0.5)).ln().max(0.0);
            if idf == 0.0 {
                continue;
            }
            for &(doc, tf) in postings {
                if let Some(allowed) = &allowed {
                    if !allowed[doc as usize] {
                        continue;
                    }
                }
                let tf = tf as f32;
                let len_norm = 1.0 - b + b * snap.doc_lens[doc as usize] / snap.avg_len;
                let tf_norm = tf * (k1 + 1.0) / (tf + k1 * len_norm);
                *scores.entry(doc).or_insert(0.0) += idf * tf_norm;
            }
        }

        let mut hits: Vec<(u32, f32)> = scores
            .into_iter()
            .filter(|&(_, score)| score > 0.0)
            .collect();
        // Descending score; ties by ascending chunk id (== ascending doc index).
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hits.truncate(top_k);

        Ok(hits
            .into_iter()
            .map(|(doc, score)| SearchHit {
                id: snap.docs[doc as usize].id.clone(),
                score,
                source: SourceKind::Lexical,
            })
            .collect())
    }
}
