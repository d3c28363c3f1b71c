//! Tokenization shared by indexing and query scoring.
//!
//! The pipeline is lowercase, punctuation split, short-token drop, stopword
//! removal, Snowball stemming. Index-time and query-time tokenization must
//! be identical or term statistics stop lining up.

use rust_stemmers::{Algorithm, Stemmer};

/// Tokens shorter than this are dropped before stopword filtering.
pub const MIN_TOKEN_LEN: usize = 3;

/// Fixed English stopword list, sorted for binary search.
const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "all", "and", "any", "are", "because", "been", "before",
    "being", "below", "between", "both", "but", "can", "did", "does", "doing", "down", "during",
    "each", "few", "for", "from", "further", "had", "has", "have", "having", "her", "here", "hers",
    "him", "his", "how", "into", "its", "itself", "just", "more", "most", "not", "now", "off",
    "once", "only", "other", "our", "ours", "out", "over", "own", "same", "she", "should", "some",
    "such", "than", "that", "the", "their", "theirs", "them", "then", "there", "these", "they",
    "this", "those", "through", "too", "under", "until", "very", "was", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "you", "your", "yours",
];

pub struct Tokenizer {
    stemmer: Stemmer,
    strip_stopwords: bool,
    stem: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl Tokenizer {
    pub fn new(strip_stopwords: bool, stem: bool) -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
            strip_stopwords,
            stem,
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut tokens = Vec::new();
        for raw in lowered.split(|c: char| !c.is_alphanumeric()) {
            if raw.chars().count() < MIN_TOKEN_LEN {
                continue;
            }
            if self.strip_stopwords && STOPWORDS.binary_search(&raw).is_ok() {
                continue;
            }
            let token = if self.stem {
                self.stemmer.stem(raw).into_owned()
            } else {
                raw.to_string()
            };
            tokens.push(token);
        }
        tokens
    }
}
