//! Caller-supplied hard constraints on search results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Chunk;

/// A predicate set applied with AND semantics. Constructed once per query
/// and never mutated.
///
/// `min_score` is checked against the candidate's final score by the filter
/// layer; every other predicate is structural and can also be pushed down
/// into the engines before scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub doc_type: Option<String>,
    pub section: Option<String>,
    pub path_contains: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub min_score: Option<f32>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

impl SearchFilters {
    /// True when every structural and date predicate accepts the chunk.
    /// Chunks without a timestamp pass date bounds.
    pub fn matches_chunk(&self, chunk: &Chunk) -> bool {
        if let Some(doc_type) = &self.doc_type {
            if !chunk
                .doc_type
                .to_lowercase()
                .contains(&doc_type.to_lowercase())
            {
                return false;
            }
        }
        if let Some(section) = &self.section {
            if !chunk
                .section
                .to_lowercase()
                .contains(&section.to_lowercase())
            {
                return false;
            }
        }
        if let Some(fragment) = &self.path_contains {
            if !chunk.path.contains(fragment.as_str()) {
                return false;
            }
        }
        for tag in &self.tags {
            if !chunk.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if !within(chunk.created_at, self.created_after, self.created_before) {
            return false;
        }
        if !within(chunk.updated_at, self.updated_after, self.updated_before) {
            return false;
        }
        true
    }

    /// True when any predicate besides `min_score` is set.
    pub fn has_structural_predicates(&self) -> bool {
        self.doc_type.is_some()
            || self.section.is_some()
            || self.path_contains.is_some()
            || !self.tags.is_empty()
            || self.created_after.is_some()
            || self.created_before.is_some()
            || self.updated_after.is_some()
            || self.updated_before.is_some()
    }
}

fn within(
    ts: Option<DateTime<Utc>>,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
) -> bool {
    if after.is_none() && before.is_none() {
        return true;
    }
    let Some(ts) = ts else {
        return true;
    };
    if let Some(after) = after {
        if ts < after {
            return false;
        }
    }
    if let Some(before) = before {
        if ts > before {
            return false;
        }
    }
    true
}
