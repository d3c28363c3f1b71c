//! Corpus persistence: the ingest/query handoff used by the CLI.
//!
//! The corpus file is the JSON-serialized chunk list, embeddings included.
//! The vector store's own persistence is the external store's concern; this
//! file only feeds re-indexing of the in-process engines.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::types::Chunk;

pub fn save_corpus(path: &Path, chunks: &[Chunk]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string(chunks).context("serializing corpus")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn load_corpus(path: &Path) -> Result<Vec<Chunk>> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let chunks: Vec<Chunk> = serde_json::from_str(&json).context("parsing corpus")?;
    Ok(chunks)
}
