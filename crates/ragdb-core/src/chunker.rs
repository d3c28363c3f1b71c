//! Directory-to-chunk ingestion for the CLI and tests.
//!
//! Splits `.md`/`.txt` files on blank lines, carries the enclosing heading
//! as the chunk section, and records source line ranges. Oversized
//! paragraphs are re-split on word windows with overlap.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::Chunk;

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            overlap_percent: 0.2,
        }
    }
}

#[derive(Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

struct Paragraph {
    text: String,
    line_start: usize,
    line_end: usize,
    section: String,
    title: String,
}

impl Chunker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Chunk>> {
        let files = self.list_source_files(data_dir);
        if files.is_empty() {
            info!(dir = %data_dir.display(), "no .md or .txt files found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for file_path in &files {
            let content = self.read_file_content(file_path)?;
            let chunks = self.chunk_file(&content, file_path, data_dir)?;
            debug!(file = %file_path.display(), chunks = chunks.len(), "chunked file");
            all_chunks.extend(chunks);
        }
        info!(
            files = files.len(),
            chunks = all_chunks.len(),
            "processed corpus directory"
        );
        Ok(all_chunks)
    }

    pub fn chunk_file(&self, content: &str, file_path: &Path, data_dir: &Path) -> Result<Vec<Chunk>> {
        let doc_id = file_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let doc_type = match file_path.extension().and_then(|s| s.to_str()) {
            Some("md") => "markdown",
            _ => "text",
        };
        let updated_at = file_mtime(file_path);
        let tags = tags_from_path(file_path, data_dir);

        let mut chunks = Vec::new();
        let mut chunk_index = 0usize;
        for paragraph in split_paragraphs(content, &doc_id) {
            let token_estimate = estimate_tokens(&paragraph.text);
            let pieces: Vec<String> = if token_estimate <= self.config.max_tokens {
                vec![paragraph.text.clone()]
            } else {
                self.split_paragraph_with_overlap(&paragraph.text)
            };
            for piece in pieces {
                chunks.push(Chunk {
                    id: format!("{doc_id}:{chunk_index}"),
                    doc_id: doc_id.clone(),
                    title: paragraph.title.clone(),
                    section: paragraph.section.clone(),
                    path: file_path.to_string_lossy().to_string(),
                    line_start: paragraph.line_start,
                    line_end: paragraph.line_end,
                    text: piece,
                    embedding: Vec::new(),
                    doc_type: doc_type.to_string(),
                    version: "1.0".to_string(),
                    created_at: None,
                    updated_at,
                    tags: tags.clone(),
                    metadata: Default::default(),
                });
                chunk_index += 1;
            }
        }
        Ok(chunks)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let words_per_chunk = 300;
        let overlap_words = (words_per_chunk as f32 * self.config.overlap_percent) as usize;
        let mut pieces = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            pieces.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap_words;
        }
        pieces
    }

    fn list_source_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if matches!(
                path.extension().and_then(|s| s.to_str()),
                Some("txt") | Some("md")
            ) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        files
    }
}

/// Group lines into blank-line-separated paragraphs, tracking the enclosing
/// markdown heading as the section and the first heading as the title.
fn split_paragraphs(content: &str, doc_id: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut buf: Vec<&str> = Vec::new();
    let mut buf_start = 0usize;
    let mut title = String::new();
    let mut section = String::new();
    let mut lineno = 0usize;
    for (i, line) in content.lines().enumerate() {
        lineno = i + 1;
        if let Some(rest) = line.trim_start().strip_prefix('#') {
            let heading = rest.trim_start_matches('#').trim();
            if !heading.is_empty() {
                if title.is_empty() {
                    title = heading.to_string();
                }
                section = heading.to_string();
            }
        }
        if line.trim().is_empty() {
            if !buf.is_empty() {
                paragraphs.push(Paragraph {
                    text: buf.join("\n"),
                    line_start: buf_start,
                    line_end: lineno - 1,
                    section: section.clone(),
                    title: String::new(),
                });
                buf.clear();
            }
        } else {
            if buf.is_empty() {
                buf_start = lineno;
            }
            buf.push(line);
        }
    }
    if !buf.is_empty() {
        paragraphs.push(Paragraph {
            text: buf.join("\n"),
            line_start: buf_start,
            line_end: lineno,
            section: section.clone(),
            title: String::new(),
        });
    }
    let title = if title.is_empty() {
        doc_id.to_string()
    } else {
        title
    };
    for p in &mut paragraphs {
        p.title = title.clone();
    }
    paragraphs
}

/// Rough token estimate from the word count, matching the chunk budget used
/// at ingestion time.
fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}

fn file_mtime(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Parent directories relative to the corpus root become tags.
fn tags_from_path(file_path: &Path, data_dir: &Path) -> Vec<String> {
    let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path);
    relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
