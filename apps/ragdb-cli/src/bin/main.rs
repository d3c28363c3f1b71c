use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use ragdb_core::chunker::Chunker;
use ragdb_core::config::Config;
use ragdb_core::corpus;
use ragdb_core::traits::Embedder;
use ragdb_hybrid::HybridRetriever;
use ragdb_vector::{HashingEmbedder, MemoryVectorStore};

const DEFAULT_EMBED_DIM: usize = 256;
const EMBED_BATCH: usize = 64;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|query> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn corpus_file(config: &Config) -> PathBuf {
    let path: String = config
        .get("data.corpus_file")
        .unwrap_or_else(|_| "./data/corpus.json".to_string());
    ragdb_core::config::expand_path(path)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let config = Config::load()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let data_dir = args.first().map(PathBuf::from).unwrap_or_else(|| {
                let dir: String = config
                    .get("data.raw_dir")
                    .unwrap_or_else(|_| "./data/docs".to_string());
                PathBuf::from(dir)
            });
            let dim: usize = config
                .get("embedding.dim")
                .unwrap_or(DEFAULT_EMBED_DIM);
            println!("Ingesting from {}", data_dir.display());

            let chunker = Chunker::new();
            let mut chunks = chunker.process_directory(&data_dir)?;
            let embedder = HashingEmbedder::new(dim)?;

            let bar = ProgressBar::new(chunks.len() as u64);
            bar.set_style(ProgressStyle::with_template(
                "{bar:40} {pos}/{len} chunks embedded",
            )?);
            for batch in chunks.chunks_mut(EMBED_BATCH) {
                let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
                let embeddings = embedder.embed_batch(&texts)?;
                for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                    chunk.embedding = embedding;
                }
                bar.inc(batch.len() as u64);
            }
            bar.finish();

            let out = corpus_file(&config);
            corpus::save_corpus(&out, &chunks)?;
            println!("✅ Ingest complete: {} chunks -> {}", chunks.len(), out.display());
        }
        "query" => {
            let query_text = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: ragdb query \"<query>\" [top_k]");
                std::process::exit(1)
            });
            let retrieval = config.retrieval()?;
            let top_k: usize = args
                .get(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(retrieval.top_k);

            let chunks = corpus::load_corpus(&corpus_file(&config))?;
            let dim = chunks
                .iter()
                .map(|c| c.embedding.len())
                .find(|&d| d > 0)
                .unwrap_or(DEFAULT_EMBED_DIM);
            let store = Arc::new(MemoryVectorStore::new(dim));
            let embedder = Arc::new(HashingEmbedder::new(dim)?);
            let engine = HybridRetriever::new(retrieval, store, embedder)?;

            let rt = tokio::runtime::Runtime::new()?;
            let results = rt.block_on(async {
                engine.index(chunks).await?;
                engine.search(&query_text, top_k, None).await
            })?;

            println!("\n🔍 Found {} results for: \"{}\"", results.len(), query_text);
            for candidate in &results {
                let chunk = &candidate.chunk;
                println!(
                    "\n  {}. score={:.4}  id={}  {}:{}-{}",
                    candidate.rank,
                    candidate.effective_score(),
                    chunk.id,
                    chunk.path,
                    chunk.line_start,
                    chunk.line_end
                );
                if !chunk.section.is_empty() {
                    println!("     section: {}", chunk.section);
                }
                let snippet: String = chunk.text.chars().take(120).collect();
                println!("     {}", snippet.replace('\n', " "));
            }
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
