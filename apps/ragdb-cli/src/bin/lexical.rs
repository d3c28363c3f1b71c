use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use ragdb_core::corpus;
use ragdb_core::traits::LexicalSearch;
use ragdb_lexical::{Bm25Index, Bm25Params};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [corpus_file]", args[0]);
        eprintln!("Example: {} 'token refresh' ./data/corpus.json", args[0]);
        std::process::exit(1);
    }
    let query_text = &args[1];
    let corpus_file = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data/corpus.json"));

    println!("🔍 ragdb-lexical-search\n=======================");
    println!("Query: {}", query_text);
    println!("Corpus: {}", corpus_file.display());

    let chunks = corpus::load_corpus(&corpus_file)?;
    let shared: Vec<Arc<_>> = chunks.into_iter().map(Arc::new).collect();
    let index = Bm25Index::new(Bm25Params::default());
    index.index(&shared)?;

    let hits = index.search(query_text, 10, None)?;
    println!("\n🔍 Found {} results for: \"{}\"", hits.len(), query_text);
    for (i, hit) in hits.iter().enumerate() {
        println!("  {}. score={:.4}  id={}", i + 1, hit.score, hit.id);
    }
    Ok(())
}
