use chrono::Utc;
use tempfile::TempDir;

use ragdb_core::corpus::{load_corpus, save_corpus};
use ragdb_core::types::Chunk;

#[test]
fn corpus_round_trips_through_json() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("indexes/corpus.json");

    let chunks = vec![Chunk {
        id: "doc:0".to_string(),
        doc_id: "doc".to_string(),
        title: "Doc".to_string(),
        section: "Intro".to_string(),
        path: "docs/doc.md".to_string(),
        line_start: 1,
        line_end: 4,
        text: "hello retrieval".to_string(),
        embedding: vec![0.25, -0.5, 0.75],
        doc_type: "markdown".to_string(),
        version: "1.0".to_string(),
        created_at: Some(Utc::now()),
        updated_at: Some(Utc::now()),
        tags: vec!["intro".to_string()],
        metadata: Default::default(),
    }];

    save_corpus(&path, &chunks).expect("save");
    let loaded = load_corpus(&path).expect("load");

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, chunks[0].id);
    assert_eq!(loaded[0].embedding, chunks[0].embedding);
    assert_eq!(loaded[0].updated_at, chunks[0].updated_at);
    assert_eq!(loaded[0].tags, chunks[0].tags);
}
