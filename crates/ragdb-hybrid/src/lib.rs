pub mod engine;
pub mod filter;
pub mod fusion;
pub mod rerank;

pub use engine::HybridRetriever;
pub use rerank::Reranker;
