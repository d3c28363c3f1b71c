//! Deterministic feature-hashing embedder.
//!
//! Buckets tokens into a fixed-dimension vector with a signed xxHash and
//! L2-normalizes the result. Not a semantic model: it exists so the CLI and
//! tests can run the full pipeline without model inference, and a real
//! embedder replaces it behind the `Embedder` trait.

use std::hash::Hasher;

use twox_hash::XxHash64;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;

const HASH_SEED: u64 = 0;

pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig(
                "embedding dimension must be at least 1".into(),
            ));
        }
        Ok(Self { dim })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = XxHash64::with_seed(HASH_SEED);
            hasher.write(token.as_bytes());
            let hash = hasher.finish();
            let bucket = (hash % self.dim as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
