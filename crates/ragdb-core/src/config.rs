//! Layered configuration and retrieval tunables.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `RAGDB_*` env
//! vars. `RetrievalConfig` is extracted from the `retrieval` table on top of
//! its defaults and validated once at load time; it is read-only afterwards
//! and passed explicitly into the fusion engine and reranker.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Tolerance when checking that weight groups sum to 1.0.
const WEIGHT_SUM_TOLERANCE: f32 = 1e-4;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("RAGDB_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the `retrieval` table. Invalid tunables fail
    /// here, at load time, never at query time.
    pub fn retrieval(&self) -> anyhow::Result<RetrievalConfig> {
        let config: RetrievalConfig = Figment::new()
            .merge(Serialized::defaults(RetrievalConfig::default()))
            .merge(self.figment.focus("retrieval"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

/// Weights of the reranker's five sub-scores. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RerankWeights {
    #[serde(default = "default_rerank_base")]
    pub base: f32,
    #[serde(default = "default_rerank_semantic")]
    pub semantic: f32,
    #[serde(default = "default_rerank_quality")]
    pub quality: f32,
    #[serde(default = "default_rerank_freshness")]
    pub freshness: f32,
    #[serde(default = "default_rerank_metadata")]
    pub metadata: f32,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            base: default_rerank_base(),
            semantic: default_rerank_semantic(),
            quality: default_rerank_quality(),
            freshness: default_rerank_freshness(),
            metadata: default_rerank_metadata(),
        }
    }
}

impl RerankWeights {
    pub fn sum(&self) -> f32 {
        self.base + self.semantic + self.quality + self.freshness + self.metadata
    }
}

/// Process-wide retrieval tunables. Loaded once at startup, read-only
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Weight of the normalized vector score in fusion.
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,
    /// Weight of the normalized BM25 score in fusion. Must satisfy
    /// `vector_weight + bm25_weight == 1.0`.
    #[serde(default = "default_bm25_weight")]
    pub bm25_weight: f32,
    /// Multiplier applied to candidates found by both engines.
    #[serde(default = "default_overlap_boost")]
    pub overlap_boost: f32,
    #[serde(default = "default_enable_reranking")]
    pub enable_reranking: bool,
    #[serde(default = "default_enable_filtering")]
    pub enable_filtering: bool,
    /// Default number of results returned to the caller.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Candidates past this depth keep their fused rank unchanged.
    #[serde(default = "default_rerank_pool_size")]
    pub rerank_pool_size: usize,
    #[serde(default)]
    pub rerank_weights: RerankWeights,
    #[serde(default = "default_freshness_half_life_days")]
    pub freshness_half_life_days: f32,
    #[serde(default = "default_bm25_k1")]
    pub bm25_k1: f32,
    #[serde(default = "default_bm25_b")]
    pub bm25_b: f32,
    /// Deadline for the vector store call; a timeout degrades the query to
    /// lexical-only ranking instead of failing it.
    #[serde(default = "default_vector_timeout_ms")]
    pub vector_timeout_ms: u64,
}

fn default_vector_weight() -> f32 {
    0.7
}
fn default_bm25_weight() -> f32 {
    0.3
}
fn default_overlap_boost() -> f32 {
    1.2
}
fn default_enable_reranking() -> bool {
    true
}
fn default_enable_filtering() -> bool {
    true
}
fn default_top_k() -> usize {
    20
}
fn default_rerank_pool_size() -> usize {
    100
}
fn default_rerank_base() -> f32 {
    0.40
}
fn default_rerank_semantic() -> f32 {
    0.30
}
fn default_rerank_quality() -> f32 {
    0.20
}
fn default_rerank_freshness() -> f32 {
    0.05
}
fn default_rerank_metadata() -> f32 {
    0.05
}
fn default_freshness_half_life_days() -> f32 {
    180.0
}
fn default_bm25_k1() -> f32 {
    1.5
}
fn default_bm25_b() -> f32 {
    0.75
}
fn default_vector_timeout_ms() -> u64 {
    3_000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_weight: default_vector_weight(),
            bm25_weight: default_bm25_weight(),
            overlap_boost: default_overlap_boost(),
            enable_reranking: default_enable_reranking(),
            enable_filtering: default_enable_filtering(),
            top_k: default_top_k(),
            rerank_pool_size: default_rerank_pool_size(),
            rerank_weights: RerankWeights::default(),
            freshness_half_life_days: default_freshness_half_life_days(),
            bm25_k1: default_bm25_k1(),
            bm25_b: default_bm25_b(),
            vector_timeout_ms: default_vector_timeout_ms(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        check_weight("vector_weight", self.vector_weight)?;
        check_weight("bm25_weight", self.bm25_weight)?;
        let fusion_sum = self.vector_weight + self.bm25_weight;
        if (fusion_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::InvalidConfig(format!(
                "vector_weight + bm25_weight must equal 1.0, got {fusion_sum}"
            )));
        }
        if !self.overlap_boost.is_finite() || self.overlap_boost <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "overlap_boost must be a positive finite number, got {}",
                self.overlap_boost
            )));
        }
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".into()));
        }
        if self.rerank_pool_size == 0 {
            return Err(Error::InvalidConfig(
                "rerank_pool_size must be at least 1".into(),
            ));
        }
        let w = &self.rerank_weights;
        check_weight("rerank_weights.base", w.base)?;
        check_weight("rerank_weights.semantic", w.semantic)?;
        check_weight("rerank_weights.quality", w.quality)?;
        check_weight("rerank_weights.freshness", w.freshness)?;
        check_weight("rerank_weights.metadata", w.metadata)?;
        if (w.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::InvalidConfig(format!(
                "rerank weights must sum to 1.0, got {}",
                w.sum()
            )));
        }
        if !self.freshness_half_life_days.is_finite() || self.freshness_half_life_days <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "freshness_half_life_days must be positive, got {}",
                self.freshness_half_life_days
            )));
        }
        if !self.bm25_k1.is_finite() || self.bm25_k1 <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "bm25_k1 must be positive, got {}",
                self.bm25_k1
            )));
        }
        if !self.bm25_b.is_finite() || !(0.0..=1.0).contains(&self.bm25_b) {
            return Err(Error::InvalidConfig(format!(
                "bm25_b must lie in [0, 1], got {}",
                self.bm25_b
            )));
        }
        if self.vector_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "vector_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn check_weight(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidConfig(format!(
            "{name} must be a non-negative finite number, got {value}"
        )));
    }
    Ok(())
}
