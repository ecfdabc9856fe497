//! Typed settings sections. Every field has a default so a partial (or absent)
//! `config.toml` still yields a usable configuration; the numeric constants are
//! calibratable starting points, not fixed requirements.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::resolve_with_base;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataConfig,
    pub lexical: LexicalConfig,
    pub vector: VectorConfig,
    pub fusion: FusionConfig,
    pub filter: FilterConfig,
    pub assembly: AssemblyConfig,
    pub embedding: EmbeddingConfig,
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory of pre-extracted `.txt` documents.
    pub corpus_dir: String,
    /// Optional JSON array of document records; takes precedence over `corpus_dir`.
    pub corpus_json: Option<String>,
    /// Directory holding the two vector index artifacts.
    pub index_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            corpus_dir: "./data/corpus".to_string(),
            corpus_json: None,
            index_dir: "./data/index".to_string(),
        }
    }
}

impl DataConfig {
    pub fn corpus_dir(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.corpus_dir)
    }

    pub fn corpus_json(&self, base: &Path) -> Option<PathBuf> {
        self.corpus_json.as_ref().map(|p| resolve_with_base(base, p))
    }

    pub fn index_dir(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.index_dir)
    }
}

/// Lexical scorer tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    /// Character window within which keyword occurrences form a cluster.
    pub proximity_window: usize,
    /// Multiplier applied when the whole query occurs contiguously.
    pub exact_phrase_multiplier: f32,
    /// Weight of each cluster (scaled by distinct keywords squared).
    pub proximity_weight: f32,
    /// Document length (chars) at which the length penalty starts to bite.
    pub length_reference: usize,
    /// Exponent of the length penalty; > 1 makes it super-linear.
    pub length_exponent: f32,
    /// Keywords shorter than this many characters are dropped.
    pub min_token_chars: usize,
    /// The exact-phrase bonus only applies to queries with at least this many tokens.
    pub min_phrase_tokens: usize,
    /// Extra stopwords on top of the built-in English/Vietnamese list.
    pub extra_stopwords: Vec<String>,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            proximity_window: 50,
            exact_phrase_multiplier: 100.0,
            proximity_weight: 2.0,
            length_reference: 1000,
            length_exponent: 1.5,
            min_token_chars: 3,
            min_phrase_tokens: 2,
            extra_stopwords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Documents shorter than this (in chars, after trimming) are not embedded.
    pub min_content_chars: usize,
    /// Length of the preview text kept in the side-table.
    pub preview_chars: usize,
    pub batch_size: usize,
    /// Embedding batches in flight at once during a build.
    pub concurrency: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self { min_content_chars: 50, preview_chars: 300, batch_size: 16, concurrency: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Weight of the vector leg; the lexical leg gets `1 - alpha`.
    pub alpha: f32,
    pub rrf_k: f32,
    /// Added to documents with an exact-phrase lexical hit.
    pub phrase_boost: f32,
    /// Per-leg result count fed into fusion.
    pub candidate_limit: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { alpha: 0.5, rrf_k: 60.0, phrase_boost: 1.0, candidate_limit: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub cutoff_ratio: f32,
    /// Absolute floor on fused scores, applied on top of the ratio.
    pub min_score: f32,
    /// Shingle containment at or above which two documents are duplicates.
    pub dedup_overlap: f32,
    pub shingle_words: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { cutoff_ratio: 0.1, min_score: 0.001, dedup_overlap: 0.9, shingle_words: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    pub default_max_chars: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self { default_max_chars: 10_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "ollama", "openai" or "fake"
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dim: usize,
    pub timeout_secs: u64,
    pub use_fake: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            api_key: None,
            dim: 768,
            timeout_secs: 30,
            use_fake: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub enabled: bool,
    /// "gemini", "ollama" or "openai"
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub target_chars: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "gemini".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            timeout_secs: 20,
            target_chars: 2000,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));
        if !(0.0..=1.0).contains(&self.fusion.alpha) {
            return invalid(format!("fusion.alpha must be within [0, 1], got {}", self.fusion.alpha));
        }
        if self.fusion.rrf_k <= 0.0 {
            return invalid(format!("fusion.rrf_k must be positive, got {}", self.fusion.rrf_k));
        }
        if self.fusion.phrase_boost < 0.0 {
            return invalid("fusion.phrase_boost must not be negative".to_string());
        }
        if self.fusion.candidate_limit == 0 {
            return invalid("fusion.candidate_limit must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.filter.cutoff_ratio) {
            return invalid(format!("filter.cutoff_ratio must be within [0, 1], got {}", self.filter.cutoff_ratio));
        }
        if self.filter.min_score < 0.0 {
            return invalid("filter.min_score must not be negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.filter.dedup_overlap) || self.filter.dedup_overlap == 0.0 {
            return invalid(format!("filter.dedup_overlap must be within (0, 1], got {}", self.filter.dedup_overlap));
        }
        if self.filter.shingle_words == 0 {
            return invalid("filter.shingle_words must be at least 1".to_string());
        }
        if self.lexical.proximity_window == 0 || self.lexical.length_reference == 0 {
            return invalid("lexical.proximity_window and lexical.length_reference must be positive".to_string());
        }
        if self.lexical.exact_phrase_multiplier < 1.0 {
            return invalid("lexical.exact_phrase_multiplier must be at least 1".to_string());
        }
        if self.lexical.length_exponent < 1.0 {
            return invalid("lexical.length_exponent must be at least 1 (super-linear penalty)".to_string());
        }
        if self.vector.batch_size == 0 || self.vector.concurrency == 0 {
            return invalid("vector.batch_size and vector.concurrency must be positive".to_string());
        }
        if self.embedding.dim == 0 {
            return invalid("embedding.dim must be positive".to_string());
        }
        if self.summary.timeout_secs == 0 {
            return invalid("summary.timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}
