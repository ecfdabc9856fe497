//! Domain types shared by the lexical, vector and hybrid engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DocId = String;
pub type Meta = BTreeMap<String, String>;

/// A pre-extracted source document.
///
/// - `id`: stable, unique identifier (relative path or caller-supplied id)
/// - `file_name`: label shown to the downstream model in assembled context
/// - `content`: the full UTF-8 text payload
/// - `summary`/`keywords`/`category`/`indexed_at`: optional ingestion metadata
///
/// Documents are immutable once indexed; a rebuild replaces the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub file_name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(id: impl Into<String>, file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            content: content.into(),
            summary: None,
            keywords: Vec::new(),
            category: None,
            indexed_at: None,
        }
    }

    /// Length of the content in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Flattened metadata stored alongside vectors in the index side-table.
    pub fn metadata(&self) -> Meta {
        let mut meta = Meta::new();
        meta.insert("file_name".to_string(), self.file_name.clone());
        if let Some(category) = &self.category {
            meta.insert("category".to_string(), category.clone());
        }
        if !self.keywords.is_empty() {
            meta.insert("keywords".to_string(), self.keywords.join(","));
        }
        if let Some(at) = &self.indexed_at {
            meta.insert("indexed_at".to_string(), at.to_rfc3339());
        }
        meta
    }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// One entry of a per-leg ranked list.
///
/// `score` is leg-specific but always non-negative, higher is better.
/// `rank` is 1-based. `exact_phrase` is only ever set by the lexical leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub score: f32,
    pub rank: usize,
    pub text: String,
    pub metadata: Meta,
    pub source: SourceKind,
    pub exact_phrase: bool,
}

/// A document after reciprocal rank fusion of both legs.
///
/// `fused_score` only reflects ranks. `relevance` keeps the size of the
/// evidence: each leg's raw score scaled against the best of that leg, blended
/// with the fusion weights, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub doc_id: DocId,
    pub fused_score: f32,
    pub rank: usize,
    pub lexical_rank: Option<usize>,
    pub vector_rank: Option<usize>,
    pub lexical_score: Option<f32>,
    pub vector_score: Option<f32>,
    pub relevance: f32,
    pub exact_phrase: bool,
}

/// A document that made it into the assembled context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludedDocument {
    pub doc_id: DocId,
    pub file_name: String,
    pub chars: usize,
    pub truncated: bool,
}

/// Budget-bounded output of the context assembler.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetrievalContext {
    pub documents: Vec<IncludedDocument>,
    pub context: String,
    pub total_chars: usize,
    pub truncated: bool,
    pub documents_included: usize,
    pub total_documents: usize,
    pub message: String,
}

/// A retrieval call as received from the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub query: String,
    #[serde(default)]
    pub max_chars: Option<usize>,
    #[serde(default)]
    pub use_summary: bool,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), max_chars: None, use_summary: false }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }

    pub fn with_summary(mut self, use_summary: bool) -> Self {
        self.use_summary = use_summary;
        self
    }
}

/// The response payload. Every per-request outcome (no match, filtered to
/// zero, summarization skipped) is reported here with `success = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResponse {
    pub success: bool,
    pub total_documents: usize,
    pub documents_included: usize,
    pub context: String,
    pub context_length: usize,
    pub keywords_used: Vec<String>,
    #[serde(rename = "gemini_summarization")]
    pub summarized: bool,
    pub truncated: bool,
    pub sources: Vec<String>,
    pub message: String,
}
