use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};

use recall_core::settings::VectorConfig;
use recall_core::text::truncate_chars;
use recall_core::traits::Embedder;
use recall_core::types::{Document, Meta, SearchResult, SourceKind};
use recall_core::Error;
use recall_embed::l2_normalize;

/// A document left out of the vector index because its content was too short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub doc_id: String,
    pub chars: usize,
}

/// Flat, exact inner-product index over unit vectors.
///
/// Row `i` of `vectors` (length `dim`) belongs to `doc_ids[i]`, `texts[i]` and
/// `metadata[i]`; the four are always the same length.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    pub(crate) dim: usize,
    pub(crate) embedder_id: String,
    pub(crate) vectors: Vec<f32>,
    pub(crate) doc_ids: Vec<String>,
    pub(crate) texts: Vec<String>,
    pub(crate) metadata: Vec<Meta>,
    pub(crate) skipped: Vec<SkippedDocument>,
    pub(crate) built_at: DateTime<Utc>,
}

impl VectorIndex {
    pub fn empty(dim: usize, embedder_id: &str) -> Self {
        Self {
            dim,
            embedder_id: embedder_id.to_string(),
            vectors: Vec::new(),
            doc_ids: Vec::new(),
            texts: Vec::new(),
            metadata: Vec::new(),
            skipped: Vec::new(),
            built_at: Utc::now(),
        }
    }

    /// Embed every document whose trimmed content has at least
    /// `config.min_content_chars` characters. Batches of `config.batch_size`
    /// are sent to the embedder with up to `config.concurrency` in flight;
    /// output order always follows input order.
    pub async fn build(
        documents: &[Document],
        embedder: &dyn Embedder,
        config: &VectorConfig,
        progress: Option<&ProgressBar>,
    ) -> Result<Self> {
        let mut index = Self::empty(embedder.dim(), embedder.embedder_id());
        let mut eligible: Vec<&Document> = Vec::with_capacity(documents.len());
        for doc in documents {
            let chars = doc.content.trim().chars().count();
            if chars < config.min_content_chars {
                tracing::warn!(doc_id = %doc.id, chars, min = config.min_content_chars, "skipping short document for vector index");
                index.skipped.push(SkippedDocument { doc_id: doc.id.clone(), chars });
            } else {
                eligible.push(doc);
            }
        }
        if let Some(pb) = progress { pb.set_length(eligible.len() as u64); }
        if eligible.is_empty() {
            tracing::warn!("no documents eligible for the vector index");
            return Ok(index);
        }

        let batch_size = config.batch_size.max(1);
        let batches: Vec<Vec<String>> = eligible
            .chunks(batch_size)
            .map(|chunk| chunk.iter().map(|d| d.content.clone()).collect())
            .collect();
        let mut results = futures::stream::iter(batches)
            .map(|texts| async move {
                let n = texts.len();
                embedder.embed_batch(&texts).await.map(|v| (n, v))
            })
            .buffered(config.concurrency.max(1));

        index.vectors.reserve(eligible.len() * index.dim);
        let mut next = 0usize;
        while let Some(batch) = results.next().await {
            let (expected, embeddings) = batch?;
            if embeddings.len() != expected {
                return Err(anyhow!("embedder returned {} vectors for {} documents", embeddings.len(), expected));
            }
            for mut v in embeddings {
                if v.len() != index.dim {
                    return Err(Error::DimensionMismatch { expected: index.dim, found: v.len() }.into());
                }
                l2_normalize(&mut v);
                let doc = eligible[next];
                index.vectors.extend_from_slice(&v);
                index.doc_ids.push(doc.id.clone());
                index.texts.push(truncate_chars(&doc.content, config.preview_chars).to_string());
                index.metadata.push(doc.metadata());
                next += 1;
            }
            if let Some(pb) = progress { pb.set_position(next as u64); }
        }

        index.built_at = Utc::now();
        tracing::info!(indexed = index.len(), skipped = index.skipped.len(), dim = index.dim, "vector index built");
        Ok(index)
    }

    /// Embed `query` and return its nearest neighbours. An empty index answers
    /// without calling the embedder.
    pub async fn search(&self, query: &str, k: usize, embedder: &dyn Embedder) -> Result<Vec<SearchResult>> {
        if self.is_empty() || k == 0 { return Ok(Vec::new()); }
        let mut out = embedder.embed_batch(&[query.to_string()]).await?;
        let q = out.pop().ok_or_else(|| anyhow!("embedder returned no vector for the query"))?;
        Ok(self.search_vec(&q, k)?)
    }

    /// Top-`k` rows by inner product with `query`, best first. Rows scoring
    /// zero or below are dropped; ties go to the smaller doc id.
    pub fn search_vec(&self, query: &[f32], k: usize) -> recall_core::Result<Vec<SearchResult>> {
        if self.is_empty() || k == 0 { return Ok(Vec::new()); }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, found: query.len() });
        }
        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, v)| (row, dot(&q, v)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.doc_ids[a.0].cmp(&self.doc_ids[b.0]))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (row, score))| SearchResult {
                doc_id: self.doc_ids[row].clone(),
                score,
                rank: i + 1,
                text: self.texts[row].clone(),
                metadata: self.metadata[row].clone(),
                source: SourceKind::Vector,
                exact_phrase: false,
            })
            .collect())
    }

    pub fn len(&self) -> usize { self.doc_ids.len() }
    pub fn is_empty(&self) -> bool { self.doc_ids.is_empty() }
    pub fn dim(&self) -> usize { self.dim }
    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn doc_ids(&self) -> &[String] { &self.doc_ids }
    pub fn skipped(&self) -> &[SkippedDocument] { &self.skipped }
    pub fn built_at(&self) -> DateTime<Utc> { self.built_at }

    /// Stored unit vector for row `row`.
    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dim)?;
        self.vectors.get(start..start + self.dim)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
