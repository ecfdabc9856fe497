//! Adaptive score cutoff followed by near-duplicate removal.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use recall_core::settings::FilterConfig;
use recall_core::text::normalize_whitespace_lower;
use recall_core::types::{DocId, FusedResult};
use recall_core::Corpus;

/// Doc ids surviving the cutoff and deduplication, in fused rank order.
///
/// A candidate must reach `cutoff_ratio` of the best candidate twice: on the
/// fused score (with `min_score` as an absolute floor) and on `relevance`.
/// When the best fused score is not positive nothing survives.
///
/// A survivor is dropped when its normalized text is contained in an already
/// kept document, or when at least `dedup_overlap` of its word shingles are.
pub fn filter(fused: &[FusedResult], corpus: &Corpus, config: &FilterConfig) -> Vec<DocId> {
    let max_score = fused.iter().map(|r| r.fused_score).fold(0.0f32, f32::max);
    if max_score <= 0.0 { return Vec::new(); }
    let cutoff = (max_score * config.cutoff_ratio).max(config.min_score);
    let max_relevance = fused.iter().map(|r| r.relevance).fold(0.0f32, f32::max);
    let relevance_cutoff = max_relevance * config.cutoff_ratio;

    let mut kept: Vec<Fingerprint> = Vec::new();
    let mut out = Vec::new();
    for candidate in fused.iter().filter(|r| r.fused_score >= cutoff && r.relevance >= relevance_cutoff) {
        let Some(doc) = corpus.get(&candidate.doc_id) else {
            tracing::warn!(doc_id = %candidate.doc_id, "fused result not in corpus");
            continue;
        };
        let fp = Fingerprint::new(&doc.content, config.shingle_words);
        if let Some(dup_of) = kept.iter().position(|k| fp.duplicates(k, config.dedup_overlap)) {
            tracing::debug!(doc_id = %candidate.doc_id, duplicate_of = %out[dup_of], "dropping near-duplicate");
            continue;
        }
        kept.push(fp);
        out.push(candidate.doc_id.clone());
    }
    tracing::debug!(candidates = fused.len(), cutoff, relevance_cutoff, kept = out.len(), "threshold filter");
    out
}

struct Fingerprint {
    normalized: String,
    shingles: HashSet<u64>,
}

impl Fingerprint {
    fn new(content: &str, shingle_words: usize) -> Self {
        let normalized = normalize_whitespace_lower(content);
        let words: Vec<&str> = normalized.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
        let n = shingle_words.max(1);
        let shingles = if words.is_empty() {
            HashSet::new()
        } else if words.len() < n {
            std::iter::once(hash_words(&words)).collect()
        } else {
            words.windows(n).map(hash_words).collect()
        };
        Self { normalized, shingles }
    }

    /// Whether `self` adds nothing material beyond `kept`.
    fn duplicates(&self, kept: &Fingerprint, overlap: f32) -> bool {
        if self.normalized.is_empty() { return false; }
        if kept.normalized.contains(&self.normalized) { return true; }
        if self.shingles.is_empty() { return false; }
        let shared = self.shingles.intersection(&kept.shingles).count();
        shared as f32 / self.shingles.len() as f32 >= overlap
    }
}

fn hash_words(words: &[&str]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    words.hash(&mut hasher);
    hasher.finish()
}
