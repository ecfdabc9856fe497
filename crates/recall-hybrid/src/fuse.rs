use std::collections::HashMap;

use recall_core::settings::FusionConfig;
use recall_core::types::{FusedResult, SearchResult};

/// Weighted reciprocal rank fusion of the lexical and vector legs.
///
/// Each leg contributes `weight / (k + rank)` with the 1-based rank it
/// reported; the vector leg is weighted `alpha` and the lexical leg
/// `1 - alpha`. Documents flagged as exact-phrase hits by the lexical leg get
/// `phrase_boost` on top. Output is sorted by fused score, exact-phrase first
/// on ties, then by doc id, and re-ranked from 1.
///
/// Alongside the rank-based score every result gets a `relevance`: lexical
/// scores divided by the best lexical score, vector similarities min-max
/// scaled over the vector hits, weighted like the ranks.
pub fn fuse(lexical: &[SearchResult], vector: &[SearchResult], config: &FusionConfig) -> Vec<FusedResult> {
    let k = config.rrf_k;
    let mut by_id: HashMap<&str, FusedResult> = HashMap::new();

    for hit in lexical {
        let entry = by_id.entry(hit.doc_id.as_str()).or_insert_with(|| empty(&hit.doc_id));
        entry.fused_score += (1.0 - config.alpha) / (k + hit.rank as f32);
        entry.lexical_rank = Some(entry.lexical_rank.map_or(hit.rank, |r| r.min(hit.rank)));
        entry.lexical_score = Some(entry.lexical_score.map_or(hit.score, |s| s.max(hit.score)));
        entry.exact_phrase |= hit.exact_phrase;
    }
    for hit in vector {
        let entry = by_id.entry(hit.doc_id.as_str()).or_insert_with(|| empty(&hit.doc_id));
        entry.fused_score += config.alpha / (k + hit.rank as f32);
        entry.vector_rank = Some(entry.vector_rank.map_or(hit.rank, |r| r.min(hit.rank)));
        entry.vector_score = Some(entry.vector_score.map_or(hit.score, |s| s.max(hit.score)));
    }

    let max_lexical = lexical.iter().map(|h| h.score).fold(0.0f32, f32::max);
    let max_vector = vector.iter().map(|h| h.score).fold(f32::MIN, f32::max);
    let min_vector = vector.iter().map(|h| h.score).fold(f32::MAX, f32::min);
    for entry in by_id.values_mut() {
        if entry.exact_phrase { entry.fused_score += config.phrase_boost; }
        let lexical_part = match entry.lexical_score {
            Some(s) if max_lexical > 0.0 => s / max_lexical,
            _ => 0.0,
        };
        let vector_part = match entry.vector_score {
            Some(s) if max_vector > min_vector => (s - min_vector) / (max_vector - min_vector),
            Some(_) => 1.0,
            None => 0.0,
        };
        entry.relevance = (1.0 - config.alpha) * lexical_part + config.alpha * vector_part;
    }

    let mut results: Vec<FusedResult> = by_id.into_values().collect();
    results.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.exact_phrase.cmp(&a.exact_phrase))
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    for (i, r) in results.iter_mut().enumerate() { r.rank = i + 1; }
    results
}

fn empty(doc_id: &str) -> FusedResult {
    FusedResult {
        doc_id: doc_id.to_string(),
        fused_score: 0.0,
        rank: 0,
        lexical_rank: None,
        vector_rank: None,
        lexical_score: None,
        vector_score: None,
        relevance: 0.0,
        exact_phrase: false,
    }
}
