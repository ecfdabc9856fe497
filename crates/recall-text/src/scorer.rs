//! Literal relevance scoring: exact phrase, keyword proximity clusters and raw
//! frequency, divided by a super-linear length penalty so long documents need
//! proportionally denser matches.

use std::collections::HashMap;

use recall_core::settings::LexicalConfig;
use recall_core::text::{normalize_whitespace_lower, truncate_chars};
use recall_core::types::{Document, SearchResult, SourceKind};

use crate::analyzer::{QueryAnalyzer, Token};

/// The normalized forms of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTerms {
	pub keywords: Vec<String>,
	/// Every folded token of the query, stopwords included.
	pub phrase_tokens: Vec<String>,
	/// Lowercased, whitespace-collapsed original query.
	pub phrase: String,
}

impl QueryTerms {
	pub fn is_empty(&self) -> bool { self.keywords.is_empty() }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexicalScore {
	pub doc_id: String,
	pub score: f32,
	pub exact_phrase: bool,
	pub occurrences: usize,
}

pub struct LexicalScorer {
	analyzer: QueryAnalyzer,
	config: LexicalConfig,
}

impl LexicalScorer {
	pub fn new(config: LexicalConfig) -> Self {
		Self { analyzer: QueryAnalyzer::new(&config), config }
	}

	pub fn analyzer(&self) -> &QueryAnalyzer { &self.analyzer }
	pub fn config(&self) -> &LexicalConfig { &self.config }

	pub fn analyze(&self, query: &str) -> QueryTerms {
		QueryTerms {
			keywords: self.analyzer.keywords(query),
			phrase_tokens: self.analyzer.token_texts(query),
			phrase: normalize_whitespace_lower(query),
		}
	}

	/// One score per document, in document order. A query without keywords
	/// scores every document zero.
	pub fn score(&self, query: &str, documents: &[Document]) -> Vec<LexicalScore> {
		let terms = self.analyze(query);
		self.score_terms(&terms, documents)
	}

	pub fn score_terms(&self, terms: &QueryTerms, documents: &[Document]) -> Vec<LexicalScore> {
		let scores: Vec<LexicalScore> = documents.iter().map(|d| self.score_document(terms, d)).collect();
		tracing::debug!(keywords = ?terms.keywords, matched = scores.iter().filter(|s| s.score > 0.0).count(), "lexical scores");
		scores
	}

	pub fn score_document(&self, terms: &QueryTerms, doc: &Document) -> LexicalScore {
		let zero = LexicalScore { doc_id: doc.id.clone(), score: 0.0, exact_phrase: false, occurrences: 0 };
		if terms.is_empty() || doc.content.is_empty() { return zero; }

		let tokens = self.analyzer.tokens(&doc.content);
		let hits = keyword_hits(&tokens, &terms.keywords);
		if hits.is_empty() { return zero; }

		let frequency = hits.len() as f32;
		let proximity = if terms.keywords.len() >= 2 {
			cluster_score(&hits, terms.keywords.len(), self.config.proximity_window)
		} else {
			0.0
		};
		let mut combined = frequency + self.config.proximity_weight * proximity;

		let exact_phrase = terms.phrase_tokens.len() >= self.config.min_phrase_tokens
			&& (contains_bounded(&doc.content.to_lowercase(), &terms.phrase) || contains_run(&tokens, &terms.phrase_tokens));
		if exact_phrase { combined *= self.config.exact_phrase_multiplier; }

		LexicalScore {
			doc_id: doc.id.clone(),
			score: combined / self.length_penalty(doc.char_len()),
			exact_phrase,
			occurrences: hits.len(),
		}
	}

	/// `(1 + len / reference) ^ exponent`, always >= 1.
	pub fn length_penalty(&self, chars: usize) -> f32 {
		(1.0 + chars as f32 / self.config.length_reference as f32).powf(self.config.length_exponent)
	}

	/// Positive scores as a ranked list: score descending, exact-phrase first
	/// on ties, then smallest doc id.
	pub fn rank(&self, scores: &[LexicalScore], documents: &[Document], limit: usize, preview_chars: usize) -> Vec<SearchResult> {
		let by_id: HashMap<&str, &Document> = documents.iter().map(|d| (d.id.as_str(), d)).collect();
		let mut positive: Vec<&LexicalScore> = scores.iter().filter(|s| s.score > 0.0).collect();
		positive.sort_by(|a, b| {
			b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal)
				.then(b.exact_phrase.cmp(&a.exact_phrase))
				.then_with(|| a.doc_id.cmp(&b.doc_id))
		});
		positive.truncate(limit);
		positive.into_iter().enumerate().map(|(i, s)| {
			let (text, metadata) = by_id.get(s.doc_id.as_str())
				.map(|d| (truncate_chars(&d.content, preview_chars).to_string(), d.metadata()))
				.unwrap_or_default();
			SearchResult {
				doc_id: s.doc_id.clone(),
				score: s.score,
				rank: i + 1,
				text,
				metadata,
				source: SourceKind::Text,
				exact_phrase: s.exact_phrase,
			}
		}).collect()
	}
}

/// `(char_offset, keyword_index)` for every token equal to a keyword.
fn keyword_hits(tokens: &[Token], keywords: &[String]) -> Vec<(usize, usize)> {
	let index: HashMap<&str, usize> = keywords.iter().enumerate().map(|(i, k)| (k.as_str(), i)).collect();
	tokens.iter().filter_map(|t| index.get(t.text.as_str()).map(|&k| (t.char_offset, k))).collect()
}

/// Greedy left-to-right scan for non-overlapping windows holding at least two
/// distinct keywords; each cluster contributes `distinct²`.
fn cluster_score(hits: &[(usize, usize)], n_keywords: usize, window: usize) -> f32 {
	let mut total = 0.0;
	let mut i = 0;
	while i < hits.len() {
		let start = hits[i].0;
		let mut seen = vec![false; n_keywords];
		let mut distinct = 0usize;
		let mut j = i;
		while j < hits.len() && hits[j].0 - start <= window {
			if !seen[hits[j].1] { seen[hits[j].1] = true; distinct += 1; }
			j += 1;
		}
		if distinct >= 2 { total += (distinct * distinct) as f32; i = j; } else { i += 1; }
	}
	total
}

/// Substring match that must start and end on a word boundary.
fn contains_bounded(haystack: &str, needle: &str) -> bool {
	if needle.is_empty() { return false; }
	haystack.match_indices(needle).any(|(start, m)| {
		let before = haystack[..start].chars().next_back();
		let after = haystack[start + m.len()..].chars().next();
		!before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
	})
}

/// Diacritic-insensitive fallback: the query's folded tokens appear as a
/// contiguous run of document tokens.
fn contains_run(tokens: &[Token], phrase: &[String]) -> bool {
	if phrase.is_empty() || tokens.len() < phrase.len() { return false; }
	tokens.windows(phrase.len()).any(|w| w.iter().zip(phrase).all(|(t, p)| &t.text == p))
}
