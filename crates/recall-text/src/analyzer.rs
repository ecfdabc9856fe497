use std::collections::HashSet;

use tantivy::tokenizer::{
	AsciiFoldingFilter, LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream,
};

use recall_core::settings::LexicalConfig;

/// English plus common Vietnamese function words. Matched after lowercasing
/// and before diacritic folding.
pub const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	"và","của","là","các","những","cho","với","trong","được","có","không","này","một","để","khi","thì","đã","sẽ","về","từ","như","theo","tại","nào","gì","ra","sao","hay","hoặc","nhưng","rằng","bị","đến","lại","cũng","vẫn","đang","rất",
];

const MAX_TOKEN_BYTES: usize = 64;

/// A folded token with its position in the source text, counted in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	pub text: String,
	pub char_offset: usize,
}

/// Query and document normalization shared by every lexical pass.
///
/// `folded` lowercases and strips diacritics but keeps stopwords (used for
/// documents and phrase matching); `keywords` additionally drops stopwords.
#[derive(Clone)]
pub struct QueryAnalyzer {
	folded: TextAnalyzer,
	keywords: TextAnalyzer,
	min_token_chars: usize,
}

impl QueryAnalyzer {
	pub fn new(config: &LexicalConfig) -> Self {
		let mut stop_words: Vec<String> = STOP_WORDS.iter().map(|s| s.to_string()).collect();
		stop_words.extend(config.extra_stopwords.iter().map(|s| s.to_lowercase()));
		let folded = TextAnalyzer::builder(SimpleTokenizer::default())
			.filter(RemoveLongFilter::limit(MAX_TOKEN_BYTES))
			.filter(LowerCaser)
			.filter(AsciiFoldingFilter)
			.build();
		let keywords = TextAnalyzer::builder(SimpleTokenizer::default())
			.filter(RemoveLongFilter::limit(MAX_TOKEN_BYTES))
			.filter(LowerCaser)
			.filter(StopWordFilter::remove(stop_words))
			.filter(AsciiFoldingFilter)
			.build();
		Self { folded, keywords, min_token_chars: config.min_token_chars }
	}

	/// Distinct search keywords in query order: folded, stopwords and tokens
	/// shorter than `min_token_chars` removed.
	pub fn keywords(&self, text: &str) -> Vec<String> {
		let mut analyzer = self.keywords.clone();
		let mut stream = analyzer.token_stream(text);
		let mut seen = HashSet::new();
		let mut out = Vec::new();
		while stream.advance() {
			let t = stream.token();
			if t.text.chars().count() < self.min_token_chars { continue; }
			if seen.insert(t.text.clone()) { out.push(t.text.clone()); }
		}
		out
	}

	/// Every folded token of `text`, in order, with character offsets.
	pub fn tokens(&self, text: &str) -> Vec<Token> {
		let mut analyzer = self.folded.clone();
		let mut stream = analyzer.token_stream(text);
		let mut out = Vec::new();
		let (mut last_byte, mut last_char) = (0usize, 0usize);
		while stream.advance() {
			let t = stream.token();
			let from = t.offset_from.max(last_byte);
			last_char += text.get(last_byte..from).map(|s| s.chars().count()).unwrap_or(0);
			last_byte = from;
			out.push(Token { text: t.text.clone(), char_offset: last_char });
		}
		out
	}

	/// Folded token texts only, for phrase comparison.
	pub fn token_texts(&self, text: &str) -> Vec<String> {
		self.tokens(text).into_iter().map(|t| t.text).collect()
	}
}
