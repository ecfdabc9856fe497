//! recall-text
//!
//! Tantivy-based query/document analysis and the lexical scorer. See
//! `analyzer` for tokenization and `scorer` for the relevance heuristics.

pub mod analyzer;
pub mod scorer;

pub use analyzer::{QueryAnalyzer, Token, STOP_WORDS};
pub use scorer::{LexicalScore, LexicalScorer, QueryTerms};
