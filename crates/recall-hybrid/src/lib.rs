//! recall-hybrid
//!
//! The retrieval pipeline on top of the lexical scorer and the vector index:
//! rank fusion, threshold filtering with deduplication, budgeted context
//! assembly and the optional summarization pass.
pub mod assemble;
pub mod filter;
pub mod fuse;
pub mod llm;
pub mod service;
pub mod summarize;

pub use assemble::assemble;
pub use filter::filter;
pub use fuse::fuse;
pub use llm::HttpCompleter;
pub use service::{RetrievalService, ServiceStatus, ServingState};
pub use summarize::{build_summarizer, LlmSummarizer, NoopSummarizer, SummaryOutcome, Summarizer};
