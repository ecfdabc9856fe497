//! recall-core
//!
//! Shared domain types, the error enum, the collaborator traits (`Embedder`,
//! `Completer`), figment-backed configuration and corpus loading.

pub mod config;
pub mod corpus;
pub mod error;
pub mod settings;
pub mod text;
pub mod traits;
pub mod types;

pub use corpus::{Corpus, CorpusLoader};
pub use error::{Error, Result};
pub use settings::Settings;
pub use types::{Document, FusedResult, RetrievalContext, RetrievalRequest, RetrievalResponse, SearchResult, SourceKind};
