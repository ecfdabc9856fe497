use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate document id: {0}")]
    DuplicateDocumentId(String),

    #[error("Index artifact missing: {}", .0.display())]
    IndexArtifactMissing(PathBuf),

    #[error("Index artifact corrupt: {0}")]
    IndexCorrupt(String),

    #[error("Index artifacts disagree on {what}: expected {expected}, found {found}")]
    IndexMismatch { what: &'static str, expected: usize, found: usize },

    #[error("Embedding dimension mismatch: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
