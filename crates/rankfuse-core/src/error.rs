use std::path::PathBuf;

use thiserror::Error;

use crate::types::DocId;

#[derive(Debug, Error)]
pub enum Error {
    /// A corpus entry has no usable id (absent or zero).
    #[error("Document at position {position} is missing an 'id'")]
    MissingIdentifier { position: usize },

    #[error("Duplicate document id {0}")]
    DuplicateIdentifier(DocId),

    /// A single-term lookup normalized to zero or several tokens.
    #[error("Term '{term}' must normalize to exactly one token, got {tokens}")]
    InvalidTerm { term: String, tokens: usize },

    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Corrupted index: {0}")]
    Corruption(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding provider failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Encoding failed: {0}")]
    Encode(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
