use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lexical index error: {0}")]
    Index(String),

    /// The embedding collaborator failed or returned unusable vectors.
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// The reranking collaborator failed or returned an invalid result.
    #[error("Rerank failed: {0}")]
    Rerank(String),
}

impl Error {
    pub fn embedding(err: impl std::fmt::Display) -> Self {
        Error::Embedding(format!("{err:#}"))
    }

    pub fn rerank(err: impl std::fmt::Display) -> Self {
        Error::Rerank(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
