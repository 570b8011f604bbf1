use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Embedding contains NaN or infinite values")]
    NonFiniteEmbedding,

    #[error("Requested {k} neighbours from an index holding {len}")]
    InvalidK { k: usize, len: usize },

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Lookup budget exhausted after {elapsed_ms}ms")]
    LookupTimeout { elapsed_ms: u128 },

    /// Embedding sequence and distance structure disagree on length.
    /// Never expected; only the snapshot constructor can produce it.
    #[error("Index out of sync: {embeddings} embeddings vs {index} index entries")]
    IndexDesync { embeddings: usize, index: usize },

    #[error("Reference embedding error: {0}")]
    Reference(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
