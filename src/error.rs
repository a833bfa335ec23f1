//! Typed error taxonomy for the retrieval core.
//!
//! Degradable failures (model, index) are caught inside the engine and
//! downgrade semantic search to keyword search. Non-degradable failures
//! (note store unreachable, bad arguments) propagate to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The embedding provider has not completed initialization.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Index artifacts are missing from the index directory.
    #[error("vector index not found in {dir}")]
    IndexNotFound { dir: String },

    /// Index artifacts exist but cannot be trusted (bad magic, dimension
    /// mismatch, or index/position-map divergence).
    #[error("vector index corrupt: {reason}")]
    IndexCorrupt { reason: String },

    /// The requested note does not exist or is trashed.
    #[error("note not found: {id}")]
    NoteNotFound { id: String },

    /// The note store cannot be reached or a query against it failed.
    #[error("note store unavailable: {0}")]
    RepositoryUnavailable(#[from] rusqlite::Error),

    /// Caller supplied a missing or unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index artifact I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("index artifact encoding: {0}")]
    Artifact(#[from] serde_json::Error),
}

impl Error {
    /// True for failures the engine absorbs by falling back to keyword
    /// search instead of failing the call.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Error::ModelUnavailable(_)
                | Error::IndexNotFound { .. }
                | Error::IndexCorrupt { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
