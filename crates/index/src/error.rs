use std::path::PathBuf;
use thiserror::Error;

/// Failures while saving or loading a persisted graph.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed graph file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Inconsistent graph data: {0}")]
    Inconsistent(String),

    #[error("Unsupported graph format version: {0}")]
    UnsupportedVersion(u32),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
