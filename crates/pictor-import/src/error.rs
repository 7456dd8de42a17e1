use std::path::PathBuf;

use pictor_engine::EngineError;
use thiserror::Error;

/// Failure of a whole import. The document is left untouched.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("fetching {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("malformed source document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("import cancelled")]
    Cancelled,

    #[error("document rejected the import batch: {0}")]
    Apply(#[from] EngineError),

    #[error("import task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for ImportError {
    fn from(err: tokio::task::JoinError) -> Self {
        ImportError::Task(err.to_string())
    }
}
