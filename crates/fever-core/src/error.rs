use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeverError {
    #[error("Failed to read fragment {path}: {reason}")]
    FragmentRead { path: String, reason: String },
    #[error("Compression error ({encoding}): {reason}")]
    Compression { encoding: &'static str, reason: String },
    #[error("Failed to persist artifact {path}: {reason}")]
    Persist { path: String, reason: String },
    #[error("Failed to remove stale artifact {path}: {reason}")]
    StaleCleanup { path: String, reason: String },
    #[error("File {id} has been destroyed")]
    Destroyed { id: String },
    #[error("File {id} has no committed artifact")]
    NotCommitted { id: String },
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FeverError {
    /// Whether the error came out of the recompute pipeline.
    pub fn is_pipeline(&self) -> bool {
        matches!(
            self,
            FeverError::FragmentRead { .. }
                | FeverError::Compression { .. }
                | FeverError::Persist { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FeverError>;
