use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte counts of the last committed artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sizes {
    pub raw: u64,
    pub gzip: u64,
    pub deflate: u64,
}

/// Lifecycle state of a compiled file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    /// No fragments, nothing committed.
    Empty,
    /// A recompute is pending or in flight.
    Dirty,
    Committed,
    /// Terminal.
    Destroyed,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileState::Empty => write!(f, "empty"),
            FileState::Dirty => write!(f, "dirty"),
            FileState::Committed => write!(f, "committed"),
            FileState::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Per-file construction options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileOptions {
    /// Overrides the MIME type inferred from the first fragment.
    #[serde(default)]
    pub content_type: Option<String>,
}

impl FileOptions {
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self { content_type: Some(content_type.into()) }
    }
}
