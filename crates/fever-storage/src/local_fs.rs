//! Local filesystem store.
//!
//! Relative paths resolve against the store root; absolute paths are used
//! as they are, so fragments can live anywhere on disk while artifacts stay
//! under the root.

use crate::traits::{ByteStream, Store};
use async_trait::async_trait;
use fever_core::error::{FeverError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a store path to a local filesystem path.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(path.trim_start_matches("./"))
        }
    }

    pub async fn exists(&self, path: &str) -> bool {
        fs::metadata(self.resolve(path)).await.is_ok()
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(self.resolve(path))
            .await
            .map_err(|e| FeverError::Storage(format!("read {path}: {e}")))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FeverError::Storage(format!("mkdir {}: {e}", parent.display())))?;
        }
        fs::write(&target, data)
            .await
            .map_err(|e| FeverError::Storage(format!("write {path}: {e}")))?;
        debug!(path, bytes = data.len(), "wrote");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        fs::remove_file(self.resolve(path))
            .await
            .map_err(|e| FeverError::Storage(format!("rm {path}: {e}")))?;
        debug!(path, "removed");
        Ok(())
    }

    async fn open_read_stream(&self, path: &str) -> Result<ByteStream> {
        let file = fs::File::open(self.resolve(path))
            .await
            .map_err(|e| FeverError::Storage(format!("open {path}: {e}")))?;
        Ok(Box::pin(file))
    }
}
