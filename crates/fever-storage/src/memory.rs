//! In-memory store with fault injection.

use crate::traits::{ByteStream, Store};
use async_trait::async_trait;
use bytes::Bytes;
use fever_core::error::{FeverError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct Faults {
    reads: Vec<String>,
    writes: Vec<String>,
    deletes: Vec<String>,
    write_delay: Option<Duration>,
    read_delay: Option<Duration>,
}

/// Store keeping every object in a hash map.
///
/// Operations whose path contains a registered fault pattern fail with
/// [`FeverError::Storage`].
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Bytes>>,
    faults: RwLock<Faults>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without going through the async API.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Bytes>) {
        self.data.write().insert(path.into(), data.into());
    }

    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.data.read().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.data.read().contains_key(path)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads_containing(&self, pattern: impl Into<String>) {
        self.faults.write().reads.push(pattern.into());
    }

    pub fn fail_writes_containing(&self, pattern: impl Into<String>) {
        self.faults.write().writes.push(pattern.into());
    }

    pub fn fail_deletes_containing(&self, pattern: impl Into<String>) {
        self.faults.write().deletes.push(pattern.into());
    }

    /// Make every write sleep before landing.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        self.faults.write().write_delay = delay;
    }

    /// Make every read sleep before answering.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.faults.write().read_delay = delay;
    }

    pub fn clear_faults(&self) {
        *self.faults.write() = Faults::default();
    }

    fn check(patterns: &[String], op: &str, path: &str) -> Result<()> {
        match patterns.iter().find(|p| path.contains(p.as_str())) {
            Some(p) => Err(FeverError::Storage(format!("{op} {path}: injected fault ({p})"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let delay = {
            let faults = self.faults.read();
            Self::check(&faults.reads, "read", path)?;
            faults.read_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.get(path)
            .map(|b| b.to_vec())
            .ok_or_else(|| FeverError::Storage(format!("read {path}: not found")))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let delay = {
            let faults = self.faults.read();
            Self::check(&faults.writes, "write", path)?;
            faults.write_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.insert(path, Bytes::copy_from_slice(data));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        Self::check(&self.faults.read().deletes, "rm", path)?;
        match self.data.write().remove(path) {
            Some(_) => Ok(()),
            None => Err(FeverError::Storage(format!("rm {path}: not found"))),
        }
    }

    async fn open_read_stream(&self, path: &str) -> Result<ByteStream> {
        Self::check(&self.faults.read().reads, "open", path)?;
        let data = self
            .get(path)
            .ok_or_else(|| FeverError::Storage(format!("open {path}: not found")))?;
        Ok(Box::pin(Cursor::new(data)))
    }
}
