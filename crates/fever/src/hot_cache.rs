use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory cache of artifact bytes for the most requested files.
pub trait HotCache: Send + Sync {
    /// Store an entry. Returns `false` when the cache is full and `key` is new.
    fn set(&self, key: &str, value: Bytes) -> bool;
    fn get(&self, key: &str) -> Option<Bytes>;
    fn remove(&self, key: &str) -> bool;
    /// Drop every entry.
    fn reset(&self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn capacity(&self) -> usize;
    fn keys(&self) -> Vec<String>;
}

/// Hash map bounded by entry count.
pub struct MemoryHotCache {
    capacity: usize,
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryHotCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Total bytes held.
    pub fn weight(&self) -> usize {
        self.entries.read().values().map(Bytes::len).sum()
    }
}

impl HotCache for MemoryHotCache {
    fn set(&self, key: &str, value: Bytes) -> bool {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            return false;
        }
        entries.insert(key.to_string(), value);
        true
    }

    fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.read().get(key).cloned()
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    fn reset(&self) {
        self.entries.write().clear();
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}
