//! The registry owns every active file, the request counters and the hot cache.

use crate::events::{Listener, Listeners};
use crate::file::File;
use crate::hot_cache::{HotCache, MemoryHotCache};
use bytes::Bytes;
use fever_core::error::{FeverError, Result};
use fever_core::{FeverConfig, FileOptions, FileState};
use fever_storage::Store;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct Fever {
    me: Weak<Fever>,
    config: FeverConfig,
    store: RwLock<Arc<dyn Store>>,
    files: RwLock<Vec<Arc<File>>>,
    hot: Arc<dyn HotCache>,
    listeners: Listeners,
    requested: AtomicU64,
    cycles: AtomicU64,
    recache: tokio::sync::Mutex<()>,
    destroyed: AtomicBool,
}

impl Fever {
    pub fn new(config: FeverConfig, store: Arc<dyn Store>) -> Arc<Self> {
        let hot = Arc::new(MemoryHotCache::new(config.hot_cache_capacity));
        Self::with_hot_cache(config, store, hot)
    }

    pub fn with_hot_cache(config: FeverConfig, store: Arc<dyn Store>, hot: Arc<dyn HotCache>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            config,
            store: RwLock::new(store),
            files: RwLock::new(Vec::new()),
            hot,
            listeners: Listeners::default(),
            requested: AtomicU64::new(0),
            cycles: AtomicU64::new(0),
            recache: tokio::sync::Mutex::new(()),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &FeverConfig {
        &self.config
    }

    /// Replace the store used by files created from now on.
    pub fn engine(&self, store: Arc<dyn Store>) -> &Self {
        *self.store.write() = store;
        self
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.read().clone()
    }

    pub fn hot_cache(&self) -> &Arc<dyn HotCache> {
        &self.hot
    }

    // ========== Files ==========

    /// Create and register a file. Nothing is compiled until the first
    /// recompute.
    pub fn create_file(&self, fragments: Vec<String>, options: FileOptions) -> Result<Arc<File>> {
        let file = {
            let mut files = self.files.write();
            self.ensure_alive()?;
            let file = self.new_file(fragments, options);
            files.push(file.clone());
            file
        };
        self.listeners.emit_add(&file);
        Ok(file)
    }

    /// Return the file already holding `fragment`, or register a new one
    /// holding it and compile it.
    pub async fn add(&self, fragment: impl Into<String>, options: FileOptions) -> Result<Arc<File>> {
        let fragment = fragment.into();
        let file = {
            let mut files = self.files.write();
            self.ensure_alive()?;
            if let Some(existing) = files.iter().find(|f| f.contains(&fragment)) {
                return Ok(existing.clone());
            }
            let file = self.new_file(vec![fragment], options);
            files.push(file.clone());
            file
        };
        self.listeners.emit_add(&file);
        file.recompute().await?;
        Ok(file)
    }

    fn new_file(&self, fragments: Vec<String>, options: FileOptions) -> Arc<File> {
        Arc::new(File::new(
            self.me.clone(),
            self.store(),
            self.config.directory.clone(),
            fragments,
            options,
        ))
    }

    /// Active files in registration order.
    pub fn files(&self) -> Vec<Arc<File>> {
        self.files.read().clone()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First active file containing `fragment`.
    pub fn find(&self, fragment: &str) -> Option<Arc<File>> {
        self.files.read().iter().find(|f| f.contains(fragment)).cloned()
    }

    /// Map a request path (`<prefix><fingerprint>[.ext]`) to its file.
    pub fn resolve(&self, path: &str) -> Option<Arc<File>> {
        let prefix = self.config.normalized_prefix();
        let rest = path.strip_prefix(prefix.as_str())?;
        if rest.contains('/') {
            return None;
        }
        let name = rest.split('.').next().unwrap_or(rest);
        if name.is_empty() {
            return None;
        }
        self.files
            .read()
            .iter()
            .find(|f| f.fingerprint() == name)
            .cloned()
    }

    pub(crate) fn remove(&self, file: &File) {
        let removed = {
            let mut files = self.files.write();
            files
                .iter()
                .position(|f| f.id() == file.id())
                .map(|index| files.remove(index))
        };
        let Some(removed) = removed else { return };

        let fingerprint = removed.fingerprint();
        if !fingerprint.is_empty() && !self.fingerprint_in_use(&fingerprint, removed.id()) {
            self.hot.remove(&fingerprint);
        }
        debug!(file = %removed.id(), "unregistered");
        self.listeners.emit_remove(&removed);
    }

    /// Whether any active file other than `except` has `fingerprint` committed.
    pub(crate) fn fingerprint_in_use(&self, fingerprint: &str, except: Uuid) -> bool {
        self.files
            .read()
            .iter()
            .any(|f| f.id() != except && f.fingerprint() == fingerprint)
    }

    // ========== Observers ==========

    pub fn on_add(&self, listener: impl Fn(&Arc<File>) + Send + Sync + 'static) {
        let listener: Listener = Arc::new(listener);
        self.listeners.on_add(listener);
    }

    pub fn on_remove(&self, listener: impl Fn(&Arc<File>) + Send + Sync + 'static) {
        let listener: Listener = Arc::new(listener);
        self.listeners.on_remove(listener);
    }

    // ========== Requests & Hot Cache ==========

    /// Count a served request for `file`. Returns `true` when this request
    /// lands on a recache boundary.
    pub fn record_request(&self, file: &File) -> bool {
        file.record_request();
        let total = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        self.config.recache > 0 && total % self.config.recache == 0
    }

    /// Lifetime number of served requests.
    pub fn requested(&self) -> u64 {
        self.requested.load(Ordering::SeqCst)
    }

    /// Number of completed recache cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Hot-cached bytes for `file`'s committed artifact.
    pub fn cached(&self, file: &File) -> Option<Bytes> {
        self.cached_fingerprint(&file.fingerprint())
    }

    /// Hot-cached bytes for the artifact with `fingerprint`.
    pub fn cached_fingerprint(&self, fingerprint: &str) -> Option<Bytes> {
        if fingerprint.is_empty() {
            return None;
        }
        self.hot.get(fingerprint)
    }

    /// Refill the hot cache with the most requested files.
    ///
    /// Files are ranked by request count, ties kept in registration order.
    /// The cache is cleared and refilled in one go, so files that fell out of
    /// the top ranks lose their entry. Cycles never overlap; a second caller
    /// waits for the running cycle and then runs its own. Returns the number
    /// of cached entries, or the first load failure once the cycle is done.
    /// Files destroyed or recompiled while the cycle was loading are left out.
    pub async fn cache(&self) -> Result<usize> {
        let _cycle = self.recache.lock().await;
        self.ensure_alive()?;

        let mut ranked = self.files();
        // Counts keep moving under live traffic; rank on one snapshot of them.
        ranked.sort_by_cached_key(|f| Reverse(f.requested()));

        let capacity = self.hot.capacity();
        let mut loaded = Vec::with_capacity(capacity.min(ranked.len()));
        let mut failure = None;
        for file in ranked {
            if loaded.len() >= capacity {
                break;
            }
            if file.state() == FileState::Destroyed || file.fingerprint().is_empty() {
                continue;
            }
            let outcome = file.committed_buffer().await;
            match outcome {
                Ok((fingerprint, bytes)) => loaded.push((file, fingerprint, bytes)),
                Err(e) => {
                    warn!(file = %file.id(), error = %e, "failed to load file for the hot cache");
                    failure.get_or_insert(e);
                }
            }
        }

        // Under the file list lock: a concurrent `remove` either already ran
        // or evicts after these inserts.
        let stored = {
            let files = self.files.read();
            self.hot.reset();
            let mut stored = 0;
            for (file, fingerprint, bytes) in loaded {
                let active = files.iter().any(|f| f.id() == file.id());
                if !active || file.is_destroyed() || file.fingerprint() != fingerprint {
                    debug!(file = %file.id(), "file changed during the cycle, not caching");
                    continue;
                }
                if self.hot.set(&fingerprint, bytes) {
                    stored += 1;
                }
            }
            stored
        };
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        info!(cycle, entries = stored, "hot cache refreshed");

        match failure {
            Some(e) => Err(e),
            None => Ok(stored),
        }
    }

    /// Run a recache cycle on the runtime, logging failures.
    pub fn cache_in_background(&self) {
        let Some(me) = self.me.upgrade() else { return };
        tokio::spawn(async move {
            if let Err(e) = me.cache().await {
                warn!(error = %e, "Failed to update the cache");
            }
        });
    }

    // ========== Lifecycle ==========

    /// Destroy every file and clear the hot cache. The registry rejects new
    /// files afterwards.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        for file in self.files() {
            file.destroy();
        }
        self.hot.reset();
        info!("registry destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            Err(FeverError::Destroyed { id: "registry".into() })
        } else {
            Ok(())
        }
    }
}
