//! A compiled file: an ordered list of fragments and its committed artifact.
//!
//! Every edit of the fragment list triggers a recompute. Recomputes are
//! single-flight per file: callers queue on the pipeline lock and a caller
//! whose edit was already picked up by a later successful run returns
//! without building again. The commit swap happens only after all three
//! artifact writes landed.

use crate::events::{Edit, EditListener};
use crate::pipeline::{artifact_paths, Artifact, Pipeline};
use crate::registry::Fever;
use bytes::Bytes;
use fever_core::codec::{artifact_path, Encoding};
use fever_core::error::{FeverError, Result};
use fever_core::mime::{self, DEFAULT_CONTENT_TYPE};
use fever_core::{FileOptions, FileState, Sizes, SourceMap};
use fever_storage::{ByteStream, Store};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The committed artifact as read at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub fingerprint: String,
    pub sizes: Sizes,
    pub content_type: String,
}

/// An opened artifact variant.
pub struct Delivery {
    pub encoding: Encoding,
    /// Size of this variant in bytes.
    pub length: u64,
    pub stream: ByteStream,
    /// The commit the stream was opened from.
    pub snapshot: Snapshot,
}

pub struct File {
    id: Uuid,
    registry: Weak<Fever>,
    store: Arc<dyn Store>,
    directory: String,
    options: FileOptions,
    fragments: Mutex<Vec<String>>,
    state: Mutex<FileState>,
    commit: RwLock<Option<Artifact>>,
    pipeline: tokio::sync::Mutex<()>,
    // Bumped on every fragment edit, under the fragments lock.
    generation: AtomicU64,
    runs_started: AtomicU64,
    last_success: AtomicU64,
    requested: AtomicU64,
    edits: RwLock<Vec<EditListener>>,
}

impl File {
    pub(crate) fn new(
        registry: Weak<Fever>,
        store: Arc<dyn Store>,
        directory: impl Into<String>,
        fragments: Vec<String>,
        options: FileOptions,
    ) -> Self {
        let state = if fragments.is_empty() { FileState::Empty } else { FileState::Dirty };
        Self {
            id: Uuid::new_v4(),
            registry,
            store,
            directory: directory.into(),
            options,
            fragments: Mutex::new(fragments),
            state: Mutex::new(state),
            commit: RwLock::new(None),
            pipeline: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            runs_started: AtomicU64::new(0),
            last_success: AtomicU64::new(0),
            requested: AtomicU64::new(0),
            edits: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> FileState {
        *self.state.lock()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state() == FileState::Destroyed
    }

    pub fn fragments(&self) -> Vec<String> {
        self.fragments.lock().clone()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.fragments.lock().iter().any(|f| f == fragment)
    }

    /// Fingerprint of the committed artifact, empty before the first commit.
    pub fn fingerprint(&self) -> String {
        self.commit.read().as_ref().map(|a| a.fingerprint.clone()).unwrap_or_default()
    }

    pub fn sizes(&self) -> Sizes {
        self.commit.read().as_ref().map(|a| a.sizes).unwrap_or_default()
    }

    pub fn content_type(&self) -> String {
        if let Some(artifact) = self.commit.read().as_ref() {
            return artifact.content_type.clone();
        }
        self.options
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
    }

    /// Fingerprint, sizes and content type of the current commit, read
    /// together.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.commit.read().as_ref().map(|a| Snapshot {
            fingerprint: a.fingerprint.clone(),
            sizes: a.sizes,
            content_type: a.content_type.clone(),
        })
    }

    pub fn source_map(&self) -> Option<Arc<SourceMap>> {
        self.commit.read().as_ref().map(|a| a.source_map.clone())
    }

    /// Lifetime request count.
    pub fn requested(&self) -> u64 {
        self.requested.load(Ordering::SeqCst)
    }

    pub(crate) fn record_request(&self) -> u64 {
        self.requested.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Public URL of the committed artifact: `<prefix><fingerprint><ext>`.
    pub fn url(&self) -> Option<String> {
        let artifact = self.commit.read().clone()?;
        let prefix = self
            .registry
            .upgrade()
            .map(|r| r.config().normalized_prefix())
            .unwrap_or_else(|| "/".to_string());
        Some(format!(
            "{prefix}{}{}",
            artifact.fingerprint,
            mime::extension(&artifact.content_type)
        ))
    }

    // ========== Fragment Edits ==========

    /// Register an observer for this file's fragment edits.
    pub fn on_edit(&self, listener: EditListener) {
        self.edits.write().push(listener);
    }

    pub async fn push(&self, fragment: impl Into<String>) -> Result<&Self> {
        let fragment = fragment.into();
        let added = fragment.clone();
        self.edit(|list| list.push(fragment))?;
        self.emit_edit(Edit::Push(added));
        self.recompute().await
    }

    pub async fn unshift(&self, fragment: impl Into<String>) -> Result<&Self> {
        let fragment = fragment.into();
        let added = fragment.clone();
        self.edit(|list| list.insert(0, fragment))?;
        self.emit_edit(Edit::Unshift(added));
        self.recompute().await
    }

    /// Remove the last fragment and recompute. Returns the removed fragment.
    pub async fn pop(&self) -> Result<Option<String>> {
        let removed = self.edit(|list| list.pop())?;
        self.emit_edit(Edit::Pop(removed.clone()));
        self.recompute().await?;
        Ok(removed)
    }

    /// Remove the first fragment and recompute. Returns the removed fragment.
    pub async fn shift(&self) -> Result<Option<String>> {
        let removed = self.edit(|list| if list.is_empty() { None } else { Some(list.remove(0)) })?;
        self.emit_edit(Edit::Shift(removed.clone()));
        self.recompute().await?;
        Ok(removed)
    }

    fn emit_edit(&self, edit: Edit) {
        let handlers = self.edits.read().clone();
        for handler in handlers {
            handler(self, &edit);
        }
    }

    fn edit<T>(&self, f: impl FnOnce(&mut Vec<String>) -> T) -> Result<T> {
        let mut fragments = self.fragments.lock();
        {
            let mut state = self.state.lock();
            if *state == FileState::Destroyed {
                return Err(self.destroyed());
            }
            *state = FileState::Dirty;
        }
        let out = f(&mut fragments);
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(out)
    }

    // ========== Recompute ==========

    /// Rebuild and commit the artifact for the current fragment list.
    pub async fn recompute(&self) -> Result<&Self> {
        self.ensure_alive()?;
        let ticket = self.runs_started.load(Ordering::SeqCst);
        let _flight = self.pipeline.lock().await;
        self.ensure_alive()?;

        if self.last_success.load(Ordering::SeqCst) > ticket {
            debug!(file = %self.id, "recompute coalesced into a later run");
            return Ok(self);
        }

        let run = self.runs_started.fetch_add(1, Ordering::SeqCst) + 1;
        let (generation, fragments) = {
            let list = self.fragments.lock();
            (self.generation.load(Ordering::SeqCst), list.clone())
        };

        let pipeline = Pipeline {
            store: self.store.as_ref(),
            directory: &self.directory,
            content_type: self.options.content_type.as_deref(),
        };

        match pipeline.build(&fragments).await {
            Err(failed) => {
                if let Some(fp) = failed.fingerprint.as_deref() {
                    self.discard(fp, &failed.written).await;
                }
                self.settle(generation);
                warn!(file = %self.id, error = %failed.error, "recompute failed, keeping previous commit");
                Err(failed.error)
            }
            Ok(built) => {
                // The destroyed check and the swap share the state lock so a
                // concurrent destroy lands either before the commit or after it.
                let swapped = {
                    let state = self.state.lock();
                    if *state == FileState::Destroyed {
                        Err(built)
                    } else {
                        Ok(self.swap(built))
                    }
                };
                let previous = match swapped {
                    Ok(previous) => previous,
                    Err(built) => {
                        if let Some(artifact) = &built {
                            let paths = artifact_paths(&self.directory, &artifact.fingerprint);
                            self.discard(&artifact.fingerprint, &paths).await;
                        }
                        return Err(self.destroyed());
                    }
                };
                self.last_success.store(run, Ordering::SeqCst);
                self.settle(generation);

                let current = self.fingerprint();
                info!(
                    file = %self.id,
                    from = previous.as_deref().unwrap_or("(empty)"),
                    to = if current.is_empty() { "(empty)" } else { current.as_str() },
                    "content changed"
                );
                if let Some(old) = previous.filter(|old| *old != current) {
                    self.remove_stale(&old).await;
                }
                Ok(self)
            }
        }
    }

    /// Install `built` as the committed artifact. Returns the old fingerprint.
    fn swap(&self, built: Option<Artifact>) -> Option<String> {
        let mut commit = self.commit.write();
        let previous = commit.take().map(|a| a.fingerprint);
        *commit = built;
        previous
    }

    // Leave Dirty only when no newer edit is waiting for its own run.
    fn settle(&self, generation: u64) {
        let committed = self.commit.read().is_some();
        let mut state = self.state.lock();
        if *state == FileState::Destroyed {
            return;
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            *state = FileState::Dirty;
        } else {
            *state = if committed { FileState::Committed } else { FileState::Empty };
        }
    }

    fn artifact_in_use(&self, fingerprint: &str) -> bool {
        if self.commit.read().as_ref().is_some_and(|a| a.fingerprint == fingerprint) {
            return true;
        }
        self.registry
            .upgrade()
            .is_some_and(|r| r.fingerprint_in_use(fingerprint, self.id))
    }

    /// Best-effort removal of artifacts from an attempt that will not be committed.
    async fn discard(&self, fingerprint: &str, written: &[String]) {
        if self.artifact_in_use(fingerprint) {
            return;
        }
        for path in written {
            if let Err(e) = self.store.delete(path).await {
                debug!(file = %self.id, path = %path, error = %e, "failed to discard artifact");
            }
        }
    }

    async fn remove_stale(&self, fingerprint: &str) {
        if self.artifact_in_use(fingerprint) {
            debug!(file = %self.id, fingerprint, "stale artifacts still in use, keeping them");
            return;
        }
        for path in artifact_paths(&self.directory, fingerprint) {
            if let Err(e) = self.store.delete(&path).await {
                let err = FeverError::StaleCleanup { path: path.clone(), reason: e.to_string() };
                warn!(file = %self.id, error = %err, "failed to destroy old artifact");
            }
        }
    }

    // ========== Concatenation ==========

    /// Build a new file from this file's fragments followed by each of
    /// `others`' fragments. This file and every argument are destroyed once
    /// the new file has committed. If its first build fails the new file is
    /// destroyed instead and the originals are left as they were.
    pub async fn concat(&self, others: &[Arc<File>]) -> Result<Arc<File>> {
        self.ensure_alive()?;
        for other in others {
            other.ensure_alive()?;
        }
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| FeverError::Destroyed { id: "registry".into() })?;

        let mut fragments = self.fragments();
        for other in others {
            fragments.extend(other.fragments());
        }
        let file = registry.create_file(fragments, self.options.clone())?;
        if let Err(e) = file.recompute().await {
            file.destroy();
            return Err(e);
        }

        for other in others {
            other.destroy();
        }
        self.destroy();
        Ok(file)
    }

    // ========== Reading ==========

    /// Committed raw artifact bytes.
    pub async fn buffer(&self) -> Result<Bytes> {
        self.committed_buffer().await.map(|(_, bytes)| bytes)
    }

    /// Committed raw bytes together with the fingerprint they belong to.
    pub(crate) async fn committed_buffer(&self) -> Result<(String, Bytes)> {
        self.ensure_alive()?;
        let fingerprint = self.committed_fingerprint()?;
        let path = artifact_path(&self.directory, &fingerprint, Encoding::Identity);
        let data = self.store.read(&path).await?;
        Ok((fingerprint, Bytes::from(data)))
    }

    /// Open the committed artifact in the best encoding the client accepts.
    pub async fn stream(&self, accepted: &[Encoding]) -> Result<Delivery> {
        self.ensure_alive()?;
        let snapshot = self.snapshot().ok_or_else(|| self.not_committed())?;
        let sizes = snapshot.sizes;
        let encoding = Encoding::select(accepted, &sizes);
        let length = match encoding {
            Encoding::Gzip => sizes.gzip,
            Encoding::Deflate => sizes.deflate,
            Encoding::Identity => sizes.raw,
        };
        let stream = self
            .store
            .open_read_stream(&artifact_path(&self.directory, &snapshot.fingerprint, encoding))
            .await?;
        Ok(Delivery { encoding, length, stream, snapshot })
    }

    fn committed_fingerprint(&self) -> Result<String> {
        self.commit
            .read()
            .as_ref()
            .map(|a| a.fingerprint.clone())
            .ok_or_else(|| self.not_committed())
    }

    // ========== Lifecycle ==========

    /// Mark the file destroyed and unregister it. Idempotent.
    ///
    /// A recompute in flight finishes, but its result is thrown away.
    pub fn destroy(&self) {
        {
            let mut state = self.state.lock();
            if *state == FileState::Destroyed {
                return;
            }
            *state = FileState::Destroyed;
        }
        debug!(file = %self.id, "destroyed");
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self);
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            Err(self.destroyed())
        } else {
            Ok(())
        }
    }

    fn destroyed(&self) -> FeverError {
        FeverError::Destroyed { id: self.id.to_string() }
    }

    fn not_committed(&self) -> FeverError {
        FeverError::NotCommitted { id: self.id.to_string() }
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("fingerprint", &self.fingerprint())
            .field("fragments", &self.fragments())
            .field("requested", &self.requested())
            .finish()
    }
}
