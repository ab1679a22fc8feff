//! The artifact build: read fragments, fingerprint, map, compress, persist.
//!
//! Nothing here touches a [`crate::File`]; the caller decides whether the
//! result gets committed.

use bytes::Bytes;
use fever_core::codec::{self, artifact_path, Encoding};
use fever_core::error::{FeverError, Result};
use fever_core::fingerprint::fingerprint_parts;
use fever_core::{mime, SourceMap, Sizes};
use fever_storage::Store;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// A fully persisted artifact set.
#[derive(Debug, Clone)]
pub(crate) struct Artifact {
    pub fingerprint: String,
    pub sizes: Sizes,
    pub content_type: String,
    pub source_map: Arc<SourceMap>,
}

/// A build that failed, with whatever it already wrote.
#[derive(Debug)]
pub(crate) struct Failed {
    pub error: FeverError,
    pub fingerprint: Option<String>,
    pub written: Vec<String>,
}

impl Failed {
    fn early(error: FeverError) -> Self {
        Self { error, fingerprint: None, written: Vec::new() }
    }
}

pub(crate) struct Pipeline<'a> {
    pub store: &'a dyn Store,
    pub directory: &'a str,
    pub content_type: Option<&'a str>,
}

impl Pipeline<'_> {
    /// Build artifacts for `fragments`. An empty list builds nothing.
    pub async fn build(&self, fragments: &[String]) -> std::result::Result<Option<Artifact>, Failed> {
        if fragments.is_empty() {
            return Ok(None);
        }

        // try_join_all keeps input order no matter which read lands first.
        let contents = try_join_all(fragments.iter().map(|path| async move {
            self.store.read(path).await.map_err(|e| FeverError::FragmentRead {
                path: path.clone(),
                reason: e.to_string(),
            })
        }))
        .await
        .map_err(Failed::early)?;

        let fingerprint = fingerprint_parts(contents.iter());
        let source_map = SourceMap::generate(
            fingerprint.clone(),
            fragments.iter().map(String::as_str).zip(contents.iter().map(Vec::as_slice)),
        );
        let buffer = Bytes::from(contents.concat());
        let content_type = self
            .content_type
            .unwrap_or_else(|| mime::lookup(&fragments[0]))
            .to_string();

        debug!(fingerprint = %fingerprint, fragments = fragments.len(), bytes = buffer.len(), "built buffer");

        let raw_path = artifact_path(self.directory, &fingerprint, Encoding::Identity);
        let gzip_path = artifact_path(self.directory, &fingerprint, Encoding::Gzip);
        let deflate_path = artifact_path(self.directory, &fingerprint, Encoding::Deflate);

        // join, not try_join: every write must settle before we can tell what
        // needs cleaning up.
        let (raw, gzip, deflate) = tokio::join!(
            self.persist(&raw_path, buffer.clone()),
            self.compress_and_persist(&gzip_path, buffer.clone(), Encoding::Gzip),
            self.compress_and_persist(&deflate_path, buffer.clone(), Encoding::Deflate),
        );

        let mut written = Vec::new();
        let mut error = None;
        let mut record = |path: &str, outcome: Result<u64>| -> u64 {
            match outcome {
                Ok(len) => {
                    written.push(path.to_string());
                    len
                }
                Err(e) => {
                    error.get_or_insert(e);
                    0
                }
            }
        };
        let raw_len = record(&raw_path, raw);
        let gzip_len = record(&gzip_path, gzip);
        let deflate_len = record(&deflate_path, deflate);

        if let Some(error) = error {
            return Err(Failed { error, fingerprint: Some(fingerprint), written });
        }

        Ok(Some(Artifact {
            fingerprint,
            sizes: Sizes { raw: raw_len, gzip: gzip_len, deflate: deflate_len },
            content_type,
            source_map: Arc::new(source_map),
        }))
    }

    async fn persist(&self, path: &str, data: Bytes) -> Result<u64> {
        self.store
            .write(path, &data)
            .await
            .map_err(|e| FeverError::Persist { path: path.to_string(), reason: e.to_string() })?;
        Ok(data.len() as u64)
    }

    async fn compress_and_persist(&self, path: &str, data: Bytes, encoding: Encoding) -> Result<u64> {
        let packed = compress(data, encoding).await?;
        self.persist(path, Bytes::from(packed)).await
    }
}

async fn compress(data: Bytes, encoding: Encoding) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || match encoding {
        Encoding::Gzip => codec::gzip(&data),
        Encoding::Deflate => codec::deflate(&data),
        Encoding::Identity => Ok(data.to_vec()),
    })
    .await
    .map_err(|e| FeverError::Compression { encoding: encoding.as_str(), reason: e.to_string() })?
}

/// Store paths of every variant of `fingerprint`.
pub(crate) fn artifact_paths(directory: &str, fingerprint: &str) -> [String; 3] {
    [
        artifact_path(directory, fingerprint, Encoding::Identity),
        artifact_path(directory, fingerprint, Encoding::Gzip),
        artifact_path(directory, fingerprint, Encoding::Deflate),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fever_core::fingerprint::fingerprint;
    use fever_storage::MemoryStore;

    fn store_with(files: &[(&str, &str)]) -> MemoryStore {
        let store = MemoryStore::new();
        for (path, body) in files {
            store.insert(*path, body.to_string());
        }
        store
    }

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_builds_nothing() {
        let store = MemoryStore::new();
        let pipeline = Pipeline { store: &store, directory: "out", content_type: None };
        assert!(pipeline.build(&[]).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_build_writes_three_variants() {
        let store = store_with(&[("a.js", "var a = 1;\n"), ("b.js", "var b = 2;\n")]);
        let pipeline = Pipeline { store: &store, directory: "out", content_type: None };
        let artifact = pipeline.build(&paths(&["a.js", "b.js"])).await.unwrap().unwrap();

        assert_eq!(artifact.fingerprint, fingerprint(b"var a = 1;\nvar b = 2;\n"));
        assert_eq!(artifact.content_type, "application/javascript");
        assert_eq!(artifact.sizes.raw, 22);
        for path in artifact_paths("out", &artifact.fingerprint) {
            assert!(store.contains(&path), "missing {path}");
        }
        let raw = store.get(&format!("out/{}", artifact.fingerprint)).unwrap();
        assert_eq!(&raw[..], b"var a = 1;\nvar b = 2;\n");
        assert_eq!(artifact.sizes.gzip, store.get(&format!("out/{}.gzip", artifact.fingerprint)).unwrap().len() as u64);
    }

    #[tokio::test]
    async fn test_content_type_override() {
        let store = store_with(&[("a.txt", "x")]);
        let pipeline = Pipeline { store: &store, directory: "out", content_type: Some("text/x-custom") };
        let artifact = pipeline.build(&paths(&["a.txt"])).await.unwrap().unwrap();
        assert_eq!(artifact.content_type, "text/x-custom");
    }

    #[tokio::test]
    async fn test_read_failure_writes_nothing() {
        let store = store_with(&[("a.js", "x")]);
        let pipeline = Pipeline { store: &store, directory: "out", content_type: None };
        let failed = pipeline.build(&paths(&["a.js", "missing.js"])).await.unwrap_err();
        assert!(matches!(failed.error, FeverError::FragmentRead { ref path, .. } if path == "missing.js"));
        assert!(failed.written.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_reports_written() {
        let store = store_with(&[("a.js", "x")]);
        store.fail_writes_containing(".deflate");
        let pipeline = Pipeline { store: &store, directory: "out", content_type: None };
        let failed = pipeline.build(&paths(&["a.js"])).await.unwrap_err();
        assert!(matches!(failed.error, FeverError::Persist { .. }));
        assert_eq!(failed.written.len(), 2);
        assert_eq!(failed.fingerprint.as_deref(), Some(fingerprint(b"x").as_str()));
    }

    #[tokio::test]
    async fn test_source_map_keyed_by_fingerprint() {
        let store = store_with(&[("a.js", "a\n"), ("b.js", "b\n")]);
        let pipeline = Pipeline { store: &store, directory: "out", content_type: None };
        let artifact = pipeline.build(&paths(&["a.js", "b.js"])).await.unwrap().unwrap();
        assert_eq!(artifact.source_map.file, artifact.fingerprint);
        assert_eq!(artifact.source_map.sources, vec!["a.js", "b.js"]);
        assert_eq!(artifact.source_map.source_content("b.js"), Some("b\n"));
    }
}
