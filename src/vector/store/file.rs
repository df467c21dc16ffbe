//! File-backed vector store.
//!
//! Wraps [`MemoryVectorStore`] and mirrors every mutation into a JSON
//! snapshot on disk. Snapshots are written to a temp file in the target
//! directory and atomically renamed into place, so a crashed write never
//! leaves a partial snapshot behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{FathomError, Result};
use crate::vector::store::memory::MemoryVectorStore;
use crate::vector::store::{ScoredEntry, VectorEntry, VectorSearchParams, VectorStore};

const SNAPSHOT_VERSION: &str = "1";

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: String,
    entries: Vec<VectorEntry>,
    /// Epoch milliseconds of the last write.
    last_updated: i64,
}

/// Vector store persisted as a JSON snapshot file.
pub struct FileVectorStore {
    inner: MemoryVectorStore,
    path: PathBuf,
    auto_persist: bool,
}

impl FileVectorStore {
    /// Create a store backed by `path`. Nothing is read until [`load`] is
    /// called. Auto-persist (snapshot after every mutation) is on by
    /// default.
    ///
    /// [`load`]: FileVectorStore::load
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: MemoryVectorStore::new(),
            path: path.into(),
            auto_persist: true,
        }
    }

    /// Toggle snapshot-per-mutation. When off, callers persist explicitly.
    pub fn with_auto_persist(mut self, auto_persist: bool) -> Self {
        self.auto_persist = auto_persist;
        self
    }

    /// Snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot from disk, replacing in-memory state. A missing
    /// file is treated as an empty store; an unparsable file is an error.
    /// A version-tag mismatch is tolerated best-effort with a warning.
    pub async fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            log::debug!(
                "no vector snapshot at '{}', starting empty",
                self.path.display()
            );
            return Ok(());
        }
        let bytes = tokio::fs::read(&self.path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            log::warn!(
                "vector snapshot '{}' has version '{}' (expected '{}'), loading best-effort",
                self.path.display(),
                snapshot.version,
                SNAPSHOT_VERSION
            );
        }
        self.inner.clear().await?;
        self.inner.add_batch(snapshot.entries).await?;
        Ok(())
    }

    /// Write the current entry set as a snapshot, atomically.
    pub async fn persist(&self) -> Result<()> {
        self.write_snapshot().await
    }

    /// Copy the snapshot file to `target`, or to a timestamped sibling
    /// path when `target` is `None`. Returns the backup path. Fails when
    /// no snapshot has been written yet.
    pub async fn backup(&self, target: Option<PathBuf>) -> Result<PathBuf> {
        if !self.path.exists() {
            return Err(FathomError::persistence(format!(
                "cannot back up '{}': no snapshot has been written yet",
                self.path.display()
            )));
        }
        let target = target.unwrap_or_else(|| {
            let stamp = Utc::now().format("%Y%m%d%H%M%S");
            PathBuf::from(format!("{}.{stamp}.bak", self.path.display()))
        });
        tokio::fs::copy(&self.path, &target).await?;
        Ok(target)
    }

    /// Replace the snapshot file with `source` and reload from it.
    pub async fn restore(&mut self, source: &Path) -> Result<()> {
        if !source.exists() {
            return Err(FathomError::persistence(format!(
                "cannot restore from '{}': file does not exist",
                source.display()
            )));
        }
        tokio::fs::copy(source, &self.path).await?;
        self.load().await
    }

    async fn write_snapshot(&self) -> Result<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION.to_string(),
            entries: self.inner.all_entries().into_iter().cloned().collect(),
            last_updated: Utc::now().timestamp_millis(),
        };
        let json = serde_json::to_vec(&snapshot)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                tokio::fs::create_dir_all(parent).await?;
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };
        // NamedTempFile is blocking I/O; keep it off the async workers.
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&json)?;
            tmp.flush()?;
            tmp.persist(&path)
                .map_err(|err| FathomError::persistence(format!("snapshot rename failed: {err}")))?;
            Ok(())
        })
        .await
        .map_err(|err| FathomError::internal(format!("snapshot write task failed: {err}")))?
    }

    async fn after_mutation(&self) -> Result<()> {
        if self.auto_persist {
            self.write_snapshot().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for FileVectorStore {
    async fn add(&mut self, entry: VectorEntry) -> Result<()> {
        self.inner.add(entry).await?;
        self.after_mutation().await
    }

    async fn add_batch(&mut self, entries: Vec<VectorEntry>) -> Result<()> {
        self.inner.add_batch(entries).await?;
        self.after_mutation().await
    }

    async fn update(&mut self, id: &str, entry: VectorEntry) -> Result<()> {
        self.inner.update(id, entry).await?;
        self.after_mutation().await
    }

    async fn remove(&mut self, id: &str) -> Result<()> {
        self.inner.remove(id).await?;
        self.after_mutation().await
    }

    async fn remove_batch(&mut self, ids: &[String]) -> Result<()> {
        // Partial progress before a NotFound still hits the snapshot.
        let result = self.inner.remove_batch(ids).await;
        self.after_mutation().await?;
        result
    }

    fn get(&self, id: &str) -> Option<&VectorEntry> {
        self.inner.get(id)
    }

    fn has(&self, id: &str) -> bool {
        self.inner.has(id)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    async fn clear(&mut self) -> Result<()> {
        self.inner.clear().await?;
        self.after_mutation().await
    }

    fn all_entries(&self) -> Vec<&VectorEntry> {
        self.inner.all_entries()
    }

    fn all_ids(&self) -> Vec<String> {
        self.inner.all_ids()
    }

    fn search(&self, query: &[f32], params: &VectorSearchParams) -> Result<Vec<ScoredEntry>> {
        self.inner.search(query, params)
    }

    async fn persist(&self) -> Result<()> {
        self.write_snapshot().await
    }
}
