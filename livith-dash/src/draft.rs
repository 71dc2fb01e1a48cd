//! Draft store
//!
//! Holds the pending [`ChangeSet`] between edits and a successful save. The
//! save workflow only sees the [`DraftStore`] trait; the service uses
//! [`FileDraftStore`] (a JSON file in the data directory), tests use
//! [`MemoryDraftStore`].

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{DashError, DashResult};
use crate::row::ChangeSet;

/// Persistence port for the pending change-set
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Replace the stored draft
    async fn save(&self, changes: &ChangeSet) -> DashResult<()>;

    /// Stored draft, empty if none
    async fn load(&self) -> DashResult<ChangeSet>;

    /// Drop the stored draft
    async fn clear(&self) -> DashResult<()>;
}

/// Draft kept as JSON (`{ "<table>": [row, ...] }`) in a single file
pub struct FileDraftStore {
    path: PathBuf,
}

impl FileDraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn save(&self, changes: &ChangeSet) -> DashResult<()> {
        let json = serde_json::to_vec_pretty(changes)?;
        let path = self.path.clone();

        // Each save gets its own temp file, persisted over the draft atomically
        tokio::task::spawn_blocking(move || -> DashResult<()> {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(dir)?;
            let mut temp = NamedTempFile::new_in(dir)?;
            temp.write_all(&json)?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| DashError::Persistence(format!("Draft write task failed: {}", e)))??;

        debug!("Draft saved to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> DashResult<ChangeSet> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ChangeSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> DashResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Draft cleared: {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process draft store
#[derive(Default)]
pub struct MemoryDraftStore {
    draft: Mutex<Option<ChangeSet>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a draft is currently stored
    pub async fn is_stored(&self) -> bool {
        self.draft.lock().await.is_some()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn save(&self, changes: &ChangeSet) -> DashResult<()> {
        *self.draft.lock().await = Some(changes.clone());
        Ok(())
    }

    async fn load(&self) -> DashResult<ChangeSet> {
        Ok(self.draft.lock().await.clone().unwrap_or_default())
    }

    async fn clear(&self) -> DashResult<()> {
        *self.draft.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{Row, RowState};
    use livith_common::Table;
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn sample() -> ChangeSet {
        let mut fields = Map::new();
        fields.insert("title".into(), json!("A"));
        let mut changes = ChangeSet::new();
        changes.set_table(Table::Songs, vec![Row::new_row(fields)]);
        changes
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileDraftStore::new(dir.path().join("livith_temp_save.json"));

        assert!(store.load().await.unwrap().is_empty());

        store.save(&sample()).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, sample());
        assert_eq!(loaded.rows(Table::Songs).unwrap()[0].state, RowState::New);

        store.clear().await.unwrap();
        assert!(!store.path().exists());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_format_uses_wire_flags() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileDraftStore::new(dir.path().join("draft.json"));
        store.save(&sample()).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw, json!({"songs": [{"title": "A", "_isNew": true}]}));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_all_succeed() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(FileDraftStore::new(dir.path().join("livith_temp_save.json")));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.save(&sample()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.unwrap(), sample());
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("draft.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert!(FileDraftStore::new(path).load().await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryDraftStore::new();
        assert!(!store.is_stored().await);
        store.save(&sample()).await.unwrap();
        assert!(store.is_stored().await);
        assert_eq!(store.load().await.unwrap(), sample());
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }
}
