// src/storage/checkpoint.rs

//! Durable per-collection crawl checkpoints.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CollectionKey, CrawlState};

/// On-disk checkpoint payload.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointData {
    #[serde(rename = "finalId")]
    final_id: i64,

    #[serde(rename = "nextUrl")]
    next_url: String,
}

/// Filesystem-backed checkpoint store, one JSON file per collection key.
#[derive(Clone)]
pub struct CheckpointStore {
    root_dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Checkpoint file location for a collection key.
    fn path(&self, key: &CollectionKey) -> PathBuf {
        self.root_dir
            .join(&key.owner)
            .join(&key.game)
            .join(format!("{}.json", key.content_type))
    }

    /// Load the crawl state for a key.
    ///
    /// Absence is not an error: it means this collection has not been
    /// crawled yet and the caller should probe the terminal page.
    pub async fn load(&self, key: &CollectionKey) -> Result<Option<CrawlState>> {
        let path = self.path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Io(e)),
        };
        let data: CheckpointData = serde_json::from_slice(&bytes)?;
        Ok(Some(CrawlState::new(
            key.clone(),
            data.final_id,
            data.next_url,
        )))
    }

    /// Persist the crawl state and reset its save counter.
    pub async fn save(&self, state: &mut CrawlState) -> Result<()> {
        let path = self.path(&state.key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = CheckpointData {
            final_id: state.final_id,
            next_url: state.next_url.clone(),
        };
        let bytes = serde_json::to_vec(&data)?;

        // Write to temp, then rename: a crash mid-save leaves the previous
        // checkpoint intact.
        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp, &path).await?;

        state.pages_since_save = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key() -> CollectionKey {
        CollectionKey::new("alice", "maze-maker", "Level")
    }

    #[tokio::test]
    async fn test_load_absent_returns_none() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path());
        assert!(store.load(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path());

        let mut state = CrawlState::new(key(), 77, "https://example.com/next");
        state.pages_since_save = 9;
        store.save(&mut state).await.unwrap();

        // Saving resets the cadence counter.
        assert_eq!(state.pages_since_save, 0);

        let loaded = store.load(&key()).await.unwrap().unwrap();
        assert_eq!(loaded.final_id, 77);
        assert_eq!(loaded.next_url, "https://example.com/next");
        assert_eq!(loaded.pages_since_save, 0);
    }

    #[tokio::test]
    async fn test_checkpoint_file_uses_stable_keys() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path());

        let mut state = CrawlState::new(key(), 5, "u");
        store.save(&mut state).await.unwrap();

        let path = tmp
            .path()
            .join("alice")
            .join("maze-maker")
            .join("Level.json");
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["finalId"], 5);
        assert_eq!(value["nextUrl"], "u");
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path());

        let mut state = CrawlState::new(key(), 5, "first");
        store.save(&mut state).await.unwrap();
        state.next_url = "second".to_string();
        store.save(&mut state).await.unwrap();

        let loaded = store.load(&key()).await.unwrap().unwrap();
        assert_eq!(loaded.next_url, "second");
    }
}
