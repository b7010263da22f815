// src/storage/archive.rs

//! The record archive: one file per record id, overwrite semantics.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::{ZlibDecoder, ZlibEncoder};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{CollectionKey, Record};
use crate::storage::RecordSink;

/// Filesystem archive writer with an optional zlib byte-transform.
#[derive(Clone)]
pub struct ArchiveWriter {
    root_dir: PathBuf,
    compress: bool,
    cancel: CancellationToken,
}

impl ArchiveWriter {
    /// Create an archive rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, compress: bool, cancel: CancellationToken) -> Self {
        Self {
            root_dir: root_dir.into(),
            compress,
            cancel,
        }
    }

    /// Archive file location for a record id within a collection.
    fn record_path(&self, key: &CollectionKey, id: i64) -> PathBuf {
        self.root_dir
            .join(&key.owner)
            .join(&key.game)
            .join(format!("{id}.json"))
    }

    /// Make sure the collection's archive directory exists.
    pub async fn ensure_dirs(&self, key: &CollectionKey) -> Result<()> {
        let dir = self.root_dir.join(&key.owner).join(&key.game);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(())
    }

    /// Serialize a record, applying the configured byte-transform.
    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        if self.compress {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&serde_json::to_vec(record)?)?;
            Ok(encoder.finish()?)
        } else {
            Ok(serde_json::to_vec_pretty(record)?)
        }
    }

    /// Read a record back from the archive, if present.
    pub async fn load(&self, key: &CollectionKey, id: i64) -> Result<Option<Record>> {
        let path = self.record_path(key, id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Io(e)),
        };
        let json = if self.compress {
            let mut decoder = ZlibDecoder::new(Vec::new());
            decoder.write_all(&bytes)?;
            decoder.finish()?
        } else {
            bytes
        };
        Ok(Some(serde_json::from_slice(&json)?))
    }
}

#[async_trait]
impl RecordSink for ArchiveWriter {
    /// Write one record, keyed by its id.
    ///
    /// The write is atomic (temp file, then rename), so a cancellation or
    /// crash never leaves a partial archive entry. A cancellation observed
    /// around the write aborts it and surfaces [`AppError::Cancelled`] for
    /// the caller to turn into an orderly process exit.
    async fn write(&self, key: &CollectionKey, record: &Record) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let path = self.record_path(key, record.id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = self.encode(record)?;
        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        if self.cancel.is_cancelled() {
            let _ = tokio::fs::remove_file(&tmp).await;
            log::info!("Write of record {} aborted by shutdown signal", record.id);
            return Err(AppError::Cancelled);
        }

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
