// src/storage/mod.rs

//! Durable state: crawl checkpoints and the record archive.
//!
//! ## Directory layout
//!
//! ```text
//! {storage}/
//! ├── Checkpoints/
//! │   └── {owner}/{game}/{content_type}.json   # resume cursor per collection
//! └── Archived Levels/
//!     └── {owner}/{game}/{record_id}.json      # one record per id, overwrite on re-crawl
//! ```

pub mod archive;
pub mod checkpoint;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CollectionKey, Record};

pub use archive::ArchiveWriter;
pub use checkpoint::CheckpointStore;

/// Destination for extracted records.
///
/// Implementations must be idempotent per record id: writing the same id
/// twice keeps only the most recent payload.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist one record under its collection.
    async fn write(&self, key: &CollectionKey, record: &Record) -> Result<()>;
}
