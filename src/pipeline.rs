// src/pipeline.rs

//! Top-level archive pipeline: discover a game's content types, then crawl
//! every collection concurrently over the shared pool.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::CollectionKey;
use crate::services::{CollectionCrawler, ContentTypeDiscovery};
use crate::storage::{ArchiveWriter, CheckpointStore, RecordSink};
use crate::utils::PoolHandle;
use crate::utils::http::create_client;

/// Subdirectory holding one archive file per record.
pub const ARCHIVE_DIR: &str = "Archived Levels";

/// Subdirectory holding one checkpoint file per collection.
pub const CHECKPOINT_DIR: &str = "Checkpoints";

/// Archive all shared content of one game.
pub async fn run_archive(
    settings: &Settings,
    owner: &str,
    game: &str,
    storage_dir: &Path,
    cancel: CancellationToken,
) -> Result<()> {
    let client = create_client(&settings.user_agent, settings.timeout_secs)?;
    let pool = PoolHandle::new(settings.pool_size);

    let discovery = ContentTypeDiscovery::new(&client, &settings.origin);
    let content_types = discovery.discover(owner, game).await?;
    log::info!(
        "Found {} content types for {}/{}: {:?}",
        content_types.len(),
        owner,
        game,
        content_types
    );
    if content_types.is_empty() {
        log::info!("Nothing to crawl for {}/{}", owner, game);
        return Ok(());
    }

    let writer = Arc::new(ArchiveWriter::new(
        storage_dir.join(ARCHIVE_DIR),
        settings.compress,
        cancel.clone(),
    ));
    let checkpoints = CheckpointStore::new(storage_dir.join(CHECKPOINT_DIR));
    let crawler = CollectionCrawler::new(
        settings,
        client,
        pool.clone(),
        checkpoints,
        Arc::clone(&writer) as Arc<dyn RecordSink>,
        cancel,
    )?;

    let keys: Vec<CollectionKey> = content_types
        .into_iter()
        .map(|content_type| CollectionKey::new(owner, game, content_type))
        .collect();
    for key in &keys {
        writer.ensure_dirs(key).await?;
    }

    let mut failures = 0usize;
    let mut crawls = stream::iter(keys.iter())
        .map(|key| {
            let crawler = &crawler;
            async move { (key, crawler.crawl(key).await) }
        })
        .buffer_unordered(pool.capacity());

    while let Some((key, result)) = crawls.next().await {
        match result {
            Ok(()) => log::info!("Finished {}", key.label()),
            Err(AppError::Cancelled) => return Err(AppError::Cancelled),
            Err(e) => {
                failures += 1;
                log::warn!("Crawl failed for {}: {}", key.label(), e);
            }
        }
    }

    if failures > 0 {
        log::warn!("{} collection(s) did not complete", failures);
    }
    Ok(())
}
