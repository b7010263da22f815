// src/models/collection.rs

//! Collection identity and resumable crawl state.

use serde::{Deserialize, Serialize};

/// Identifies one crawlable pagination stream: a game's shared-content
/// listing of a single content type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionKey {
    /// Account name of the game's owner
    pub owner: String,

    /// Game name as it appears in the URL path
    pub game: String,

    /// Shared-content type (e.g. "Level")
    pub content_type: String,
}

impl CollectionKey {
    /// Create a new collection key.
    pub fn new(
        owner: impl Into<String>,
        game: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            game: game.into(),
            content_type: content_type.into(),
        }
    }

    /// URL of the game's landing page.
    pub fn landing_url(&self, origin: &str) -> String {
        format!("{}/games/{}/{}", origin, self.owner, self.game)
    }

    /// URL of the collection's shared-content listing (first page when
    /// fetched without parameters).
    pub fn shared_url(&self, origin: &str) -> String {
        format!("{}/shared/{}", self.landing_url(origin), self.content_type)
    }

    /// Short human-readable label for log messages.
    pub fn label(&self) -> String {
        format!("{}/{}/{}", self.owner, self.game, self.content_type)
    }
}

/// Resumable progress for one collection's crawl.
///
/// Owned exclusively by the crawler instance driving this key; persisted by
/// the checkpoint store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    /// The collection this state belongs to
    pub key: CollectionKey,

    /// Lowest record id observed on the collection's last page at probe
    /// time; the crawl's stopping condition
    pub final_id: i64,

    /// Next page URL to fetch on resume
    pub next_url: String,

    /// Pages processed since the last checkpoint save
    pub pages_since_save: u32,
}

impl CrawlState {
    /// Create a fresh crawl state with the save counter at zero.
    pub fn new(key: CollectionKey, final_id: i64, next_url: impl Into<String>) -> Self {
        Self {
            key,
            final_id,
            next_url: next_url.into(),
            pages_since_save: 0,
        }
    }
}
