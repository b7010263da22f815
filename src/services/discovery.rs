// src/services/discovery.rs

//! Content-type discovery service.
//!
//! A game's landing page registers each shared-content listing through an
//! embedded `holodeck.showSharedContentsIndex("...")` call; the quoted first
//! argument is the content type we can crawl.

use std::collections::HashSet;

use regex::Regex;
use reqwest::Client;

use crate::error::Result;

/// Service for discovering a game's crawlable content types.
pub struct ContentTypeDiscovery<'a> {
    client: &'a Client,
    origin: String,
    call_pattern: Regex,
}

impl<'a> ContentTypeDiscovery<'a> {
    /// Create a new discovery service.
    pub fn new(client: &'a Client, origin: &str) -> Self {
        Self {
            client,
            origin: origin.to_string(),
            call_pattern: Regex::new(r"holodeck\.showSharedContentsIndex(.*)")
                .expect("static discovery pattern"),
        }
    }

    /// Fetch the game's landing page once and scan it for content types.
    ///
    /// An empty set is a legitimate "nothing to crawl" outcome, not an
    /// error. The fetch is direct; a transient failure surfaces to the
    /// caller instead of being retried.
    pub async fn discover(&self, owner: &str, game: &str) -> Result<HashSet<String>> {
        let url = format!("{}/games/{}/{}", self.origin, owner, game);
        let body = self.client.get(&url).send().await?.text().await?;
        Ok(self.scan(&body))
    }

    /// Extract the deduplicated content types from landing-page text.
    pub fn scan(&self, body: &str) -> HashSet<String> {
        let mut types = HashSet::new();
        for caps in self.call_pattern.captures_iter(body) {
            // The page sometimes ships the call arguments entity-escaped.
            let args = caps[1].replace("&quot;", "\"");
            let Some(open) = args.find('"') else { continue };
            let tail = &args[open + 1..];
            let Some(close) = tail.find('"') else { continue };
            types.insert(tail[..close].to_string());
        }
        types
    }
}
