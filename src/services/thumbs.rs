// src/services/thumbs.rs

//! Batch thumbnail fetching.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::utils::PoolHandle;
use crate::utils::http::{RetryPolicy, fetch_with_retry};

/// Fetches thumbnail images keyed by URL, base64-encoding the bytes.
pub struct ThumbnailFetcher {
    client: Client,
    pool: PoolHandle,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl ThumbnailFetcher {
    /// Create a new thumbnail fetcher sharing the process-wide pool.
    pub fn new(
        client: Client,
        pool: PoolHandle,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            pool,
            retry,
            cancel,
        }
    }

    /// Fetch all URLs, returning results in input order regardless of
    /// completion order. A URL whose retries exhaust yields `None`.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<Option<String>> {
        stream::iter(urls)
            .map(|url| self.fetch_one(url))
            .buffered(self.pool.capacity().max(1))
            .collect()
            .await
    }

    /// Fetch one image with its own bounded retry loop, holding a pool
    /// permit for the duration of the request.
    async fn fetch_one(&self, url: &str) -> Option<String> {
        self.pool
            .run(async {
                let response =
                    fetch_with_retry(&self.client, url, &[], &self.retry, &self.cancel).await?;
                match response.bytes().await {
                    Ok(bytes) => Some(STANDARD.encode(&bytes)),
                    Err(e) => {
                        log::warn!("thumbnail body read failed for {}: {}", url, e);
                        None
                    }
                }
            })
            .await
    }
}
