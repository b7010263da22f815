// src/utils/http.rs

//! HTTP client utilities and the retry policy.

use std::time::Duration;

use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;

use crate::config::RetrySettings;
use crate::error::Result;

/// Retry behavior for a fetch call site.
///
/// `max_tries = None` means retry indefinitely; the loop still observes the
/// shutdown token between attempts, so an unbounded fetch never outlives a
/// cancelled run.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_tries: Option<u32>,
    pub wait: Duration,
}

impl RetryPolicy {
    /// Retry at most `max_tries` times with `wait` between attempts.
    pub fn bounded(max_tries: u32, wait: Duration) -> Self {
        Self {
            max_tries: Some(max_tries),
            wait,
        }
    }

    /// Retry until success or cancellation.
    pub fn unbounded(wait: Duration) -> Self {
        Self {
            max_tries: None,
            wait,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_tries: settings.max_tries,
            wait: settings.wait(),
        }
    }
}

/// Create a configured asynchronous HTTP client.
pub fn create_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// GET a URL, retrying on connection failure or non-success status.
///
/// Returns `None` once the policy's attempts are exhausted or the token is
/// cancelled; callers must treat that as a fetch failure. Each failed
/// attempt emits a warning with the status code or error.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    params: &[(&str, &str)],
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Option<Response> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match client.get(url).query(params).send().await {
            Ok(response) if response.status().is_success() => return Some(response),
            Ok(response) => {
                log::warn!(
                    "fetch {} returned status {}, retrying...",
                    url,
                    response.status()
                );
            }
            Err(e) => {
                log::warn!("fetch {} failed: {}, retrying...", url, e);
            }
        }

        if let Some(max) = policy.max_tries {
            if attempt >= max {
                log::warn!("fetch {} gave up after {} attempts", url, attempt);
                return None;
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                log::info!("fetch {} stopped by shutdown signal", url);
                return None;
            }
            _ = tokio::time::sleep(policy.wait) => {}
        }
    }
}
