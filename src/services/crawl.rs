// src/services/crawl.rs

//! Per-collection crawl orchestration.
//!
//! Each collection is driven by a small state machine: load the checkpoint
//! (or probe the last page to establish the terminal id), then page forward
//! until the terminal id is re-observed, persisting progress every few
//! pages. Pages within one collection are strictly sequential; distinct
//! collections run concurrently.

use std::sync::Arc;

use futures::future;
use reqwest::Client;
use scraper::Html;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::{CollectionKey, CrawlState, Record};
use crate::services::{PageExtractor, ThumbnailFetcher};
use crate::storage::{CheckpointStore, RecordSink};
use crate::utils::PoolHandle;
use crate::utils::http::{RetryPolicy, fetch_with_retry};
use crate::utils::url::next_page_url;

/// Drives the crawl of one collection at a time.
pub struct CollectionCrawler {
    client: Client,
    extractor: PageExtractor,
    thumbs: Option<ThumbnailFetcher>,
    checkpoints: CheckpointStore,
    sink: Arc<dyn RecordSink>,
    pool: PoolHandle,
    origin: String,
    retry: RetryPolicy,
    pages_per_checkpoint: u32,
    cancel: CancellationToken,
}

impl CollectionCrawler {
    /// Create a new crawler from explicit collaborators.
    pub fn new(
        settings: &Settings,
        client: Client,
        pool: PoolHandle,
        checkpoints: CheckpointStore,
        sink: Arc<dyn RecordSink>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let retry = RetryPolicy::from(&settings.retry);
        let extractor = PageExtractor::new(pool.clone())?;
        let thumbs = settings.download_thumbnails.then(|| {
            ThumbnailFetcher::new(client.clone(), pool.clone(), retry.clone(), cancel.clone())
        });

        Ok(Self {
            client,
            extractor,
            thumbs,
            checkpoints,
            sink,
            pool,
            origin: settings.origin.clone(),
            retry,
            pages_per_checkpoint: settings.pages_per_checkpoint,
            cancel,
        })
    }

    /// Crawl one collection to completion, resuming from its checkpoint if
    /// one exists.
    pub async fn crawl(&self, key: &CollectionKey) -> Result<()> {
        let mut state = match self.checkpoints.load(key).await? {
            Some(state) => {
                log::info!("Resuming {} from {}", key.label(), state.next_url);
                state
            }
            None => self.probe(key).await?,
        };

        loop {
            state.pages_since_save += 1;
            if state.pages_since_save >= self.pages_per_checkpoint {
                self.checkpoints.save(&mut state).await?;
            }

            let (records, next) = self.process_page(key, &state.next_url).await?;

            let writes = records.iter().map(|record| {
                let sink = Arc::clone(&self.sink);
                let pool = self.pool.clone();
                async move { pool.run(sink.write(key, record)).await }
            });
            for result in future::join_all(writes).await {
                result?;
            }

            let lowest_id = records.iter().map(|r| r.id).min().ok_or_else(|| {
                AppError::crawl(key.label(), format!("page {} yielded no records", state.next_url))
            })?;

            // The terminal check compares the page minimum against the
            // probed final id; ids are assumed to decrease monotonically
            // across pages in crawl order.
            if lowest_id == state.final_id {
                log::info!("Final id reached for {}. Enjoy your archive!", key.label());
                break;
            }

            match next {
                Some(url) => {
                    log::info!(
                        "Downloading {}: {}",
                        key.label(),
                        percent_done(lowest_id, state.final_id)
                    );
                    state.next_url = url;
                }
                None => {
                    // Partial crawl accepted, not retried.
                    log::warn!(
                        "No next page link at {}, stopping {} here",
                        state.next_url,
                        key.label()
                    );
                    break;
                }
            }
        }

        // Final save so the checkpoint reflects the last processed page.
        self.checkpoints.save(&mut state).await
    }

    /// Establish a fresh crawl state by probing the collection's last page
    /// for its lowest record id.
    async fn probe(&self, key: &CollectionKey) -> Result<CrawlState> {
        let url = key.shared_url(&self.origin);
        log::info!("No checkpoint for {}, probing last page", key.label());

        let document = self.fetch_document(&url, &[("srid", "last")]).await?;
        let records = self.extractor.extract(&document, self.thumbs.as_ref()).await?;
        let final_id = records
            .iter()
            .map(|r| r.id)
            .min()
            .ok_or_else(|| AppError::crawl(key.label(), "terminal page yielded no records"))?;

        let mut state = CrawlState::new(key.clone(), final_id, url);
        self.checkpoints.save(&mut state).await?;
        Ok(state)
    }

    /// Fetch and extract one listing page, also resolving its next-page
    /// link.
    async fn process_page(
        &self,
        key: &CollectionKey,
        url: &str,
    ) -> Result<(Vec<Record>, Option<String>)> {
        let document = self.fetch_document(url, &[]).await?;
        let records = self.extractor.extract(&document, self.thumbs.as_ref()).await?;
        let next = next_page_url(&document, &self.origin);
        drop(document);

        log::debug!("Extracted {} record(s) from {} for {}", records.len(), url, key.label());
        Ok((records, next))
    }

    async fn fetch_document(&self, url: &str, params: &[(&str, &str)]) -> Result<Html> {
        let Some(response) =
            fetch_with_retry(&self.client, url, params, &self.retry, &self.cancel).await
        else {
            return Err(AppError::crawl(url, "fetch attempts exhausted"));
        };
        let body = response.text().await?;
        Ok(Html::parse_document(&body))
    }
}

/// Progress toward the terminal id as a percentage string.
fn percent_done(lowest_id: i64, final_id: i64) -> String {
    if lowest_id == 0 {
        return "0.00% done".to_string();
    }
    format!("{:.2}% done", final_id as f64 / lowest_id as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrySettings;
    use crate::storage::ArchiveWriter;
    use crate::utils::http::create_client;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OWNER: &str = "alice";
    const GAME: &str = "maze-maker";
    const TYPE: &str = "Level";

    fn key() -> CollectionKey {
        CollectionKey::new(OWNER, GAME, TYPE)
    }

    fn entry_html(id: i64) -> String {
        format!(
            concat!(
                r##"<dt class="thumbnail"><a href="#" onclick="holodeck.showSharedContent("##,
                r#"{{&quot;name&quot;:&quot;level {id}&quot;,&quot;content&quot;:&quot;data-{id}&quot;,"#,
                r#"&quot;id&quot;:{id},&quot;contentType&quot;:&quot;Level&quot;}}); return false;">"#,
                r#"<img src="http://cdn.test/{id}.png"></a></dt>"#,
                r#"<dd class="name_description"><em>by author{id}</em><p>desc {id}</p></dd>"#,
                r#"<dd class="load_count"><em>Loaded 5 times</em></dd>"#,
                r#"<div class="shared_content_rating"><em>(4.0 Avg.)</em></div>"#,
            ),
            id = id,
        )
    }

    fn page_html(ids: &[i64], next_href: Option<&str>) -> String {
        let mut body: String = ids.iter().map(|id| entry_html(*id)).collect();
        if let Some(href) = next_href {
            body.push_str(&format!(
                r#"<ul class="pagination"><li class="next"><a href="{href}">next</a></li></ul>"#
            ));
        }
        format!("<html><body><dl>{body}</dl></body></html>")
    }

    fn page_response(ids: &[i64], next_href: Option<&str>) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_string(page_html(ids, next_href))
    }

    struct Harness {
        crawler: CollectionCrawler,
        checkpoints: CheckpointStore,
        writer: Arc<ArchiveWriter>,
        _tmp: TempDir,
    }

    fn harness(server_uri: &str) -> Harness {
        let tmp = TempDir::new().unwrap();
        let settings = Settings {
            origin: server_uri.trim_end_matches('/').to_string(),
            retry: RetrySettings {
                max_tries: Some(2),
                wait_ms: 5,
            },
            ..Settings::default()
        };
        let client = create_client(&settings.user_agent, 5).unwrap();
        let pool = PoolHandle::new(4);
        let checkpoints = CheckpointStore::new(tmp.path().join("Checkpoints"));
        let writer = Arc::new(ArchiveWriter::new(
            tmp.path().join("Archived Levels"),
            false,
            CancellationToken::new(),
        ));
        let crawler = CollectionCrawler::new(
            &settings,
            client,
            pool,
            checkpoints.clone(),
            Arc::clone(&writer) as Arc<dyn RecordSink>,
            CancellationToken::new(),
        )
        .unwrap();
        Harness {
            crawler,
            checkpoints,
            writer,
            _tmp: tmp,
        }
    }

    async fn seed_checkpoint(h: &Harness, final_id: i64, next_url: &str) {
        let mut state = CrawlState::new(key(), final_id, next_url);
        h.checkpoints.save(&mut state).await.unwrap();
    }

    #[tokio::test]
    async fn test_stops_when_page_minimum_equals_final_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p1"))
            .respond_with(page_response(&[60, 50], Some("/p2")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p2"))
            .respond_with(page_response(&[40, 30], Some("/p3")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p3"))
            .respond_with(page_response(&[20, 10], Some("/p4")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p4"))
            .respond_with(page_response(&[5], None))
            .expect(0)
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        seed_checkpoint(&h, 10, &format!("{}/p1", server.uri())).await;

        h.crawler.crawl(&key()).await.unwrap();

        // All three pages archived, the fourth never fetched.
        for id in [60, 50, 40, 30, 20, 10] {
            assert!(h.writer.load(&key(), id).await.unwrap().is_some());
        }
        assert!(h.writer.load(&key(), 5).await.unwrap().is_none());
        server.verify().await;

        // The final checkpoint points at the last processed page.
        let saved = h.checkpoints.load(&key()).await.unwrap().unwrap();
        assert_eq!(saved.next_url, format!("{}/p3", server.uri()));
        assert_eq!(saved.final_id, 10);
    }

    #[tokio::test]
    async fn test_resume_fetches_checkpoint_url_without_reprobing() {
        let server = MockServer::start().await;
        // The terminal-page probe must never fire when a checkpoint exists.
        Mock::given(method("GET"))
            .and(path(format!("/games/{OWNER}/{GAME}/shared/{TYPE}")))
            .and(query_param("srid", "last"))
            .respond_with(page_response(&[1], None))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/resumed"))
            .respond_with(page_response(&[50], None))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        seed_checkpoint(&h, 50, &format!("{}/resumed", server.uri())).await;

        h.crawler.crawl(&key()).await.unwrap();
        server.verify().await;
    }

    #[tokio::test]
    async fn test_probe_establishes_final_id_then_pages_from_first() {
        let server = MockServer::start().await;
        let shared_path = format!("/games/{OWNER}/{GAME}/shared/{TYPE}");

        // Probe of the last page; its records are not archived.
        Mock::given(method("GET"))
            .and(path(shared_path.clone()))
            .and(query_param("srid", "last"))
            .respond_with(page_response(&[20, 10], None))
            .expect(1)
            .mount(&server)
            .await;
        // First page, fetched without parameters.
        Mock::given(method("GET"))
            .and(path(shared_path.clone()))
            .and(query_param_is_missing("srid"))
            .and(query_param_is_missing("page"))
            .respond_with(page_response(&[50, 40], Some(&format!("{shared_path}?page=2"))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(shared_path.clone()))
            .and(query_param("page", "2"))
            .respond_with(page_response(&[30, 10], None))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        h.crawler.crawl(&key()).await.unwrap();

        for id in [50, 40, 30, 10] {
            assert!(h.writer.load(&key(), id).await.unwrap().is_some());
        }
        // Probe-page records are only used to establish the terminal id.
        assert!(h.writer.load(&key(), 20).await.unwrap().is_none());

        let saved = h.checkpoints.load(&key()).await.unwrap().unwrap();
        assert_eq!(saved.final_id, 10);
    }

    #[tokio::test]
    async fn test_missing_next_link_is_soft_termination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solo"))
            .respond_with(page_response(&[30, 20], None))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        seed_checkpoint(&h, 5, &format!("{}/solo", server.uri())).await;

        // Terminal id never observed, but the crawl still ends cleanly.
        h.crawler.crawl(&key()).await.unwrap();
        assert!(h.writer.load(&key(), 30).await.unwrap().is_some());
        assert!(h.writer.load(&key(), 20).await.unwrap().is_some());

        let saved = h.checkpoints.load(&key()).await.unwrap().unwrap();
        assert_eq!(saved.next_url, format!("{}/solo", server.uri()));
    }

    #[tokio::test]
    async fn test_recrawl_overwrites_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/once"))
            .respond_with(page_response(&[10], None))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        seed_checkpoint(&h, 10, &format!("{}/once", server.uri())).await;
        h.crawler.crawl(&key()).await.unwrap();

        // Second run resumes from the saved checkpoint and rewrites id 10.
        h.crawler.crawl(&key()).await.unwrap();
        let record = h.writer.load(&key(), 10).await.unwrap().unwrap();
        assert_eq!(record.data, "data-10");
    }

    #[tokio::test]
    async fn test_page_without_records_is_a_crawl_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        seed_checkpoint(&h, 10, &format!("{}/empty", server.uri())).await;

        let result = h.crawler.crawl(&key()).await;
        assert!(matches!(result, Err(AppError::Crawl { .. })));
    }

    #[tokio::test]
    async fn test_exhausted_page_fetch_is_a_crawl_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        seed_checkpoint(&h, 10, &format!("{}/down", server.uri())).await;

        let result = h.crawler.crawl(&key()).await;
        assert!(matches!(result, Err(AppError::Crawl { .. })));
        server.verify().await;
    }

    #[test]
    fn test_percent_done_formatting() {
        assert_eq!(percent_done(50, 10), "20.00% done");
        assert_eq!(percent_done(0, 10), "0.00% done");
    }
}
