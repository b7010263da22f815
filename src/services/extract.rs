// src/services/extract.rs

//! Listing-page extraction.
//!
//! One listing page carries five independently-located fragment regions:
//! thumbnail nodes (each embedding the record's object literal), metadata
//! nodes, play-count nodes, rating nodes, and thumbnail image URLs. The
//! regions are only correlated by position; alignment and padding live in
//! [`PageFragments`].

use futures::stream::{self, StreamExt};
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{MetaBlock, PageFragments, Record, assemble};
use crate::services::ThumbnailFetcher;
use crate::utils::PoolHandle;
use crate::utils::url::strip_query;

/// End of the embedded object literal inside a thumbnail node's click
/// handler.
const BLOB_SENTINEL: &str = "}); return false";

/// Extracts records from one shared-content listing page.
pub struct PageExtractor {
    thumbnail_sel: Selector,
    meta_sel: Selector,
    plays_sel: Selector,
    rating_sel: Selector,
    em_sel: Selector,
    p_sel: Selector,
    img_sel: Selector,
    pool: PoolHandle,
}

impl PageExtractor {
    /// Create an extractor sharing the process-wide pool.
    pub fn new(pool: PoolHandle) -> Result<Self> {
        Ok(Self {
            thumbnail_sel: Self::parse_selector("dt.thumbnail")?,
            meta_sel: Self::parse_selector("dd.name_description")?,
            plays_sel: Self::parse_selector("dd.load_count")?,
            rating_sel: Self::parse_selector("div.shared_content_rating")?,
            em_sel: Self::parse_selector("em")?,
            p_sel: Self::parse_selector("p")?,
            img_sel: Self::parse_selector("img")?,
            pool,
        })
    }

    /// Extract all records from a page, fetching thumbnails first when a
    /// fetcher is supplied.
    ///
    /// Every aligned tuple that carries a primary blob yields exactly one
    /// record; assembly runs across the shared pool and output order is
    /// unconstrained.
    pub async fn extract(
        &self,
        document: &Html,
        thumbs: Option<&ThumbnailFetcher>,
    ) -> Result<Vec<Record>> {
        let mut fragments = self.fragments(document)?;

        if let Some(fetcher) = thumbs {
            let urls = self.thumbnail_urls(document)?;
            fragments.thumbnails = fetcher.fetch_all(&urls).await;
        }

        if fragments.is_misaligned() {
            log::warn!(
                "Fragment sequences disagree in length ({} blobs, {} metas, {} plays, {} ratings, {} thumbs); padding with absent markers",
                fragments.levels.len(),
                fragments.metas.len(),
                fragments.plays.len(),
                fragments.ratings.len(),
                fragments.thumbnails.len(),
            );
        }

        let tuples = fragments.align();
        let total = tuples.len();

        let assembled: Vec<_> = stream::iter(tuples)
            .map(|parts| self.pool.run(async move { assemble(parts) }))
            .buffer_unordered(self.pool.capacity().max(1))
            .collect()
            .await;
        let records: Vec<Record> = assembled.into_iter().flatten().collect();

        if records.len() != total {
            log::warn!(
                "{} fragment tuple(s) carried no primary blob and were dropped",
                total - records.len()
            );
        }
        Ok(records)
    }

    /// Scrape the five positional fragment sequences from a page.
    pub fn fragments(&self, document: &Html) -> Result<PageFragments> {
        let mut fragments = PageFragments::default();

        for node in document.select(&self.thumbnail_sel) {
            let html = node.html().replace("&quot;", "\"");
            let literal = slice_embedded(&html).ok_or_else(|| {
                AppError::extract("level blob", "embedded object literal not found")
            })?;
            let blob = serde_json::from_str(literal)
                .map_err(|e| AppError::extract("level blob", e))?;
            fragments.levels.push(blob);
        }

        for node in document.select(&self.meta_sel) {
            fragments.metas.push(self.parse_meta(&node)?);
        }

        for node in document.select(&self.plays_sel) {
            fragments.plays.push(self.parse_plays(&node)?);
        }

        for node in document.select(&self.rating_sel) {
            fragments.ratings.push(self.parse_rating(&node)?);
        }

        Ok(fragments)
    }

    /// Resolve each thumbnail node's image URL with the query stripped.
    pub fn thumbnail_urls(&self, document: &Html) -> Result<Vec<String>> {
        document
            .select(&self.thumbnail_sel)
            .map(|node| {
                let src = node
                    .select(&self.img_sel)
                    .next()
                    .and_then(|img| img.value().attr("src"))
                    .ok_or_else(|| {
                        AppError::extract("thumbnail", "node carries no img src")
                    })?;
                Ok(strip_query(src).to_string())
            })
            .collect()
    }

    fn parse_meta(&self, node: &ElementRef<'_>) -> Result<MetaBlock> {
        let author_text: String = node
            .select(&self.em_sel)
            .next()
            .ok_or_else(|| AppError::extract("metadata", "author line missing"))?
            .text()
            .collect();
        let description: String = node
            .select(&self.p_sel)
            .next()
            .ok_or_else(|| AppError::extract("metadata", "description paragraph missing"))?
            .text()
            .collect();

        Ok(MetaBlock {
            author: author_text
                .strip_prefix("by ")
                .unwrap_or(&author_text)
                .to_string(),
            description,
        })
    }

    fn parse_plays(&self, node: &ElementRef<'_>) -> Result<u64> {
        let text: String = node
            .select(&self.em_sel)
            .next()
            .ok_or_else(|| AppError::extract("play count", "count text missing"))?
            .text()
            .collect();
        let digits = text
            .replace("Loaded ", "")
            .replace(" times", "")
            .replace(" time", "");
        digits
            .trim()
            .parse()
            .map_err(|e| AppError::extract("play count", format!("{e}: {text:?}")))
    }

    /// A rating node without a numeric child means no rating was recorded;
    /// a present child that fails to parse is malformed markup.
    fn parse_rating(&self, node: &ElementRef<'_>) -> Result<Option<f64>> {
        let Some(em) = node.select(&self.em_sel).next() else {
            return Ok(None);
        };
        let text: String = em.text().collect();
        let value = text
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(" Avg.)")
            .parse()
            .map_err(|e| AppError::extract("rating", format!("{e}: {text:?}")))?;
        Ok(Some(value))
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

/// Slice the embedded object literal out of a thumbnail node's HTML: from
/// the first `{` through the closing brace of the sentinel.
fn slice_embedded(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind(BLOB_SENTINEL)?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
