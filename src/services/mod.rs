// src/services/mod.rs

//! Service layer for the archiver.
//!
//! - Content-type discovery (`ContentTypeDiscovery`)
//! - Listing-page extraction (`PageExtractor`)
//! - Thumbnail fetching (`ThumbnailFetcher`)
//! - Per-collection crawling (`CollectionCrawler`)

mod crawl;
mod discovery;
mod extract;
mod thumbs;

pub use crawl::CollectionCrawler;
pub use discovery::ContentTypeDiscovery;
pub use extract::PageExtractor;
pub use thumbs::ThumbnailFetcher;
