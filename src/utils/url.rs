// src/utils/url.rs

//! URL manipulation helpers.

use scraper::{Html, Selector};
use url::Url;

/// Resolve a potentially relative href against a base URL.
pub fn resolve(base: &str, href: &str) -> Option<String> {
    Url::parse(base)
        .ok()
        .and_then(|base| base.join(href).ok())
        .map(|u| u.to_string())
}

/// Locate the "next page" navigation link in a listing page and resolve it
/// against the site origin.
///
/// Absence is a legitimate outcome; the caller treats it as the end of the
/// collection's pagination.
pub fn next_page_url(document: &Html, origin: &str) -> Option<String> {
    let selector = Selector::parse("li.next a[href]").ok()?;
    let href = document
        .select(&selector)
        .next()
        .and_then(|a| a.value().attr("href"))?;
    resolve(origin, href)
}

/// Drop the query string from a URL.
pub fn strip_query(url: &str) -> &str {
    match url.find('?') {
        Some(idx) => &url[..idx],
        None => url,
    }
}
