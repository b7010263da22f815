// src/models/fragments.rs

//! Positional fragment sequences scraped from one listing page.
//!
//! The five sequences come from independent markup regions and are only
//! correlated by position. The aligner below owns the padding policy for
//! length mismatches; keeping it in one place makes the policy testable
//! instead of being interleaved with extraction.

use crate::models::record::{LevelBlob, MetaBlock};

/// The five independently-located fragment sequences from one page, in
/// document order.
#[derive(Debug, Default)]
pub struct PageFragments {
    pub levels: Vec<LevelBlob>,
    pub metas: Vec<MetaBlock>,
    pub plays: Vec<u64>,
    /// A rating node may legitimately carry no numeric child.
    pub ratings: Vec<Option<f64>>,
    /// Base64 image blobs, empty when thumbnail download is disabled.
    pub thumbnails: Vec<Option<String>>,
}

/// One positionally-aligned tuple ready for record assembly.
#[derive(Debug)]
pub struct RecordParts {
    pub level: Option<LevelBlob>,
    pub meta: Option<MetaBlock>,
    pub plays: Option<u64>,
    pub rating: Option<f64>,
    pub thumbnail: Option<String>,
}

impl PageFragments {
    /// Whether the content sequences disagree in length.
    ///
    /// Thumbnails only count when present at all, since a disabled thumbnail
    /// fetch leaves that sequence empty by design of the page scrape.
    pub fn is_misaligned(&self) -> bool {
        let n = self.levels.len();
        self.metas.len() != n
            || self.plays.len() != n
            || self.ratings.len() != n
            || (!self.thumbnails.is_empty() && self.thumbnails.len() != n)
    }

    /// Zip the sequences into per-record tuples, right-padding every
    /// sequence to the longest one with an absent marker.
    pub fn align(self) -> Vec<RecordParts> {
        let len = self
            .levels
            .len()
            .max(self.metas.len())
            .max(self.plays.len())
            .max(self.ratings.len())
            .max(self.thumbnails.len());

        let levels = pad(self.levels.into_iter().map(Some).collect(), len);
        let metas = pad(self.metas.into_iter().map(Some).collect(), len);
        let plays = pad(self.plays.into_iter().map(Some).collect(), len);
        let ratings = pad(self.ratings, len);
        let thumbnails = pad(self.thumbnails, len);

        levels
            .into_iter()
            .zip(metas)
            .zip(plays)
            .zip(ratings)
            .zip(thumbnails)
            .map(|((((level, meta), plays), rating), thumbnail)| RecordParts {
                level,
                meta,
                plays,
                rating,
                thumbnail,
            })
            .collect()
    }
}

fn pad<T>(mut seq: Vec<Option<T>>, len: usize) -> Vec<Option<T>> {
    seq.resize_with(len, || None);
    seq
}
