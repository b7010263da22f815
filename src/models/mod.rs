// src/models/mod.rs

//! Domain models for the archiver.

mod collection;
mod fragments;
mod record;

pub use collection::{CollectionKey, CrawlState};
pub use fragments::{PageFragments, RecordParts};
pub use record::{LevelBlob, MetaBlock, Record, assemble};
