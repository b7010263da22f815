// src/models/record.rs

//! Archived record and its assembly from page fragments.

use serde::{Deserialize, Serialize};

use crate::models::fragments::RecordParts;

/// The embedded object literal carried by each thumbnail node.
///
/// This is the primary fragment: it alone carries the record's identity and
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelBlob {
    pub name: String,

    /// Serialized level payload as published by the game
    pub content: String,

    pub id: i64,

    #[serde(rename = "contentType")]
    pub content_type: String,
}

/// Author name and description scraped from a metadata node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaBlock {
    pub author: String,
    pub description: String,
}

/// One archived shared-content record.
///
/// Written once per crawl under its `id`; re-crawls overwrite in place, so
/// absence of any optional field is legitimate, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,

    pub name: String,

    /// Serialized level payload
    pub data: String,

    #[serde(rename = "type")]
    pub content_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plays: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(rename = "desc", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,

    /// Base64-encoded thumbnail image bytes
    #[serde(rename = "thumb", skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Assemble a record from one positionally-aligned fragment tuple.
///
/// Pure function of its inputs; any argument may be absent after padding.
/// Without a level blob there is no id to key the archive entry by, so the
/// tuple yields `None`. An empty description is treated as absent.
pub fn assemble(parts: RecordParts) -> Option<Record> {
    let level = parts.level?;

    let (author, description) = match parts.meta {
        Some(meta) => {
            let description = if meta.description.is_empty() {
                None
            } else {
                Some(meta.description)
            };
            (Some(meta.author), description)
        }
        None => (None, None),
    };

    Some(Record {
        id: level.id,
        name: level.name,
        data: level.content,
        content_type: level.content_type,
        plays: parts.plays,
        author,
        description,
        rating: parts.rating,
        thumbnail: parts.thumbnail,
    })
}
