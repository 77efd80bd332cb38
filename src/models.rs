//! Data models for harvested stories and crawl progress.
//!
//! This module defines the structures that are persisted between runs and
//! the messages workers send to the aggregator:
//! - [`Story`], [`Section`], [`Content`], [`ContentChild`]: the extracted
//!   content model, serialized with the camelCase keys the site's consumers
//!   expect (`createdDate`, `type`, ...)
//! - [`CrawlState`], [`StoryCollection`]: the two resumable maps
//! - [`WorkResult`], [`DiscoveryResult`]: per-lane messages, never persisted

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Discovered story URL → "fully extracted" flag.
pub type CrawlState = BTreeMap<String, bool>;

/// Story title → story. Two stories sharing a title overwrite each other.
pub type StoryCollection = BTreeMap<String, Story>;

/// Read a list that older state files may store as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One testimonial as extracted from a story page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Headline of the story; also its key in [`StoryCollection`].
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_date: String,
    #[serde(default)]
    pub author: String,
    /// First paragraph of the narrative.
    #[serde(default)]
    pub summary: String,
    /// Image sections in document order, followed by one paragraph section.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sections: Vec<Section>,
}

/// A block of a story: either one image or the running paragraph text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Section {
    #[serde(default)]
    pub anchor: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: Vec<Content>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    /// Published image path; empty for paragraphs.
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<ContentChild>,
}

impl Content {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Image,
            url: url.into(),
            children: Vec::new(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Paragraph,
            url: String::new(),
            children: vec![ContentChild::text(text)],
        }
    }
}

/// Inline content node.
///
/// Only `text` is filled in by the extractor; the formatting fields keep the
/// schema compatible with richer inline markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContentChild {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub bold: bool,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<ContentChild>,
}

impl ContentChild {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// What an extraction lane reports for one story page.
#[derive(Debug, Clone)]
pub struct WorkResult {
    pub story: Story,
    pub source_url: String,
    pub failed: bool,
}

impl WorkResult {
    pub fn extracted(source_url: impl Into<String>, story: Story) -> Self {
        Self {
            story,
            source_url: source_url.into(),
            failed: false,
        }
    }

    pub fn failed(source_url: impl Into<String>) -> Self {
        Self {
            story: Story::default(),
            source_url: source_url.into(),
            failed: true,
        }
    }
}

/// What a discovery lane reports. A lane emits one `Found` per story link on
/// its listing page, or a single `ListingFailed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryResult {
    Found(String),
    ListingFailed(String),
}
