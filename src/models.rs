//! Data models for aggregated news records and rendered pages.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Record`]: One news or announcement item as produced by an extractor
//! - [`RenderedDocument`]: The fully materialized markup of one page
//!
//! Records are persisted with snake_case field names (`read_more_link`,
//! `image_reference`, ...) to stay compatible with previously written state
//! files. Fields the crate does not know about are carried in
//! [`Record::extra`] so they survive a load/save cycle.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One aggregated news or announcement item.
///
/// A record is never modified after an extractor produced it. The pipeline
/// only filters, deduplicates and reorders records.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Record {
    /// Headline. May be empty; the core never rejects a record for it.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    /// Absolute link to the full story.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub read_more_link: String,
    /// Absolute image URL, or empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image_reference: String,
    /// Plain-text teaser.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Source-specific date text. Opaque: never parsed.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String,
    /// Human-readable source label some newsrooms attach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Coarse date grouping such as "March 2025" for archive-style pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_label: Option<String>,
    /// Any other fields found in persisted state.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Build a record from the four fields every extractor fills in.
    pub fn new(
        title: impl Into<String>,
        read_more_link: impl Into<String>,
        image_reference: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            read_more_link: read_more_link.into(),
            image_reference: image_reference.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_date_label(mut self, label: impl Into<String>) -> Self {
        self.date_label = Some(label.into());
        self
    }

    /// Trimmed, lowercased description. This is the session dedup key.
    pub fn description_key(&self) -> String {
        normalize_key(&self.description)
    }

    /// Trimmed, lowercased title. This is the merge-time dedup key.
    pub fn title_key(&self) -> String {
        normalize_key(&self.title)
    }
}

/// Older state files carry `null` where a page had no value.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalize text for exact-match comparisons.
pub fn normalize_key(text: &str) -> String {
    text.trim().to_lowercase()
}

/// The fully rendered markup of one page.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// The URL that was requested.
    pub url: String,
    /// The markup after scripts ran and the settle delay elapsed.
    pub html: String,
}

impl RenderedDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}
