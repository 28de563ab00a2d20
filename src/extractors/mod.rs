//! Source extractors that turn a rendered page into records.
//!
//! Every source has exactly one [`Extractor`], registered under its source
//! identifier in an [`ExtractorRegistry`]. Extractors are pure: they read
//! the markup of a [`RenderedDocument`] and return records in page order.
//! Making relative links absolute is their job; relevance filtering and
//! deduplication are not.
//!
//! # Supported Sources
//!
//! | Kind | Module | Sources |
//! |------|--------|---------|
//! | Card/list layouts | [`listing`] | ccny, bmcc, csi, guttman, hunter, jjay, kbcc, law, lehman, macaly, mec, sps, lagrdia, sph, york, hostos, broklyn, bcc, gc, ct |
//! | Archive layouts | [`archives`] | baruc, qc, qcc |
//!
//! The identifiers are the stable keys of the persisted state file and must
//! not be renamed.

pub mod archives;
pub mod colleges;
pub mod listing;

use crate::models::{RenderedDocument, Record};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors an extractor can raise.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("unexpected document structure: {0}")]
    Structure(String),
}

/// Maps one rendered page of a source to records.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &RenderedDocument) -> Result<Vec<Record>, ExtractError>;
}

/// Source identifier → extractor.
///
/// This is the only place new sources are added.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `extractor` for `source`, replacing any previous one.
    pub fn register(&mut self, source: impl Into<String>, extractor: impl Extractor + 'static) {
        self.extractors.insert(source.into(), Box::new(extractor));
    }

    pub fn get(&self, source: &str) -> Option<&dyn Extractor> {
        self.extractors.get(source).map(|e| e.as_ref())
    }

    pub fn contains(&self, source: &str) -> bool {
        self.extractors.contains_key(source)
    }

    /// Registered identifiers, sorted.
    pub fn sources(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("sources", &self.sources())
            .finish()
    }
}

/// Parse a CSS selector, mapping the parser's borrowed error into ours.
pub(crate) fn selector(css: &str) -> Result<scraper::Selector, ExtractError> {
    scraper::Selector::parse(css).map_err(|_| ExtractError::Selector(css.to_string()))
}

/// Resolve `href` against the page URL. Empty input stays empty.
pub(crate) fn absolutize(page: &url::Url, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    match page.join(href) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Parse the URL a document was rendered from.
pub(crate) fn page_url(document: &RenderedDocument) -> Result<url::Url, ExtractError> {
    url::Url::parse(&document.url)
        .map_err(|e| ExtractError::Structure(format!("bad page url {}: {e}", document.url)))
}
