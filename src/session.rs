//! Crawl session runner: one source, its seed URLs, one bounded result.
//!
//! For each URL in configured order the runner renders the page and hands
//! it to the source's extractor, retrying the pair as a unit. Raw records
//! then pass the relevance filter and the session deduplicator, in that
//! order, before they are appended to the session result.
//!
//! A URL that exhausts its attempts is logged and skipped. The session
//! stops early once it holds `num_of_news` records, once `session_ceiling`
//! raw records have been looked at, or once the per-source deadline
//! passes. Whatever was gathered up to that point is returned.

use crate::config::{CrawlSettings, SourceConfig};
use crate::dedup::SessionDeduplicator;
use crate::extractors::{ExtractError, Extractor};
use crate::filter::RelevanceFilter;
use crate::models::{RenderedDocument, Record};
use crate::renderer::{Render, RenderError};
use crate::retry::{with_retries, RetryExhausted, RetryPolicy};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, instrument, warn};

/// Why a single render+extract attempt failed.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("source deadline passed before the attempt started")]
    DeadlinePassed,
}

/// Limits for one session, derived from [`CrawlSettings`].
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub retry: RetryPolicy,
    pub num_of_news: usize,
    pub session_ceiling: usize,
    pub render_timeout: Duration,
    pub settle_delay: Duration,
    pub deadline: Duration,
}

impl From<&CrawlSettings> for SessionLimits {
    fn from(settings: &CrawlSettings) -> Self {
        Self {
            retry: settings.retry_policy(),
            num_of_news: settings.num_of_news,
            session_ceiling: settings.session_ceiling,
            render_timeout: settings.render_timeout(),
            settle_delay: settings.settle_delay(),
            deadline: settings.source_deadline(),
        }
    }
}

/// The outcome of one session.
#[derive(Debug, Default)]
pub struct SessionReport {
    /// Admitted records in discovery order, at most `num_of_news`.
    pub records: Vec<Record>,
    pub urls_attempted: usize,
    /// URLs skipped after exhausting their attempts.
    pub urls_failed: Vec<String>,
    /// Raw records looked at, bounded by `session_ceiling`.
    pub raw_seen: usize,
    pub filtered_out: usize,
    pub duplicates: usize,
    pub deadline_hit: bool,
}

/// Drives one source's URLs through a renderer and an extractor.
pub struct SessionRunner<'a, R> {
    renderer: &'a R,
    filter: &'a RelevanceFilter,
    limits: SessionLimits,
    dump_dir: Option<&'a Path>,
}

impl<'a, R: Render> SessionRunner<'a, R> {
    pub fn new(renderer: &'a R, filter: &'a RelevanceFilter, limits: SessionLimits) -> Self {
        Self {
            renderer,
            filter,
            limits,
            dump_dir: None,
        }
    }

    /// Write every successfully rendered page under `dir`.
    pub fn with_dump_dir(mut self, dir: Option<&'a Path>) -> Self {
        self.dump_dir = dir;
        self
    }

    #[instrument(level = "info", skip_all, fields(source = %source.id))]
    pub async fn run(&self, source: &SourceConfig, extractor: &dyn Extractor) -> SessionReport {
        let started = Instant::now();
        let deadline = started + self.limits.deadline;
        let mut dedup = SessionDeduplicator::new();
        let mut report = SessionReport::default();

        for (index, url) in source.urls.iter().enumerate() {
            if report.records.len() >= self.limits.num_of_news {
                debug!("Session cap reached");
                break;
            }
            if report.raw_seen >= self.limits.session_ceiling {
                debug!("Raw record ceiling reached");
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    skipped_urls = source.urls.len() - index,
                    "Source deadline passed; keeping what was gathered"
                );
                report.deadline_hit = true;
                break;
            }

            info!(%url, page = index + 1, "Crawling page");
            report.urls_attempted += 1;

            let raw = match self.crawl_url(url, extractor, deadline).await {
                Ok((document, raw)) => {
                    self.dump(&source.id, index, &document).await;
                    raw
                }
                Err(e) => {
                    warn!(%url, attempts = e.attempts, error = %e.last, "Skipping page");
                    report.urls_failed.push(url.clone());
                    continue;
                }
            };

            let before = report.records.len();
            for record in raw {
                if report.raw_seen >= self.limits.session_ceiling {
                    break;
                }
                report.raw_seen += 1;

                if !self.filter.accepts(&record) {
                    report.filtered_out += 1;
                    continue;
                }
                if !dedup.admit(&record) {
                    report.duplicates += 1;
                    continue;
                }
                report.records.push(record);
                if report.records.len() >= self.limits.num_of_news {
                    break;
                }
            }
            info!(%url, added = report.records.len() - before, "Page processed");
        }

        info!(
            records = report.records.len(),
            raw_seen = report.raw_seen,
            filtered_out = report.filtered_out,
            duplicates = report.duplicates,
            urls_attempted = report.urls_attempted,
            urls_failed = report.urls_failed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Session finished"
        );
        report
    }

    /// Render and extract `url`, retrying both as one attempt.
    async fn crawl_url(
        &self,
        url: &str,
        extractor: &dyn Extractor,
        deadline: Instant,
    ) -> Result<(RenderedDocument, Vec<Record>), RetryExhausted<CrawlError>> {
        with_retries(self.limits.retry, url, |attempt| {
            self.attempt(url, extractor, deadline, attempt)
        })
        .await
    }

    async fn attempt(
        &self,
        url: &str,
        extractor: &dyn Extractor,
        deadline: Instant,
        attempt: u32,
    ) -> Result<(RenderedDocument, Vec<Record>), CrawlError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CrawlError::DeadlinePassed);
        }
        let navigation = self.limits.render_timeout.min(remaining);
        let budget = (self.limits.render_timeout + self.limits.settle_delay).min(remaining);
        debug!(%url, attempt, ?budget, "Rendering");

        let document = match timeout(budget, self.renderer.render(url, navigation)).await {
            Ok(rendered) => rendered?,
            Err(_) => return Err(RenderError::Timeout(budget).into()),
        };
        let raw = extractor.extract(&document)?;
        debug!(%url, attempt, raw = raw.len(), "Extracted");
        Ok((document, raw))
    }

    async fn dump(&self, source: &str, index: usize, document: &RenderedDocument) {
        let Some(dir) = self.dump_dir else {
            return;
        };
        let path = dir.join(format!("{source}_p{}.html", index + 1));
        if let Err(e) = fs::write(&path, &document.html).await {
            warn!(path = %path.display(), error = %e, "Failed to write HTML dump");
        }
    }
}
