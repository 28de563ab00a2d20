//! Run orchestration across all configured sources.
//!
//! Sessions for different sources are independent: a source whose every URL
//! fails simply produces an empty session, which the merge step turns into a
//! no-op. Up to `concurrency` sessions run at once over the shared renderer.
//! Merges are applied afterwards, one source at a time and in configured
//! order, into the store value the caller handed in.

use crate::config::SourceConfig;
use crate::extractors::ExtractorRegistry;
use crate::filter::RelevanceFilter;
use crate::merge::MergeOutcome;
use crate::renderer::Render;
use crate::session::{SessionLimits, SessionReport, SessionRunner};
use crate::store::AggregationStore;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// What happened to one source during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutcome {
    pub source: String,
    pub session_len: usize,
    pub urls_failed: usize,
    pub deadline_hit: bool,
    pub merge: MergeOutcome,
    pub elapsed: Duration,
}

/// Per-source outcomes in configured order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub outcomes: Vec<SourceOutcome>,
}

impl RunSummary {
    pub fn changed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.merge != MergeOutcome::Unchanged)
            .count()
    }

    /// Sources whose session came back empty.
    pub fn empty_sessions(&self) -> usize {
        self.outcomes.iter().filter(|o| o.session_len == 0).count()
    }
}

pub struct Orchestrator<'a, R> {
    renderer: &'a R,
    registry: &'a ExtractorRegistry,
    filter: RelevanceFilter,
    limits: SessionLimits,
    max_retained: usize,
    concurrency: usize,
    dump_dir: Option<PathBuf>,
}

impl<'a, R: Render> Orchestrator<'a, R> {
    pub fn new(
        renderer: &'a R,
        registry: &'a ExtractorRegistry,
        filter: RelevanceFilter,
        limits: SessionLimits,
        max_retained: usize,
    ) -> Self {
        Self {
            renderer,
            registry,
            filter,
            limits,
            max_retained,
            concurrency: 1,
            dump_dir: None,
        }
    }

    /// Sessions allowed in flight at once. Zero is treated as one.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    /// Crawl every source, merge each session into `store`, return both.
    #[instrument(level = "info", skip_all, fields(sources = sources.len(), concurrency = self.concurrency))]
    pub async fn run(
        &self,
        sources: &[SourceConfig],
        mut store: AggregationStore,
    ) -> (AggregationStore, RunSummary) {
        let mut sessions: Vec<(usize, SessionReport, Duration)> =
            stream::iter(sources.iter().enumerate())
                .map(|(i, source)| async move {
                    let t0 = Instant::now();
                    let report = self.crawl_source(source).await;
                    (i, report, t0.elapsed())
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        sessions.sort_by_key(|(i, _, _)| *i);

        let mut summary = RunSummary::default();
        for (i, report, elapsed) in sessions {
            let source = &sources[i];
            let session_len = report.records.len();
            if session_len == 0 {
                info!(source = %source.id, "No records this run; skipping merge");
            }

            let merge = store.merge_session(&source.id, report.records, self.max_retained);
            match merge {
                MergeOutcome::Unchanged => {
                    info!(source = %source.id, session_len, "Collection unchanged")
                }
                MergeOutcome::Trimmed { len } => {
                    info!(source = %source.id, session_len, len, "Oversized collection trimmed to cap")
                }
                MergeOutcome::Replaced { len } => {
                    info!(source = %source.id, session_len, len, "Collection replaced by session")
                }
                MergeOutcome::Prepended { fresh, len } => {
                    info!(source = %source.id, fresh, len, "Prepended fresh records")
                }
            }

            summary.outcomes.push(SourceOutcome {
                source: source.id.clone(),
                session_len,
                urls_failed: report.urls_failed.len(),
                deadline_hit: report.deadline_hit,
                merge,
                elapsed,
            });
        }
        (store, summary)
    }

    async fn crawl_source(&self, source: &SourceConfig) -> SessionReport {
        let Some(extractor) = self.registry.get(&source.id) else {
            warn!(source = %source.id, "No extractor registered; skipping source");
            return SessionReport::default();
        };
        SessionRunner::new(self.renderer, &self.filter, self.limits)
            .with_dump_dir(self.dump_dir.as_deref())
            .run(source, extractor)
            .await
    }
}
