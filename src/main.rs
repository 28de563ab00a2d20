//! # Campus News
//!
//! A news aggregation job that crawls college newsroom pages through a
//! headless browser, extracts short news and announcement records, and keeps
//! one bounded, deduplicated collection per source in a JSON state file.
//!
//! ## Usage
//!
//! ```sh
//! campus_news -c sources.yaml -s colleges_data.json
//! ```
//!
//! ## Architecture
//!
//! The run follows explicit phases:
//! 1. **Load**: read the run config and the persisted store (a missing or
//!    corrupt store starts empty)
//! 2. **Crawl**: per source, render each seed URL with bounded retries,
//!    extract records, filter by keyword and drop repeated descriptions
//! 3. **Merge**: combine each session with the source's stored collection
//!    (replace when the session is longer, otherwise prepend new titles)
//! 4. **Save**: atomically rewrite the state file once

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod dedup;
mod extractors;
mod filter;
mod merge;
mod models;
mod orchestrator;
mod renderer;
mod retry;
mod session;
mod store;
mod utils;

use cli::Cli;
use config::RunConfig;
use extractors::ExtractorRegistry;
use filter::RelevanceFilter;
use orchestrator::Orchestrator;
use renderer::BrowserlessRenderer;
use session::SessionLimits;
use store::AggregationStore;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("campus_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration & extractors (fatal on failure) ----
    let registry = ExtractorRegistry::cuny()?;
    let mut config = RunConfig::load(&args.config).await?;
    config.validate(&registry)?;
    config.restrict_to(&args.only)?;
    let use_keywords = config.use_keywords && !args.no_keywords;
    info!(
        sources = config.sources.len(),
        use_keywords,
        keywords = config.keywords.len(),
        "Configuration ready"
    );

    // Fail early rather than after an hour of crawling
    let state_dir = state_dir(&args.state_file);
    if let Err(e) = ensure_writable_dir(&state_dir).await {
        error!(
            path = %state_dir.display(),
            error = %e,
            "State directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let dump_dir = match args.html_dump_dir.as_deref() {
        Some(base) => prepare_dump_dir(base).await,
        None => None,
    };

    let renderer = BrowserlessRenderer::new(
        &args.renderer_url,
        args.renderer_token.as_deref(),
        config.crawl.settle_delay(),
    )?;
    info!(renderer_url = %args.renderer_url, "Renderer client ready");

    // ---- Load, crawl, merge ----
    let store = AggregationStore::load(&args.state_file).await;

    let orchestrator = Orchestrator::new(
        &renderer,
        &registry,
        RelevanceFilter::new(use_keywords, &config.keywords),
        SessionLimits::from(&config.crawl),
        config.crawl.max_retained,
    )
    .concurrency(args.concurrency)
    .dump_dir(dump_dir);

    let (store, summary) = orchestrator.run(&config.sources, store).await;

    for outcome in &summary.outcomes {
        info!(
            source = %outcome.source,
            session_len = outcome.session_len,
            urls_failed = outcome.urls_failed,
            deadline_hit = outcome.deadline_hit,
            merge = ?outcome.merge,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            stored = store.collection(&outcome.source).len(),
            "Source done"
        );
    }

    // ---- Save once, at the end ----
    if let Err(e) = store.save(&args.state_file).await {
        error!(path = %args.state_file.display(), error = %e, "Failed to write state file");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        sources = summary.outcomes.len(),
        changed = summary.changed(),
        empty_sessions = summary.empty_sessions(),
        records = store.total_records(),
        "Execution complete"
    );

    Ok(())
}

/// Directory holding the state file; a bare file name means the cwd.
fn state_dir(state_file: &Path) -> PathBuf {
    match state_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Per-day dump directory under `base`. Dumps are best effort, so a
/// directory that can't be created only disables them.
async fn prepare_dump_dir(base: &Path) -> Option<PathBuf> {
    let dir = base.join(Local::now().date_naive().to_string());
    match ensure_writable_dir(&dir).await {
        Ok(()) => Some(dir),
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "HTML dumps disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_dir() {
        assert_eq!(state_dir(Path::new("colleges_data.json")), PathBuf::from("."));
        assert_eq!(state_dir(Path::new("/var/lib/c/state.json")), PathBuf::from("/var/lib/c"));
        assert_eq!(state_dir(Path::new("out/state.json")), PathBuf::from("out"));
    }

    #[tokio::test]
    async fn test_prepare_dump_dir_uses_dated_subdir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = prepare_dump_dir(tmp.path()).await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir.parent(), Some(tmp.path()));
    }
}
