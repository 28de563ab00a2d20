//! Command-line interface definitions for Campus News.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Renderer connection settings can also be provided via environment
//! variables.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one aggregation run.
///
/// # Examples
///
/// ```sh
/// # Crawl every source in sources.yaml into colleges_data.json
/// campus_news
///
/// # Two sources only, keyword filter off, dumping rendered pages
/// campus_news --only ccny --only bmcc --no-keywords --html-dump-dir ./colleges_htmls
///
/// # Remote renderer with a token, four sessions at once
/// campus_news --renderer-url https://chrome.example.com --renderer-token SECRET --concurrency 4
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML file listing sources, keywords and crawl settings
    #[arg(short, long, default_value = "sources.yaml")]
    pub config: PathBuf,

    /// JSON file holding the persisted collections
    #[arg(short, long, default_value = "colleges_data.json")]
    pub state_file: PathBuf,

    /// Base URL of the headless browser service
    #[arg(long, env = "RENDERER_URL", default_value = "http://localhost:3000")]
    pub renderer_url: String,

    /// Access token for the headless browser service
    #[arg(long, env = "RENDERER_TOKEN")]
    pub renderer_token: Option<String>,

    /// Keep every described record regardless of keywords
    #[arg(long)]
    pub no_keywords: bool,

    /// Crawl only this source (repeatable)
    #[arg(long = "only", value_name = "SOURCE")]
    pub only: Vec<String>,

    /// Number of sources crawled at the same time
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Directory for debug dumps of every rendered page
    #[arg(long)]
    pub html_dump_dir: Option<PathBuf>,
}
