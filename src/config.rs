//! Run configuration loaded from a YAML file.
//!
//! The file lists the sources to crawl (in processing order, each with its
//! ordered seed URLs), the relevance keywords, and the crawl tunables.
//!
//! ```yaml
//! use_keywords: true
//! keywords: [workshop, scholarship]
//! crawl:
//!   max_attempts: 3
//!   num_of_news: 20
//! sources:
//!   - id: ccny
//!     urls:
//!       - https://www.ccny.cuny.edu/news
//!       - https://www.ccny.cuny.edu/news?page=1
//! ```
//!
//! Every key except `sources` is optional.

use crate::extractors::ExtractorRegistry;
use crate::filter::DEFAULT_KEYWORDS;
use crate::retry::RetryPolicy;
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One source: its stable identifier and seed URLs, crawled in order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub urls: Vec<String>,
}

/// Crawl tunables shared by every source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Render+extract attempts per URL.
    pub max_attempts: u32,
    /// Records kept per session.
    pub num_of_news: usize,
    /// Raw records considered per session before giving up on the cap.
    pub session_ceiling: usize,
    pub settle_delay_ms: u64,
    pub render_timeout_secs: u64,
    /// Wall-clock budget for one source's whole session.
    pub source_deadline_secs: u64,
    /// Records retained per source in the persisted store.
    pub max_retained: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            num_of_news: 20,
            session_ceiling: 50,
            settle_delay_ms: 2_000,
            render_timeout_secs: 30,
            source_deadline_secs: 300,
            max_retained: 20,
        }
    }
}

impl CrawlSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn source_deadline(&self) -> Duration {
        Duration::from_secs(self.source_deadline_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::immediate(self.max_attempts)
    }
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.clone()
}

fn default_true() -> bool {
    true
}

/// Everything one run needs besides CLI paths.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub use_keywords: bool,
    #[serde(default)]
    pub crawl: CrawlSettings,
}

impl RunConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse the YAML file at `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path).await?;
        let config = Self::from_yaml_str(&yaml)?;
        info!(sources = config.sources.len(), "Loaded run configuration");
        Ok(config)
    }

    /// Check the configuration against itself and the extractor registry.
    ///
    /// Unknown source identifiers are rejected here rather than discovered
    /// mid-run.
    pub fn validate(&self, registry: &ExtractorRegistry) -> Result<(), ConfigError> {
        let crawl = &self.crawl;
        if crawl.max_attempts == 0 {
            return Err(ConfigError::Invalid("crawl.max_attempts must be at least 1".into()));
        }
        if crawl.num_of_news == 0 {
            return Err(ConfigError::Invalid("crawl.num_of_news must be at least 1".into()));
        }
        if crawl.session_ceiling < crawl.num_of_news {
            return Err(ConfigError::Invalid(format!(
                "crawl.session_ceiling ({}) is below crawl.num_of_news ({})",
                crawl.session_ceiling, crawl.num_of_news
            )));
        }
        if crawl.max_retained == 0 {
            return Err(ConfigError::Invalid("crawl.max_retained must be at least 1".into()));
        }
        if crawl.render_timeout_secs == 0 {
            return Err(ConfigError::Invalid("crawl.render_timeout_secs must be at least 1".into()));
        }

        let duplicates: Vec<&str> = self
            .sources
            .iter()
            .map(|s| s.id.as_str())
            .duplicates()
            .collect();
        if !duplicates.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "duplicate source ids: {}",
                duplicates.join(", ")
            )));
        }

        for source in &self.sources {
            if !registry.contains(&source.id) {
                return Err(ConfigError::Invalid(format!(
                    "no extractor registered for source `{}`",
                    source.id
                )));
            }
            for url in &source.urls {
                url::Url::parse(url).map_err(|e| {
                    ConfigError::Invalid(format!("source `{}` has bad url {url}: {e}", source.id))
                })?;
            }
        }
        Ok(())
    }

    /// Keep only the sources named in `only`, preserving configured order.
    /// An empty `only` keeps everything.
    pub fn restrict_to(&mut self, only: &[String]) -> Result<(), ConfigError> {
        if only.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = only
            .iter()
            .find(|id| !self.sources.iter().any(|s| &s.id == *id))
        {
            return Err(ConfigError::Invalid(format!(
                "--only names unknown source `{unknown}`"
            )));
        }
        self.sources.retain(|s| only.contains(&s.id));
        Ok(())
    }
}
