//! Page rendering through a headless browser service.
//!
//! Newsroom listings are frequently filled in by JavaScript, so pages are
//! not fetched directly. Instead the URL is handed to a Browserless-style
//! service whose `/content` endpoint navigates a real browser, waits for the
//! network to go idle plus a fixed settle delay, and returns the final
//! markup.
//!
//! # Architecture
//!
//! - [`Render`]: Core trait the crawl session runner is generic over
//! - [`BrowserlessRenderer`]: HTTP client for the `/content` endpoint
//!
//! Retrying is not done here; see [`crate::retry`].

use crate::models::RenderedDocument;
use crate::utils::truncate_for_log;
use serde_json::json;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors produced while rendering a page.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("renderer returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("render timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for RenderError {
    fn from(err: reqwest::Error) -> Self {
        RenderError::Network(err.to_string())
    }
}

/// Trait for anything that can turn a URL into rendered markup.
///
/// Implementations must honor `timeout` as the navigation budget and let
/// dynamic content settle before returning.
pub trait Render {
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedDocument, RenderError>;
}

/// Client for a Browserless `/content` endpoint.
#[derive(Debug, Clone)]
pub struct BrowserlessRenderer {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    settle_delay: Duration,
}

impl BrowserlessRenderer {
    /// Create a renderer talking to `base_url`.
    ///
    /// `settle_delay` is forwarded as `waitForTimeout` so the browser keeps
    /// the page open that long after navigation finished.
    ///
    /// # Errors
    ///
    /// Fails only if the underlying HTTP client cannot be constructed (TLS
    /// backend unavailable). This is the one fatal startup condition.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        settle_delay: Duration,
    ) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("campus_news/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            settle_delay,
        })
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    fn request_body(&self, url: &str, timeout: Duration) -> serde_json::Value {
        json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": "networkidle2",
                "timeout": timeout.as_millis() as u64,
            },
            "waitForTimeout": self.settle_delay.as_millis() as u64,
        })
    }
}

impl Render for BrowserlessRenderer {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedDocument, RenderError> {
        let t0 = Instant::now();
        // The HTTP deadline covers navigation plus the settle wait
        let resp = self
            .client
            .post(self.endpoint())
            .timeout(timeout + self.settle_delay)
            .json(&self.request_body(url, timeout))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                body = %truncate_for_log(&message, 200),
                "Renderer rejected request"
            );
            return Err(RenderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let html = resp.text().await?;
        debug!(
            bytes = html.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Rendered page"
        );
        Ok(RenderedDocument::new(url, html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(token: Option<&str>) -> BrowserlessRenderer {
        BrowserlessRenderer::new("http://localhost:3000/", token, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_endpoint_without_token() {
        assert_eq!(renderer(None).endpoint(), "http://localhost:3000/content");
    }

    #[test]
    fn test_endpoint_with_token() {
        assert_eq!(
            renderer(Some("abc")).endpoint(),
            "http://localhost:3000/content?token=abc"
        );
    }

    #[test]
    fn test_request_body_carries_timeouts() {
        let body = renderer(None).request_body("https://www.ccny.cuny.edu/news", Duration::from_secs(30));
        assert_eq!(body["url"], "https://www.ccny.cuny.edu/news");
        assert_eq!(body["gotoOptions"]["timeout"], 30_000);
        assert_eq!(body["gotoOptions"]["waitUntil"], "networkidle2");
        assert_eq!(body["waitForTimeout"], 2_000);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_network_error() {
        // Port 9 (discard) is never serving HTTP on a test host
        let renderer =
            BrowserlessRenderer::new("http://127.0.0.1:9", None, Duration::from_millis(0)).unwrap();
        let err = renderer
            .render("https://example.edu", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Network(_)));
    }
}
