//! HTTP page loader.
//!
//! Fetches a page and its embedded frames into a [`PageSnapshot`]. Frames
//! on the page's origin are fetched so the extractor can read them; frames
//! on any other origin are recorded as inaccessible, mirroring what a
//! script running in the page is allowed to see.

use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::PageLoadError;
use crate::extractor::resolve_src;
use crate::types::page::{FrameSnapshot, PageSnapshot};

/// Loads pages over HTTP.
pub struct HttpPageLoader {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
    max_frames: usize,
}

impl Default for HttpPageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPageLoader {
    /// Create a loader with a 20s timeout and up to 8 frames per page.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: "termscan/0.1".to_string(),
            timeout: Duration::from_secs(20),
            max_frames: 8,
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Fetch `url` and its frames.
    pub async fn load(&self, url: &str) -> Result<PageSnapshot, PageLoadError> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PageLoadError::DisallowedScheme(parsed.scheme().to_string()));
        }

        let (final_url, html) = self.fetch(&parsed).await?;
        let frame_sources = discover_frames(final_url.as_str(), &html);
        let mut snapshot = PageSnapshot::new(final_url.as_str(), html);

        for src in frame_sources.into_iter().take(self.max_frames) {
            let frame_url = match Url::parse(&src) {
                Ok(u) => u,
                Err(e) => {
                    debug!(src = %src, error = %e, "Skipping frame with invalid URL");
                    continue;
                }
            };

            if frame_url.origin() != final_url.origin() {
                debug!(src = %src, "Cross-origin frame");
                snapshot.frames.push(FrameSnapshot::cross_origin(src));
                continue;
            }

            match self.fetch(&frame_url).await {
                Ok((_, frame_html)) => {
                    snapshot.frames.push(FrameSnapshot::same_origin(src, frame_html))
                }
                Err(e) => warn!(src = %src, error = %e, "Failed to fetch frame"),
            }
        }

        info!(
            url = %snapshot.url,
            html_bytes = snapshot.html.len(),
            frames = snapshot.frames.len(),
            "Page loaded"
        );

        Ok(snapshot)
    }

    /// Fetch one URL, returning the final URL after redirects and the body.
    async fn fetch(&self, url: &Url) -> Result<(Url, String), PageLoadError> {
        debug!(url = %url, "HTTP fetch starting");

        let request = async {
            let response = self
                .client
                .get(url.clone())
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .send()
                .await
                .map_err(|e| PageLoadError::Http(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(PageLoadError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let final_url = response.url().clone();
            let body = response
                .text()
                .await
                .map_err(|e| PageLoadError::Http(e.to_string()))?;
            Ok::<_, PageLoadError>((final_url, body))
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| PageLoadError::Timeout {
                url: url.to_string(),
            })?
    }
}

/// Absolute `src` URLs of the `iframe` elements in `html`, in document order.
pub fn discover_frames(page_url: &str, html: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse("iframe[src]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut sources: Vec<String> = Vec::new();
    for iframe in document.select(&selector) {
        let Some(src) = iframe.value().attr("src") else {
            continue;
        };
        let src = src.trim();
        if src.is_empty() || src.starts_with("javascript:") || src == "about:blank" {
            continue;
        }
        let resolved = resolve_src(page_url, src);
        if !sources.contains(&resolved) {
            sources.push(resolved);
        }
    }
    sources
}
