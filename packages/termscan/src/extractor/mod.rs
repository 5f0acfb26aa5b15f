//! Content extractor - finds probable legal text in a page.
//!
//! The extractor only reads; it never mutates the page. A single pass
//! ([`ContentExtractor::extract_once`]) runs the keyword gate and then walks
//! an ordered list of selectors, returning the first qualifying element.
//! [`ContentExtractor::extract`] repeats that pass while a client-rendered
//! page is still populating.
//!
//! # Example
//!
//! ```rust,ignore
//! use termscan::extractor::ContentExtractor;
//! use termscan::types::page::PageSnapshot;
//!
//! let extractor = ContentExtractor::default();
//! let snapshot = PageSnapshot::new("https://example.com/terms", html);
//! let content = extractor.extract(&snapshot).await;
//! println!("{} ({} chars)", content.reason, content.char_count());
//! ```

pub mod text;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::retry::retry_bounded;
use crate::types::config::ExtractorConfig;
use crate::types::page::{ExtractionReason, FrameAccess, PageContent, PageSnapshot};

pub use text::{body_text, visible_text};

/// Candidate containers in priority order. The first qualifying match wins,
/// so specific containers shadow navigation and footer boilerplate.
pub const CANDIDATE_SELECTORS: &[&str] = &[
    // Semantic containers
    "main",
    "article",
    "section",
    // Id/class heuristics
    r#"div[id*="terms"]"#,
    r#"div[class*="terms"]"#,
    r#"div[id*="policy"]"#,
    r#"div[class*="policy"]"#,
    r#"div[id*="legal"]"#,
    r#"div[class*="legal"]"#,
    // Generic content containers
    r#"div[role="main"]"#,
    "div.content",
    "div.text",
    "div.main-content",
    "p",
    // Page chrome, last resort before frames
    "footer",
    "header",
    "nav",
    // Embedded frames
    "iframe",
];

/// Source of the live document. Each call observes the page as it is now.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self) -> PageSnapshot;
}

impl SnapshotSource for PageSnapshot {
    fn snapshot(&self) -> PageSnapshot {
        self.clone()
    }
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for std::sync::Arc<S> {
    fn snapshot(&self) -> PageSnapshot {
        (**self).snapshot()
    }
}

struct Candidate {
    css: &'static str,
    selector: Selector,
}

/// Heuristic legal-text extractor.
pub struct ContentExtractor {
    config: ExtractorConfig,
    candidates: Vec<Candidate>,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl ContentExtractor {
    /// Create an extractor with the given config.
    pub fn new(config: ExtractorConfig) -> Self {
        let candidates = CANDIDATE_SELECTORS
            .iter()
            .filter_map(|css| match Selector::parse(css) {
                Ok(selector) => Some(Candidate { css, selector }),
                Err(e) => {
                    warn!(selector = %css, error = ?e, "Skipping unparseable selector");
                    None
                }
            })
            .collect();

        Self { config, candidates }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract with polling: retries while the result is empty.
    ///
    /// Takes a fresh snapshot per attempt. Returns empty content with
    /// [`ExtractionReason::FailedAllRetries`] once attempts run out.
    pub async fn extract<S>(&self, source: &S) -> PageContent
    where
        S: SnapshotSource + ?Sized,
    {
        let policy = self.config.retry;
        let outcome = retry_bounded(
            policy,
            |attempt| {
                let content = self.extract_once(&source.snapshot());
                debug!(attempt, reason = %content.reason, chars = content.char_count(), "Extraction attempt");
                async move {
                    if content.is_empty() {
                        Err(content)
                    } else {
                        Ok(content)
                    }
                }
            },
            |_| true,
        )
        .await;

        match outcome {
            Ok(content) => {
                info!(reason = %content.reason, chars = content.char_count(), "Extraction succeeded");
                content
            }
            Err(e) => {
                let attempts = e.attempts();
                let last = e.into_inner();
                warn!(attempts, last_reason = %last.reason, "Extraction failed after retries");
                PageContent::empty(ExtractionReason::FailedAllRetries)
            }
        }
    }

    /// One extraction pass over a snapshot.
    pub fn extract_once(&self, snapshot: &PageSnapshot) -> PageContent {
        let document = Html::parse_document(&snapshot.html);

        let body = body_text(&document);
        if body.is_empty() {
            return PageContent::empty(ExtractionReason::EmptyBody);
        }

        if !self.config.matches_keyword(&body.to_lowercase()) {
            return PageContent::empty(ExtractionReason::KeywordMissing);
        }

        for candidate in &self.candidates {
            let mut matched = 0usize;
            for element in document.select(&candidate.selector) {
                matched += 1;

                if element.value().name() == "iframe" {
                    if let Some(text) = self.frame_text(snapshot, element) {
                        debug!(src = ?element.value().attr("src"), "Extracted from same-origin frame");
                        return PageContent::found(text, ExtractionReason::IframeExtract);
                    }
                    continue;
                }

                let text = visible_text(element);
                if self.qualifies(&text) {
                    debug!(selector = candidate.css, "Extracted from selector");
                    return PageContent::found(text, ExtractionReason::SelectorMatch);
                }
            }
            if matched > 0 {
                trace!(selector = candidate.css, matched, "No qualifying element");
            }
        }

        debug!("No selector qualified, falling back to whole body");
        PageContent::found(body, ExtractionReason::FallbackWholeBody)
    }

    /// Long enough and mentions a keyword.
    fn qualifies(&self, text: &str) -> bool {
        text.chars().count() > self.config.min_candidate_chars
            && self.config.matches_keyword(&text.to_lowercase())
    }

    /// Body text of a readable frame, if it qualifies.
    ///
    /// Cross-origin and unknown frames yield `None` without error.
    fn frame_text(&self, snapshot: &PageSnapshot, iframe: ElementRef<'_>) -> Option<String> {
        let src = iframe.value().attr("src")?;
        let resolved = resolve_src(&snapshot.url, src);

        let frame = match snapshot.frame(&resolved) {
            Some(frame) => frame,
            None => {
                trace!(src = %resolved, "Frame not present in snapshot");
                return None;
            }
        };

        match &frame.access {
            FrameAccess::SameOrigin(html) => {
                let text = body_text(&Html::parse_document(html));
                self.qualifies(&text).then_some(text)
            }
            FrameAccess::CrossOrigin => {
                debug!(src = %resolved, "Frame blocked by cross-origin policy");
                None
            }
        }
    }
}

/// Resolve a frame `src` against the page URL; falls back to the raw value.
pub fn resolve_src(page_url: &str, src: &str) -> String {
    Url::parse(page_url)
        .and_then(|base| base.join(src))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| src.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::RetryPolicy;
    use crate::types::page::FrameSnapshot;
    use proptest::prelude::*;
    use std::time::Duration;

    const PAGE_URL: &str = "https://example.com/legal";

    fn page(body: &str) -> PageSnapshot {
        PageSnapshot::new(PAGE_URL, format!("<html><body>{}</body></html>", body))
    }

    fn section_text() -> String {
        // 120 characters, mentions "privacy policy"
        let base = "This privacy policy explains how we collect, use and share your personal data when you use our services";
        let mut text = base.to_string();
        while text.len() < 120 {
            text.push('.');
        }
        text
    }

    #[test]
    fn test_empty_body() {
        let extractor = ContentExtractor::default();
        let content = extractor.extract_once(&page("  <script>var x;</script> "));
        assert_eq!(content.reason, ExtractionReason::EmptyBody);
        assert!(content.is_empty());
    }

    #[test]
    fn test_keyword_missing() {
        let extractor = ContentExtractor::default();
        let content = extractor.extract_once(&page("<main>Welcome to the recipe archive</main>"));
        assert_eq!(content.reason, ExtractionReason::KeywordMissing);
        assert!(content.is_empty());
    }

    #[test]
    fn test_section_preferred_over_footer() {
        let extractor = ContentExtractor::default();
        let section = section_text();
        assert_eq!(section.len(), 120);
        let footer = "Copyright notice, site map, careers, press, investors, contact us. ".repeat(20);

        let content = extractor.extract_once(&page(&format!(
            "<div>Header links</div><section>{}</section><footer>{}</footer>",
            section, footer
        )));

        assert_eq!(content.reason, ExtractionReason::SelectorMatch);
        assert_eq!(content.text, section);
    }

    #[test]
    fn test_short_span_falls_back_to_whole_body() {
        let extractor = ContentExtractor::default();
        let span = "see privacy policy!!";
        assert_eq!(span.len(), 20);

        let snapshot = page(&format!(
            "Our legal terms apply to every visitor of this website. <span>{}</span>",
            span
        ));
        let content = extractor.extract_once(&snapshot);

        assert_eq!(content.reason, ExtractionReason::FallbackWholeBody);
        assert_eq!(
            content.text,
            "Our legal terms apply to every visitor of this website. see privacy policy!!"
        );
    }

    #[test]
    fn test_priority_order_main_before_section() {
        let extractor = ContentExtractor::default();
        let content = extractor.extract_once(&page(
            "<section>These terms and conditions govern the section content here.</section>\
             <main>The main terms of service for this product and all related services.</main>",
        ));
        assert_eq!(content.reason, ExtractionReason::SelectorMatch);
        assert!(content.text.starts_with("The main terms of service"));
    }

    #[test]
    fn test_class_heuristic_match() {
        let extractor = ContentExtractor::default();
        let content = extractor.extract_once(&page(
            r#"<div class="site-legal-text">This disclaimer limits our liability for any damages arising.</div>"#,
        ));
        assert_eq!(content.reason, ExtractionReason::SelectorMatch);
        assert!(content.text.starts_with("This disclaimer"));
    }

    #[test]
    fn test_same_origin_iframe_extract() {
        let extractor = ContentExtractor::default();
        let frame_html = "<html><body><p>End user license agreement. This EULA governs your use of the software.</p></body></html>";
        // Keyword present at page level only through a short link
        let snapshot = page(r#"<a href="/eula">EULA</a><iframe src="/embed/eula"></iframe>"#)
            .with_frame(FrameSnapshot::same_origin(
                "https://example.com/embed/eula",
                frame_html,
            ));

        let content = extractor.extract_once(&snapshot);
        assert_eq!(content.reason, ExtractionReason::IframeExtract);
        assert!(content.text.contains("This EULA governs"));
    }

    #[test]
    fn test_cross_origin_iframe_skipped() {
        let extractor = ContentExtractor::default();
        let snapshot = page(r#"<a href="/eula">EULA</a><iframe src="https://docs.other.com/tos"></iframe>"#)
            .with_frame(FrameSnapshot::cross_origin("https://docs.other.com/tos"));

        let content = extractor.extract_once(&snapshot);
        assert_eq!(content.reason, ExtractionReason::FallbackWholeBody);
        assert_eq!(content.text, "EULA");
    }

    #[test]
    fn test_resolve_src() {
        assert_eq!(
            resolve_src("https://example.com/a/b", "../c"),
            "https://example.com/c"
        );
        assert_eq!(resolve_src("not a url", "/x"), "/x");
    }

    struct Populating {
        calls: std::sync::atomic::AtomicU32,
        ready_after: u32,
    }

    impl SnapshotSource for Populating {
        fn snapshot(&self) -> PageSnapshot {
            let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            if n < self.ready_after {
                page("<div id='root'></div>")
            } else {
                page("<main>These terms of service were rendered on the client side.</main>")
            }
        }
    }

    #[tokio::test]
    async fn test_retries_until_page_populates() {
        let extractor = ContentExtractor::new(
            ExtractorConfig::new().with_retry(RetryPolicy::new(12, Duration::from_millis(1))),
        );
        let source = Populating {
            calls: Default::default(),
            ready_after: 4,
        };

        let content = extractor.extract(&source).await;
        assert_eq!(content.reason, ExtractionReason::SelectorMatch);
        assert_eq!(source.calls.load(std::sync::atomic::Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let extractor = ContentExtractor::new(
            ExtractorConfig::new().with_retry(RetryPolicy::new(3, Duration::from_millis(1))),
        );
        let content = extractor.extract(&page("Nothing to see here")).await;
        assert_eq!(content.reason, ExtractionReason::FailedAllRetries);
        assert!(content.is_empty());
    }

    proptest! {
        #[test]
        fn prop_no_keyword_means_keyword_missing(body in "[xqz0-9 ]{1,200}[xqz0-9]") {
            let extractor = ContentExtractor::default();
            let content = extractor.extract_once(&page(&body));
            prop_assert_eq!(content.reason, ExtractionReason::KeywordMissing);
            prop_assert!(content.text.is_empty());
        }

        #[test]
        fn prop_injected_keyword_passes_gate(
            body in "[xqz0-9 ]{0,200}",
            at in 0usize..200,
            keyword in prop::sample::select(vec!["terms", "privacy policy", "eula", "imprint", "legal"]),
        ) {
            let at = at.min(body.len());
            let text = format!("{} {} {}", &body[..at], keyword, &body[at..]);
            let extractor = ContentExtractor::default();
            let content = extractor.extract_once(&page(&text));
            prop_assert!(matches!(
                content.reason,
                ExtractionReason::SelectorMatch | ExtractionReason::FallbackWholeBody
            ));
            prop_assert!(content.text.contains(keyword));
        }
    }
}
