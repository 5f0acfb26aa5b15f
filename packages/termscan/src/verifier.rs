//! Verification orchestrator.
//!
//! One request runs as a linear sequence of awaited stages:
//!
//! 1. resolve the focused target
//! 2. inject the extractor and ask it for content through the bridge
//! 3. truncate and fan out to both summarization backends concurrently
//! 4. score agreement between the two summaries
//! 5. persist the result
//!
//! Backend and embedding failures are recovered here whenever a usable
//! summary remains; only losing both backends fails the request.

use std::time::Instant;

use chrono::Utc;
use futures::future::join;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge::MessagingBridge;
use crate::error::{Result, VerifyError};
use crate::page::{ExtractorRequest, ExtractorResponse, PageHost, TargetId};
use crate::providers::{Embedder, Summarizer};
use crate::scoring::SimilarityScorer;
use crate::stores::ResultStore;
use crate::types::config::VerifierConfig;
use crate::types::page::PageContent;
use crate::types::summary::SummaryResult;
use crate::types::verification::{
    ProvenanceInfo, SubCallStatus, TriggerResponse, VerificationResult,
};

/// Runs the dual-model verification pipeline against a page host.
///
/// # Example
///
/// ```rust,ignore
/// let verifier = Verifier::new(host, FileResultStore::new("data/latest_result.json"), gemini)
///     .with_secondary(openai)
///     .with_embedder(embedder);
///
/// let result = verifier.summarize_active_page().await?;
/// println!("{} (confidence {:.2})", result.primary_summary, result.confidence);
/// ```
pub struct Verifier<H: PageHost, S: ResultStore> {
    host: H,
    store: S,
    primary: Box<dyn Summarizer>,
    secondary: Option<Box<dyn Summarizer>>,
    scorer: Option<SimilarityScorer>,
    config: VerifierConfig,
}

/// Summaries and scoring folded into the shape that gets persisted.
struct Combined {
    primary_summary: String,
    secondary_summary: Option<String>,
    confidence: f64,
    similarity_raw: f64,
    embedding: SubCallStatus,
    degraded: bool,
}

impl<H: PageHost, S: ResultStore> Verifier<H, S> {
    pub fn new(host: H, store: S, primary: impl Summarizer + 'static) -> Self {
        Self {
            host,
            store,
            primary: Box::new(primary),
            secondary: None,
            scorer: None,
            config: VerifierConfig::default(),
        }
    }

    /// Add the best-effort cross-check backend.
    pub fn with_secondary(mut self, secondary: impl Summarizer + 'static) -> Self {
        self.secondary = Some(Box::new(secondary));
        self
    }

    /// Embedding service used to score agreement.
    pub fn with_embedder(mut self, embedder: impl Embedder + 'static) -> Self {
        self.scorer = Some(SimilarityScorer::new(embedder));
        self
    }

    pub fn with_config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The most recently persisted result.
    pub async fn last_result(&self) -> Result<Option<VerificationResult>> {
        Ok(self.store.get().await?)
    }

    /// Summarize the active page, folding any failure into the response.
    pub async fn trigger(&self) -> TriggerResponse {
        TriggerResponse::from(&self.summarize_active_page().await)
    }

    /// Extract, summarize twice, score, persist.
    pub async fn summarize_active_page(&self) -> Result<VerificationResult> {
        let start = Instant::now();
        let request_id = Uuid::new_v4();

        let target = self
            .host
            .active_target()
            .await
            .ok_or(VerifyError::NoActiveTarget)?;
        info!(%request_id, target_id = %target, "Summarizing active page");

        let content = self.fetch_content(target).await?;
        if content.is_blank() {
            warn!(%request_id, reason = %content.reason, "No relevant content on page");
            return Err(VerifyError::NoRelevantContent {
                reason: content.reason,
            });
        }

        let extracted_chars = content.char_count();
        let forwarded = PageContent::found(
            truncate_chars(&content.text, self.config.max_content_chars),
            content.reason,
        );
        let forwarded_chars = forwarded.char_count();
        let truncated = forwarded_chars < extracted_chars;
        if truncated {
            debug!(%request_id, extracted_chars, forwarded_chars, "Truncated page content");
        }

        let (primary, secondary) = self.run_backends(&forwarded.text).await;
        let primary_status = SubCallStatus::from(&primary);
        let secondary_status = secondary
            .as_ref()
            .map(SubCallStatus::from)
            .unwrap_or(SubCallStatus::Skipped);

        let combined = self.combine(request_id, &primary, secondary.as_ref()).await?;
        if combined.degraded {
            warn!(
                %request_id,
                primary_ok = primary.success,
                "Only one backend produced a summary; confidence reported as 0"
            );
        }

        let result = VerificationResult {
            primary_summary: combined.primary_summary,
            secondary_summary: combined.secondary_summary,
            confidence: combined.confidence,
            similarity_raw: combined.similarity_raw,
            provenance: ProvenanceInfo {
                request_id,
                target,
                extraction_reason: content.reason,
                extracted_chars,
                forwarded_chars,
                truncated,
                content_hash: forwarded.content_hash(),
                primary: primary_status,
                secondary: secondary_status,
                embedding: combined.embedding,
                degraded: combined.degraded,
                duration_ms: start.elapsed().as_millis() as u64,
                created_at: Utc::now(),
            },
        };

        self.store.set(&result).await?;
        info!(
            %request_id,
            confidence = result.confidence,
            degraded = result.provenance.degraded,
            duration_ms = result.provenance.duration_ms,
            "Verification complete"
        );
        Ok(result)
    }

    async fn fetch_content(&self, target: TargetId) -> Result<PageContent> {
        self.host
            .inject_extractor(target)
            .await
            .map_err(|e| VerifyError::ExtractionUnavailable {
                reason: e.to_string(),
            })?;

        let bridge = MessagingBridge::new(&self.host).with_policy(self.config.messaging_retry);
        match bridge.request(target, ExtractorRequest::GetPageContent).await {
            Some(ExtractorResponse::Content(content)) => {
                debug!(
                    target_id = %target,
                    reason = %content.reason,
                    chars = content.char_count(),
                    "Received page content"
                );
                Ok(content)
            }
            Some(ExtractorResponse::Failed { error }) => {
                Err(VerifyError::ExtractionUnavailable { reason: error })
            }
            None => Err(VerifyError::ExtractionUnavailable {
                reason: "no response from the content extractor".into(),
            }),
        }
    }

    async fn run_backends(&self, text: &str) -> (SummaryResult, Option<SummaryResult>) {
        let primary = async {
            let id = self.primary.backend_id();
            SummaryResult::from_call(id, self.primary.summarize(text).await)
        };
        let secondary = async {
            match &self.secondary {
                Some(backend) => {
                    let id = backend.backend_id();
                    Some(SummaryResult::from_call(id, backend.summarize(text).await))
                }
                None => None,
            }
        };

        let (primary, secondary) = join(primary, secondary).await;
        if !primary.success {
            warn!(backend = %primary.backend_id, error = primary.error(), "Backend failed");
        }
        if let Some(failed) = secondary.as_ref().filter(|s| !s.success) {
            warn!(backend = %failed.backend_id, error = failed.error(), "Backend failed");
        }
        (primary, secondary)
    }

    async fn combine(
        &self,
        request_id: Uuid,
        primary: &SummaryResult,
        secondary: Option<&SummaryResult>,
    ) -> Result<Combined> {
        let secondary_text = secondary.and_then(SummaryResult::summary);

        match (primary.summary(), secondary_text) {
            (Some(a), Some(b)) => {
                let (confidence, similarity_raw, embedding) = match &self.scorer {
                    Some(scorer) => match scorer.score(a, b).await {
                        Ok(score) => (score.confidence, score.similarity_raw, SubCallStatus::Succeeded),
                        Err(e) => {
                            warn!(%request_id, error = %e, "Embedding failed; confidence reported as 0");
                            (0.0, 0.0, SubCallStatus::failed(e.to_string()))
                        }
                    },
                    None => (0.0, 0.0, SubCallStatus::Skipped),
                };
                Ok(Combined {
                    primary_summary: a.to_string(),
                    secondary_summary: Some(b.to_string()),
                    confidence,
                    similarity_raw,
                    embedding,
                    degraded: false,
                })
            }
            (Some(sole), None) | (None, Some(sole)) => Ok(Combined {
                primary_summary: sole.to_string(),
                secondary_summary: None,
                confidence: 0.0,
                similarity_raw: 0.0,
                embedding: SubCallStatus::Skipped,
                degraded: true,
            }),
            (None, None) => Err(VerifyError::AllBackendsFailed {
                primary: primary.error().to_string(),
                secondary: secondary
                    .map(|s| s.error().to_string())
                    .unwrap_or_else(|| "not configured".to_string()),
            }),
        }
    }
}

/// The first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::LocalPageHost;
    use crate::stores::MemoryResultStore;
    use crate::testing::{MockEmbedder, MockSummarizer};
    use crate::types::config::{ExtractorConfig, RetryPolicy};
    use crate::types::page::{ExtractionReason, PageSnapshot};
    use crate::types::summary::BackendId;
    use std::time::Duration;

    const TERMS_HTML: &str = "<body><main>By using this service you agree to these terms of service, \
        including binding arbitration and automatic renewal.</main></body>";

    fn fast_host() -> LocalPageHost {
        LocalPageHost::new().with_extractor_config(
            ExtractorConfig::new().with_retry(RetryPolicy::new(2, Duration::from_millis(1))),
        )
    }

    fn fast_config() -> VerifierConfig {
        VerifierConfig::new().with_messaging_retry(RetryPolicy::new(10, Duration::from_millis(5)))
    }

    async fn host_with(html: &str) -> LocalPageHost {
        let host = fast_host();
        host.open_tab(PageSnapshot::new("https://example.com/terms", html))
            .await;
        host
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[tokio::test]
    async fn test_cross_checked_result_is_persisted() {
        let embedder = MockEmbedder::fixed(vec![1.0, 0.0], vec![1.0, 0.0]);
        let verifier = Verifier::new(
            host_with(TERMS_HTML).await,
            MemoryResultStore::new(),
            MockSummarizer::ok(BackendId::A, "- Arbitration required"),
        )
        .with_secondary(MockSummarizer::ok(BackendId::B, "- Disputes go to arbitration"))
        .with_embedder(embedder.clone())
        .with_config(fast_config());

        let result = verifier.summarize_active_page().await.unwrap();
        assert_eq!(result.primary_summary, "- Arbitration required");
        assert_eq!(result.secondary_summary.as_deref(), Some("- Disputes go to arbitration"));
        assert_eq!(result.confidence, 1.0);
        assert!(result.is_cross_checked());
        assert!(!result.provenance.degraded);
        assert_eq!(result.provenance.extraction_reason, ExtractionReason::SelectorMatch);
        assert_eq!(embedder.calls(), 1);

        let stored = verifier.last_result().await.unwrap().unwrap();
        assert_eq!(stored, result);
    }

    #[tokio::test]
    async fn test_truncates_to_max_chars() {
        let body = format!("terms {}", "x".repeat(149_994));
        let html = format!("<body><main>{}</main></body>", body);

        let primary = MockSummarizer::ok(BackendId::A, "summary a");
        let secondary = MockSummarizer::ok(BackendId::B, "summary b");
        let verifier = Verifier::new(host_with(&html).await, MemoryResultStore::new(), primary.clone())
            .with_secondary(secondary.clone())
            .with_config(fast_config());

        let result = verifier.summarize_active_page().await.unwrap();
        assert_eq!(primary.received_lengths(), vec![100_000]);
        assert_eq!(secondary.received_lengths(), vec![100_000]);
        assert_eq!(result.provenance.forwarded_chars, 100_000);
        assert_eq!(result.provenance.extracted_chars, 150_000);
        assert!(result.provenance.truncated);
    }

    #[tokio::test]
    async fn test_secondary_failure_degrades_to_primary() {
        let embedder = MockEmbedder::fixed(vec![1.0], vec![1.0]);
        let verifier = Verifier::new(
            host_with(TERMS_HTML).await,
            MemoryResultStore::new(),
            MockSummarizer::ok(BackendId::A, "primary summary"),
        )
        .with_secondary(MockSummarizer::failing(BackendId::B, "quota exceeded"))
        .with_embedder(embedder.clone())
        .with_config(fast_config());

        let result = verifier.summarize_active_page().await.unwrap();
        assert_eq!(result.primary_summary, "primary summary");
        assert_eq!(result.secondary_summary, None);
        assert_eq!(result.confidence, 0.0);
        assert!(result.provenance.degraded);
        assert!(matches!(result.provenance.secondary, SubCallStatus::Failed { .. }));
        assert_eq!(result.provenance.embedding, SubCallStatus::Skipped);
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back_to_secondary() {
        let verifier = Verifier::new(
            host_with(TERMS_HTML).await,
            MemoryResultStore::new(),
            MockSummarizer::failing(BackendId::A, "timeout"),
        )
        .with_secondary(MockSummarizer::ok(BackendId::B, "secondary summary"))
        .with_config(fast_config());

        let result = verifier.summarize_active_page().await.unwrap();
        assert_eq!(result.primary_summary, "secondary summary");
        assert_eq!(result.secondary_summary, None);
        assert_eq!(result.confidence, 0.0);
        assert!(result.provenance.degraded);
    }

    #[tokio::test]
    async fn test_total_failure_persists_nothing() {
        let store = MemoryResultStore::new();
        let verifier = Verifier::new(
            host_with(TERMS_HTML).await,
            store,
            MockSummarizer::failing(BackendId::A, "API error: 401 - bad key"),
        )
        .with_secondary(MockSummarizer::failing(BackendId::B, "network down"))
        .with_config(fast_config());

        let err = verifier.summarize_active_page().await.unwrap_err();
        match err {
            VerifyError::AllBackendsFailed { primary, secondary } => {
                assert!(primary.contains("bad key"));
                assert!(secondary.contains("network down"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(verifier.store().write_count(), 0);
        assert!(verifier.last_result().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_embedding_failure_keeps_both_summaries() {
        let verifier = Verifier::new(
            host_with(TERMS_HTML).await,
            MemoryResultStore::new(),
            MockSummarizer::ok(BackendId::A, "a"),
        )
        .with_secondary(MockSummarizer::ok(BackendId::B, "b"))
        .with_embedder(MockEmbedder::failing())
        .with_config(fast_config());

        let result = verifier.summarize_active_page().await.unwrap();
        assert_eq!(result.secondary_summary.as_deref(), Some("b"));
        assert_eq!(result.confidence, 0.0);
        assert!(!result.is_cross_checked());
        assert!(matches!(result.provenance.embedding, SubCallStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_no_active_target() {
        let verifier = Verifier::new(
            fast_host(),
            MemoryResultStore::new(),
            MockSummarizer::ok(BackendId::A, "a"),
        );

        let response = verifier.trigger().await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("No active tab found."));
    }

    #[tokio::test]
    async fn test_page_without_legal_text() {
        let primary = MockSummarizer::ok(BackendId::A, "a");
        let verifier = Verifier::new(
            host_with("<body><p>Welcome to our bakery</p></body>").await,
            MemoryResultStore::new(),
            primary.clone(),
        )
        .with_config(fast_config());

        let err = verifier.summarize_active_page().await.unwrap_err();
        assert!(matches!(
            err,
            VerifyError::NoRelevantContent {
                reason: ExtractionReason::FailedAllRetries
            }
        ));
        assert!(primary.received_lengths().is_empty());
    }

    #[tokio::test]
    async fn test_extractor_never_listening() {
        let host = fast_host().with_listener_delay(Duration::from_secs(60));
        host.open_tab(PageSnapshot::new("https://example.com/terms", TERMS_HTML))
            .await;
        let verifier = Verifier::new(host, MemoryResultStore::new(), MockSummarizer::ok(BackendId::A, "a"))
            .with_config(
                VerifierConfig::new().with_messaging_retry(RetryPolicy::new(3, Duration::from_millis(1))),
            );

        let err = verifier.summarize_active_page().await.unwrap_err();
        assert!(matches!(err, VerifyError::ExtractionUnavailable { .. }));
    }
}
