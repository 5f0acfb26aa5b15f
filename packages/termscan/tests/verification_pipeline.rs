//! Integration tests for the verification pipeline.
//!
//! These run the whole flow against the in-process page host:
//! 1. Open a tab and inject an extractor that starts listening late
//! 2. Extract legal text (including from same-origin frames)
//! 3. Summarize with two mock backends
//! 4. Score and persist to a file store

use std::sync::Arc;
use std::time::Duration;

use termscan::{
    testing::{MockEmbedder, MockSummarizer, SequencedSnapshots},
    BackendId, ConfidenceLevel, ExtractionReason, ExtractorConfig, FileResultStore,
    FrameSnapshot, LocalPageHost, PageHost, PageSnapshot, ResultStore, RetryPolicy, Verifier,
    VerifierConfig, VerifyError,
};

const TERMS_PAGE: &str = r#"
<html>
  <head><title>Terms</title><script>var tracking = "privacy policy";</script></head>
  <body>
    <nav>Home | Pricing | Legal</nav>
    <section id="tos">
      <h1>Terms of Service</h1>
      <p>You must be 13 or older to use the service. We may terminate accounts at any time.</p>
    </section>
    <footer>Copyright 2024. All rights reserved. Terms apply.</footer>
  </body>
</html>"#;

/// Helper to set up a host whose extractor listens after `delay`.
fn host_with_delay(delay: Duration) -> LocalPageHost {
    LocalPageHost::new()
        .with_listener_delay(delay)
        .with_extractor_config(
            ExtractorConfig::new().with_retry(RetryPolicy::new(6, Duration::from_millis(5))),
        )
}

fn verifier_config() -> VerifierConfig {
    VerifierConfig::new().with_messaging_retry(RetryPolicy::new(10, Duration::from_millis(20)))
}

#[tokio::test]
async fn test_late_listener_is_reached_and_result_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("latest_result.json");

    let host = host_with_delay(Duration::from_millis(50));
    host.open_tab(PageSnapshot::new("https://example.com/terms", TERMS_PAGE))
        .await;

    let verifier = Verifier::new(
        host,
        FileResultStore::new(&store_path),
        MockSummarizer::ok(BackendId::A, "- Minimum age 13\n- Accounts can be terminated"),
    )
    .with_secondary(MockSummarizer::ok(BackendId::B, "- Users must be 13+"))
    .with_embedder(MockEmbedder::fixed(vec![0.9, 0.1, 0.0], vec![0.8, 0.2, 0.1]))
    .with_config(verifier_config());

    let response = verifier.trigger().await;
    assert!(response.success, "unexpected failure: {:?}", response.error);
    assert!(response.confidence > 0.9);
    assert_eq!(response.confidence_level, Some(ConfidenceLevel::High));

    let stored = FileResultStore::new(&store_path).get().await.unwrap().unwrap();
    assert_eq!(stored.primary_summary, "- Minimum age 13\n- Accounts can be terminated");
    assert_eq!(stored.provenance.extraction_reason, ExtractionReason::SelectorMatch);
    assert!(stored.provenance.extracted_chars < 200);
}

#[tokio::test]
async fn test_same_origin_frame_content_is_summarized() {
    let host = host_with_delay(Duration::ZERO);
    let page = PageSnapshot::new(
        "https://shop.example.com/checkout",
        r#"<body><span>See legal</span><iframe src="/legal/eula.html"></iframe></body>"#,
    )
    .with_frame(FrameSnapshot::same_origin(
        "https://shop.example.com/legal/eula.html",
        "<body><article>This End User License Agreement (EULA) governs your use of the software.</article></body>",
    ));
    host.open_tab(page).await;

    let primary = MockSummarizer::ok(BackendId::A, "EULA summary");
    let verifier = Verifier::new(host, termscan::MemoryResultStore::new(), primary.clone())
        .with_config(verifier_config());

    let result = verifier.summarize_active_page().await.unwrap();
    assert_eq!(result.provenance.extraction_reason, ExtractionReason::IframeExtract);
    assert_eq!(result.primary_summary, "EULA summary");
    assert!(result.provenance.degraded);
    assert_eq!(primary.received_lengths().len(), 1);
}

#[tokio::test]
async fn test_client_rendered_page_is_polled_until_ready() {
    let host = host_with_delay(Duration::ZERO);
    let snapshots = Arc::new(SequencedSnapshots::new(vec![
        PageSnapshot::new("https://app.example.com/legal", "<body><div id='app'></div></body>"),
        PageSnapshot::new("https://app.example.com/legal", "<body><div id='app'>Loading</div></body>"),
        PageSnapshot::new(
            "https://app.example.com/legal",
            "<body><div id='app'><main>Privacy policy: we share usage data with analytics partners.</main></div></body>",
        ),
    ]));
    host.open_tab(Arc::clone(&snapshots)).await;

    let verifier = Verifier::new(
        host,
        termscan::MemoryResultStore::new(),
        MockSummarizer::ok(BackendId::A, "Data is shared with analytics partners"),
    )
    .with_config(verifier_config());

    let result = verifier.summarize_active_page().await.unwrap();
    assert_eq!(result.provenance.extraction_reason, ExtractionReason::SelectorMatch);
    assert!(result.provenance.content_hash.len() == 64);
    // One look when the tab opens, then one per extraction pass until ready
    assert_eq!(snapshots.observed(), 3);
}

#[tokio::test]
async fn test_closed_tab_has_no_active_target() {
    let host = host_with_delay(Duration::ZERO);
    let id = host
        .open_tab(PageSnapshot::new("https://example.com/terms", TERMS_PAGE))
        .await;
    host.close_tab(id).await;
    assert_eq!(host.active_target().await, None);

    let verifier = Verifier::new(
        host,
        termscan::MemoryResultStore::new(),
        MockSummarizer::ok(BackendId::A, "unused"),
    );
    assert!(matches!(
        verifier.summarize_active_page().await,
        Err(VerifyError::NoActiveTarget)
    ));
}
