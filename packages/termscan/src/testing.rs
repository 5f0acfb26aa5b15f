//! Testing utilities including mock implementations.
//!
//! These let applications exercise the verification pipeline without
//! real provider calls or a live page.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::error::{BackendError, BackendResult, DeliveryError, EmbeddingError};
use crate::extractor::SnapshotSource;
use crate::page::{ExtractorRequest, ExtractorResponse, PageChannel, TargetId};
use crate::providers::{Embedder, Summarizer};
use crate::types::page::{ExtractionReason, PageSnapshot};
use crate::types::summary::BackendId;
use crate::types::verification::{ProvenanceInfo, SubCallStatus, VerificationResult};

/// A mock summarizer with a fixed answer.
///
/// Clones share call tracking, so a clone can be handed to the verifier
/// and this instance inspected afterwards.
#[derive(Clone)]
pub struct MockSummarizer {
    backend_id: BackendId,
    outcome: Result<String, String>,
    received: Arc<RwLock<Vec<usize>>>,
}

impl MockSummarizer {
    /// Always returns `summary`.
    pub fn ok(backend_id: BackendId, summary: impl Into<String>) -> Self {
        Self {
            backend_id,
            outcome: Ok(summary.into()),
            received: Arc::default(),
        }
    }

    /// Always fails with an API error carrying `message`.
    pub fn failing(backend_id: BackendId, message: impl Into<String>) -> Self {
        Self {
            backend_id,
            outcome: Err(message.into()),
            received: Arc::default(),
        }
    }

    /// Character counts of every text this mock was asked to summarize.
    pub fn received_lengths(&self) -> Vec<usize> {
        self.received.read().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    fn backend_id(&self) -> BackendId {
        self.backend_id
    }

    async fn summarize(&self, text: &str) -> BackendResult<String> {
        self.received.write().unwrap().push(text.chars().count());
        match &self.outcome {
            Ok(summary) => Ok(summary.clone()),
            Err(message) => Err(BackendError::Api {
                status: 500,
                message: message.clone(),
            }),
        }
    }
}

/// A mock embedding service returning a fixed vector pair.
#[derive(Clone)]
pub struct MockEmbedder {
    vectors: Option<[Vec<f32>; 2]>,
    calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub fn fixed(first: Vec<f32>, second: Vec<f32>) -> Self {
        Self {
            vectors: Some([first, second]),
            calls: Arc::default(),
        }
    }

    /// Always fails as if the service were unreachable.
    pub fn failing() -> Self {
        Self {
            vectors: None,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_pair(
        &self,
        _first: &str,
        _second: &str,
    ) -> Result<[Vec<f32>; 2], EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .clone()
            .ok_or_else(|| EmbeddingError::Network("connection refused".into()))
    }
}

/// A page channel whose listener registers after a fixed number of
/// delivery attempts.
pub struct ScriptedChannel {
    unavailable_for: u32,
    outcome: Result<ExtractorResponse, DeliveryError>,
    attempts: AtomicU32,
}

impl ScriptedChannel {
    /// Fails with `NoReceiver` for the first `n` sends, then answers.
    pub fn listening_after(n: u32, response: ExtractorResponse) -> Self {
        Self {
            unavailable_for: n,
            outcome: Ok(response),
            attempts: AtomicU32::new(0),
        }
    }

    /// Every send fails with `error`.
    pub fn failing(error: DeliveryError) -> Self {
        Self {
            unavailable_for: 0,
            outcome: Err(error),
            attempts: AtomicU32::new(0),
        }
    }

    /// Sends attempted so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageChannel for ScriptedChannel {
    async fn send(
        &self,
        _target: TargetId,
        _request: ExtractorRequest,
    ) -> Result<ExtractorResponse, DeliveryError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.unavailable_for {
            return Err(DeliveryError::NoReceiver);
        }
        self.outcome.clone()
    }
}

/// A page that changes between observations, e.g. while client-side
/// rendering fills it in. The last snapshot repeats forever.
pub struct SequencedSnapshots {
    snapshots: Vec<PageSnapshot>,
    observed: AtomicUsize,
}

impl SequencedSnapshots {
    pub fn new(snapshots: Vec<PageSnapshot>) -> Self {
        Self {
            snapshots,
            observed: AtomicUsize::new(0),
        }
    }

    /// Number of snapshots taken so far.
    pub fn observed(&self) -> usize {
        self.observed.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for SequencedSnapshots {
    fn snapshot(&self) -> PageSnapshot {
        let n = self.observed.fetch_add(1, Ordering::SeqCst);
        match self.snapshots.get(n).or_else(|| self.snapshots.last()) {
            Some(snapshot) => snapshot.clone(),
            None => PageSnapshot::new("about:blank", ""),
        }
    }
}

/// A plausible persisted result.
pub fn sample_result(primary_summary: &str, confidence: f64) -> VerificationResult {
    VerificationResult {
        primary_summary: primary_summary.to_string(),
        secondary_summary: Some(format!("{} (cross-check)", primary_summary)),
        confidence,
        similarity_raw: confidence * 2.0 - 1.0,
        provenance: ProvenanceInfo {
            request_id: Uuid::new_v4(),
            target: TargetId(1),
            extraction_reason: ExtractionReason::SelectorMatch,
            extracted_chars: 1200,
            forwarded_chars: 1200,
            truncated: false,
            content_hash: "0".repeat(64),
            primary: SubCallStatus::Succeeded,
            secondary: SubCallStatus::Succeeded,
            embedding: SubCallStatus::Succeeded,
            degraded: false,
            duration_ms: 42,
            created_at: Utc::now(),
        },
    }
}
