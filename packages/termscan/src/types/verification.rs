//! Verification results - the unit of output and persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VerifyError;
use crate::page::TargetId;
use crate::types::page::ExtractionReason;
use crate::types::summary::SummaryResult;

/// Outcome of one sub-call of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubCallStatus {
    Succeeded,
    Failed { error: String },
    Skipped,
}

impl SubCallStatus {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl From<&SummaryResult> for SubCallStatus {
    fn from(result: &SummaryResult) -> Self {
        if result.success {
            Self::Succeeded
        } else {
            Self::failed(result.error())
        }
    }
}

/// Diagnostic record of which sub-calls of a request succeeded.
///
/// Never required for correctness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceInfo {
    pub request_id: Uuid,

    pub target: TargetId,

    pub extraction_reason: ExtractionReason,

    /// Characters returned by the extractor
    pub extracted_chars: usize,

    /// Characters forwarded to the backends
    pub forwarded_chars: usize,

    pub truncated: bool,

    /// SHA-256 of the forwarded text
    pub content_hash: String,

    pub primary: SubCallStatus,

    pub secondary: SubCallStatus,

    pub embedding: SubCallStatus,

    /// Set when only one backend's summary made it into the result.
    pub degraded: bool,

    pub duration_ms: u64,

    pub created_at: DateTime<Utc>,
}

/// The verified summary of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub primary_summary: String,

    /// Present only when both backends produced a summary.
    pub secondary_summary: Option<String>,

    /// Agreement score in [0, 1]; 0 unless both summaries were scored.
    pub confidence: f64,

    /// Cosine similarity in [-1, 1]; 0 when not scored.
    pub similarity_raw: f64,

    pub provenance: ProvenanceInfo,
}

impl VerificationResult {
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.confidence)
    }

    /// Whether the two summaries were actually cross-checked.
    pub fn is_cross_checked(&self) -> bool {
        self.secondary_summary.is_some() && self.provenance.embedding.is_success()
    }
}

/// Coarse banding of the confidence score, as shown next to the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Moderate,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            Self::High
        } else if score >= 0.4 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

/// Response shape consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    pub confidence: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<ConfidenceLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&VerificationResult> for TriggerResponse {
    fn from(result: &VerificationResult) -> Self {
        Self {
            success: true,
            summary: Some(result.primary_summary.clone()),
            confidence: result.confidence,
            confidence_level: Some(result.confidence_level()),
            error: None,
        }
    }
}

impl TriggerResponse {
    /// A failed request carrying a human-readable reason.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            summary: None,
            confidence: 0.0,
            confidence_level: None,
            error: Some(error.into()),
        }
    }
}

impl From<&VerifyError> for TriggerResponse {
    fn from(error: &VerifyError) -> Self {
        Self::failure(error.to_string())
    }
}

impl From<&std::result::Result<VerificationResult, VerifyError>> for TriggerResponse {
    fn from(outcome: &std::result::Result<VerificationResult, VerifyError>) -> Self {
        match outcome {
            Ok(result) => result.into(),
            Err(e) => e.into(),
        }
    }
}
