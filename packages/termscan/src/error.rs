//! Typed errors for the verification pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Only
//! [`VerifyError`] ever reaches the trigger boundary; backend, embedding
//! and delivery failures are recovered inside the pipeline where a partial
//! result is still useful.

use std::time::Duration;

use thiserror::Error;

use crate::page::TargetId;
use crate::types::page::ExtractionReason;

/// Terminal failures of a verification request.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// No page is focused in the host.
    #[error("No active tab found.")]
    NoActiveTarget,

    /// The extractor could not be reached or did not answer.
    #[error("Failed to get page content: {reason}")]
    ExtractionUnavailable { reason: String },

    /// The extractor answered with empty or whitespace-only text.
    #[error(
        "Could not extract relevant text from the page. Is it a Terms & Conditions page? ({reason})"
    )]
    NoRelevantContent { reason: ExtractionReason },

    /// Neither backend produced a usable summary.
    #[error("all summarization backends failed (primary: {primary}; secondary: {secondary})")]
    AllBackendsFailed { primary: String, secondary: String },

    /// The result could not be persisted.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Failure of a single summarization backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Configuration error (missing API key, invalid settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection failed before a response arrived
    #[error("network error: {0}")]
    Network(String),

    /// No response within the configured bound
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response did not match the provider schema
    #[error("parse error: {0}")]
    Parse(String),

    /// Provider answered but returned no text
    #[error("No summary returned from AI.")]
    EmptySummary,
}

/// Failure of the embedding service. Always recovered: confidence drops to 0.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding input must be non-empty")]
    EmptyInput,

    #[error("network error: {0}")]
    Network(String),

    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Missing, extra or unparseable embeddings
    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

/// Failure to deliver a message to an extractor listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The extractor has not registered its listener yet.
    #[error("Could not establish connection. Receiving end does not exist.")]
    NoReceiver,

    /// The listener went away before answering.
    #[error("message channel closed: {0}")]
    Disconnected(String),
}

impl DeliveryError {
    /// Whether this failure is the transient "not listening yet" race.
    pub fn is_no_receiver(&self) -> bool {
        matches!(self, Self::NoReceiver)
    }
}

/// Page host failures (injection, unknown targets).
#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown target: {0}")]
    UnknownTarget(TargetId),

    #[error("script injection failed: {0}")]
    Injection(String),
}

/// Result store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures while loading a page over HTTP.
#[derive(Debug, Error)]
pub enum PageLoadError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("timeout fetching {url}")]
    Timeout { url: String },
}

/// Result type alias for verification requests.
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Result type alias for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
