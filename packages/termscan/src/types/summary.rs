//! Per-backend summary results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BackendError;

/// Identifies one of the two summarization backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendId {
    /// Primary backend
    A,
    /// Secondary, best-effort backend
    B,
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Outcome of one backend call, normalized across providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub backend_id: BackendId,

    /// Summary text (empty on failure)
    pub text: String,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SummaryResult {
    pub fn succeeded(backend_id: BackendId, text: impl Into<String>) -> Self {
        Self {
            backend_id,
            text: text.into(),
            success: true,
            error_message: None,
        }
    }

    pub fn failed(backend_id: BackendId, message: impl Into<String>) -> Self {
        Self {
            backend_id,
            text: String::new(),
            success: false,
            error_message: Some(message.into()),
        }
    }

    /// Fold a backend call's result into the common shape.
    pub fn from_call(backend_id: BackendId, result: Result<String, BackendError>) -> Self {
        match result {
            Ok(text) if !text.trim().is_empty() => Self::succeeded(backend_id, text),
            Ok(_) => Self::failed(backend_id, BackendError::EmptySummary.to_string()),
            Err(e) => Self::failed(backend_id, e.to_string()),
        }
    }

    /// The summary text, if this call produced one.
    pub fn summary(&self) -> Option<&str> {
        self.success.then_some(self.text.as_str())
    }

    pub fn error(&self) -> &str {
        self.error_message.as_deref().unwrap_or("unknown error")
    }
}
