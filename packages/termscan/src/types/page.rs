//! Page types - snapshots handed to the extractor and what it returns.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Which heuristic path produced (or failed to produce) content.
///
/// Diagnostic only; nothing downstream branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionReason {
    KeywordMissing,
    EmptyBody,
    SelectorMatch,
    IframeExtract,
    FallbackWholeBody,
    FailedAllRetries,
}

impl ExtractionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeywordMissing => "keyword_missing",
            Self::EmptyBody => "empty_body",
            Self::SelectorMatch => "selector_match",
            Self::IframeExtract => "iframe_extract",
            Self::FallbackWholeBody => "fallback_whole_body",
            Self::FailedAllRetries => "failed_all_retries",
        }
    }
}

impl fmt::Display for ExtractionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate legal text extracted from a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// Extracted text (empty on failure paths)
    pub text: String,

    /// How the text was found
    pub reason: ExtractionReason,
}

impl PageContent {
    /// Content found by one of the heuristics.
    pub fn found(text: impl Into<String>, reason: ExtractionReason) -> Self {
        Self {
            text: text.into(),
            reason,
        }
    }

    /// Empty content carrying the reason nothing was found.
    pub fn empty(reason: ExtractionReason) -> Self {
        Self {
            text: String::new(),
            reason,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True when the text has no non-whitespace characters.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Length in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// SHA-256 hex digest of the text.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Whether the top-level page may read an embedded frame's document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameAccess {
    /// Same origin as the embedding page; the frame's HTML is readable.
    SameOrigin(String),

    /// Different origin; reading the document is blocked.
    CrossOrigin,
}

/// An embedded frame as seen from its parent page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Absolute frame URL (the resolved `src` attribute)
    pub src: String,

    pub access: FrameAccess,
}

impl FrameSnapshot {
    pub fn same_origin(src: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            access: FrameAccess::SameOrigin(html.into()),
        }
    }

    pub fn cross_origin(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            access: FrameAccess::CrossOrigin,
        }
    }
}

/// The live document of a page at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Page URL (used to resolve relative frame sources)
    pub url: String,

    /// Full document HTML
    pub html: String,

    /// Embedded frames discovered when the page was loaded
    #[serde(default)]
    pub frames: Vec<FrameSnapshot>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            frames: Vec::new(),
        }
    }

    /// Attach an embedded frame.
    pub fn with_frame(mut self, frame: FrameSnapshot) -> Self {
        self.frames.push(frame);
        self
    }

    /// Look up a frame by its resolved URL.
    pub fn frame(&self, src: &str) -> Option<&FrameSnapshot> {
        self.frames.iter().find(|f| f.src == src)
    }
}
