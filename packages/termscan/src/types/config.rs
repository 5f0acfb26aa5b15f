//! Configuration types for extraction, messaging and verification.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default keywords that mark a page as a legal document.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "terms",
    "terms and conditions",
    "terms of service",
    "terms & conditions",
    "privacy policy",
    "cookie policy",
    "policy",
    "legal",
    "disclaimer",
    "user agreement",
    "eula",
    "imprint",
];

/// Maximum characters forwarded to a summarization backend.
pub const MAX_CONTENT_CHARS: usize = 100_000;

/// Bounded retry settings: how many attempts, and how long between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,

    /// Pause between attempts in milliseconds.
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: delay.as_millis() as u64,
        }
    }

    /// Extraction polling for client-rendered pages: 12 attempts, 150ms apart.
    pub fn extraction() -> Self {
        Self::new(12, Duration::from_millis(150))
    }

    /// Listener start-up race: 10 attempts, 100ms apart.
    pub fn messaging() -> Self {
        Self::new(10, Duration::from_millis(100))
    }

    /// A single attempt with no waiting.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Configuration for the content extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Lower-case phrases that mark legal text.
    pub keywords: Vec<String>,

    /// A candidate element's text must be longer than this to qualify.
    ///
    /// Default: 40 characters.
    pub min_candidate_chars: usize,

    /// Polling while the page populates.
    pub retry: RetryPolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            min_candidate_chars: 40,
            retry: RetryPolicy::extraction(),
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the keyword set. Keywords are lower-cased.
    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keywords = keywords
            .into_iter()
            .map(|k| k.into().to_lowercase())
            .collect();
        self
    }

    pub fn with_min_candidate_chars(mut self, chars: usize) -> Self {
        self.min_candidate_chars = chars;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether already lower-cased text contains any keyword.
    pub fn matches_keyword(&self, lower: &str) -> bool {
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

/// Configuration for the verification orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Content longer than this is truncated before leaving the orchestrator.
    pub max_content_chars: usize,

    /// Retry policy of the messaging bridge.
    pub messaging_retry: RetryPolicy,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_content_chars: MAX_CONTENT_CHARS,
            messaging_retry: RetryPolicy::messaging(),
        }
    }
}

impl VerifierConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }

    pub fn with_messaging_retry(mut self, retry: RetryPolicy) -> Self {
        self.messaging_retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policies() {
        assert_eq!(RetryPolicy::extraction().attempts(), 12);
        assert_eq!(RetryPolicy::extraction().delay(), Duration::from_millis(150));
        assert_eq!(RetryPolicy::messaging().attempts(), 10);
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    }

    #[test]
    fn test_keywords_lowercased() {
        let config = ExtractorConfig::new().with_keywords(["EULA", "Imprint"]);
        assert!(config.matches_keyword("see our eula below"));
        assert!(!config.matches_keyword("privacy policy"));
    }
}
