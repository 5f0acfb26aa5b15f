use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use termscan::providers::{GeminiSummarizer, OpenAiEmbedder, OpenAiSummarizer};
use termscan::SecretString;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<SecretString>,
    /// When set, Gemini requests go through this proxy and no key is sent.
    pub gemini_proxy_url: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<SecretString>,
    pub openai_model: String,
    pub openai_embedding_model: String,
    pub store_path: PathBuf,
    pub backend_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_timeout = match get("TERMSCAN_BACKEND_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(
                secs.trim()
                    .parse()
                    .context("TERMSCAN_BACKEND_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            None => Duration::from_secs(20),
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").map(SecretString::from),
            gemini_proxy_url: get("GEMINI_PROXY_URL"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            openai_api_key: get("OPENAI_API_KEY").map(SecretString::from),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_embedding_model: get("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            store_path: get("TERMSCAN_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/latest_result.json")),
            backend_timeout,
        })
    }

    /// Backend A. Requires either a proxy URL or a Gemini key.
    pub fn primary(&self) -> Result<GeminiSummarizer> {
        let gemini = match (&self.gemini_proxy_url, &self.gemini_api_key) {
            (Some(proxy), _) => GeminiSummarizer::via_proxy(proxy),
            (None, Some(key)) => GeminiSummarizer::new(key.clone()),
            (None, None) => bail!("GEMINI_API_KEY or GEMINI_PROXY_URL must be set"),
        };
        Ok(gemini
            .with_model(&self.gemini_model)
            .with_timeout(self.backend_timeout))
    }

    /// Backend B, when an OpenAI key is configured.
    pub fn secondary(&self) -> Option<OpenAiSummarizer> {
        self.openai_api_key.as_ref().map(|key| {
            OpenAiSummarizer::new(key.clone())
                .with_model(&self.openai_model)
                .with_timeout(self.backend_timeout)
        })
    }

    pub fn embedder(&self) -> Option<OpenAiEmbedder> {
        self.openai_api_key.as_ref().map(|key| {
            OpenAiEmbedder::new(key.clone())
                .with_model(&self.openai_embedding_model)
                .with_timeout(self.backend_timeout)
        })
    }
}

/// Key presence for startup logs, never the key itself.
pub fn key_status(key: &Option<SecretString>) -> String {
    match key {
        Some(key) => key.masked(),
        None => "not set".to_string(),
    }
}
