//! Gemini (generate-content style) summarizer.
//!
//! # Example
//!
//! ```rust,ignore
//! use termscan::providers::GeminiSummarizer;
//!
//! // Direct, with an API key
//! let gemini = GeminiSummarizer::new("AIza...").with_model("gemini-2.0-flash");
//!
//! // Through a local proxy that holds the key
//! let gemini = GeminiSummarizer::via_proxy("http://localhost:3000/proxy/gemini");
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{BackendError, BackendResult};
use crate::providers::prompts::summary_prompt;
use crate::providers::{
    api_error_message, is_success, send_bounded, Summarizer, TransportError,
    DEFAULT_REQUEST_TIMEOUT,
};
use crate::security::SecretString;
use crate::types::summary::BackendId;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone)]
enum Endpoint {
    Direct {
        base_url: String,
        api_key: SecretString,
    },
    /// A proxy that forwards the request body and adds the key itself.
    Proxy { url: String },
}

/// Summarizer backed by Gemini's `generateContent` API.
#[derive(Clone)]
pub struct GeminiSummarizer {
    client: Client,
    endpoint: Endpoint,
    model: String,
    timeout: Duration,
    backend_id: BackendId,
}

impl GeminiSummarizer {
    /// Call Gemini directly with `api_key`.
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self::with_endpoint(Endpoint::Direct {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Post to a proxy URL instead; no key leaves this process.
    pub fn via_proxy(url: impl Into<String>) -> Self {
        Self::with_endpoint(Endpoint::Proxy { url: url.into() })
    }

    fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            backend_id: BackendId::A,
        }
    }

    /// Set the model (default: gemini-2.0-flash). Ignored behind a proxy.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        if let Endpoint::Direct { base_url, .. } = &mut self.endpoint {
            *base_url = url.into();
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backend_id(mut self, backend_id: BackendId) -> Self {
        self.backend_id = backend_id;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, body: &GenerateContentRequest<'_>) -> BackendResult<reqwest::RequestBuilder> {
        match &self.endpoint {
            Endpoint::Direct { base_url, api_key } => {
                if api_key.is_blank() {
                    return Err(BackendError::Config("Gemini API key is empty".into()));
                }
                Ok(self
                    .client
                    .post(format!("{}/models/{}:generateContent", base_url, self.model))
                    .header("x-goog-api-key", api_key.expose())
                    .json(body))
            }
            Endpoint::Proxy { url } => Ok(self.client.post(url).json(body)),
        }
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    fn backend_id(&self) -> BackendId {
        self.backend_id
    }

    async fn summarize(&self, text: &str) -> BackendResult<String> {
        let start = Instant::now();
        let prompt = summary_prompt(text);
        let body = GenerateContentRequest::user_text(&prompt);

        let (status, response_body) = send_bounded(self.request(&body)?, self.timeout)
            .await
            .map_err(|e| match e {
                TransportError::Timeout => BackendError::Timeout(self.timeout),
                TransportError::Network(msg) => {
                    warn!(error = %msg, "Gemini request failed");
                    BackendError::Network(msg)
                }
            })?;

        if !is_success(status) {
            let message = api_error_message(&response_body);
            warn!(status, error = %message, "Gemini API error");
            return Err(BackendError::Api { status, message });
        }

        let summary = parse_generate_content(&response_body)?;
        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            summary_chars = summary.chars().count(),
            "Gemini summary"
        );
        Ok(summary)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn user_text(text: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Summary text from a `generateContent` response body.
///
/// Uses the first part of the first candidate.
pub(crate) fn parse_generate_content(body: &str) -> BackendResult<String> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.trim().is_empty())
        .ok_or(BackendError::EmptySummary)
}
