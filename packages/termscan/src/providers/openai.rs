//! OpenAI chat-completion summarizer and embedding client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{BackendError, BackendResult, EmbeddingError};
use crate::providers::prompts::{summary_prompt, SYSTEM_PROMPT};
use crate::providers::{
    api_error_message, is_success, send_bounded, Embedder, Summarizer, TransportError,
    DEFAULT_REQUEST_TIMEOUT,
};
use crate::security::SecretString;
use crate::types::summary::BackendId;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Summarizer backed by `/chat/completions`.
#[derive(Clone)]
pub struct OpenAiSummarizer {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    timeout: Duration,
    backend_id: BackendId,
}

impl OpenAiSummarizer {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            backend_id: BackendId::B,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
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
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    fn backend_id(&self) -> BackendId {
        self.backend_id
    }

    async fn summarize(&self, text: &str) -> BackendResult<String> {
        if self.api_key.is_blank() {
            return Err(BackendError::Config("OpenAI API key is empty".into()));
        }

        let start = Instant::now();
        let prompt = summary_prompt(text);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&body);

        let (status, response_body) =
            send_bounded(request, self.timeout)
                .await
                .map_err(|e| match e {
                    TransportError::Timeout => BackendError::Timeout(self.timeout),
                    TransportError::Network(msg) => {
                        warn!(error = %msg, "OpenAI chat request failed");
                        BackendError::Network(msg)
                    }
                })?;

        if !is_success(status) {
            let message = api_error_message(&response_body);
            warn!(status, error = %message, "OpenAI chat API error");
            return Err(BackendError::Api { status, message });
        }

        let summary = parse_chat_completion(&response_body)?;
        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            summary_chars = summary.chars().count(),
            "OpenAI summary"
        );
        Ok(summary)
    }
}

/// Embedding client for the similarity check.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_pair(
        &self,
        first: &str,
        second: &str,
    ) -> Result<[Vec<f32>; 2], EmbeddingError> {
        if first.trim().is_empty() || second.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: [first, second],
        };

        let request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&body);

        let (status, response_body) =
            send_bounded(request, self.timeout)
                .await
                .map_err(|e| match e {
                    TransportError::Timeout => EmbeddingError::Timeout(self.timeout),
                    TransportError::Network(msg) => EmbeddingError::Network(msg),
                })?;

        if !is_success(status) {
            let message = api_error_message(&response_body);
            warn!(status, error = %message, "OpenAI embeddings API error");
            return Err(EmbeddingError::Api { status, message });
        }

        parse_embedding_pair(&response_body)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 2],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

pub(crate) fn parse_chat_completion(body: &str) -> BackendResult<String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|t| !t.trim().is_empty())
        .ok_or(BackendError::EmptySummary)
}

/// Two vectors in input order. Anything else is malformed.
pub(crate) fn parse_embedding_pair(body: &str) -> Result<[Vec<f32>; 2], EmbeddingError> {
    let mut response: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

    if response.data.len() != 2 {
        return Err(EmbeddingError::Malformed(format!(
            "expected 2 embeddings, got {}",
            response.data.len()
        )));
    }

    response.data.sort_by_key(|d| d.index);
    let mut vectors = response.data.into_iter().map(|d| d.embedding);
    match (vectors.next(), vectors.next()) {
        (Some(first), Some(second)) if !first.is_empty() && !second.is_empty() => {
            Ok([first, second])
        }
        _ => Err(EmbeddingError::Malformed("empty embedding vector".into())),
    }
}
