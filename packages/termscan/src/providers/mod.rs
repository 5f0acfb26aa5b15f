//! Summarization and embedding providers.
//!
//! Each provider adapter owns its request/response schema. Nothing
//! provider-specific leaves the adapter: summarizers return plain summary
//! text, embedders return a pair of vectors.

pub mod gemini;
pub mod openai;
pub mod prompts;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{BackendResult, EmbeddingError};
use crate::types::summary::BackendId;

pub use gemini::GeminiSummarizer;
pub use openai::{OpenAiEmbedder, OpenAiSummarizer};

/// Default bound on every provider call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// A backend that condenses legal text into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Which slot this backend fills in a verification.
    fn backend_id(&self) -> BackendId;

    /// Summarize raw page text.
    async fn summarize(&self, text: &str) -> BackendResult<String>;
}

/// An embedding service that vectorizes two texts in one call.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_pair(
        &self,
        first: &str,
        second: &str,
    ) -> Result<[Vec<f32>; 2], EmbeddingError>;
}

/// Transport-level failure shared by all adapters.
#[derive(Debug)]
pub(crate) enum TransportError {
    Timeout,
    Network(String),
}

/// Send a request, bounded by `timeout`, and read the whole body.
///
/// Network errors drop the request URL from their message.
pub(crate) async fn send_bounded(
    request: RequestBuilder,
    timeout: Duration,
) -> Result<(u16, String), TransportError> {
    let call = async {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;
        Ok::<_, TransportError>((status, body))
    };

    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| TransportError::Timeout)?
}

/// `{ "error": { "message": ... } }`, the error shape both providers use.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Human-readable message from a non-2xx response body.
pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            let cut: String = trimmed.chars().take(200).collect();
            if cut.is_empty() {
                "no error body".to_string()
            } else {
                cut
            }
        })
}

pub(crate) fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Local endpoints for exercising transport failures.
#[cfg(test)]
pub(crate) mod test_endpoints {
    use tokio::net::TcpListener;

    /// Accepts connections and never answers.
    pub(crate) async fn silent() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    /// A port nothing listens on.
    pub(crate) fn refused() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }
}
