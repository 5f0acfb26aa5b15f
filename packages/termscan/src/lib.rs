//! Terms & Conditions Summarizer with Dual-Model Verification
//!
//! Finds probable legal text on a page, summarizes it with two independent
//! model providers and scores how closely the two summaries agree.
//!
//! # Design Philosophy
//!
//! - One summary is always better than none: a failed cross-check degrades
//!   the confidence, never the request
//! - Every retry loop and network call is bounded
//! - Provider schemas stay inside their adapters
//!
//! # Usage
//!
//! ```rust,ignore
//! use termscan::{HttpPageLoader, LocalPageHost, MemoryResultStore, Verifier};
//! use termscan::providers::{GeminiSummarizer, OpenAiEmbedder, OpenAiSummarizer};
//!
//! let host = LocalPageHost::new();
//! host.open_tab(HttpPageLoader::new().load("https://example.com/terms").await?).await;
//!
//! let verifier = Verifier::new(host, MemoryResultStore::new(), GeminiSummarizer::new(gemini_key))
//!     .with_secondary(OpenAiSummarizer::new(openai_key.clone()))
//!     .with_embedder(OpenAiEmbedder::new(openai_key));
//!
//! let response = verifier.trigger().await;
//! ```
//!
//! # Modules
//!
//! - [`extractor`] - Keyword gate and selector heuristics over page snapshots
//! - [`page`] - Page host, extractor messaging and HTTP page loading
//! - [`bridge`] - Retrying delivery to a not-yet-listening extractor
//! - [`providers`] - Gemini and OpenAI adapters
//! - [`scoring`] - Embedding similarity and confidence
//! - [`stores`] - Single-slot result storage
//! - [`verifier`] - The orchestrator
//! - [`testing`] - Mock implementations for testing

pub mod bridge;
pub mod error;
pub mod extractor;
pub mod page;
pub mod providers;
pub mod retry;
pub mod scoring;
pub mod security;
pub mod stores;
pub mod testing;
pub mod types;
pub mod verifier;

// Re-export core types at crate root
pub use error::{
    BackendError, DeliveryError, EmbeddingError, HostError, PageLoadError, StoreError,
    VerifyError,
};
pub use types::{
    config::{ExtractorConfig, RetryPolicy, VerifierConfig, DEFAULT_KEYWORDS, MAX_CONTENT_CHARS},
    page::{ExtractionReason, FrameAccess, FrameSnapshot, PageContent, PageSnapshot},
    summary::{BackendId, SummaryResult},
    verification::{
        ConfidenceLevel, ProvenanceInfo, SubCallStatus, TriggerResponse, VerificationResult,
    },
};

pub use bridge::MessagingBridge;
pub use extractor::{ContentExtractor, SnapshotSource};
pub use page::{
    ExtractorRequest, ExtractorResponse, HttpPageLoader, LocalPageHost, PageChannel, PageHost,
    TargetId,
};
pub use providers::{Embedder, Summarizer};
pub use retry::{retry_bounded, RetryError};
pub use scoring::{confidence_from_similarity, cosine_similarity, SimilarityScore, SimilarityScorer};
pub use security::SecretString;
pub use stores::{FileResultStore, MemoryResultStore, ResultStore};
pub use verifier::{truncate_chars, Verifier};
