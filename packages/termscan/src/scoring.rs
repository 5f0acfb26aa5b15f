//! Agreement scoring between two summaries.

use std::sync::Arc;

use tracing::debug;

use crate::error::EmbeddingError;
use crate::providers::Embedder;

/// Cosine similarity between two vectors.
///
/// Returns 0 for mismatched dimensions, empty input or a zero-magnitude
/// vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Map a similarity in [-1, 1] onto a confidence in [0, 1], two decimals.
pub fn confidence_from_similarity(similarity: f64) -> f64 {
    if !similarity.is_finite() {
        return 0.0;
    }
    let sim = similarity.clamp(-1.0, 1.0);
    (((sim + 1.0) / 2.0 * 100.0).round() / 100.0).clamp(0.0, 1.0)
}

/// Result of scoring a pair of summaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScore {
    pub confidence: f64,
    pub similarity_raw: f64,
}

impl SimilarityScore {
    pub fn from_vectors(a: &[f32], b: &[f32]) -> Self {
        let similarity_raw = f64::from(cosine_similarity(a, b)).clamp(-1.0, 1.0);
        Self {
            confidence: confidence_from_similarity(similarity_raw),
            similarity_raw,
        }
    }
}

/// Embeds two summaries and scores their agreement.
#[derive(Clone)]
pub struct SimilarityScorer {
    embedder: Arc<dyn Embedder>,
}

impl SimilarityScorer {
    pub fn new(embedder: impl Embedder + 'static) -> Self {
        Self {
            embedder: Arc::new(embedder),
        }
    }

    pub async fn score(&self, first: &str, second: &str) -> Result<SimilarityScore, EmbeddingError> {
        if first.trim().is_empty() || second.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let [u, v] = self.embedder.embed_pair(first, second).await?;
        if u.is_empty() || v.is_empty() {
            return Err(EmbeddingError::Malformed("empty embedding vector".into()));
        }

        let score = SimilarityScore::from_vectors(&u, &v);
        debug!(
            dimensions = u.len(),
            similarity = score.similarity_raw,
            confidence = score.confidence,
            "Scored summary agreement"
        );
        Ok(score)
    }
}
