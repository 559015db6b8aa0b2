//! Sentence embedding service abstraction.
//!
//! The semantic rebuttal tier compares transcript chunks against phrase
//! embeddings by cosine similarity. The core depends only on the
//! [`Embedder`] trait; the HTTP adapter lives in [`remote`].

pub mod remote;

pub use remote::RemoteEmbedder;

use async_trait::async_trait;

/// Sentence embedding service interface.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Encode a batch of texts into embedding vectors.
    ///
    /// Returns one vector per input text, all of equal dimension.
    ///
    /// # Errors
    ///
    /// Returns an `Api` error when the service is unreachable or rejects
    /// the request.
    async fn encode(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>>;
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched dimensions or zero-magnitude inputs, which
/// conservatively fails any similarity threshold.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
