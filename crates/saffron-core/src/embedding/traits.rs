//! The encoder seam.
//!
//! Everything that turns text into vectors sits behind [`Embedder`], so the
//! embedding store builder and the vector search service work the same way
//! with the feature-hashing encoder and with JinaBERT.

use crate::error::EmbeddingError;

/// Trait for text encoders.
///
/// The same encoder (same [`model_id`](Embedder::model_id), same
/// [`embedding_dim`](Embedder::embedding_dim)) must be used to build the
/// embedding store and to encode queries against the resulting index. The
/// vector search service refuses to start if they differ.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: a search service shares one encoder
/// across every thread that queries it.
///
/// # Examples
///
/// ```
/// use saffron_core::embedding::{Embedder, HashEmbedder};
///
/// let embedder = HashEmbedder::default();
/// let vectors = embedder
///     .embed_batch(&["banana bread".to_string(), "chicken curry".to_string()])
///     .unwrap();
/// assert_eq!(vectors.len(), 2);
/// assert_eq!(vectors[0].len(), embedder.embedding_dim());
/// ```
pub trait Embedder: Send + Sync {
    /// Stable identifier of the encoder and its parameters.
    ///
    /// Recorded in the vector index manifest.
    fn model_id(&self) -> &str;

    /// Returns the embedding dimension (vector size).
    fn embedding_dim(&self) -> usize;

    /// Encodes a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Encodes a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        match vectors.pop() {
            Some(vector) if vectors.is_empty() => Ok(vector),
            _ => Err(EmbeddingError::BatchSizeMismatch {
                expected: 1,
                actual: vectors.len() + 1,
            }),
        }
    }
}
