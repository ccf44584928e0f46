//! FNV-1a feature-hashing encoder.
//!
//! Each text contributes its whitespace-separated words and its character
//! n-grams. Every feature is hashed into one of `dimension` buckets with a
//! sign taken from an independent hash bit, and the result is L2-normalized.
//! Deterministic, model-free, and good enough to exercise the whole pipeline
//! on machines without model weights.

use super::l2_normalize;
use super::traits::Embedder;
use crate::config::HASH_EMBEDDING_DIM;
use crate::error::EmbeddingError;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Feature-hashing encoder.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    ngram_range: (usize, usize),
    model_id: String,
}

impl HashEmbedder {
    /// Creates an encoder producing vectors of `dimension` components.
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        Self::with_ngram_range(dimension, 3, 4)
    }

    /// Creates an encoder with a custom character n-gram range.
    pub fn with_ngram_range(
        dimension: usize,
        min: usize,
        max: usize,
    ) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "embedding dimension must be > 0".to_string(),
            ));
        }
        if min == 0 || min > max {
            return Err(EmbeddingError::InvalidConfig(format!(
                "invalid n-gram range {}..={}",
                min, max
            )));
        }
        Ok(Self {
            dimension,
            ngram_range: (min, max),
            model_id: format!("fnv1a-hash-d{}-n{}-{}", dimension, min, max),
        })
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8]) {
        let h = fnv1a(feature);
        let bucket = (h % self.dimension as u64) as usize;
        let sign = if (h >> 32) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();

        for word in lower.split_whitespace() {
            let mut feature = Vec::with_capacity(word.len() + 2);
            feature.extend_from_slice(b"w:");
            feature.extend_from_slice(word.as_bytes());
            self.add_feature(&mut vector, &feature);
        }

        let chars: Vec<char> = lower.chars().collect();
        let mut buf = String::new();
        for n in self.ngram_range.0..=self.ngram_range.1 {
            if n > chars.len() {
                break;
            }
            for window in chars.windows(n) {
                buf.clear();
                buf.extend(window);
                self.add_feature(&mut vector, buf.as_bytes());
            }
        }

        l2_normalize(&mut vector);
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimension: HASH_EMBEDDING_DIM,
            ngram_range: (3, 4),
            model_id: format!("fnv1a-hash-d{}-n3-4", HASH_EMBEDDING_DIM),
        }
    }
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embedding_dim(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
