//! Configuration for the JinaBERT encoder.

use serde::{Deserialize, Serialize};

/// Configuration for JinaBERT embedding models.
///
/// JinaBERT uses ALiBi (Attention with Linear Biases) positional embeddings,
/// so the sequence limit is a memory budget rather than a trained length.
/// ALiBi bias memory scales as `heads * seq_len^2 * 4 bytes`. Recipe texts are
/// short, so the default keeps the limit at 512 tokens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JinaBertConfig {
    /// Model identifier (e.g., "jinaai/jina-embeddings-v2-small-en")
    pub model_id: String,

    /// Hidden dimension size (embedding output dimension)
    pub hidden_size: usize,

    /// Number of transformer layers
    pub num_hidden_layers: usize,

    /// Number of attention heads per layer
    pub num_attention_heads: usize,

    /// Intermediate (FFN) dimension size
    pub intermediate_size: usize,

    /// Maximum tokens per text; longer texts are truncated
    pub max_position_embeddings: usize,
}

impl Default for JinaBertConfig {
    fn default() -> Self {
        // jinaai/jina-embeddings-v2-small-en
        Self {
            model_id: "jinaai/jina-embeddings-v2-small-en".to_string(),
            hidden_size: 512,
            num_hidden_layers: 4,
            num_attention_heads: 8,
            intermediate_size: 2048,
            max_position_embeddings: 512,
        }
    }
}

impl JinaBertConfig {
    /// Overrides the truncation length.
    pub fn with_max_positions(mut self, max_positions: usize) -> Self {
        self.max_position_embeddings = max_positions;
        self
    }

    /// Estimates the ALiBi bias memory requirement in bytes.
    pub fn estimate_alibi_memory_bytes(&self) -> usize {
        self.num_attention_heads * self.max_position_embeddings * self.max_position_embeddings * 4
    }
}
