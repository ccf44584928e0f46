//! Production configuration constants and tunable parameter sets.
//!
//! Constants here are shared by the builders, the search services, the CLI
//! and the benchmarks so that build-time and query-time settings cannot drift.
//!
//! # Usage
//!
//! ```
//! use saffron_core::config::{Bm25Params, EmbeddingBuildConfig, DEFAULT_TOP_K};
//!
//! let bm25 = Bm25Params::default();
//! assert_eq!(bm25.k1, 0.9);
//!
//! let build = EmbeddingBuildConfig::default().with_chunk_size(1_000);
//! assert_eq!(build.chunk_size, 1_000);
//! assert_eq!(DEFAULT_TOP_K, 5);
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Embedding Store
// =============================================================================

/// Records per durable chunk.
///
/// One chunk is encoded, written and synced to disk before the next one is
/// read, so this bounds peak memory during an embedding run.
pub const DEFAULT_CHUNK_SIZE: usize = 5_000;

/// Texts per encoder call within a chunk.
pub const DEFAULT_ENCODE_BATCH_SIZE: usize = 128;

/// Row count of the reference food.com snapshot.
///
/// Used as the default pre-allocated capacity of the embedding store. Runs over
/// a larger corpus must pass an explicit capacity.
pub const EXPECTED_CORPUS_SIZE: usize = 231_637;

/// Default dimension of the feature-hashing encoder.
pub const HASH_EMBEDDING_DIM: usize = 384;

/// Tolerance used when checking that stored vectors are unit length.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-3;

// =============================================================================
// Lexical Index
// =============================================================================

/// BM25 term-frequency saturation.
pub const BM25_K1: f32 = 0.9;

/// BM25 document length normalization strength.
pub const BM25_B: f32 = 0.4;

/// Number of times the recipe name is repeated in the lexical blob.
pub const NAME_BOOST: usize = 3;

// =============================================================================
// Search
// =============================================================================

/// Default number of hits returned by the search services.
pub const DEFAULT_TOP_K: usize = 5;

/// BM25 scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation (k1)
    pub k1: f32,
    /// Length-normalization strength (b), in [0, 1]
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: BM25_K1,
            b: BM25_B,
        }
    }
}

/// Embedding store build parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingBuildConfig {
    /// Records per durable chunk (see [`DEFAULT_CHUNK_SIZE`])
    pub chunk_size: usize,
    /// Texts per encoder call (see [`DEFAULT_ENCODE_BATCH_SIZE`])
    pub batch_size: usize,
}

impl Default for EmbeddingBuildConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_size: DEFAULT_ENCODE_BATCH_SIZE,
        }
    }
}

impl EmbeddingBuildConfig {
    /// Overrides the chunk size. Zero is clamped to one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Overrides the encoder batch size. Zero is clamped to one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}
