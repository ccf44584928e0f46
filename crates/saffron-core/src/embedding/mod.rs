//! Text encoders.
//!
//! ## Core Trait
//!
//! - [`Embedder`] - batch text-to-vector interface shared by the store builder
//!   and the vector search service
//!
//! ## Implementations
//!
//! - [`HashEmbedder`] - FNV-1a feature hashing, always available
//! - `JinaBertEmbedder` - JinaBERT via Candle (requires the `jina-bert` feature)
//!
//! ## Example
//!
//! ```ignore
//! use saffron_core::embedding::{JinaBertConfig, JinaBertEmbedder};
//!
//! let embedder = JinaBertEmbedder::from_files(
//!     "model.safetensors",
//!     "tokenizer.json",
//!     JinaBertConfig::default(),
//! )?;
//! let vector = embedder.embed("chocolate chip cookies")?;
//! ```

mod hash;
mod traits;

#[cfg(feature = "jina-bert")]
pub mod config;
#[cfg(feature = "jina-bert")]
pub mod model;
#[cfg(feature = "jina-bert")]
pub mod tokenizer;

pub use hash::HashEmbedder;
pub use traits::Embedder;

#[cfg(feature = "jina-bert")]
pub use config::JinaBertConfig;
#[cfg(feature = "jina-bert")]
pub use model::JinaBertEmbedder;
#[cfg(feature = "jina-bert")]
pub use tokenizer::TokenizerHandle;

/// Scales `v` to unit length in place and returns its original norm.
///
/// A vector whose norm is zero (or not finite) is left untouched; callers
/// check the returned norm to detect it.
pub fn l2_normalize(v: &mut [f32]) -> f32 {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON && norm.is_finite() {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    norm
}

/// Returns true if `v` has unit length within `tolerance`.
pub fn is_unit_norm(v: &[f32], tolerance: f32) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    (norm - 1.0).abs() <= tolerance
}
