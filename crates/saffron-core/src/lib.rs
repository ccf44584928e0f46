//! # Saffron Core
//!
//! Recipe retrieval over a normalized food.com-style corpus, with two
//! independent search paths: exact semantic search over unit-length
//! embeddings and BM25 keyword search over weighted recipe text.
//!
//! ## Modules
//!
//! - [`recipe`] - Recipe records and the JSON-lines corpus reader
//! - [`normalize`] - Text normalization shared by builders and queries
//! - [`embedding`] - Text encoders (feature hashing, optional JinaBERT)
//! - [`store`] - Chunked, crash-detectable on-disk embedding store
//! - [`search`] - Vector and lexical indexes and their query services
//! - [`metadata`] - Display metadata joined onto vector hits
//! - [`evaluation`] - Rule-based relevance judgments and IR metrics
//! - [`config`] - Production configuration constants
//! - [`error`] - Error types

pub mod config;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod metadata;
pub mod normalize;
pub mod recipe;
pub mod search;
pub mod store;

#[cfg(test)]
mod test_utils;
