//! Error types for saffron-core.
//!
//! Errors are split by how the caller is expected to react:
//!
//! - [`RecordError`] - a single corpus line could not be read. Malformed lines
//!   are skippable; I/O failures are not.
//! - [`IndexError`] - building, saving or loading an index artifact failed.
//!   Always fatal: a misaligned index would silently return the wrong recipe
//!   for every future query.
//! - [`SearchError`] - a query could not be served at all.
//! - [`EmbeddingError`] - the encoder failed.

use crate::search::types::RecipeId;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// Failed to load model weights
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    /// Failed to create tensor during inference
    #[error("Failed to create tensor: {0}")]
    TensorCreation(String),
    /// Forward pass through the model failed
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    /// Failed to tokenize text
    #[error("Tokenization failed: {0}")]
    TokenizationFailed(String),
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Tokenizer not available or initialization failed
    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),
    /// Encoder returned a different number of vectors than inputs
    #[error("Encoder returned {actual} embeddings for {expected} inputs")]
    BatchSizeMismatch { expected: usize, actual: usize },
}

/// Errors raised while reading one line of a JSON-lines input.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The line is not a valid record. Callers log and skip it.
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    /// The underlying reader failed. Not recoverable.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecordError {
    /// Returns true if processing may continue past this error.
    pub fn is_skippable(&self) -> bool {
        matches!(self, RecordError::Malformed { .. })
    }
}

/// Errors raised while building, saving or loading an index artifact.
///
/// Every integrity variant carries the row (or byte offset) at which the
/// inconsistency was first detected.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The vector rows and the identifier log disagree in length.
    #[error(
        "embedding store holds {vectors} vector rows but {ids} identifiers \
         (first unmatched row: {})", std::cmp::min(.vectors, .ids)
    )]
    IdCountMismatch { vectors: usize, ids: usize },
    /// Generic integrity violation at a specific row/offset.
    #[error("integrity violation at row {row}: {reason}")]
    Integrity { row: usize, reason: String },
    /// The same identifier appears twice.
    #[error("duplicate recipe id {id} at row {row}")]
    DuplicateId { row: usize, id: RecipeId },
    /// A vector does not have the configured dimension.
    #[error("dimension mismatch at row {row}: expected {expected}, got {actual}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    /// Pre-allocated embedding store capacity would be exceeded.
    #[error(
        "capacity exceeded: writing {requested} rows at offset {offset} \
         exceeds pre-allocated capacity of {capacity} rows"
    )]
    CapacityExceeded {
        offset: usize,
        requested: usize,
        capacity: usize,
    },
    /// Artifact was written by an incompatible schema version.
    #[error("incompatible index schema: found v{found}, supported v{supported}")]
    IncompatibleSchema { found: u32, supported: u32 },
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Embedded database error
    #[error("Storage error: {0}")]
    Storage(String),
    /// Manifest or payload (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Encoder failure during a build
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}

impl From<RecordError> for IndexError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Io(e) => IndexError::Io(e),
            RecordError::Malformed { line, reason } => IndexError::Integrity { row: line, reason },
        }
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::Serialization(err.to_string())
    }
}

/// Error types for query-time operations.
///
/// Missing metadata and unmatched identifiers are never errors; they only
/// shorten the result list.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// The service could not be constructed (index or metadata not loadable,
    /// or the encoder does not match the index).
    #[error("search service unavailable: {0}")]
    Unavailable(String),
    /// Query embedding failed
    #[error("Embedding error: {0}")]
    EmbeddingError(String),
    /// Vector dimension mismatch (expected vs actual)
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was built with
        expected: usize,
        /// Dimension of the query vector
        actual: usize,
    },
}

impl From<IndexError> for SearchError {
    fn from(err: IndexError) -> Self {
        SearchError::Unavailable(err.to_string())
    }
}

impl From<EmbeddingError> for SearchError {
    fn from(err: EmbeddingError) -> Self {
        SearchError::EmbeddingError(err.to_string())
    }
}
