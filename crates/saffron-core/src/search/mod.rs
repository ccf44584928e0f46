//! Retrieval over the recipe corpus.
//!
//! Two independent paths answer the same [`RecipeSearcher`] interface:
//!
//! - **Vector**: [`VectorIndex`] holds unit-length recipe embeddings and
//!   returns the exact top-k by inner product. [`VectorSearchService`]
//!   encodes the query and joins hits against the display metadata table.
//! - **Lexical**: [`LexicalIndex`] scores weighted recipe blobs with BM25.
//!   [`LexicalSearchService`] decodes display fields from each hit's payload.
//!
//! Scores from the two paths are not comparable and are never fused.
//!
//! # Usage
//!
//! ```
//! use saffron_core::search::{RecipeId, VectorIndex};
//!
//! let index = VectorIndex::build(
//!     vec![1.0, 0.0, 0.0, 1.0],
//!     2,
//!     vec![RecipeId::from_u64(10), RecipeId::from_u64(20)],
//! )?;
//! let hits = index.search(&[0.0, 1.0], 1)?;
//! assert_eq!(hits[0].0, RecipeId::from_u64(20));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod types;

#[doc(hidden)]
pub mod keyword;
pub mod service;
#[doc(hidden)]
pub mod vector;

pub use crate::error::SearchError;
pub use keyword::{LexicalBuildSummary, LexicalIndex, LexicalIndexManifest, LexicalMatch};
pub use service::{LexicalSearchService, RecipeSearcher, VectorSearchService};
pub use types::{RecipeId, SearchHit};
pub use vector::{VectorIndex, VectorIndexManifest};
