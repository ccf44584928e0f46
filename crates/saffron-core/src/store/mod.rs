//! On-disk embedding store.
//!
//! Two files, aligned by row:
//!
//! - `vectors.f32` - N x D little-endian `f32`, row-major, every row unit length
//! - `ids.txt` - N decimal recipe identifiers, one per line, in row order
//!
//! The store is written by [`EmbeddingWriter`] (usually driven by
//! [`EmbeddingStoreBuilder`]) and read back in full by [`EmbeddingStore::open`],
//! which refuses any store whose files disagree.

mod builder;
mod progress;
mod writer;

pub use builder::{BuildSummary, EmbeddingStoreBuilder};
pub use progress::{BuildProgress, ProgressTimer};
pub use writer::EmbeddingWriter;

use crate::config::UNIT_NORM_TOLERANCE;
use crate::embedding::is_unit_norm;
use crate::error::IndexError;
use crate::search::types::RecipeId;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// File name of the vector array inside a store directory.
pub const VECTORS_FILE: &str = "vectors.f32";
/// File name of the identifier log inside a store directory.
pub const IDS_FILE: &str = "ids.txt";

/// Locations of the two store files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingStorePaths {
    pub vectors: PathBuf,
    pub ids: PathBuf,
}

impl EmbeddingStorePaths {
    /// Standard file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            vectors: dir.join(VECTORS_FILE),
            ids: dir.join(IDS_FILE),
        }
    }
}

/// A fully loaded, validated embedding store.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    dimension: usize,
    vectors: Vec<f32>,
    ids: Vec<RecipeId>,
}

impl EmbeddingStore {
    /// Loads and validates a store of `dimension`-component vectors.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Integrity`] if the vector file ends in a partial row, an
    ///   identifier line does not parse, or a row is not unit length
    /// - [`IndexError::IdCountMismatch`] if the files hold different row counts
    ///   (the signature of an interrupted build)
    #[instrument(skip_all, fields(vectors = %paths.vectors.display(), dimension = dimension))]
    pub fn open(paths: &EmbeddingStorePaths, dimension: usize) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::Integrity {
                row: 0,
                reason: "embedding dimension must be > 0".to_string(),
            });
        }

        let row_bytes = dimension * 4;
        let file = File::open(&paths.vectors)?;
        let file_len = file.metadata()?.len() as usize;
        if file_len % row_bytes != 0 {
            return Err(IndexError::Integrity {
                row: file_len / row_bytes,
                reason: format!(
                    "vector file ends in a partial row ({} trailing bytes, row size {})",
                    file_len % row_bytes,
                    row_bytes
                ),
            });
        }
        let rows = file_len / row_bytes;

        let ids = read_ids(&paths.ids)?;
        if ids.len() != rows {
            return Err(IndexError::IdCountMismatch {
                vectors: rows,
                ids: ids.len(),
            });
        }

        let mut vectors = Vec::with_capacity(rows * dimension);
        let mut reader = BufReader::new(file);
        let mut buf = vec![0u8; row_bytes];
        for row in 0..rows {
            reader.read_exact(&mut buf)?;
            let start = vectors.len();
            vectors.extend(
                buf.chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            );
            if !is_unit_norm(&vectors[start..], UNIT_NORM_TOLERANCE) {
                return Err(IndexError::Integrity {
                    row,
                    reason: "vector is not unit length".to_string(),
                });
            }
        }

        info!("Loaded embedding store: {} rows x {} dims", rows, dimension);

        Ok(Self {
            dimension,
            vectors,
            ids,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Identifiers in row order.
    pub fn ids(&self) -> &[RecipeId] {
        &self.ids
    }

    /// Vector of row `row`, if in range.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimension)?;
        self.vectors.get(start..start + self.dimension)
    }

    /// Consumes the store, returning `(vectors, dimension, ids)`.
    pub fn into_parts(self) -> (Vec<f32>, usize, Vec<RecipeId>) {
        (self.vectors, self.dimension, self.ids)
    }
}

fn read_ids(path: &Path) -> Result<Vec<RecipeId>, IndexError> {
    let reader = BufReader::new(File::open(path)?);
    let mut ids = Vec::new();
    for (row, line) in reader.lines().enumerate() {
        let line = line?;
        let id = line.parse::<RecipeId>().map_err(|e| IndexError::Integrity {
            row,
            reason: format!("unparsable identifier {:?}: {}", line, e),
        })?;
        ids.push(id);
    }
    Ok(ids)
}
