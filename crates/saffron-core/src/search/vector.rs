//! Exact inner-product vector index keyed by recipe identifier.
//!
//! Row `i` of the matrix belongs to `ids[i]`. Search is a flat scan, so results
//! are exact: with unit-length rows and queries, inner product equals cosine
//! similarity. The index is immutable once built; there is no incremental
//! insertion.
//!
//! # Persistence
//!
//! [`VectorIndex::save`] writes a single redb file with two tables:
//!
//! - `manifest`: `"manifest"` -> JSON [`VectorIndexManifest`]
//! - `rows`: row (u64) -> 8-byte little-endian id followed by `D` little-endian `f32`
//!
//! [`VectorIndex::load`] validates the manifest, that rows are contiguous from
//! zero, that every row has the right byte length and that the row count
//! matches, and reports the first offending row otherwise.

use super::types::RecipeId;
use crate::error::{IndexError, SearchError};
use crate::store::EmbeddingStore;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::path::Path;
use tracing::{info, instrument};

const MANIFEST_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("manifest");
const ROWS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("rows");
const MANIFEST_KEY: &str = "manifest";

/// On-disk format version written by this build.
pub const VECTOR_INDEX_SCHEMA_VERSION: u32 = 1;

/// Header stored alongside the rows of a saved vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorIndexManifest {
    pub schema_version: u32,
    pub dimension: usize,
    pub count: usize,
    /// Identifier of the encoder that produced the vectors (empty if unknown)
    pub model_id: String,
}

/// Immutable identifier-mapped flat index.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<f32>,
    ids: Vec<RecipeId>,
    rows_by_id: HashMap<RecipeId, usize>,
    model_id: String,
}

impl VectorIndex {
    /// Builds an index from a row-major matrix and its identifier list.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Integrity`] if `dimension` is zero, the matrix ends in a
    ///   partial row, or a row has a non-finite component
    /// - [`IndexError::IdCountMismatch`] if row and identifier counts differ
    /// - [`IndexError::DuplicateId`] if an identifier appears twice
    ///
    /// # Examples
    ///
    /// ```
    /// use saffron_core::search::{RecipeId, VectorIndex};
    ///
    /// let ids = vec![RecipeId::from_u64(10), RecipeId::from_u64(20)];
    /// let index = VectorIndex::build(vec![1.0, 0.0, 0.0, 1.0], 2, ids).unwrap();
    ///
    /// let hits = index.search(&[0.0, 1.0], 1).unwrap();
    /// assert_eq!(hits[0].0, RecipeId::from_u64(20));
    /// ```
    #[instrument(skip_all, fields(dimension = dimension, rows = ids.len()))]
    pub fn build(
        vectors: Vec<f32>,
        dimension: usize,
        ids: Vec<RecipeId>,
    ) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::Integrity {
                row: 0,
                reason: "vector dimension must be > 0".to_string(),
            });
        }
        if vectors.len() % dimension != 0 {
            return Err(IndexError::Integrity {
                row: vectors.len() / dimension,
                reason: format!(
                    "matrix of {} values is not a whole number of {}-dimensional rows",
                    vectors.len(),
                    dimension
                ),
            });
        }

        let rows = vectors.len() / dimension;
        if rows != ids.len() {
            return Err(IndexError::IdCountMismatch {
                vectors: rows,
                ids: ids.len(),
            });
        }

        let mut rows_by_id = HashMap::with_capacity(rows);
        for (row, (id, vector)) in ids.iter().zip(vectors.chunks_exact(dimension)).enumerate() {
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(IndexError::Integrity {
                    row,
                    reason: "vector has a non-finite component".to_string(),
                });
            }
            if rows_by_id.insert(*id, row).is_some() {
                return Err(IndexError::DuplicateId { row, id: *id });
            }
        }

        info!("Built vector index: {} rows x {} dims", rows, dimension);

        Ok(Self {
            dimension,
            vectors,
            ids,
            rows_by_id,
            model_id: String::new(),
        })
    }

    /// Builds an index from a loaded embedding store.
    pub fn from_store(store: EmbeddingStore) -> Result<Self, IndexError> {
        let (vectors, dimension, ids) = store.into_parts();
        Self::build(vectors, dimension, ids)
    }

    /// Records the encoder that produced the vectors.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Identifiers in row order.
    pub fn ids(&self) -> &[RecipeId] {
        &self.ids
    }

    /// Vector stored for `id`.
    pub fn get(&self, id: RecipeId) -> Option<&[f32]> {
        self.rows_by_id.get(&id).map(|&row| self.row(row))
    }

    /// Manifest describing this index.
    pub fn manifest(&self) -> VectorIndexManifest {
        VectorIndexManifest {
            schema_version: VECTOR_INDEX_SCHEMA_VERSION,
            dimension: self.dimension,
            count: self.len(),
            model_id: self.model_id.clone(),
        }
    }

    fn row(&self, row: usize) -> &[f32] {
        &self.vectors[row * self.dimension..(row + 1) * self.dimension]
    }

    /// Exact top-k by inner product, best first.
    ///
    /// Ties resolve to the lower row. Returns at most `min(k, len)` hits, so
    /// there are never unfilled slots to filter out.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(RecipeId, f32)>, SearchError> {
        if query.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(SearchError::EmbeddingError(
                "query vector has a non-finite component".to_string(),
            ));
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        for (row, vector) in self.vectors.chunks_exact(self.dimension).enumerate() {
            let candidate = Candidate {
                score: dot(query, vector),
                row,
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| (self.ids[c.row], c.score))
            .collect())
    }

    /// Writes the index to a single redb file, replacing any existing file.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), rows = self.len()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            std::fs::remove_file(path)?;
        }

        let manifest = serde_json::to_vec(&self.manifest())?;
        let db = Database::create(path).map_err(storage("Failed to create index file"))?;
        let write_txn = db
            .begin_write()
            .map_err(storage("Failed to begin write transaction"))?;
        {
            let mut table = write_txn
                .open_table(MANIFEST_TABLE)
                .map_err(storage("Failed to open manifest table"))?;
            table
                .insert(MANIFEST_KEY, manifest.as_slice())
                .map_err(storage("Failed to write manifest"))?;

            let mut rows = write_txn
                .open_table(ROWS_TABLE)
                .map_err(storage("Failed to open rows table"))?;
            let mut buf = Vec::with_capacity(8 + self.dimension * 4);
            for (row, id) in self.ids.iter().enumerate() {
                buf.clear();
                buf.extend_from_slice(&id.as_u64().to_le_bytes());
                for value in self.row(row) {
                    buf.extend_from_slice(&value.to_le_bytes());
                }
                rows.insert(row as u64, buf.as_slice())
                    .map_err(storage("Failed to write row"))?;
            }
        }
        write_txn
            .commit()
            .map_err(storage("Failed to commit vector index"))?;

        info!("Saved vector index: {} rows", self.len());
        Ok(())
    }

    /// Loads and validates an index written by [`save`](Self::save).
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IndexError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("vector index not found: {}", path.display()),
            )));
        }

        let db = Database::open(path).map_err(storage("Failed to open index file"))?;
        let read_txn = db
            .begin_read()
            .map_err(storage("Failed to begin read transaction"))?;

        let manifest: VectorIndexManifest = {
            let table = read_txn
                .open_table(MANIFEST_TABLE)
                .map_err(storage("Failed to open manifest table"))?;
            let guard = table
                .get(MANIFEST_KEY)
                .map_err(storage("Failed to read manifest"))?
                .ok_or_else(|| IndexError::Storage("vector index has no manifest".to_string()))?;
            serde_json::from_slice(guard.value())?
        };

        if manifest.schema_version != VECTOR_INDEX_SCHEMA_VERSION {
            return Err(IndexError::IncompatibleSchema {
                found: manifest.schema_version,
                supported: VECTOR_INDEX_SCHEMA_VERSION,
            });
        }

        let dimension = manifest.dimension;
        let row_bytes = dimension
            .checked_mul(4)
            .and_then(|bytes| bytes.checked_add(8))
            .ok_or_else(|| IndexError::Integrity {
                row: 0,
                reason: format!("manifest dimension {} is out of range", dimension),
            })?;

        let table = read_txn
            .open_table(ROWS_TABLE)
            .map_err(storage("Failed to open rows table"))?;
        let stored = table.len().map_err(storage("Failed to count rows"))? as usize;
        let mut ids = Vec::with_capacity(stored);
        let mut vectors = Vec::new();
        let iter = table.iter().map_err(storage("Failed to iterate rows"))?;
        for (expected, entry) in iter.enumerate() {
            let (key, value) = entry.map_err(storage("Failed to read row"))?;
            let row = key.value();
            if row != expected as u64 {
                return Err(IndexError::Integrity {
                    row: expected,
                    reason: format!("row missing (next stored row is {})", row),
                });
            }

            let bytes = value.value();
            if bytes.len() != row_bytes {
                return Err(IndexError::Integrity {
                    row: expected,
                    reason: format!("row holds {} bytes, expected {}", bytes.len(), row_bytes),
                });
            }

            let (id_bytes, vector_bytes) = bytes.split_at(8);
            let mut id = [0u8; 8];
            id.copy_from_slice(id_bytes);
            ids.push(RecipeId::from_u64(u64::from_le_bytes(id)));
            vectors.extend(
                vector_bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            );
        }

        if ids.len() != manifest.count {
            return Err(IndexError::Integrity {
                row: ids.len(),
                reason: format!(
                    "manifest declares {} rows but the index holds {}",
                    manifest.count,
                    ids.len()
                ),
            });
        }

        let index = Self::build(vectors, dimension, ids)?.with_model_id(manifest.model_id);
        info!("Loaded vector index: {} rows", index.len());
        Ok(index)
    }
}

fn storage<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> IndexError {
    move |e| IndexError::Storage(format!("{}: {}", context, e))
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Heap entry ordered so that the worst candidate is the maximum.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    row: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lower score is worse; on equal scores the later row is worse.
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.row.cmp(&other.row))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}
