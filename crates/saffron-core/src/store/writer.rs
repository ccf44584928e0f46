//! Append-only writer for the pre-sized embedding store.

use super::EmbeddingStorePaths;
use crate::error::IndexError;
use crate::search::types::RecipeId;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use tracing::debug;

/// Owns the write cursor of an embedding store.
///
/// The vector file is pre-sized to `capacity` rows at creation. Each
/// [`append`](Self::append) writes its rows at the cursor and syncs them before
/// the matching identifiers are appended and synced, so the identifier log is
/// never ahead of the vector file. A crash leaves every previously appended row
/// intact; [`EmbeddingStore::open`](super::EmbeddingStore::open) detects the
/// unfinished tail.
pub struct EmbeddingWriter {
    paths: EmbeddingStorePaths,
    vectors: File,
    ids: File,
    dimension: usize,
    capacity: usize,
    offset: usize,
}

impl EmbeddingWriter {
    /// Creates (or truncates) both store files and pre-sizes the vector file.
    pub fn create(
        paths: EmbeddingStorePaths,
        dimension: usize,
        capacity: usize,
    ) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::Integrity {
                row: 0,
                reason: "embedding dimension must be > 0".to_string(),
            });
        }

        let byte_len = capacity
            .checked_mul(dimension)
            .and_then(|values| values.checked_mul(4))
            .ok_or(IndexError::CapacityExceeded {
                offset: 0,
                requested: capacity,
                capacity: usize::MAX / dimension / 4,
            })?;

        for path in [&paths.vectors, &paths.ids] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let vectors = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&paths.vectors)?;
        vectors.set_len(byte_len as u64)?;

        let ids = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&paths.ids)?;

        debug!(
            "Created embedding store at {} ({} rows x {} dims)",
            paths.vectors.display(),
            capacity,
            dimension
        );

        Ok(Self {
            paths,
            vectors,
            ids,
            dimension,
            capacity,
            offset: 0,
        })
    }

    /// Number of rows written so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Pre-allocated row capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Paths this writer writes to.
    pub fn paths(&self) -> &EmbeddingStorePaths {
        &self.paths
    }

    /// Writes `rows` at the cursor, then their identifiers, and returns the
    /// new offset.
    ///
    /// Nothing is written if any check fails.
    pub fn append(&mut self, ids: &[RecipeId], rows: &[Vec<f32>]) -> Result<usize, IndexError> {
        if ids.len() != rows.len() {
            return Err(IndexError::IdCountMismatch {
                vectors: self.offset + rows.len(),
                ids: self.offset + ids.len(),
            });
        }
        if self.offset + rows.len() > self.capacity {
            return Err(IndexError::CapacityExceeded {
                offset: self.offset,
                requested: rows.len(),
                capacity: self.capacity,
            });
        }
        if rows.is_empty() {
            return Ok(self.offset);
        }

        let mut bytes = Vec::with_capacity(rows.len() * self.dimension * 4);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != self.dimension {
                return Err(IndexError::DimensionMismatch {
                    row: self.offset + i,
                    expected: self.dimension,
                    actual: row.len(),
                });
            }
            for value in row {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }

        let mut lines = String::with_capacity(ids.len() * 8);
        for id in ids {
            lines.push_str(&id.to_string());
            lines.push('\n');
        }

        self.vectors
            .seek(SeekFrom::Start((self.offset * self.dimension * 4) as u64))?;
        self.vectors.write_all(&bytes)?;
        self.vectors.sync_data()?;

        self.ids.write_all(lines.as_bytes())?;
        self.ids.sync_data()?;

        self.offset += rows.len();
        Ok(self.offset)
    }

    /// Trims the unused pre-allocated tail and returns the final row count.
    pub fn finish(self) -> Result<usize, IndexError> {
        self.vectors
            .set_len((self.offset * self.dimension * 4) as u64)?;
        self.vectors.sync_all()?;
        self.ids.sync_all()?;
        Ok(self.offset)
    }
}
