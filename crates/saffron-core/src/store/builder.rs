//! Chunked embedding of a normalized corpus into an [`EmbeddingWriter`].

use super::progress::{BuildProgress, ProgressTimer};
use super::writer::EmbeddingWriter;
use crate::config::EmbeddingBuildConfig;
use crate::embedding::{l2_normalize, Embedder};
use crate::error::{EmbeddingError, IndexError, RecordError};
use crate::recipe::RecipeRecord;
use crate::search::types::RecipeId;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Outcome of a completed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    /// Rows in the finished store
    pub rows_written: usize,
    /// Malformed records and zero-norm embeddings that were skipped
    pub records_skipped: usize,
    /// Durable chunks written
    pub chunks: usize,
    /// Wall-clock duration (milliseconds)
    pub elapsed_ms: u64,
}

/// Streams records through an encoder into the embedding store.
///
/// Records are grouped into chunks of `chunk_size`. Each chunk is encoded in
/// batches of `batch_size`, normalized to unit length and appended to the
/// writer, which syncs it to disk before the next chunk is read. Peak memory is
/// bounded by one chunk regardless of corpus size.
///
/// # Example
///
/// ```
/// use saffron_core::config::EmbeddingBuildConfig;
/// use saffron_core::embedding::HashEmbedder;
/// use saffron_core::recipe::RecipeRecord;
/// use saffron_core::search::RecipeId;
/// use saffron_core::store::{EmbeddingStorePaths, EmbeddingStoreBuilder, EmbeddingWriter};
///
/// let dir = tempfile::tempdir().unwrap();
/// let embedder = HashEmbedder::new(16).unwrap();
/// let writer = EmbeddingWriter::create(EmbeddingStorePaths::in_dir(dir.path()), 16, 10).unwrap();
/// let records = vec![Ok(RecipeRecord {
///     id: RecipeId::from_u64(42),
///     name: "banana bread".to_string(),
///     description: String::new(),
///     tags: vec![],
///     ingredients: vec!["banana".to_string()],
/// })];
///
/// let summary = EmbeddingStoreBuilder::new(&embedder, EmbeddingBuildConfig::default())
///     .build(records, writer, |_| {})
///     .unwrap();
/// assert_eq!(summary.rows_written, 1);
/// ```
pub struct EmbeddingStoreBuilder<'a> {
    embedder: &'a dyn Embedder,
    config: EmbeddingBuildConfig,
}

impl<'a> EmbeddingStoreBuilder<'a> {
    pub fn new(embedder: &'a dyn Embedder, config: EmbeddingBuildConfig) -> Self {
        Self {
            embedder,
            config: config
                .with_chunk_size(config.chunk_size)
                .with_batch_size(config.batch_size),
        }
    }

    /// Encodes every record and finishes the store.
    ///
    /// Malformed records are logged and skipped. I/O failures, encoder
    /// failures, wrong-dimension vectors and capacity overflow abort the build;
    /// rows from chunks that completed before the failure remain on disk.
    #[instrument(skip_all, fields(model = self.embedder.model_id(), chunk_size = self.config.chunk_size))]
    pub fn build<I, F>(
        &self,
        records: I,
        mut writer: EmbeddingWriter,
        mut on_progress: F,
    ) -> Result<BuildSummary, IndexError>
    where
        I: IntoIterator<Item = Result<RecipeRecord, RecordError>>,
        F: FnMut(&BuildProgress),
    {
        if self.embedder.embedding_dim() != writer.dimension() {
            return Err(IndexError::DimensionMismatch {
                row: writer.offset(),
                expected: writer.dimension(),
                actual: self.embedder.embedding_dim(),
            });
        }

        let timer = ProgressTimer::new();
        let mut chunk: Vec<RecipeRecord> = Vec::with_capacity(self.config.chunk_size);
        let mut skipped = 0usize;
        let mut chunks = 0usize;

        let mut report = |writer: &EmbeddingWriter, chunks: usize, skipped: usize| {
            let progress = BuildProgress {
                chunks_completed: chunks,
                rows_written: writer.offset(),
                records_skipped: skipped,
                capacity: writer.capacity(),
                elapsed_ms: timer.elapsed_ms(),
            };
            info!(
                "Chunk {} done: {} rows written ({:.1}%), {} skipped",
                chunks,
                progress.rows_written,
                progress.percent_complete(),
                skipped
            );
            on_progress(&progress);
        };

        for item in records {
            match item {
                Ok(record) => chunk.push(record.normalized()),
                Err(e) if e.is_skippable() => {
                    warn!("Skipping malformed record: {}", e);
                    skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }

            if chunk.len() >= self.config.chunk_size {
                skipped += self.write_chunk(&chunk, &mut writer)?;
                chunk.clear();
                chunks += 1;
                report(&writer, chunks, skipped);
            }
        }

        if !chunk.is_empty() {
            skipped += self.write_chunk(&chunk, &mut writer)?;
            chunks += 1;
            report(&writer, chunks, skipped);
        }

        let rows_written = writer.finish()?;
        let summary = BuildSummary {
            rows_written,
            records_skipped: skipped,
            chunks,
            elapsed_ms: timer.elapsed_ms(),
        };

        info!(
            "Embedding store complete: {} rows, {} skipped, {} chunks in {}ms",
            summary.rows_written, summary.records_skipped, summary.chunks, summary.elapsed_ms
        );

        Ok(summary)
    }

    /// Encodes and appends one chunk. Returns the number of records skipped.
    fn write_chunk(
        &self,
        chunk: &[RecipeRecord],
        writer: &mut EmbeddingWriter,
    ) -> Result<usize, IndexError> {
        let dimension = writer.dimension();
        let mut ids: Vec<RecipeId> = Vec::with_capacity(chunk.len());
        let mut rows: Vec<Vec<f32>> = Vec::with_capacity(chunk.len());
        let mut skipped = 0;

        for batch in chunk.chunks(self.config.batch_size) {
            let texts: Vec<String> = batch.iter().map(RecipeRecord::embedding_text).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::BatchSizeMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                }
                .into());
            }

            for (record, mut vector) in batch.iter().zip(vectors) {
                if vector.len() != dimension {
                    return Err(IndexError::DimensionMismatch {
                        row: writer.offset() + rows.len(),
                        expected: dimension,
                        actual: vector.len(),
                    });
                }

                let norm = l2_normalize(&mut vector);
                if !(norm > f32::EPSILON && norm.is_finite()) {
                    warn!("Skipping recipe {}: embedding has zero or non-finite norm", record.id);
                    skipped += 1;
                    continue;
                }

                ids.push(record.id);
                rows.push(vector);
            }
        }

        writer.append(&ids, &rows)?;
        Ok(skipped)
    }
}
