//! BM25 lexical index over weighted recipe blobs.
//!
//! This module wraps the [`bm25`](https://crates.io/crates/bm25) crate. Each
//! recipe becomes one document whose contents are
//! [`RecipeRecord::lexical_text`] (name repeated for emphasis, then
//! description, tags and ingredients) and which carries its serialized
//! [`DisplayRecord`](crate::recipe::DisplayRecord) as an opaque payload.
//!
//! # Scoring
//!
//! - **k1** saturates term frequency: past a few occurrences, more repeats add little
//! - **b** controls how strongly long blobs are penalized
//!
//! Every document sharing a token with the query is scored. Results are sorted
//! by score descending with ties broken by insertion position, so rankings are
//! reproducible across rebuilds.
//!
//! # Persistence
//!
//! [`LexicalIndex::save`] writes a directory:
//!
//! - `manifest.json`: schema version, document count, `k1`, `b`
//! - `documents.redb`: position (u64) -> JSON `{id, contents, payload}`
//!
//! The BM25 postings are not stored. [`LexicalIndex::load`] rebuilds them from
//! the stored blobs in insertion order, which yields the same scores.

use super::types::RecipeId;
use crate::config::Bm25Params;
use crate::error::{IndexError, RecordError};
use crate::metadata::DisplayMetadata;
use crate::recipe::RecipeRecord;
use bm25::{Document, Language, SearchEngine, SearchEngineBuilder};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{info, instrument, warn};

const DOCUMENTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("documents");

/// File name of the manifest inside a lexical index directory.
pub const MANIFEST_FILE: &str = "manifest.json";
/// File name of the document table inside a lexical index directory.
pub const DOCUMENTS_FILE: &str = "documents.redb";

/// On-disk format version written by this build.
pub const LEXICAL_INDEX_SCHEMA_VERSION: u32 = 1;

/// Header of a saved lexical index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalIndexManifest {
    pub schema_version: u32,
    pub document_count: usize,
    pub k1: f32,
    pub b: f32,
}

/// Counters reported by [`LexicalIndex::build`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LexicalBuildSummary {
    /// Documents indexed
    pub documents: usize,
    /// Malformed records skipped
    pub records_skipped: usize,
    /// Documents indexed with an empty payload (no display entry)
    pub missing_display: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredDocument {
    id: RecipeId,
    contents: String,
    payload: String,
}

/// One scored document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalMatch<'a> {
    pub id: RecipeId,
    pub score: f32,
    /// Serialized display record; empty if none was available at build time
    pub payload: &'a str,
}

/// Immutable BM25 index.
pub struct LexicalIndex {
    engine: SearchEngine<u64>,
    documents: Vec<StoredDocument>,
    params: Bm25Params,
}

impl fmt::Debug for LexicalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexicalIndex")
            .field("documents", &self.documents.len())
            .field("params", &self.params)
            .finish()
    }
}

impl LexicalIndex {
    /// Builds the index from records, normalizing each one first.
    ///
    /// Each record's payload is the JSON of its entry in `display`; records
    /// without one get an empty payload. Malformed records are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// - [`IndexError::DuplicateId`] if an identifier appears twice
    /// - [`IndexError::Io`] if reading the records fails
    #[instrument(skip_all, fields(k1 = params.k1, b = params.b))]
    pub fn build<I>(
        records: I,
        display: &DisplayMetadata,
        params: Bm25Params,
    ) -> Result<(Self, LexicalBuildSummary), IndexError>
    where
        I: IntoIterator<Item = Result<RecipeRecord, RecordError>>,
    {
        let mut documents = Vec::new();
        let mut seen = HashSet::new();
        let mut summary = LexicalBuildSummary::default();

        for item in records {
            let record = match item {
                Ok(record) => record.normalized(),
                Err(e) if e.is_skippable() => {
                    warn!("Skipping malformed record: {}", e);
                    summary.records_skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if !seen.insert(record.id) {
                return Err(IndexError::DuplicateId {
                    row: documents.len(),
                    id: record.id,
                });
            }

            let payload = match display.get(record.id) {
                Some(entry) => serde_json::to_string(entry)?,
                None => {
                    summary.missing_display += 1;
                    String::new()
                }
            };

            documents.push(StoredDocument {
                id: record.id,
                contents: record.lexical_text(),
                payload,
            });
        }

        summary.documents = documents.len();
        let index = Self::from_documents(documents, params);

        info!(
            "Built lexical index: {} documents, {} skipped, {} without display payload",
            summary.documents, summary.records_skipped, summary.missing_display
        );

        Ok((index, summary))
    }

    fn from_documents(documents: Vec<StoredDocument>, params: Bm25Params) -> Self {
        let corpus: Vec<Document<u64>> = documents
            .iter()
            .enumerate()
            .map(|(position, doc)| Document {
                id: position as u64,
                contents: doc.contents.clone(),
            })
            .collect();

        let engine = SearchEngineBuilder::<u64>::with_documents(Language::English, corpus)
            .k1(params.k1)
            .b(params.b)
            .build();

        Self {
            engine,
            documents,
            params,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Scores `query` (already normalized) and returns the top `k` matches.
    pub fn search(&self, query: &str, k: usize) -> Vec<LexicalMatch<'_>> {
        if k == 0 || query.trim().is_empty() || self.documents.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .engine
            .search(query, self.documents.len())
            .into_iter()
            .map(|result| (result.document.id as usize, result.score))
            .filter(|(position, _)| *position < self.documents.len())
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(position, score)| {
                let doc = &self.documents[position];
                LexicalMatch {
                    id: doc.id,
                    score,
                    payload: &doc.payload,
                }
            })
            .collect()
    }

    /// Manifest describing this index.
    pub fn manifest(&self) -> LexicalIndexManifest {
        LexicalIndexManifest {
            schema_version: LEXICAL_INDEX_SCHEMA_VERSION,
            document_count: self.len(),
            k1: self.params.k1,
            b: self.params.b,
        }
    }

    /// Writes the index to `dir`, replacing a previous index there.
    ///
    /// The manifest is written last, so a directory whose manifest is missing
    /// never loads.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display(), documents = self.len()))]
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), IndexError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let documents_path = dir.join(DOCUMENTS_FILE);
        for path in [&manifest_path, &documents_path] {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }

        let db = Database::create(&documents_path).map_err(storage("Failed to create document table"))?;
        let write_txn = db
            .begin_write()
            .map_err(storage("Failed to begin write transaction"))?;
        {
            let mut table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(storage("Failed to open documents table"))?;
            for (position, doc) in self.documents.iter().enumerate() {
                let bytes = serde_json::to_vec(doc)?;
                table
                    .insert(position as u64, bytes.as_slice())
                    .map_err(storage("Failed to write document"))?;
            }
        }
        write_txn
            .commit()
            .map_err(storage("Failed to commit lexical index"))?;

        std::fs::write(&manifest_path, serde_json::to_vec_pretty(&self.manifest())?)?;

        info!("Saved lexical index: {} documents", self.len());
        Ok(())
    }

    /// Loads an index written by [`save`](Self::save) and rebuilds its postings.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, IndexError> {
        let dir = dir.as_ref();
        let manifest: LexicalIndexManifest =
            serde_json::from_slice(&std::fs::read(dir.join(MANIFEST_FILE))?)?;

        if manifest.schema_version != LEXICAL_INDEX_SCHEMA_VERSION {
            return Err(IndexError::IncompatibleSchema {
                found: manifest.schema_version,
                supported: LEXICAL_INDEX_SCHEMA_VERSION,
            });
        }

        let db = Database::open(dir.join(DOCUMENTS_FILE))
            .map_err(storage("Failed to open document table"))?;
        let read_txn = db
            .begin_read()
            .map_err(storage("Failed to begin read transaction"))?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(storage("Failed to open documents table"))?;

        let stored = table.len().map_err(storage("Failed to count documents"))?;
        let mut documents = Vec::with_capacity(stored as usize);
        let iter = table.iter().map_err(storage("Failed to iterate documents"))?;
        for (expected, entry) in iter.enumerate() {
            let (key, value) = entry.map_err(storage("Failed to read document"))?;
            if key.value() != expected as u64 {
                return Err(IndexError::Integrity {
                    row: expected,
                    reason: format!("document missing (next stored position is {})", key.value()),
                });
            }
            let doc: StoredDocument =
                serde_json::from_slice(value.value()).map_err(|e| IndexError::Integrity {
                    row: expected,
                    reason: format!("undecodable document: {}", e),
                })?;
            documents.push(doc);
        }

        if documents.len() != manifest.document_count {
            return Err(IndexError::Integrity {
                row: documents.len(),
                reason: format!(
                    "manifest declares {} documents but the index holds {}",
                    manifest.document_count,
                    documents.len()
                ),
            });
        }

        let params = Bm25Params {
            k1: manifest.k1,
            b: manifest.b,
        };
        let index = Self::from_documents(documents, params);
        info!("Loaded lexical index: {} documents", index.len());
        Ok(index)
    }
}

fn storage<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> IndexError {
    move |e| IndexError::Storage(format!("{}: {}", context, e))
}
