//! Subcommand implementations.
//!
//! Each command reads its inputs from explicit paths (defaulting to the data
//! directory layout in [`DataPaths`]) and writes one artifact. The commands
//! form a pipeline:
//!
//! ```text
//! corpus.jsonl ──embed──> store/ ──build-vector──> vectors.redb ─┐
//!      │                                                        ├─search / evaluate
//!      └──────────build-lexical (+ metadata.jsonl)──> lexical/ ─┘
//! ```

use crate::config::{require_exists, DataPaths};
use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use saffron_core::config::{Bm25Params, EmbeddingBuildConfig};
use saffron_core::embedding::Embedder;
use saffron_core::evaluation::{
    build_judgments, builtin_query_specs, evaluate, load_query_specs, save_query_specs,
    EvaluationReport,
};
use saffron_core::metadata::DisplayMetadata;
use saffron_core::recipe::{read_corpus, RecipeRecord};
use saffron_core::search::{
    LexicalIndex, LexicalSearchService, RecipeSearcher, SearchHit, VectorIndex,
    VectorSearchService,
};
use saffron_core::store::{BuildSummary, EmbeddingStore, EmbeddingStoreBuilder, EmbeddingWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Which search path to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchMode {
    /// Semantic search over the vector index
    Vector,
    /// BM25 keyword search over the lexical index
    Lexical,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Vector => "vector",
            SearchMode::Lexical => "lexical",
        }
    }
}

/// Embeds the corpus into the on-disk embedding store.
pub fn embed(
    paths: &DataPaths,
    corpus: Option<&Path>,
    embedder: &dyn Embedder,
    capacity: usize,
    config: EmbeddingBuildConfig,
) -> Result<BuildSummary> {
    let corpus = corpus.map(Path::to_path_buf).unwrap_or_else(|| paths.corpus());
    require_exists(&corpus, "embed --corpus <FILE>")?;

    let store_paths = paths.store();
    info!(
        "Embedding {} with {} into {}",
        corpus.display(),
        embedder.model_id(),
        store_paths.vectors.display()
    );

    let records = read_corpus(&corpus)
        .with_context(|| format!("Failed to open corpus: {}", corpus.display()))?;
    let writer = EmbeddingWriter::create(store_paths, embedder.embedding_dim(), capacity)
        .context("Failed to create embedding store")?;

    EmbeddingStoreBuilder::new(embedder, config)
        .build(records, writer, |progress| {
            eprintln!(
                "  chunk {}: {} rows ({:.1}% of capacity)",
                progress.chunks_completed,
                progress.rows_written,
                progress.percent_complete()
            );
        })
        .context("Embedding run failed")
}

/// Builds and saves the vector index from the embedding store.
pub fn build_vector(paths: &DataPaths, embedder: &dyn Embedder) -> Result<VectorIndex> {
    let store_paths = paths.store();
    require_exists(&store_paths.vectors, "embed")?;

    let store = EmbeddingStore::open(&store_paths, embedder.embedding_dim())
        .context("Failed to load embedding store")?;
    let index = VectorIndex::from_store(store)?.with_model_id(embedder.model_id());

    let out = paths.vector_index();
    index
        .save(&out)
        .with_context(|| format!("Failed to save vector index: {}", out.display()))?;
    info!("Saved vector index ({} rows) to {}", index.len(), out.display());
    Ok(index)
}

/// Builds and saves the lexical index from the corpus and display metadata.
pub fn build_lexical(
    paths: &DataPaths,
    corpus: Option<&Path>,
    metadata: Option<&Path>,
    params: Bm25Params,
) -> Result<LexicalIndex> {
    let corpus = corpus.map(Path::to_path_buf).unwrap_or_else(|| paths.corpus());
    let metadata = metadata.map(Path::to_path_buf).unwrap_or_else(|| paths.metadata());
    require_exists(&corpus, "build-lexical --corpus <FILE>")?;
    require_exists(&metadata, "build-lexical --metadata <FILE>")?;

    let display = DisplayMetadata::load(&metadata)
        .with_context(|| format!("Failed to load metadata: {}", metadata.display()))?;
    let records = read_corpus(&corpus)
        .with_context(|| format!("Failed to open corpus: {}", corpus.display()))?;
    let (index, summary) = LexicalIndex::build(records, &display, params)?;

    let out = paths.lexical_index();
    index
        .save(&out)
        .with_context(|| format!("Failed to save lexical index: {}", out.display()))?;
    info!(
        "Saved lexical index ({} documents, {} without display fields) to {}",
        summary.documents,
        summary.missing_display,
        out.display()
    );
    Ok(index)
}

/// Opens the service for `mode` from the data directory.
pub fn open_searcher(
    paths: &DataPaths,
    mode: SearchMode,
    metadata: Option<&Path>,
    embedder: impl FnOnce() -> Result<Arc<dyn Embedder>>,
) -> Result<Box<dyn RecipeSearcher>> {
    match mode {
        SearchMode::Vector => {
            let index = paths.vector_index();
            let metadata = metadata.map(Path::to_path_buf).unwrap_or_else(|| paths.metadata());
            require_exists(&index, "build-vector")?;
            let service = VectorSearchService::open(&index, &metadata, embedder()?)
                .context("Failed to open vector search")?;
            Ok(Box::new(service))
        }
        SearchMode::Lexical => {
            let dir = paths.lexical_index();
            require_exists(&dir, "build-lexical")?;
            let service =
                LexicalSearchService::open(&dir).context("Failed to open lexical search")?;
            Ok(Box::new(service))
        }
    }
}

/// Runs one query.
pub fn search(searcher: &dyn RecipeSearcher, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
    info!("Searching for: \"{}\"", query);
    searcher
        .search(query, limit)
        .map_err(|e| anyhow!("Search failed: {}", e))
}

/// Fills the relevance judgments of query specs from the corpus.
///
/// Without a spec file the built-in benchmark queries are judged.
pub fn judge(
    paths: &DataPaths,
    corpus: Option<&Path>,
    specs: Option<&Path>,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let corpus = corpus.map(Path::to_path_buf).unwrap_or_else(|| paths.corpus());
    require_exists(&corpus, "judge --corpus <FILE>")?;

    let specs = match specs {
        Some(path) => load_query_specs(path)
            .with_context(|| format!("Failed to read query specs: {}", path.display()))?,
        None => builtin_query_specs().context("Built-in query specs are invalid")?,
    };
    let records: Vec<RecipeRecord> = read_corpus(&corpus)?
        .filter_map(|item| match item {
            Ok(record) => Some(Ok(record)),
            Err(e) if e.is_skippable() => {
                warn!("Skipping malformed record: {}", e);
                None
            }
            Err(e) => Some(Err(e)),
        })
        .collect::<Result<_, _>>()
        .with_context(|| format!("Failed to read corpus: {}", corpus.display()))?;

    let judged = build_judgments(specs, &records);
    for spec in &judged {
        eprintln!(
            "  {} {:?} => {} matches",
            spec.qid,
            spec.kind,
            spec.relevant_ids.len()
        );
    }

    let out = output.map(Path::to_path_buf).unwrap_or_else(|| paths.queries());
    save_query_specs(&out, &judged)
        .with_context(|| format!("Failed to write judgments: {}", out.display()))?;
    Ok(out)
}

/// Scores a searcher against judged queries.
pub fn run_evaluation(
    searcher: &dyn RecipeSearcher,
    queries: &Path,
    k: usize,
) -> Result<EvaluationReport> {
    require_exists(queries, "judge")?;
    let specs = load_query_specs(queries)
        .with_context(|| format!("Failed to read queries: {}", queries.display()))?;
    evaluate(searcher, &specs, k).map_err(|e| anyhow!("Evaluation failed: {}", e))
}
