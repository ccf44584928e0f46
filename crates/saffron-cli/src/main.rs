//! Saffron CLI - build and query recipe search indexes.
//!
//! # Usage
//!
//! ```bash
//! # Build artifacts from a normalized corpus
//! saffron embed --corpus recipes.jsonl
//! saffron build-vector
//! saffron build-lexical --corpus recipes.jsonl --metadata metadata.jsonl
//!
//! # Search
//! saffron search "chocolate chip cookies"
//! saffron search "cozy vegetarian dinner" --mode vector -n 10 --json
//!
//! # Evaluate
//! saffron judge
//! saffron evaluate --mode lexical -k 10
//! ```

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::SearchMode;
use config::{build_embedder, DataPaths, EncoderKind};
use saffron_core::config::{
    Bm25Params, EmbeddingBuildConfig, BM25_B, BM25_K1, DEFAULT_CHUNK_SIZE,
    DEFAULT_ENCODE_BATCH_SIZE, DEFAULT_TOP_K, EXPECTED_CORPUS_SIZE,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Saffron recipe search CLI.
///
/// Builds a semantic (vector) index and a keyword (BM25) index over a
/// normalized recipe corpus and queries either one.
#[derive(Parser)]
#[command(name = "saffron", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Data directory holding every artifact (default: platform standard location)
    #[arg(long, global = true, env = "SAFFRON_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Text encoder for embedding and vector queries
    #[arg(long, global = true, value_enum, default_value = "hash")]
    encoder: EncoderKind,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Embed the corpus into the on-disk embedding store
    Embed {
        /// Normalized corpus (default: <data-dir>/corpus.jsonl)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Pre-allocated row capacity; must be at least the corpus size
        #[arg(long, default_value_t = EXPECTED_CORPUS_SIZE)]
        capacity: usize,

        /// Records per durable chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Texts per encoder call
        #[arg(long, default_value_t = DEFAULT_ENCODE_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Build the vector index from the embedding store
    BuildVector,

    /// Build the BM25 lexical index from the corpus
    BuildLexical {
        /// Normalized corpus (default: <data-dir>/corpus.jsonl)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Display metadata (default: <data-dir>/metadata.jsonl)
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// BM25 term-frequency saturation
        #[arg(long, default_value_t = BM25_K1)]
        k1: f32,

        /// BM25 length normalization
        #[arg(long, default_value_t = BM25_B)]
        b: f32,
    },

    /// Search one of the indexes
    Search {
        /// Search query
        query: String,

        #[command(flatten)]
        target: SearchTarget,

        /// Maximum number of results to return
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_K)]
        limit: usize,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fill relevance judgments of query specs from the corpus
    Judge {
        /// Query specs as a JSON array (default: the built-in benchmark queries)
        #[arg(long)]
        specs: Option<PathBuf>,

        /// Normalized corpus (default: <data-dir>/corpus.jsonl)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Output file (default: <data-dir>/eval/queries.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Score a search path against judged queries
    Evaluate {
        #[command(flatten)]
        target: SearchTarget,

        /// Judged queries (default: <data-dir>/eval/queries.json)
        #[arg(long)]
        queries: Option<PathBuf>,

        /// Cutoff for every metric
        #[arg(short = 'k', long, default_value_t = 10)]
        k: usize,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SearchTarget {
    /// Which index to query
    #[arg(long, value_enum, default_value = "lexical")]
    mode: SearchMode,

    /// Display metadata for vector hits (default: <data-dir>/metadata.jsonl)
    #[arg(long)]
    metadata: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let paths = DataPaths::resolve(cli.data_dir.as_deref())?;
    let encoder = cli.encoder;

    match cli.command {
        Command::Embed {
            corpus,
            capacity,
            chunk_size,
            batch_size,
        } => {
            let embedder = build_embedder(encoder)?;
            let config = EmbeddingBuildConfig::default()
                .with_chunk_size(chunk_size)
                .with_batch_size(batch_size);
            let summary =
                commands::embed(&paths, corpus.as_deref(), embedder.as_ref(), capacity, config)?;
            println!(
                "Embedded {} recipes in {} chunks ({} skipped, {:.1}s)",
                summary.rows_written,
                summary.chunks,
                summary.records_skipped,
                summary.elapsed_ms as f64 / 1000.0
            );
        }
        Command::BuildVector => {
            let embedder = build_embedder(encoder)?;
            let index = commands::build_vector(&paths, embedder.as_ref())?;
            println!(
                "Vector index: {} rows x {} dims -> {}",
                index.len(),
                index.dimension(),
                paths.vector_index().display()
            );
        }
        Command::BuildLexical {
            corpus,
            metadata,
            k1,
            b,
        } => {
            let index = commands::build_lexical(
                &paths,
                corpus.as_deref(),
                metadata.as_deref(),
                Bm25Params { k1, b },
            )?;
            println!(
                "Lexical index: {} documents -> {}",
                index.len(),
                paths.lexical_index().display()
            );
        }
        Command::Search {
            query,
            target,
            limit,
            json,
        } => {
            let searcher = commands::open_searcher(
                &paths,
                target.mode,
                target.metadata.as_deref(),
                || build_embedder(encoder),
            )?;
            let hits = commands::search(searcher.as_ref(), &query, limit)?;

            let output = if json {
                output::format_json(&query, target.mode.as_str(), &hits)
            } else {
                output::format_human(&query, target.mode.as_str(), &hits)
            };
            println!("{}", output);
        }
        Command::Judge {
            specs,
            corpus,
            output,
        } => {
            let out = commands::judge(
                &paths,
                corpus.as_deref(),
                specs.as_deref(),
                output.as_deref(),
            )?;
            println!("Judgments written to {}", out.display());
        }
        Command::Evaluate {
            target,
            queries,
            k,
            json,
        } => {
            let searcher = commands::open_searcher(
                &paths,
                target.mode,
                target.metadata.as_deref(),
                || build_embedder(encoder),
            )?;
            let queries = queries.unwrap_or_else(|| paths.queries());
            let report = commands::run_evaluation(searcher.as_ref(), &queries, k)?;

            let output = if json {
                output::format_report_json(&report)
            } else {
                output::format_report_human(target.mode.as_str(), &report)
            };
            println!("{}", output);
        }
    }

    Ok(())
}
