//! Offline evaluation of the search services.
//!
//! Relevance is binary and rule-based: [`judgments`] derives the relevant set
//! of each query from tag and ingredient rules, and [`metrics`] scores a
//! ranked list against it.
//!
//! # Example
//!
//! ```no_run
//! use saffron_core::evaluation::{evaluate, load_query_specs};
//! use saffron_core::search::LexicalSearchService;
//!
//! let service = LexicalSearchService::open("data/lexical")?;
//! let queries = load_query_specs("data/eval/queries.json")?;
//! let report = evaluate(&service, &queries, 10)?;
//! println!("MRR@10 = {:.3}", report.mean.reciprocal_rank);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Metrics Reference
//!
//! | Metric | Description |
//! |--------|-------------|
//! | P@k | Fraction of the top k that are relevant |
//! | R@k | Fraction of the relevant set found in the top k |
//! | F1@k | Harmonic mean of P@k and R@k |
//! | RR | 1 / rank of the first relevant hit |
//! | AP | Mean precision at each relevant hit |
//! | NDCG@k | Position-discounted gain, normalized by the ideal ranking |

pub mod judgments;
pub mod metrics;

pub use judgments::{
    build_judgments, builtin_query_specs, load_query_specs, save_query_specs, QueryKind, QuerySpec,
};
pub use metrics::{
    average_precision, f1_at_k, ndcg_at_k, precision_at_k, recall_at_k, reciprocal_rank,
    QueryMetrics,
};

use crate::error::SearchError;
use crate::search::service::RecipeSearcher;
use crate::search::types::RecipeId;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Outcome of one evaluated query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryEvaluation {
    pub qid: u64,
    pub query: String,
    pub kind: QueryKind,
    /// Size of the judged-relevant set
    pub relevant: usize,
    /// Identifiers returned by the searcher, best first
    pub retrieved: Vec<RecipeId>,
    pub metrics: QueryMetrics,
}

/// Per-query results plus means.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub k: usize,
    pub queries: Vec<QueryEvaluation>,
    /// Mean over queries with at least one relevant recipe
    pub mean: QueryMetrics,
    /// Mean over keyword queries only
    pub keyword_mean: QueryMetrics,
    /// Mean over semantic queries only
    pub semantic_mean: QueryMetrics,
    /// Queries left out of the means because nothing was judged relevant
    pub skipped: Vec<u64>,
}

/// Runs every query through `searcher` and scores the top `k`.
///
/// Queries without relevant recipes are still run and reported, but they are
/// excluded from the means: recall and NDCG are vacuously perfect on them.
#[instrument(skip_all, fields(queries = queries.len(), k = k))]
pub fn evaluate(
    searcher: &dyn RecipeSearcher,
    queries: &[QuerySpec],
    k: usize,
) -> Result<EvaluationReport, SearchError> {
    let mut evaluated = Vec::with_capacity(queries.len());
    let mut skipped = Vec::new();

    for spec in queries {
        let hits = searcher.search(&spec.query, k)?;
        let retrieved: Vec<RecipeId> = hits.iter().map(|h| h.id).collect();
        let relevant = spec.relevant_set();
        let metrics = QueryMetrics::compute(&retrieved, &relevant, k);

        if relevant.is_empty() {
            warn!("Query {} has no relevant recipes; excluded from means", spec.qid);
            skipped.push(spec.qid);
        }

        evaluated.push(QueryEvaluation {
            qid: spec.qid,
            query: spec.query.clone(),
            kind: spec.kind,
            relevant: relevant.len(),
            retrieved,
            metrics,
        });
    }

    let mean_of = |kind: Option<QueryKind>| {
        QueryMetrics::mean(
            evaluated
                .iter()
                .filter(|q| q.relevant > 0)
                .filter(|q| kind.map_or(true, |kind| q.kind == kind))
                .map(|q| &q.metrics),
        )
    };
    let mean = mean_of(None);
    let keyword_mean = mean_of(Some(QueryKind::Keyword));
    let semantic_mean = mean_of(Some(QueryKind::Semantic));

    info!(
        "Evaluated {} queries at k={}: P={:.3} R={:.3} MRR={:.3} MAP={:.3}",
        evaluated.len(),
        k,
        mean.precision,
        mean.recall,
        mean.reciprocal_rank,
        mean.average_precision
    );

    Ok(EvaluationReport {
        k,
        queries: evaluated,
        mean,
        keyword_mean,
        semantic_mean,
        skipped,
    })
}
