//! Standard Information Retrieval metrics over binary relevance.
//!
//! Every function takes the ranked identifiers a searcher returned (best
//! first) and the set of identifiers judged relevant for the query.
//!
//! # References
//!
//! - Järvelin & Kekäläinen (2002). "Cumulated gain-based evaluation of IR techniques"
//! - Voorhees & Harman (2005). "TREC: Experiment and Evaluation in Information Retrieval"

use crate::search::types::RecipeId;
use serde::Serialize;
use std::collections::HashSet;

/// Metrics for one query at a fixed cutoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QueryMetrics {
    /// Precision@k
    pub precision: f64,
    /// Recall@k
    pub recall: f64,
    /// F1@k
    pub f1: f64,
    /// Reciprocal rank of the first relevant hit within the cutoff
    pub reciprocal_rank: f64,
    /// Average precision within the cutoff
    pub average_precision: f64,
    /// NDCG@k with binary gains
    pub ndcg: f64,
}

impl QueryMetrics {
    /// Computes all metrics for `ranked` truncated to `k`.
    pub fn compute(ranked: &[RecipeId], relevant: &HashSet<RecipeId>, k: usize) -> Self {
        let top = &ranked[..ranked.len().min(k)];
        Self {
            precision: precision_at_k(ranked, relevant, k),
            recall: recall_at_k(ranked, relevant, k),
            f1: f1_at_k(ranked, relevant, k),
            reciprocal_rank: reciprocal_rank(top, relevant),
            average_precision: average_precision(top, relevant),
            ndcg: ndcg_at_k(ranked, relevant, k),
        }
    }

    /// Component-wise mean. Returns the default (all zero) for no input.
    pub fn mean<'a>(metrics: impl IntoIterator<Item = &'a QueryMetrics>) -> Self {
        let mut sum = Self::default();
        let mut n = 0usize;
        for m in metrics {
            sum.precision += m.precision;
            sum.recall += m.recall;
            sum.f1 += m.f1;
            sum.reciprocal_rank += m.reciprocal_rank;
            sum.average_precision += m.average_precision;
            sum.ndcg += m.ndcg;
            n += 1;
        }
        if n == 0 {
            return sum;
        }
        let n = n as f64;
        Self {
            precision: sum.precision / n,
            recall: sum.recall / n,
            f1: sum.f1 / n,
            reciprocal_rank: sum.reciprocal_rank / n,
            average_precision: sum.average_precision / n,
            ndcg: sum.ndcg / n,
        }
    }
}

fn hits_in_top_k(ranked: &[RecipeId], relevant: &HashSet<RecipeId>, k: usize) -> usize {
    ranked.iter().take(k).filter(|id| relevant.contains(id)).count()
}

// ============================================================================
// Set-Based Metrics: Precision, Recall, F1
// ============================================================================

/// Computes Precision@k.
///
/// ```text
/// P@k = |relevant ∩ top_k| / k
/// ```
///
/// The denominator is `k`, not the number of results returned: a searcher
/// that returns fewer than `k` hits is penalized for the empty slots.
pub fn precision_at_k(ranked: &[RecipeId], relevant: &HashSet<RecipeId>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    hits_in_top_k(ranked, relevant, k) as f64 / k as f64
}

/// Computes Recall@k.
///
/// ```text
/// R@k = |relevant ∩ top_k| / |relevant|
/// ```
///
/// Returns 1.0 if no relevant documents exist.
pub fn recall_at_k(ranked: &[RecipeId], relevant: &HashSet<RecipeId>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 1.0;
    }
    hits_in_top_k(ranked, relevant, k) as f64 / relevant.len() as f64
}

/// Computes F1@k, the harmonic mean of Precision@k and Recall@k.
///
/// Returns 0.0 if both are 0.
pub fn f1_at_k(ranked: &[RecipeId], relevant: &HashSet<RecipeId>, k: usize) -> f64 {
    let precision = precision_at_k(ranked, relevant, k);
    let recall = recall_at_k(ranked, relevant, k);

    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

// ============================================================================
// Rank-Aware Metrics: RR, AP, NDCG
// ============================================================================

/// Computes Reciprocal Rank: 1 / position of the first relevant result.
///
/// Returns 0.0 if no relevant result is present.
pub fn reciprocal_rank(ranked: &[RecipeId], relevant: &HashSet<RecipeId>) -> f64 {
    ranked
        .iter()
        .position(|id| relevant.contains(id))
        .map(|i| 1.0 / (i + 1) as f64)
        .unwrap_or(0.0)
}

/// Computes Average Precision for a single query.
///
/// ```text
/// AP = (1 / |relevant|) * Σ P(i) * rel(i)
/// ```
///
/// Returns 0.0 if no relevant documents exist.
pub fn average_precision(ranked: &[RecipeId], relevant: &HashSet<RecipeId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }

    let mut precision_sum = 0.0;
    let mut relevant_found = 0;
    for (i, id) in ranked.iter().enumerate() {
        if relevant.contains(id) {
            relevant_found += 1;
            precision_sum += relevant_found as f64 / (i + 1) as f64;
        }
    }

    precision_sum / relevant.len() as f64
}

/// Computes NDCG@k with binary gains.
///
/// ```text
/// DCG@k  = Σ rel_i / log₂(i + 1)  for i in 1..=k
/// IDCG@k = Σ 1 / log₂(i + 1)      for i in 1..=min(k, |relevant|)
/// ```
///
/// Returns 1.0 if there are no relevant documents.
pub fn ndcg_at_k(ranked: &[RecipeId], relevant: &HashSet<RecipeId>, k: usize) -> f64 {
    let dcg: f64 = ranked
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, id)| relevant.contains(id))
        .map(|(i, _)| 1.0 / discount(i + 1))
        .sum();

    let idcg: f64 = (1..=relevant.len().min(k)).map(|pos| 1.0 / discount(pos)).sum();

    if idcg == 0.0 {
        1.0
    } else {
        dcg / idcg
    }
}

/// Logarithmic discount for a 1-indexed position.
#[inline]
fn discount(position: usize) -> f64 {
    (position as f64 + 1.0).log2()
}
