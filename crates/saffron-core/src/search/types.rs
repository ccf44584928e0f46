use crate::recipe::DisplayRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable recipe identifier.
///
/// Assigned upstream and never reassigned. It is the only join key between
/// the embedding store, the vector index, the lexical index and the display
/// metadata table.
///
/// # Examples
///
/// ```
/// use saffron_core::search::RecipeId;
///
/// let id = RecipeId::from_u64(42);
/// assert_eq!(id.as_u64(), 42);
/// assert_eq!(id.to_string(), "42");
/// assert_eq!("42".parse::<RecipeId>().unwrap(), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(u64);

impl RecipeId {
    /// Creates a RecipeId from a raw u64 value.
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value of this ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecipeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// One ranked search result.
///
/// `score` semantics depend on the path that produced the hit: inner product
/// for vector search, BM25 for lexical search. Scores from the two paths are
/// not comparable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// 1-based position in the returned list
    pub rank: usize,
    /// Recipe identifier
    pub id: RecipeId,
    /// Path-specific relevance score (higher is better)
    pub score: f32,
    /// Display fields joined from metadata or decoded from the lexical payload
    #[serde(flatten)]
    pub display: DisplayRecord,
}

/// Assigns contiguous 1-based ranks in iteration order.
pub(crate) fn rank_hits<I>(hits: I) -> Vec<SearchHit>
where
    I: IntoIterator<Item = (RecipeId, f32, DisplayRecord)>,
{
    hits.into_iter()
        .enumerate()
        .map(|(i, (id, score, display))| SearchHit {
            rank: i + 1,
            id,
            score,
            display,
        })
        .collect()
}
