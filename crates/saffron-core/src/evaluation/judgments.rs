//! Query specifications and rule-based relevance judgments.
//!
//! A [`QuerySpec`] describes what a good answer to a query looks like in terms
//! of tags and ingredients. [`build_judgments`] scans the corpus once per spec
//! and fills `relevant_ids` with every matching recipe, in corpus order.

use crate::error::IndexError;
use crate::recipe::{RawId, RecipeRecord};
use crate::search::types::RecipeId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{info, instrument};

/// Which retrieval path a query is meant to exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Short, literal queries where term overlap should win
    Keyword,
    /// Descriptive queries that need semantic matching
    Semantic,
}

/// One evaluation query and its relevance rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub qid: u64,
    pub query: String,
    #[serde(rename = "type")]
    pub kind: QueryKind,
    /// Every tag listed here must be present
    #[serde(default)]
    pub must_tags: Vec<String>,
    /// If non-empty, at least one of these tags must be present
    #[serde(default)]
    pub any_tags: Vec<String>,
    /// None of these tags may be present
    #[serde(default)]
    pub must_not_tags: Vec<String>,
    /// Substrings that must all occur in the ingredient text
    #[serde(default)]
    pub must_ingredients: Vec<String>,
    /// Substrings that must not occur in the ingredient text
    #[serde(default)]
    pub must_not_ingredients: Vec<String>,
    /// Judged-relevant recipes, filled by [`build_judgments`]
    #[serde(
        default,
        serialize_with = "ids_as_strings",
        deserialize_with = "ids_from_raw"
    )]
    pub relevant_ids: Vec<RecipeId>,
}

impl QuerySpec {
    /// Returns true if `record` satisfies every rule of this spec.
    ///
    /// Ingredient rules are substring checks against the space-joined,
    /// lowercased ingredient list, so `"blueber"` matches both "blueberry"
    /// and "blueberries". Empty substrings are ignored.
    pub fn matches(&self, record: &RecipeRecord) -> bool {
        let tags: HashSet<&str> = record.tags.iter().map(String::as_str).collect();

        if !self.must_tags.iter().all(|t| tags.contains(t.as_str())) {
            return false;
        }
        if !self.any_tags.is_empty() && !self.any_tags.iter().any(|t| tags.contains(t.as_str())) {
            return false;
        }
        if self.must_not_tags.iter().any(|t| tags.contains(t.as_str())) {
            return false;
        }

        let ingredient_text = record.ingredients.join(" ").to_lowercase();
        let contains = |needle: &String| {
            let needle = needle.to_lowercase();
            !needle.is_empty() && ingredient_text.contains(&needle)
        };
        let required_present = self
            .must_ingredients
            .iter()
            .filter(|s| !s.is_empty())
            .all(contains);
        if !required_present {
            return false;
        }

        !self.must_not_ingredients.iter().any(contains)
    }

    /// Relevant identifiers as a set.
    pub fn relevant_set(&self) -> HashSet<RecipeId> {
        self.relevant_ids.iter().copied().collect()
    }
}

/// Fills `relevant_ids` of every spec from `records`.
///
/// Existing judgments are replaced. Matches keep corpus order.
#[instrument(skip_all, fields(queries = specs.len(), records = records.len()))]
pub fn build_judgments(specs: Vec<QuerySpec>, records: &[RecipeRecord]) -> Vec<QuerySpec> {
    specs
        .into_iter()
        .map(|mut spec| {
            spec.relevant_ids = records
                .iter()
                .filter(|r| spec.matches(r))
                .map(|r| r.id)
                .collect();
            info!(
                "Query {} ({:?}): {} relevant recipes",
                spec.qid,
                spec.kind,
                spec.relevant_ids.len()
            );
            spec
        })
        .collect()
}

/// Built-in benchmark: ten keyword queries (qids 1-10) and ten semantic
/// queries (qids 11-20), without judgments.
const BUILTIN_QUERY_SPECS: &str = include_str!("../../data/query_specs.json");

/// Returns the built-in benchmark query specs.
pub fn builtin_query_specs() -> Result<Vec<QuerySpec>, IndexError> {
    Ok(serde_json::from_str(BUILTIN_QUERY_SPECS)?)
}

/// Reads a JSON array of query specs.
pub fn load_query_specs(path: impl AsRef<Path>) -> Result<Vec<QuerySpec>, IndexError> {
    let file = File::open(path.as_ref())?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Writes query specs as a pretty-printed JSON array.
pub fn save_query_specs(path: impl AsRef<Path>, specs: &[QuerySpec]) -> Result<(), IndexError> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(file), specs)?;
    Ok(())
}

fn ids_as_strings<S: Serializer>(ids: &[RecipeId], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(ids.iter().map(|id| id.to_string()))
}

fn ids_from_raw<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<RecipeId>, D::Error> {
    Option::<Vec<RawId>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|raw| raw.parse().map_err(serde::de::Error::custom))
        .collect()
}
