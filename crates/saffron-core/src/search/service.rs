//! Query-time services for the vector and lexical paths.
//!
//! Each service is an explicitly constructed, immutable value. `open`
//! loads artifacts and fails with [`SearchError::Unavailable`] if they cannot
//! be used; a reload is simply a new service. Both take `&self` for queries
//! and are `Send + Sync`, so one instance can be shared across threads behind
//! an `Arc` without locks.
//!
//! The two paths are independent: scores are not comparable and no fusion
//! happens here.

use super::keyword::LexicalIndex;
use super::types::{rank_hits, SearchHit};
use super::vector::VectorIndex;
use crate::embedding::{l2_normalize, Embedder};
use crate::error::SearchError;
use crate::metadata::DisplayMetadata;
use crate::normalize::light_normalize;
use crate::recipe::DisplayRecord;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Anything that answers a free-text query with ranked recipes.
pub trait RecipeSearcher: Send + Sync {
    /// Returns at most `k` hits, best first, with contiguous 1-based ranks.
    ///
    /// An empty result means no matches; a service that cannot answer at all
    /// returns an error instead.
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// Semantic search: encode the query, exact top-k, join display metadata.
pub struct VectorSearchService {
    index: VectorIndex,
    metadata: DisplayMetadata,
    embedder: Arc<dyn Embedder>,
}

impl VectorSearchService {
    /// Assembles a service from loaded parts.
    ///
    /// Fails if the encoder's dimension differs from the index, or if the
    /// index records a model id and the encoder reports a different one.
    pub fn new(
        index: VectorIndex,
        metadata: DisplayMetadata,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, SearchError> {
        if embedder.embedding_dim() != index.dimension() {
            return Err(SearchError::Unavailable(format!(
                "encoder '{}' produces {}-dimensional vectors but the index holds {}-dimensional rows",
                embedder.model_id(),
                embedder.embedding_dim(),
                index.dimension()
            )));
        }
        if !index.model_id().is_empty() && index.model_id() != embedder.model_id() {
            return Err(SearchError::Unavailable(format!(
                "index was built with encoder '{}' but the query encoder is '{}'",
                index.model_id(),
                embedder.model_id()
            )));
        }

        Ok(Self {
            index,
            metadata,
            embedder,
        })
    }

    /// Loads the vector index and display metadata from disk.
    #[instrument(skip_all, fields(index = %index_path.as_ref().display()))]
    pub fn open(
        index_path: impl AsRef<Path>,
        metadata_path: impl AsRef<Path>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, SearchError> {
        let index = VectorIndex::load(index_path)?;
        let metadata = DisplayMetadata::load(metadata_path)?;
        Self::new(index, metadata, embedder)
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

impl RecipeSearcher for VectorSearchService {
    #[instrument(skip_all, fields(k = k, query_len = query.len()))]
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, SearchError> {
        let normalized = light_normalize(query);
        if k == 0 || normalized.is_empty() {
            return Ok(Vec::new());
        }

        let mut vector = self.embedder.embed(&normalized)?;
        let norm = l2_normalize(&mut vector);
        if !(norm > f32::EPSILON && norm.is_finite()) {
            debug!("Query '{}' encodes to a zero vector", normalized);
            return Ok(Vec::new());
        }

        let neighbors = self.index.search(&vector, k)?;
        let joined = neighbors.into_iter().filter_map(|(id, score)| match self.metadata.get(id) {
            Some(display) => Some((id, score, display.clone())),
            None => {
                debug!("Dropping recipe {}: no display metadata", id);
                None
            }
        });

        Ok(rank_hits(joined))
    }
}

/// Keyword search over the BM25 index; display fields come from the payload.
#[derive(Debug)]
pub struct LexicalSearchService {
    index: LexicalIndex,
}

impl LexicalSearchService {
    pub fn new(index: LexicalIndex) -> Self {
        Self { index }
    }

    /// Loads a lexical index directory.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SearchError> {
        Ok(Self::new(LexicalIndex::load(dir)?))
    }

    pub fn index(&self) -> &LexicalIndex {
        &self.index
    }
}

impl RecipeSearcher for LexicalSearchService {
    #[instrument(skip_all, fields(k = k, query_len = query.len()))]
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, SearchError> {
        let normalized = light_normalize(query);
        if k == 0 || normalized.is_empty() {
            return Ok(Vec::new());
        }

        let decoded = self
            .index
            .search(&normalized, k)
            .into_iter()
            .filter_map(|hit| {
                if hit.payload.is_empty() {
                    return Some((hit.id, hit.score, DisplayRecord::default()));
                }
                match serde_json::from_str::<DisplayRecord>(hit.payload) {
                    Ok(display) => Some((hit.id, hit.score, display)),
                    Err(e) => {
                        warn!("Dropping recipe {}: undecodable payload: {}", hit.id, e);
                        None
                    }
                }
            });

        Ok(rank_hits(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Bm25Params;
    use crate::embedding::HashEmbedder;
    use crate::error::EmbeddingError;
    use crate::search::types::RecipeId;
    use crate::test_utils::{recipe, sample_corpus, sample_display, NORMALIZATION_GOLDEN};
    use std::sync::Mutex;

    fn vector_service(embedder: Arc<dyn Embedder>, metadata: DisplayMetadata) -> VectorSearchService {
        let corpus = sample_corpus();
        let texts: Vec<String> = corpus.iter().map(|r| r.embedding_text()).collect();
        let vectors = embedder.embed_batch(&texts).unwrap().concat();
        let ids = corpus.iter().map(|r| r.id).collect();
        let index = VectorIndex::build(vectors, embedder.embedding_dim(), ids)
            .unwrap()
            .with_model_id(embedder.model_id());
        VectorSearchService::new(index, metadata, embedder).unwrap()
    }

    fn lexical_service() -> LexicalSearchService {
        let display: DisplayMetadata = sample_display().into_iter().collect();
        let records = sample_corpus().into_iter().map(Ok);
        let (index, _) = LexicalIndex::build(records, &display, Bm25Params::default()).unwrap();
        LexicalSearchService::new(index)
    }

    /// Records every text it is asked to encode.
    struct RecordingEmbedder {
        inner: HashEmbedder,
        seen: Mutex<Vec<String>>,
    }

    impl Embedder for RecordingEmbedder {
        fn model_id(&self) -> &str {
            self.inner.model_id()
        }

        fn embedding_dim(&self) -> usize {
            self.inner.embedding_dim()
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.seen.lock().unwrap().extend(texts.iter().cloned());
            self.inner.embed_batch(texts)
        }
    }

    #[test]
    fn test_services_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VectorSearchService>();
        assert_send_sync::<LexicalSearchService>();
    }

    #[test]
    fn test_vector_search_joins_metadata() {
        let service = vector_service(
            Arc::new(HashEmbedder::default()),
            sample_display().into_iter().collect(),
        );
        let hits = service.search("Chocolate Chip Cookies!", 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, RecipeId::from_u64(42));
        assert_eq!(hits[0].display.name, "chocolate chip cookies");
        let ranks: Vec<_> = hits.iter().map(|h| h.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_vector_search_drops_missing_metadata() {
        let metadata: DisplayMetadata = sample_display()
            .into_iter()
            .filter(|(id, _)| id.as_u64() != 42)
            .collect();
        let service = vector_service(Arc::new(HashEmbedder::default()), metadata);

        let hits = service.search("chocolate chip cookies", 5).unwrap();
        assert_eq!(hits.len(), 4);
        assert!(hits.iter().all(|h| h.id != RecipeId::from_u64(42)));
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[3].rank, 4);
    }

    #[test]
    fn test_vector_search_empty_inputs() {
        let service = vector_service(
            Arc::new(HashEmbedder::default()),
            sample_display().into_iter().collect(),
        );
        assert!(service.search("cookies", 0).unwrap().is_empty());
        assert!(service.search("  !!  ", 5).unwrap().is_empty());
    }

    #[test]
    fn test_query_is_normalized_before_encoding() {
        let embedder = Arc::new(RecordingEmbedder {
            inner: HashEmbedder::default(),
            seen: Mutex::new(Vec::new()),
        });
        let service = vector_service(embedder.clone(), sample_display().into_iter().collect());
        embedder.seen.lock().unwrap().clear();

        for (raw, expected) in NORMALIZATION_GOLDEN {
            service.search(raw, 1).unwrap();
            if !expected.is_empty() {
                assert_eq!(embedder.seen.lock().unwrap().last().unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_encoder_mismatch_is_unavailable() {
        let index = VectorIndex::build(vec![1.0, 0.0], 2, vec![RecipeId::from_u64(1)]).unwrap();
        let result = VectorSearchService::new(
            index,
            DisplayMetadata::default(),
            Arc::new(HashEmbedder::new(4).unwrap()),
        );
        assert!(matches!(result, Err(SearchError::Unavailable(_))));

        let embedder = HashEmbedder::new(2).unwrap();
        let index = VectorIndex::build(vec![1.0, 0.0], 2, vec![RecipeId::from_u64(1)])
            .unwrap()
            .with_model_id("some-other-model");
        let result = VectorSearchService::new(index, DisplayMetadata::default(), Arc::new(embedder));
        assert!(matches!(result, Err(SearchError::Unavailable(_))));
    }

    #[test]
    fn test_lexical_query_is_normalized_before_search() {
        let records: Vec<_> = NORMALIZATION_GOLDEN
            .iter()
            .filter(|(_, expected)| !expected.is_empty())
            .enumerate()
            .map(|(i, (_, expected))| Ok(recipe(i as u64 + 1, expected, "", &[], &[])))
            .collect();
        let (index, _) =
            LexicalIndex::build(records, &DisplayMetadata::default(), Bm25Params::default())
                .unwrap();
        let service = LexicalSearchService::new(index);

        let mut next_id = 1;
        for (raw, expected) in NORMALIZATION_GOLDEN {
            let from_raw = service.search(raw, 10).unwrap();
            if expected.is_empty() {
                assert!(from_raw.is_empty(), "{:?} should not search", raw);
                continue;
            }

            let from_expected = service.search(expected, 10).unwrap();
            assert_eq!(from_raw.len(), from_expected.len(), "query {:?}", raw);
            for (a, b) in from_raw.iter().zip(&from_expected) {
                assert_eq!(a.id, b.id, "query {:?}", raw);
                assert!((a.score - b.score).abs() < 1e-6);
            }
            assert_eq!(from_raw[0].id, RecipeId::from_u64(next_id), "query {:?}", raw);
            next_id += 1;
        }
    }

    #[test]
    fn test_lexical_search_decodes_payload() {
        let hits = lexical_service().search("Chocolate Chip Cookies", 5).unwrap();
        assert_eq!(hits[0].id, RecipeId::from_u64(42));
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[0].display.tags, vec!["desserts", "cookies-and-brownies"]);
    }

    #[test]
    fn test_lexical_search_banana_bread() {
        let hits = lexical_service().search("banana bread", 5).unwrap();
        assert_eq!(hits[0].id, RecipeId::from_u64(7));
        assert!(hits.iter().all(|h| h.id != RecipeId::from_u64(42)));
    }

    #[test]
    fn test_lexical_search_empty_payload() {
        let records = sample_corpus().into_iter().map(Ok);
        let (index, _) =
            LexicalIndex::build(records, &DisplayMetadata::default(), Bm25Params::default())
                .unwrap();
        let hits = LexicalSearchService::new(index).search("shrimp", 5).unwrap();
        assert_eq!(hits[0].id, RecipeId::from_u64(31));
        assert_eq!(hits[0].display, DisplayRecord::default());
    }

    #[test]
    fn test_open_missing_artifacts_is_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            LexicalSearchService::open(dir.path().join("lexical")),
            Err(SearchError::Unavailable(_))
        ));
        assert!(matches!(
            VectorSearchService::open(
                dir.path().join("vectors.redb"),
                dir.path().join("metadata.jsonl"),
                Arc::new(HashEmbedder::default()),
            ),
            Err(SearchError::Unavailable(_))
        ));
    }
}
