//! End-to-end tests for the build and search pipeline.
//!
//! These tests exercise the full workflow on disk:
//! 1. Building: corpus → embedding store → vector index, corpus → lexical index
//! 2. Search: query normalization → encoding/BM25 → metadata join → ranked hits
//!
//! They use the feature-hashing encoder, so no model files are needed.
//! Run with: `cargo test -p saffron-core --test integration_tests`

use saffron_core::config::{Bm25Params, EmbeddingBuildConfig};
use saffron_core::embedding::{Embedder, HashEmbedder};
use saffron_core::error::IndexError;
use saffron_core::metadata::DisplayMetadata;
use saffron_core::recipe::{read_corpus, RecipeRecord};
use saffron_core::search::{
    LexicalIndex, LexicalSearchService, RecipeId, RecipeSearcher, SearchError, VectorIndex,
    VectorSearchService,
};
use saffron_core::store::{
    EmbeddingStore, EmbeddingStoreBuilder, EmbeddingStorePaths, EmbeddingWriter,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

const CORPUS: &str = r#"{"id": "42", "name": "chocolate chip cookies", "description": "classic chewy cookies", "tags": ["desserts", "cookies-and-brownies"], "ingredients": ["chocolate chips", "flour"]}
{"id": "7", "name": "banana bread", "description": "moist quick bread", "tags": ["breads", "breakfast"], "ingredients": ["banana", "flour", "eggs"]}
{"id": "19", "name": "chicken curry", "description": "mild weeknight curry", "tags": ["curries", "main-dish"], "ingredients": ["chicken", "coconut milk"]}
this line is not json
{"id": "23", "name": "tomato basil soup", "description": null, "tags": ["soups-stews"], "ingredients": ["tomato", "basil"]}

{"id": "31", "name": "garlic butter shrimp", "description": "fast skillet dinner", "tags": ["seafood"], "ingredients": ["shrimp", "garlic", "butter"]}
{"id": "55", "name": "oatmeal raisin cookies", "description": "soft and spiced", "tags": ["desserts", "cookies-and-brownies"], "ingredients": ["oats", "raisins", "flour"]}
"#;

const QUERIES: &[&str] = &[
    "chocolate chip cookies",
    "banana bread",
    "curry",
    "garlic shrimp",
    "cookies",
    "soup with basil",
];

/// Writes the corpus and a matching metadata file into `dir`.
fn write_fixtures(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let corpus = dir.join("corpus.jsonl");
    let metadata = dir.join("metadata.jsonl");
    std::fs::write(&corpus, CORPUS).unwrap();
    // The corpus lines double as display lines; the bad line is skipped.
    std::fs::write(&metadata, CORPUS).unwrap();
    (corpus, metadata)
}

fn build_store(dir: &Path, corpus: &Path, embedder: &HashEmbedder) -> EmbeddingStorePaths {
    let paths = EmbeddingStorePaths::in_dir(dir.join("store"));
    let writer = EmbeddingWriter::create(paths.clone(), embedder.embedding_dim(), 10).unwrap();
    let config = EmbeddingBuildConfig::default()
        .with_chunk_size(2)
        .with_batch_size(1);
    let summary = EmbeddingStoreBuilder::new(embedder, config)
        .build(read_corpus(corpus).unwrap(), writer, |_| {})
        .unwrap();
    assert_eq!(summary.rows_written, 6);
    assert_eq!(summary.records_skipped, 1);
    assert_eq!(summary.chunks, 3);
    paths
}

fn build_lexical(corpus: &Path, metadata: &Path) -> LexicalIndex {
    let display = DisplayMetadata::load(metadata).unwrap();
    let (index, summary) =
        LexicalIndex::build(read_corpus(corpus).unwrap(), &display, Bm25Params::default())
            .unwrap();
    assert_eq!(summary.documents, 6);
    index
}

fn ranked_ids(searcher: &dyn RecipeSearcher, query: &str, k: usize) -> Vec<RecipeId> {
    searcher
        .search(query, k)
        .unwrap()
        .into_iter()
        .map(|h| h.id)
        .collect()
}

fn id(raw: u64) -> RecipeId {
    RecipeId::from_u64(raw)
}

// ============================================================================
// Embedding store and vector index
// ============================================================================

#[test]
fn test_three_row_store_self_query() {
    let dir = TempDir::new().unwrap();
    let paths = EmbeddingStorePaths::in_dir(dir.path());

    let rows = vec![
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.0, 0.6, 0.8, 0.0],
        vec![0.0, 0.0, 0.0, 1.0],
    ];
    let mut writer = EmbeddingWriter::create(paths.clone(), 4, 3).unwrap();
    assert_eq!(writer.append(&[id(10), id(20), id(30)], &rows).unwrap(), 3);
    assert_eq!(writer.finish().unwrap(), 3);

    let store = EmbeddingStore::open(&paths, 4).unwrap();
    assert_eq!(store.len(), 3);
    assert_eq!(store.ids(), &[id(10), id(20), id(30)]);

    let query = store.row(1).unwrap().to_vec();
    let index = VectorIndex::from_store(store).unwrap();
    let hits = index.search(&query, 3).unwrap();
    assert_eq!(hits[0].0, id(20));
    assert!((hits[0].1 - 1.0).abs() < 1e-5);
}

#[test]
fn test_every_stored_vector_finds_itself() {
    let dir = TempDir::new().unwrap();
    let (corpus, _) = write_fixtures(dir.path());
    let embedder = HashEmbedder::default();
    let paths = build_store(dir.path(), &corpus, &embedder);

    let store = EmbeddingStore::open(&paths, embedder.embedding_dim()).unwrap();
    let index = VectorIndex::from_store(store.clone()).unwrap();
    for (row, &expected) in store.ids().iter().enumerate() {
        let hits = index.search(store.row(row).unwrap(), 1).unwrap();
        assert_eq!(hits[0].0, expected);
        assert!((hits[0].1 - 1.0).abs() < 1e-4);
    }
}

#[test]
fn test_capacity_exceeded_reports_offset() {
    let dir = TempDir::new().unwrap();
    let (corpus, _) = write_fixtures(dir.path());
    let embedder = HashEmbedder::new(8).unwrap();

    let writer =
        EmbeddingWriter::create(EmbeddingStorePaths::in_dir(dir.path()), 8, 3).unwrap();
    let config = EmbeddingBuildConfig::default().with_chunk_size(2);
    let err = EmbeddingStoreBuilder::new(&embedder, config)
        .build(read_corpus(&corpus).unwrap(), writer, |_| {})
        .unwrap_err();

    match err {
        IndexError::CapacityExceeded {
            offset,
            requested,
            capacity,
        } => {
            assert_eq!(offset, 2);
            assert_eq!(requested, 2);
            assert_eq!(capacity, 3);
        }
        other => panic!("expected CapacityExceeded, got {other:?}"),
    }
}

#[test]
fn test_interrupted_build_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let paths = EmbeddingStorePaths::in_dir(dir.path());

    // Dropped without finish(): the vector file keeps its pre-allocated size.
    let mut writer = EmbeddingWriter::create(paths.clone(), 2, 4).unwrap();
    writer.append(&[id(1)], &[vec![1.0, 0.0]]).unwrap();
    drop(writer);

    let err = EmbeddingStore::open(&paths, 2).unwrap_err();
    assert!(matches!(err, IndexError::IdCountMismatch { vectors: 4, ids: 1 }));
}

#[test]
fn test_missing_identifier_line_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let paths = EmbeddingStorePaths::in_dir(dir.path());

    let mut writer = EmbeddingWriter::create(paths.clone(), 2, 2).unwrap();
    writer
        .append(&[id(1), id(2)], &[vec![1.0, 0.0], vec![0.0, 1.0]])
        .unwrap();
    writer.finish().unwrap();

    std::fs::write(&paths.ids, "1\n").unwrap();
    let err = EmbeddingStore::open(&paths, 2).unwrap_err();
    assert!(matches!(err, IndexError::IdCountMismatch { vectors: 2, ids: 1 }));
    assert!(err.to_string().contains("first unmatched row: 1"));
}

#[test]
fn test_vector_index_round_trip() {
    let dir = TempDir::new().unwrap();
    let (corpus, _) = write_fixtures(dir.path());
    let embedder = HashEmbedder::default();
    let paths = build_store(dir.path(), &corpus, &embedder);

    let store = EmbeddingStore::open(&paths, embedder.embedding_dim()).unwrap();
    let index = VectorIndex::from_store(store)
        .unwrap()
        .with_model_id(embedder.model_id());
    let index_path = dir.path().join("vectors.redb");
    index.save(&index_path).unwrap();
    let loaded = VectorIndex::load(&index_path).unwrap();

    assert_eq!(loaded.manifest(), index.manifest());
    for query in QUERIES {
        let vector = embedder.embed(query).unwrap();
        assert_eq!(
            index.search(&vector, 4).unwrap(),
            loaded.search(&vector, 4).unwrap()
        );
    }
}

// ============================================================================
// Lexical index
// ============================================================================

#[test]
fn test_lexical_cookies_and_banana_bread() {
    let dir = TempDir::new().unwrap();
    let (corpus, metadata) = write_fixtures(dir.path());
    let service = LexicalSearchService::new(build_lexical(&corpus, &metadata));

    let hits = service.search("chocolate chip cookies", 5).unwrap();
    assert!(hits.iter().any(|h| h.id == id(42)));
    assert_eq!(hits[0].id, id(42));
    assert_eq!(hits[0].display.tags, vec!["desserts", "cookies-and-brownies"]);

    let hits = service.search("banana bread", 5).unwrap();
    assert_ne!(hits[0].id, id(42));
    assert_eq!(hits[0].id, id(7));
}

#[test]
fn test_lexical_name_query_outranks_unrelated() {
    let dir = TempDir::new().unwrap();
    let (corpus, metadata) = write_fixtures(dir.path());
    let index = build_lexical(&corpus, &metadata);

    for record in read_corpus(&corpus).unwrap().filter_map(Result::ok) {
        let record: RecipeRecord = record.normalized();
        let hits = index.search(&record.name, 10);
        assert_eq!(hits[0].id, record.id, "query {:?}", record.name);
    }
}

#[test]
fn test_lexical_round_trip() {
    let dir = TempDir::new().unwrap();
    let (corpus, metadata) = write_fixtures(dir.path());
    let index = build_lexical(&corpus, &metadata);
    let index_dir = dir.path().join("lexical");
    index.save(&index_dir).unwrap();

    let before = LexicalSearchService::new(index);
    let after = LexicalSearchService::open(&index_dir).unwrap();
    for query in QUERIES {
        let a = before.search(query, 5).unwrap();
        let b = after.search(query, 5).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.display, y.display);
            assert!((x.score - y.score).abs() < 1e-5);
        }
    }
}

#[test]
fn test_invalid_utf8_line_is_skipped_by_both_builds() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus.jsonl");
    let mut bytes = b"{\"id\": \"1\", \"name\": \"apple pie\"}\n".to_vec();
    bytes.extend_from_slice(b"{\"id\": \"2\", \"name\": \"cr\xe9pes\"}\n");
    bytes.extend_from_slice(b"{\"id\": \"3\", \"name\": \"pear tart\"}\n");
    std::fs::write(&corpus, bytes).unwrap();

    let (index, summary) = LexicalIndex::build(
        read_corpus(&corpus).unwrap(),
        &DisplayMetadata::default(),
        Bm25Params::default(),
    )
    .unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(summary.records_skipped, 1);

    let embedder = HashEmbedder::default();
    let paths = EmbeddingStorePaths::in_dir(dir.path().join("store"));
    let writer = EmbeddingWriter::create(paths, embedder.embedding_dim(), 3).unwrap();
    let summary = EmbeddingStoreBuilder::new(&embedder, EmbeddingBuildConfig::default())
        .build(read_corpus(&corpus).unwrap(), writer, |_| {})
        .unwrap();
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.records_skipped, 1);
}

// ============================================================================
// Services
// ============================================================================

#[test]
fn test_builds_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let (corpus, metadata) = write_fixtures(dir.path());
    let embedder = HashEmbedder::default();

    let first = build_store(&dir.path().join("a"), &corpus, &embedder);
    let second = build_store(&dir.path().join("b"), &corpus, &embedder);
    let open = |paths: &EmbeddingStorePaths| {
        let store = EmbeddingStore::open(paths, embedder.embedding_dim()).unwrap();
        let index = VectorIndex::from_store(store)
            .unwrap()
            .with_model_id(embedder.model_id());
        VectorSearchService::new(
            index,
            DisplayMetadata::load(&metadata).unwrap(),
            Arc::new(embedder.clone()),
        )
        .unwrap()
    };
    let (a, b) = (open(&first), open(&second));
    let (la, lb) = (
        LexicalSearchService::new(build_lexical(&corpus, &metadata)),
        LexicalSearchService::new(build_lexical(&corpus, &metadata)),
    );

    for query in QUERIES {
        assert_eq!(ranked_ids(&a, query, 5), ranked_ids(&b, query, 5));
        assert_eq!(ranked_ids(&la, query, 5), ranked_ids(&lb, query, 5));
    }
}

#[test]
fn test_k_boundaries() {
    let dir = TempDir::new().unwrap();
    let (corpus, metadata) = write_fixtures(dir.path());
    let embedder = HashEmbedder::default();
    let paths = build_store(dir.path(), &corpus, &embedder);
    let store = EmbeddingStore::open(&paths, embedder.embedding_dim()).unwrap();
    let vector = VectorSearchService::new(
        VectorIndex::from_store(store).unwrap(),
        DisplayMetadata::load(&metadata).unwrap(),
        Arc::new(embedder),
    )
    .unwrap();
    let lexical = LexicalSearchService::new(build_lexical(&corpus, &metadata));

    let services: [&dyn RecipeSearcher; 2] = [&vector, &lexical];
    for service in services {
        assert!(service.search("cookies", 0).unwrap().is_empty());

        let hits = service.search("cookies", 100).unwrap();
        assert!(!hits.is_empty());
        assert!(hits.len() <= 6);
        for (i, hit) in hits.iter().enumerate() {
            assert_eq!(hit.rank, i + 1);
            assert!(!hit.display.name.is_empty());
        }
    }
    assert_eq!(vector.search("cookies", 100).unwrap().len(), 6);
}

#[test]
fn test_vector_service_end_to_end() {
    let dir = TempDir::new().unwrap();
    let (corpus, metadata) = write_fixtures(dir.path());
    let embedder = HashEmbedder::default();
    let paths = build_store(dir.path(), &corpus, &embedder);

    let store = EmbeddingStore::open(&paths, embedder.embedding_dim()).unwrap();
    let index_path = dir.path().join("vectors.redb");
    VectorIndex::from_store(store)
        .unwrap()
        .with_model_id(embedder.model_id())
        .save(&index_path)
        .unwrap();

    let service =
        VectorSearchService::open(&index_path, &metadata, Arc::new(embedder.clone())).unwrap();
    let hits = service.search("Chocolate Chip Cookies", 3).unwrap();
    assert_eq!(hits[0].id, id(42));
    assert_eq!(hits[0].display.name, "chocolate chip cookies");
    assert!(hits[0].score > hits[1].score);

    // An encoder with a different dimension cannot serve this index.
    let err = VectorSearchService::open(
        &index_path,
        &metadata,
        Arc::new(HashEmbedder::new(32).unwrap()),
    );
    assert!(matches!(err, Err(SearchError::Unavailable(_))));
}

#[test]
fn test_services_share_across_threads() {
    let dir = TempDir::new().unwrap();
    let (corpus, metadata) = write_fixtures(dir.path());
    let service = Arc::new(LexicalSearchService::new(build_lexical(&corpus, &metadata)));
    let expected = ranked_ids(service.as_ref(), "cookies", 5);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || ranked_ids(service.as_ref(), "cookies", 5))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
