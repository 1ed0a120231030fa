//! End-to-end engine tests with deterministic providers
//!
//! Exercises the full Load -> Chunk -> Build -> Retrieve -> Synthesize
//! pipeline against real files in temporary directories.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use vellum::config::Config;
use vellum::embedding::{EmbeddingError, EmbeddingProvider, HashingEmbedder};
use vellum::engine::Engine;
use vellum::error::VellumError;
use vellum::generation::{ExtractiveGenerator, GenerationError, GenerativeProvider};

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.embedding.provider = "hashing".to_string();
    config.embedding.dimension = 128;
    config
}

fn test_engine(config: Config) -> Engine {
    let embedder = Arc::new(HashingEmbedder::new(config.embedding.dimension));
    let generator = Arc::new(ExtractiveGenerator::new().unwrap());
    Engine::new(config, embedder, generator).unwrap()
}

/// Counts embedding calls; used to prove fail-fast paths do no work.
struct CountingEmbedder {
    inner: HashingEmbedder,
    calls: Arc<AtomicUsize>,
}

impl EmbeddingProvider for CountingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

/// Fails on demand; used to prove a failed rebuild keeps the old index.
struct FlakyEmbedder {
    inner: HashingEmbedder,
    failing: Arc<AtomicBool>,
}

impl EmbeddingProvider for FlakyEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Generation("backend down".to_string()));
        }
        self.inner.embed(text)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        "flaky"
    }
}

/// A generator that must never run.
struct PanickingGenerator;

impl GenerativeProvider for PanickingGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        panic!("generator invoked without context");
    }

    fn model_name(&self) -> &str {
        "panicking"
    }
}

#[tokio::test]
async fn test_single_document_answer_cites_the_source() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "faq.md",
        "Returns are accepted within 30 days. Contact support for exchanges.",
    );

    let engine = test_engine(test_config());
    engine.build(temp.path()).await.unwrap();

    let results = engine.search("What is the return window?", 3).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.source_id, "faq.md");
    assert!(results[0].score > 0.0);

    let answer = engine.ask("What is the return window?").await.unwrap();
    assert!(!answer.abstained);
    assert!(answer.text.contains("30 days"));
    assert_eq!(answer.citations, vec!["faq.md"]);
}

#[tokio::test]
async fn test_empty_root_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    let engine = test_engine(test_config());

    let err = engine.build(temp.path()).await.unwrap_err();
    match err {
        VellumError::Config(message) => assert!(message.contains("no documents found")),
        other => panic!("expected ConfigError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_query_before_any_build_abstains_without_generating() {
    let config = test_config();
    let embedder = Arc::new(HashingEmbedder::new(config.embedding.dimension));
    let engine = Engine::new(config, embedder, Arc::new(PanickingGenerator)).unwrap();

    let answer = engine.ask("anything at all?").await.unwrap();
    assert!(answer.abstained);
    assert!(answer.citations.is_empty());

    let results = engine.search("anything at all?", 5).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_bad_overlap_fails_before_any_embedding_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let embedder = Arc::new(CountingEmbedder {
        inner: HashingEmbedder::new(128),
        calls: calls.clone(),
    });

    let mut config = test_config();
    config.chunking.chunk_size = 64;
    config.chunking.chunk_overlap = 64;

    let result = Engine::new(config, embedder, Arc::new(PanickingGenerator));
    assert!(matches!(
        result.unwrap_err(),
        VellumError::ConfigValidation { .. }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refresh_publishes_a_new_generation() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.md", "Alpha document about apples.");

    let engine = test_engine(test_config());
    let first = engine.build(temp.path()).await.unwrap();
    assert_eq!(first.documents, 1);

    write(temp.path(), "b.md", "Beta document about bananas.");
    let second = engine.refresh(temp.path()).await.unwrap();

    assert_ne!(first.generation, second.generation);
    assert_eq!(second.documents, 2);
    assert_eq!(engine.sources().await, vec!["a.md", "b.md"]);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_index_serving() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.md", "Alpha document about apples.");

    let failing = Arc::new(AtomicBool::new(false));
    let embedder = Arc::new(FlakyEmbedder {
        inner: HashingEmbedder::new(128),
        failing: failing.clone(),
    });
    let generator = Arc::new(ExtractiveGenerator::new().unwrap());
    let engine = Engine::new(test_config(), embedder, generator).unwrap();

    let first = engine.build(temp.path()).await.unwrap();

    failing.store(true, Ordering::SeqCst);
    write(temp.path(), "b.md", "Beta document about bananas.");
    let err = engine.refresh(temp.path()).await.unwrap_err();
    assert!(matches!(err, VellumError::Index(_)));

    // The failed build published nothing: same generation, same corpus.
    let stats = engine.stats().await;
    assert_eq!(stats.generation, first.generation);
    assert_eq!(engine.sources().await, vec!["a.md"]);

    failing.store(false, Ordering::SeqCst);
    let answer = engine.ask("something about apples?").await.unwrap();
    assert_eq!(answer.citations, vec!["a.md"]);
}

#[tokio::test]
async fn test_rebuilding_same_corpus_is_idempotent() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.md", "Stable corpus. Identical every build.");
    write(temp.path(), "b.md", "Second file with more words in it.");

    let engine = test_engine(test_config());
    let first = engine.build(temp.path()).await.unwrap();
    let second = engine.refresh(temp.path()).await.unwrap();

    assert_eq!(first.chunks, second.chunks);
    assert_eq!(first.fingerprint, second.fingerprint);
    assert_ne!(first.generation, second.generation);
}

#[tokio::test]
async fn test_undecodable_file_is_skipped_not_fatal() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "good.md", "Readable content.");
    std::fs::write(temp.path().join("bad.md"), [0xff, 0xfe, 0x00, 0x01]).unwrap();

    let engine = test_engine(test_config());
    let stats = engine.build(temp.path()).await.unwrap();

    assert_eq!(stats.documents, 1);
    assert_eq!(engine.sources().await, vec!["good.md"]);
}

#[tokio::test]
async fn test_concurrent_queries_during_rebuilds_stay_consistent() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.md", "Alpha document about apples and orchards.");

    let engine = Arc::new(test_engine(test_config()));
    engine.build(temp.path()).await.unwrap();

    write(temp.path(), "b.md", "Beta document about bananas and plantations.");

    let mut askers = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        askers.push(tokio::spawn(async move {
            for _ in 0..25 {
                let answer = engine.ask("tell me about apples").await.unwrap();
                // Whichever generation served the query, citations must
                // come from a published corpus, never a partial one.
                assert!(!answer.abstained);
                for citation in &answer.citations {
                    assert!(citation == "a.md" || citation == "b.md");
                }
            }
        }));
    }

    let rebuilder = {
        let engine = engine.clone();
        let root = temp.path().to_path_buf();
        tokio::spawn(async move {
            for _ in 0..10 {
                engine.refresh(&root).await.unwrap();
            }
        })
    };

    for asker in askers {
        asker.await.unwrap();
    }
    rebuilder.await.unwrap();

    assert_eq!(engine.sources().await, vec!["a.md", "b.md"]);
}

#[tokio::test]
async fn test_top_k_larger_than_corpus_returns_everything_ranked() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.md", "Apples grow in orchards.");
    write(temp.path(), "b.md", "Bananas grow in plantations.");

    let engine = test_engine(test_config());
    engine.build(temp.path()).await.unwrap();

    let results = engine.search("where do apples grow", 50).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].score >= results[1].score);
    assert_eq!(results[0].chunk.source_id, "a.md");
}

#[tokio::test]
async fn test_blank_question_is_rejected() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.md", "Content.");

    let engine = test_engine(test_config());
    engine.build(temp.path()).await.unwrap();

    let err = engine.ask("   ").await.unwrap_err();
    assert!(matches!(err, VellumError::InvalidQuery(_)));
}
