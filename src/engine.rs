//! End-to-end orchestration: ingest, publish, answer
//!
//! Ties the pipeline together: Load -> Chunk -> Build during (re)indexing,
//! Retrieve -> Synthesize per query. The engine owns the publication
//! handle; everything else is stateless per call, so concurrent queries
//! need no locking beyond the snapshot they take.

use crate::chunker::{Chunk, TextChunker};
use crate::config::{Config, ConfigValidator};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, VellumError};
use crate::generation::GenerativeProvider;
use crate::index::{EmbeddingIndex, IndexHandle};
use crate::loader::DocumentLoader;
use crate::retrieval::{Retriever, ScoredChunk};
use crate::synthesis::{Answer, Synthesizer};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Snapshot statistics of the published index
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub generation: Uuid,
    pub built_at: DateTime<Utc>,
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub fingerprint: String,
}

/// The question-answering engine
pub struct Engine {
    config: Config,
    loader: DocumentLoader,
    chunker: TextChunker,
    retriever: Retriever,
    synthesizer: Synthesizer,
    handle: Arc<IndexHandle>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine from a validated configuration and the two
    /// injected capabilities. Validation happens here, before any file
    /// or embedding work: a bad chunking configuration never reaches the
    /// corpus.
    pub fn new(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerativeProvider>,
    ) -> Result<Self> {
        ConfigValidator::validate(&config)?;

        let loader = DocumentLoader::new(&config.ingest.extensions)?;
        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let handle = Arc::new(IndexHandle::new());
        let retriever = Retriever::new(embedder.clone(), handle.clone());
        let synthesizer = Synthesizer::new(generator, config.llm.max_context_chars);

        Ok(Self {
            config,
            loader,
            chunker,
            retriever,
            synthesizer,
            handle,
            embedder,
        })
    }

    /// Load, chunk, embed, and publish an index for `root`.
    ///
    /// The new generation is constructed completely before it replaces
    /// the published one; on any failure the previous generation keeps
    /// serving. An ingest that discovers no documents is a configuration
    /// error, surfaced before anything is published.
    pub async fn build(&self, root: &Path) -> Result<IndexStats> {
        let report = self.loader.load(root)?;
        if !report.skipped.is_empty() {
            tracing::warn!("{} files skipped during load", report.skipped.len());
        }
        if report.documents.is_empty() {
            return Err(VellumError::Config(format!(
                "no documents found under {}",
                root.display()
            )));
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        for document in &report.documents {
            chunks.extend(self.chunker.chunk(document));
        }
        tracing::info!(
            "Chunked {} documents into {} chunks",
            report.documents.len(),
            chunks.len()
        );

        let index = EmbeddingIndex::build(
            chunks,
            self.embedder.as_ref(),
            self.config.embedding.batch_size,
        )?;
        let stats = stats_of(&index);
        self.handle.publish(index).await;

        Ok(stats)
    }

    /// Rebuild from the same root and atomically replace the published
    /// index. In-flight queries finish against the generation they
    /// snapshotted.
    pub async fn refresh(&self, root: &Path) -> Result<IndexStats> {
        tracing::info!("Refreshing index from {}", root.display());
        self.build(root).await
    }

    /// Answer a question from the indexed corpus.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(VellumError::InvalidQuery(
                "Question cannot be empty".to_string(),
            ));
        }

        let context = self.retrieve(question, self.config.retrieval.top_k).await?;
        let answer = self.synthesizer.synthesize(question, &context).await?;

        tracing::debug!(
            abstained = answer.abstained,
            citations = answer.citations.len(),
            "Answered question"
        );
        Ok(answer)
    }

    /// Retrieval only: the ranked chunks a question would be grounded on.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredChunk>> {
        self.retrieve(query, limit).await
    }

    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<ScoredChunk>> {
        let mut results = self.retriever.retrieve(query, limit).await?;
        let min_score = self.config.retrieval.min_score;
        if min_score > 0.0 {
            results.retain(|r| r.score >= min_score);
        }
        Ok(results)
    }

    /// Distinct indexed source ids, sorted
    pub async fn sources(&self) -> Vec<String> {
        self.handle.snapshot().await.sources()
    }

    /// Statistics of the currently published generation
    pub async fn stats(&self) -> IndexStats {
        let snapshot = self.handle.snapshot().await;
        stats_of(&snapshot)
    }
}

fn stats_of(index: &EmbeddingIndex) -> IndexStats {
    IndexStats {
        generation: index.generation(),
        built_at: index.built_at(),
        documents: index.doc_count(),
        chunks: index.len(),
        dimension: index.dimension(),
        fingerprint: index.fingerprint().to_string(),
    }
}
