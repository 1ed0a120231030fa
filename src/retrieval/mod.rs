//! Query-time retrieval against the published index

use crate::chunker::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::index::{IndexError, IndexHandle};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Query embedding failed: {0}")]
    Embedding(String),

    #[error("Query/index dimension mismatch: index is {expected}D, query embedding is {actual}D")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// A retrieved chunk with its similarity score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

impl ScoredChunk {
    /// Short single-line preview of the chunk text
    pub fn preview(&self, max_chars: usize) -> String {
        let flat = self.chunk.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            flat
        } else {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

/// Embeds queries and resolves nearest chunks from the current snapshot
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    handle: Arc<IndexHandle>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, handle: Arc<IndexHandle>) -> Self {
        Self { embedder, handle }
    }

    /// Retrieve the `top_k` most similar chunks for a query.
    ///
    /// The snapshot taken here is held for the whole call, so results are
    /// consistent even while a rebuild publishes a new generation. An
    /// empty index yields an empty list; callers handle "no relevant
    /// context" explicitly. A dimension disagreement between the query
    /// embedding and the index is a configuration bug and is fatal.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }

        let snapshot = self.handle.snapshot().await;
        if snapshot.is_empty() {
            tracing::debug!("Retrieval against empty index: no context");
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(query)
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let hits = snapshot.query(&vector, top_k).map_err(|e| match e {
            IndexError::QueryDimension { expected, actual } => {
                RetrievalError::DimensionMismatch { expected, actual }
            }
            other => RetrievalError::Embedding(other.to_string()),
        })?;

        tracing::debug!("Retrieved {} chunks for query", hits.len());

        Ok(hits
            .into_iter()
            .map(|(idx, score)| ScoredChunk {
                chunk: snapshot.record(idx).chunk().clone(),
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::index::EmbeddingIndex;

    fn chunk(source_id: &str, ordinal: usize, text: &str) -> Chunk {
        Chunk {
            source_id: source_id.to_string(),
            ordinal,
            text: text.to_string(),
            start: 0,
            end: text.len(),
            overlap_with_next: false,
        }
    }

    #[tokio::test]
    async fn test_empty_index_yields_empty_result() {
        let embedder = Arc::new(HashingEmbedder::new(64));
        let handle = Arc::new(IndexHandle::new());
        let retriever = Retriever::new(embedder, handle);

        let results = retriever.retrieve("anything at all", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let embedder = Arc::new(HashingEmbedder::new(64));
        let handle = Arc::new(IndexHandle::new());
        let retriever = Retriever::new(embedder, handle);

        let err = retriever.retrieve("   ", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_dimension_disagreement_is_fatal() {
        let index_embedder = HashingEmbedder::new(64);
        let chunks = vec![chunk("a.md", 0, "indexed text here")];
        let index = EmbeddingIndex::build(chunks, &index_embedder, 8).unwrap();

        let handle = Arc::new(IndexHandle::new());
        handle.publish(index).await;

        // Query-side embedder disagrees with the index dimension.
        let retriever = Retriever::new(Arc::new(HashingEmbedder::new(32)), handle);
        let err = retriever.retrieve("indexed text", 1).await.unwrap_err();
        assert!(matches!(err, RetrievalError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_retrieves_scored_chunks() {
        let embedder = Arc::new(HashingEmbedder::new(128));
        let chunks = vec![
            chunk("faq.md", 0, "Returns are accepted within 30 days."),
            chunk("ops.md", 0, "Kernel scheduling latency benchmark notes."),
        ];
        let index = EmbeddingIndex::build(chunks, embedder.as_ref(), 8).unwrap();

        let handle = Arc::new(IndexHandle::new());
        handle.publish(index).await;
        let retriever = Retriever::new(embedder, handle);

        let results = retriever.retrieve("what is the return window", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.source_id, "faq.md");
        assert!(results[0].score > results[1].score);
        assert!(results[0].score > 0.0);
    }
}
