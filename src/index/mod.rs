//! Embedding index: exact nearest-neighbor search over chunk vectors
//!
//! Built once from a complete chunk set and immutable afterwards. Ranking
//! is an exact cosine scan, so tie-breaking and full-corpus queries are
//! deterministic; rebuilds go through [`IndexHandle`], which swaps the
//! published generation atomically.

mod handle;

pub use handle::IndexHandle;

use crate::chunker::Chunk;
use crate::embedding::EmbeddingProvider;
use chrono::{DateTime, Utc};
use ndarray::Array1;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Embedding failed for chunk {chunk_id}: {reason}")]
    Embedding { chunk_id: String, reason: String },

    #[error("Embedding batch returned {actual} vectors for {expected} chunks")]
    BatchShape { expected: usize, actual: usize },

    #[error("Inconsistent dimension: index is {expected}D, chunk {chunk_id} embedded as {actual}D")]
    DimensionDrift {
        expected: usize,
        actual: usize,
        chunk_id: String,
    },

    #[error("Query dimension mismatch: index is {expected}D, query is {actual}D")]
    QueryDimension { expected: usize, actual: usize },
}

/// One indexed chunk with its embedding
#[derive(Debug)]
pub struct EmbeddingRecord {
    chunk: Chunk,
    vector: Array1<f32>,
    norm: f32,
}

impl EmbeddingRecord {
    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }
}

/// Immutable, queryable index over a chunk corpus
#[derive(Debug)]
pub struct EmbeddingIndex {
    generation: Uuid,
    built_at: DateTime<Utc>,
    dimension: usize,
    records: Vec<EmbeddingRecord>,
    doc_count: usize,
    fingerprint: String,
}

impl EmbeddingIndex {
    /// Index with no records; answers every query with an empty result.
    pub fn empty() -> Self {
        Self {
            generation: Uuid::new_v4(),
            built_at: Utc::now(),
            dimension: 0,
            records: Vec::new(),
            doc_count: 0,
            fingerprint: String::new(),
        }
    }

    /// Embed every chunk and build the index.
    ///
    /// All-or-nothing: any embedding failure, batch shape mismatch, or
    /// dimension drift aborts the whole build, so a partially embedded
    /// index can never be observed.
    pub fn build(
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self, IndexError> {
        let mut records = Vec::with_capacity(chunks.len());
        let mut dimension = 0;

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = provider
                .embed_batch(&texts)
                .map_err(|e| IndexError::Embedding {
                    chunk_id: batch[0].chunk_id(),
                    reason: e.to_string(),
                })?;
            if vectors.len() != batch.len() {
                return Err(IndexError::BatchShape {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                if dimension == 0 {
                    dimension = vector.len();
                } else if vector.len() != dimension {
                    return Err(IndexError::DimensionDrift {
                        expected: dimension,
                        actual: vector.len(),
                        chunk_id: chunk.chunk_id(),
                    });
                }

                let vector = Array1::from_vec(vector);
                let norm = vector.dot(&vector).sqrt();
                records.push(EmbeddingRecord {
                    chunk: chunk.clone(),
                    vector,
                    norm,
                });
            }
        }

        let mut hasher = blake3::Hasher::new();
        let mut sources = ahash::AHashSet::new();
        for record in &records {
            let chunk = &record.chunk;
            sources.insert(chunk.source_id.as_str());
            hasher.update(chunk.source_id.as_bytes());
            hasher.update(&[0]);
            hasher.update(chunk.text.as_bytes());
        }
        let doc_count = sources.len();
        drop(sources);

        let index = Self {
            generation: Uuid::new_v4(),
            built_at: Utc::now(),
            dimension,
            records,
            doc_count,
            fingerprint: hasher.finalize().to_hex().to_string(),
        };

        tracing::info!(
            "Built index generation {}: {} chunks from {} documents ({}D)",
            index.generation,
            index.records.len(),
            index.doc_count,
            index.dimension
        );

        Ok(index)
    }

    /// Rank every record against `vector` and return up to `top_k` hits,
    /// best first. Equal scores order by ascending chunk ordinal, then
    /// lexicographic source id. `top_k` beyond the corpus size returns
    /// the whole corpus, ranked.
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if self.records.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimension {
            return Err(IndexError::QueryDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let query = ndarray::ArrayView1::from(vector);
        let query_norm = query.dot(&query).sqrt();

        let mut hits: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let denominator = record.norm * query_norm;
                let score = if denominator > 0.0 {
                    record.vector.dot(&query) / denominator
                } else {
                    0.0
                };
                (i, score)
            })
            .collect();

        hits.sort_by(|&(a, a_score), &(b, b_score)| {
            let (a, b) = (&self.records[a].chunk, &self.records[b].chunk);
            b_score
                .total_cmp(&a_score)
                .then_with(|| a.ordinal.cmp(&b.ordinal))
                .then_with(|| a.source_id.cmp(&b.source_id))
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    pub fn record(&self, idx: usize) -> &EmbeddingRecord {
        &self.records[idx]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    /// blake3 digest over the indexed (source_id, text) pairs; identical
    /// corpora produce identical fingerprints across rebuilds.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Distinct source ids, sorted
    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self
            .records
            .iter()
            .map(|r| r.chunk.source_id.clone())
            .collect::<ahash::AHashSet<_>>()
            .into_iter()
            .collect();
        sources.sort();
        sources
    }
}
