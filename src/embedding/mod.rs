//! Embedding provider port
//!
//! The engine never talks to an embedding backend directly; everything
//! goes through [`EmbeddingProvider`], so the pipeline is testable with a
//! deterministic implementation and swappable to a local model.

mod fastembed_provider;
mod hashing;

pub use fastembed_provider::FastEmbedProvider;
pub use hashing::HashingEmbedder;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    Init(String),

    #[error("Embedding generation failed: {0}")]
    Generation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for embedding backends
///
/// Implementations must be deterministic for identical input within one
/// process lifetime; the index relies on query vectors living in the same
/// space as the stored records.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts. The default loops over
    /// [`embed`](Self::embed); backends with a batched path override it.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Embedding dimension
    fn dimension(&self) -> usize;

    /// Model name, for logs and stats
    fn model_name(&self) -> &str;
}
