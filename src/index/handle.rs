use super::EmbeddingIndex;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Atomically swappable publication point for index generations.
///
/// Queries take a snapshot and keep it for their whole lifetime; a rebuild
/// publishes a fully constructed replacement with one write-lock swap, so
/// no query ever observes a half-built index.
pub struct IndexHandle {
    current: RwLock<Arc<EmbeddingIndex>>,
}

impl IndexHandle {
    /// Handle starting from an empty generation
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(EmbeddingIndex::empty())),
        }
    }

    /// The currently published generation
    pub async fn snapshot(&self) -> Arc<EmbeddingIndex> {
        self.current.read().await.clone()
    }

    /// Publish a new generation, replacing the previous one. In-flight
    /// queries holding the old snapshot complete undisturbed.
    pub async fn publish(&self, index: EmbeddingIndex) -> Arc<EmbeddingIndex> {
        let next = Arc::new(index);
        let mut current = self.current.write().await;
        *current = next.clone();
        next
    }
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}
