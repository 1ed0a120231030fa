use super::{EmbeddingError, EmbeddingProvider};

/// Deterministic feature-hashing embedder
///
/// Buckets each token and its character trigrams into a fixed-dimension
/// vector via blake3, then normalizes to unit length. No model download,
/// no nondeterminism: two texts sharing vocabulary get a positive cosine
/// similarity, which is enough for offline use and for exercising the
/// full pipeline in tests. All components are non-negative, so scores
/// stay in `[0, 1]`.
pub struct HashingEmbedder {
    dimension: usize,
    name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            name: format!("hashing-{}", dimension),
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        let digest = blake3::hash(feature.as_bytes());
        let bytes = digest.as_bytes();
        let h = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        h as usize % self.dimension
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let mut vector = vec![0.0f32; self.dimension];
        for raw in text.split_whitespace() {
            let token: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            if token.is_empty() {
                continue;
            }

            vector[self.bucket(&token)] += 1.0;

            // Trigrams give morphological variants ("return"/"returns")
            // shared mass.
            let chars: Vec<char> = token.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(&trigram)] += 0.5;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Err(EmbeddingError::InvalidInput(
                "Text has no hashable tokens".to_string(),
            ));
        }
        for x in &mut vector {
            *x /= norm;
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
