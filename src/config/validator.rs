use crate::config::Config;
use crate::error::{Result, ValidationError, VellumError};

/// Configuration validator
///
/// Runs every check and reports the full list of failures at once, so a
/// broken config file can be fixed in one pass.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_ingest(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_llm(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(VellumError::ConfigValidation { errors })
        }
    }

    fn validate_ingest(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.ingest.extensions.is_empty() {
            errors.push(ValidationError::new(
                "ingest.extensions",
                "At least one file extension is required",
            ));
        }

        for ext in &config.ingest.extensions {
            if ext.is_empty() || ext.starts_with('.') {
                errors.push(ValidationError::new(
                    "ingest.extensions",
                    format!("Extensions must be non-empty and without dot, got '{}'", ext),
                ));
            }
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.chunking.chunk_size == 0 {
            errors.push(ValidationError::new(
                "chunking.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if config.chunking.chunk_overlap >= config.chunking.chunk_size {
            errors.push(ValidationError::new(
                "chunking.chunk_overlap",
                format!(
                    "Overlap ({}) must be smaller than chunk size ({})",
                    config.chunking.chunk_overlap, config.chunking.chunk_size
                ),
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be at least 1",
            ));
        }

        let score = config.retrieval.min_score;
        if !(0.0..=1.0).contains(&score) {
            errors.push(ValidationError::new(
                "retrieval.min_score",
                format!("min_score must be between 0.0 and 1.0, got {}", score),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.embedding.provider;
        let valid_providers = ["hashing", "fastembed"];
        if !valid_providers.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, provider
                ),
            ));
        }

        if provider == "hashing" && config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Hashing embedder dimension must be greater than 0",
            ));
        }

        if provider == "fastembed" && config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.llm.provider;
        let valid_providers = ["extractive"];
        if !valid_providers.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "llm.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'; network backends are \
                     injected through the library API",
                    valid_providers, provider
                ),
            ));
        }

        if config.llm.max_context_chars == 0 {
            errors.push(ValidationError::new(
                "llm.max_context_chars",
                "Context budget must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut config = Config::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        let err = ConfigValidator::validate(&config).unwrap_err();
        match err {
            VellumError::ConfigValidation { errors } => {
                assert!(errors.iter().any(|e| e.path == "chunking.chunk_overlap"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_extensions_rejected() {
        let mut config = Config::default();
        config.ingest.extensions.clear();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = Config::default();
        config.embedding.provider = "quantum".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }
}
