//! Configuration management for vellum
//!
//! Loading, validation, and environment overrides for the engine
//! configuration. Every knob that shapes ingestion, chunking, retrieval,
//! or synthesis lives here so the rest of the crate stays policy-free.

use crate::error::{Result, VellumError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ingest: IngestConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
}

/// Document ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// File extensions (without dot) considered during the directory walk
    pub extensions: Vec<String>,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size, in whitespace-delimited tokens
    pub chunk_size: usize,
    /// Tokens of trailing context repeated at the start of the next chunk
    pub chunk_overlap: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per query
    pub top_k: usize,
    /// Minimum similarity score for a chunk to reach the synthesizer
    pub min_score: f32,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name: "hashing" or "fastembed"
    pub provider: String,
    /// Model name for the fastembed provider
    pub model: String,
    /// Vector dimension for the hashing provider
    pub dimension: usize,
    /// Batch size for index-build embedding calls
    pub batch_size: usize,
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name; "extractive" is the built-in offline generator.
    /// External backends are injected through the library API.
    pub provider: String,
    /// Upper bound on grounding-context characters per prompt
    pub max_context_chars: usize,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VellumError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| VellumError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| VellumError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load from an explicit path, the default path if one exists there,
    /// or fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load(&default)
                } else {
                    let mut config = Self::default();
                    config.apply_env_overrides();
                    ConfigValidator::validate(&config)?;
                    Ok(config)
                }
            }
        }
    }

    /// Apply environment variable overrides
    /// Environment variables in format: VELLUM_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("VELLUM_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "CHUNKING__CHUNK_SIZE" => {
                self.chunking.chunk_size = parse_env(path, value)?;
            }
            "CHUNKING__CHUNK_OVERLAP" => {
                self.chunking.chunk_overlap = parse_env(path, value)?;
            }
            "RETRIEVAL__TOP_K" => {
                self.retrieval.top_k = parse_env(path, value)?;
            }
            "EMBEDDING__PROVIDER" => {
                self.embedding.provider = value.to_string();
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "LLM__PROVIDER" => {
                self.llm.provider = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| VellumError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("vellum").join("config.toml"))
    }
}

fn parse_env(path: &str, value: &str) -> Result<usize> {
    value.parse().map_err(|_| {
        VellumError::Config(format!("Cannot parse '{}' as integer for {}", value, path))
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ingest: IngestConfig {
                extensions: [
                    "md", "txt", "rst", "log", "html", "htm", "json", "csv", "yaml", "yml",
                    "toml", "rs", "py", "js", "ts", "java", "c", "cpp", "go", "sh",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            },
            chunking: ChunkingConfig {
                chunk_size: 512,
                chunk_overlap: 50,
            },
            retrieval: RetrievalConfig {
                top_k: 3,
                min_score: 0.0,
            },
            embedding: EmbeddingConfig {
                provider: "hashing".to_string(),
                model: "all-MiniLM-L6-v2".to_string(),
                dimension: 384,
                batch_size: 32,
            },
            llm: LlmConfig {
                provider: "extractive".to_string(),
                max_context_chars: 6000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.chunking.chunk_size, config.chunking.chunk_size);
        assert_eq!(parsed.ingest.extensions, config.ingest.extensions);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Config::load(Path::new("/nonexistent/vellum.toml")).unwrap_err();
        assert!(matches!(err, VellumError::ConfigNotFound { .. }));
    }
}
