use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the vellum engine
#[derive(Error, Debug)]
pub enum VellumError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Index build failure; the previously published index keeps serving
    #[error("Index build failed: {0}")]
    Index(#[from] crate::index::IndexError),

    /// Per-query retrieval failure
    #[error(transparent)]
    Retrieval(#[from] crate::retrieval::RetrievalError),

    /// Per-query synthesis failure
    #[error(transparent)]
    Synthesis(#[from] crate::synthesis::SynthesisError),

    /// Provider construction or invocation errors
    #[error("Provider error: {0}")]
    Provider(String),

    /// Invalid query text
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for vellum operations
pub type Result<T> = std::result::Result<T, VellumError>;
