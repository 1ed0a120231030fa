//! Generative provider port
//!
//! Answer generation is a black-box capability behind
//! [`GenerativeProvider`]. The crate ships one deterministic offline
//! implementation; network-backed LLM clients are injected by the
//! embedding application through the same trait.

use crate::synthesis::ABSTAIN_MESSAGE;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation failed: {0}")]
    Failed(String),

    #[error("Generation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Trait for answer generation backends
///
/// `generate` receives the fully assembled grounding prompt and returns
/// raw response text. Implementations may be slow or fallible; failures
/// surface per-query and never poison the index.
pub trait GenerativeProvider: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Model name, for logs and stats
    fn model_name(&self) -> &str;
}

/// Deterministic offline generator
///
/// Answers by quoting the top-ranked context block from the prompt and
/// naming its source, or with the abstention phrase when the prompt
/// carries no context. Useful without any model wired in, and as the
/// reproducibility baseline in tests.
pub struct ExtractiveGenerator {
    source_tag_re: Regex,
    max_sentences: usize,
}

impl ExtractiveGenerator {
    pub fn new() -> Result<Self, GenerationError> {
        Ok(Self {
            source_tag_re: Regex::new(r"\[source: ([^\]]+)\]")
                .map_err(|e| GenerationError::Failed(e.to_string()))?,
            max_sentences: 3,
        })
    }
}

impl GenerativeProvider for ExtractiveGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        // The first tagged block is the highest-ranked context.
        let Some(tag) = self.source_tag_re.captures(prompt) else {
            return Ok(ABSTAIN_MESSAGE.to_string());
        };
        let source_id = tag[1].to_string();
        let block_start = tag
            .get(0)
            .map(|m| m.end())
            .ok_or_else(|| GenerationError::MalformedResponse("empty capture".to_string()))?;

        let rest = &prompt[block_start..];
        let block_end = self
            .source_tag_re
            .find(rest)
            .map(|m| m.start())
            .or_else(|| rest.find("\nQuestion:"))
            .unwrap_or(rest.len());
        let block = rest[..block_end].trim();

        if block.is_empty() {
            return Ok(ABSTAIN_MESSAGE.to_string());
        }

        let mut sentences = 0;
        let mut cut = block.len();
        for (idx, ch) in block.char_indices() {
            if matches!(ch, '.' | '!' | '?') {
                sentences += 1;
                if sentences == self.max_sentences {
                    cut = idx + ch.len_utf8();
                    break;
                }
            }
        }

        Ok(format!(
            "{} (source: {})",
            block[..cut].trim().replace('\n', " "),
            source_id
        ))
    }

    fn model_name(&self) -> &str {
        "extractive"
    }
}
