//! Grounded answer synthesis with source citations
//!
//! Builds a bounded prompt from the retrieved chunks, invokes the
//! generative capability once, and post-processes the response into an
//! [`Answer`] carrying deduplicated citations. Zero retrieved chunks
//! short-circuit into an abstention without touching the generator.

use crate::generation::{GenerationError, GenerativeProvider};
use crate::retrieval::ScoredChunk;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Exact phrase the prompt instructs the model to reply with when the
/// supplied context cannot answer the question.
pub const ABSTAIN_MESSAGE: &str = "I don't have that information.";

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Generation failed for question {question:?}: {source}")]
    Generation {
        question: String,
        source: GenerationError,
    },
}

/// Synthesized answer for one query; not persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Generated prose
    pub text: String,
    /// Distinct source ids backing the answer, in citation order
    pub citations: Vec<String>,
    /// True when the engine declined to answer
    pub abstained: bool,
}

impl Answer {
    fn abstention() -> Self {
        Self {
            text: ABSTAIN_MESSAGE.to_string(),
            citations: Vec::new(),
            abstained: true,
        }
    }
}

/// Builds grounding prompts and post-processes generated answers
pub struct Synthesizer {
    generator: Arc<dyn GenerativeProvider>,
    max_context_chars: usize,
}

impl Synthesizer {
    pub fn new(generator: Arc<dyn GenerativeProvider>, max_context_chars: usize) -> Self {
        Self {
            generator,
            max_context_chars,
        }
    }

    /// Produce an answer for `question` grounded in `context`.
    ///
    /// With no context the result is an immediate abstention; the
    /// generator is not invoked. Generator failures surface as
    /// [`SynthesisError`] with the question preserved and never affect
    /// the index or other queries.
    pub async fn synthesize(
        &self,
        question: &str,
        context: &[ScoredChunk],
    ) -> Result<Answer, SynthesisError> {
        if context.is_empty() {
            tracing::debug!("No context retrieved: abstaining without generation");
            return Ok(Answer::abstention());
        }

        let prompt = self.build_prompt(question, context);
        let raw = self
            .generator
            .generate(&prompt)
            .map_err(|source| SynthesisError::Generation {
                question: question.to_string(),
                source,
            })?;

        Ok(attach_citations(raw, context))
    }

    /// Bounded grounding prompt: instruction header, source-tagged chunks
    /// in rank order, then the question. Lower-ranked chunks are dropped
    /// once the context budget is spent; a single over-budget chunk is
    /// truncated instead so the prompt never goes out empty.
    fn build_prompt(&self, question: &str, context: &[ScoredChunk]) -> String {
        let mut prompt = String::new();
        prompt.push_str(
            "You are answering questions about a document collection.\n\
             Answer using only the context below. If the context does not \
             contain the answer, reply exactly: ",
        );
        prompt.push_str(ABSTAIN_MESSAGE);
        prompt.push_str("\nName the sources you used in your answer.\n\nContext:\n");

        let mut used = 0;
        let mut dropped = 0;
        for (rank, scored) in context.iter().enumerate() {
            let block = format!("[source: {}]\n{}\n\n", scored.chunk.source_id, scored.chunk.text);
            if used + block.len() <= self.max_context_chars {
                used += block.len();
                prompt.push_str(&block);
            } else if rank == 0 {
                let budget = self.max_context_chars.saturating_sub(
                    "[source: ]\n\n\n".len() + scored.chunk.source_id.len(),
                );
                let cut = truncate_at_char_boundary(&scored.chunk.text, budget);
                prompt.push_str(&format!(
                    "[source: {}]\n{}\n\n",
                    scored.chunk.source_id, cut
                ));
                used = self.max_context_chars;
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!("Context budget dropped {} lower-ranked chunks", dropped);
        }

        prompt.push_str("Question: ");
        prompt.push_str(question);
        prompt.push_str("\nAnswer:");
        prompt
    }
}

/// Extract and validate citations from the generated text.
///
/// A cited source must actually be among the retrieved ones; anything
/// else the model names is ignored. Citations are ordered by first
/// occurrence and deduplicated. A response that cites nothing but is not
/// an abstention falls back to the distinct retrieved sources in rank
/// order, so grounded answers always carry their provenance.
fn attach_citations(raw: String, context: &[ScoredChunk]) -> Answer {
    let text = raw.trim().to_string();

    if text.contains(ABSTAIN_MESSAGE.trim_end_matches('.')) {
        return Answer {
            text,
            citations: Vec::new(),
            abstained: true,
        };
    }

    let mut seen = AHashSet::new();
    let mut found: Vec<(usize, String)> = Vec::new();
    for scored in context {
        let id = &scored.chunk.source_id;
        if seen.insert(id.as_str()) {
            if let Some(position) = text.find(id.as_str()) {
                found.push((position, id.clone()));
            }
        }
    }
    found.sort_by_key(|(position, _)| *position);

    let citations = if found.is_empty() {
        let mut fallback = Vec::new();
        let mut seen = AHashSet::new();
        for scored in context {
            if seen.insert(scored.chunk.source_id.as_str()) {
                fallback.push(scored.chunk.source_id.clone());
            }
        }
        fallback
    } else {
        found.into_iter().map(|(_, id)| id).collect()
    };

    Answer {
        text,
        citations,
        abstained: false,
    }
}

fn truncate_at_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut cut = max_bytes;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}
