//! Boundary-aware text chunking
//!
//! Splits a document into overlapping chunks along natural boundaries:
//! paragraphs first, sentences inside oversized paragraphs. Every chunk
//! is a contiguous byte span of the source text, so concatenating the
//! non-overlapping suffixes in ordinal order reconstructs the document
//! exactly.

use crate::error::{Result, VellumError};
use crate::loader::Document;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A retrievable span of a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Parent document id
    pub source_id: String,
    /// Position within the parent document, starting at 0
    pub ordinal: usize,
    /// The chunk text, verbatim from the document
    pub text: String,
    /// Byte offset of `text` in the parent document
    pub start: usize,
    /// Byte offset one past the end of `text`
    pub end: usize,
    /// Whether the next chunk re-enters before this chunk ends
    pub overlap_with_next: bool,
}

impl Chunk {
    /// Identifier unique within the corpus: `"{source_id}#{ordinal}"`
    pub fn chunk_id(&self) -> String {
        format!("{}#{}", self.source_id, self.ordinal)
    }

    /// Token count of the chunk text
    pub fn weight(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A boundary unit: a byte range of the source plus its token weight.
#[derive(Debug, Clone, Copy)]
struct Unit {
    start: usize,
    end: usize,
    weight: usize,
}

/// Splits documents into overlapping chunks.
///
/// `chunk_size` and `chunk_overlap` are measured in whitespace-delimited
/// tokens. Units are accumulated greedily until the next one would push a
/// chunk past `chunk_size`; the following chunk re-enters at the earliest
/// trailing unit whose cumulative weight stays within `chunk_overlap`.
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    paragraph_re: Regex,
    sentence_re: Regex,
}

impl TextChunker {
    /// Rejects `chunk_overlap >= chunk_size` eagerly, before any document
    /// is touched.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(VellumError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(VellumError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            paragraph_re: Regex::new(r"\n[ \t]*\n\s*").map_err(anyhow::Error::from)?,
            sentence_re: Regex::new(r#"[.!?]+["')\]]*\s+"#).map_err(anyhow::Error::from)?,
        })
    }

    /// Chunk one document. A document within the size budget yields
    /// exactly one chunk; a blank document yields none.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = document.raw_text.as_str();
        if text.trim().is_empty() {
            return Vec::new();
        }

        let units = self.units(text);
        let mut chunks: Vec<Chunk> = Vec::new();

        let mut chunk_start = 0; // first unit of the chunk being filled
        let mut chunk_weight = 0;
        let mut next = 0; // next unit to place

        while next < units.len() {
            let w = units[next].weight;
            if chunk_weight > 0 && chunk_weight + w > self.chunk_size {
                // Emit the filled chunk, then walk back over its trailing
                // units to find where the next chunk re-enters. The overlap
                // must leave room for the incoming unit, otherwise the next
                // chunk would consist of already-emitted text only.
                let mut reentry = next;
                let mut overlap_weight = 0;
                while reentry - 1 > chunk_start
                    && overlap_weight + units[reentry - 1].weight <= self.chunk_overlap
                    && overlap_weight + units[reentry - 1].weight + w <= self.chunk_size
                {
                    overlap_weight += units[reentry - 1].weight;
                    reentry -= 1;
                }
                let overlaps = reentry < next;
                chunks.push(self.emit(document, &units[chunk_start..next], chunks.len(), overlaps));

                chunk_start = reentry;
                chunk_weight = units[chunk_start..next].iter().map(|u| u.weight).sum();
            } else {
                chunk_weight += w;
                next += 1;
            }
        }

        if chunk_start < units.len() {
            chunks.push(self.emit(document, &units[chunk_start..], chunks.len(), false));
        }

        chunks
    }

    fn emit(&self, document: &Document, units: &[Unit], ordinal: usize, overlaps: bool) -> Chunk {
        let start = units[0].start;
        let end = units[units.len() - 1].end;
        Chunk {
            source_id: document.source_id.clone(),
            ordinal,
            text: document.raw_text[start..end].to_string(),
            start,
            end,
            overlap_with_next: overlaps,
        }
    }

    /// Boundary units covering the whole text with no gaps: paragraphs,
    /// refined to sentences only where a paragraph is over budget. A
    /// sentence that alone exceeds the budget stays one unit; the greedy
    /// loop emits it as an oversized chunk rather than truncating it.
    fn units(&self, text: &str) -> Vec<Unit> {
        let mut units = Vec::new();
        for (start, end) in split_at_matches(text, &self.paragraph_re) {
            if weight_of(&text[start..end]) <= self.chunk_size {
                units.push(unit(text, start, end));
                continue;
            }
            for (s, e) in split_at_matches(&text[start..end], &self.sentence_re) {
                units.push(unit(text, start + s, start + e));
            }
        }
        units
    }
}

fn unit(text: &str, start: usize, end: usize) -> Unit {
    Unit {
        start,
        end,
        weight: weight_of(&text[start..end]),
    }
}

fn weight_of(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Ranges split at the end of each separator match; separators stay
/// attached to the preceding range, so the ranges tile the input exactly.
fn split_at_matches(text: &str, separator: &Regex) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for m in separator.find_iter(text) {
        if m.end() < text.len() {
            ranges.push((start, m.end()));
            start = m.end();
        }
    }
    if start < text.len() {
        ranges.push((start, text.len()));
    }
    ranges
}
