//! Document discovery and text extraction
//!
//! Walks a root directory, extracts plain text from every file with a
//! recognized extension, and reports per-file failures without aborting
//! the load. Paths are sorted before processing so runs are reproducible.

mod extract;

pub use extract::{ExtractFn, ExtractorRegistry};

use crate::error::{Result, VellumError};
use ahash::{AHashMap, AHashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A loaded document, immutable once created
#[derive(Debug, Clone)]
pub struct Document {
    /// `/`-normalized path relative to the ingest root; unique per load
    pub source_id: String,
    /// Extracted plain text
    pub raw_text: String,
    /// Lowercased file extension the extractor was resolved from
    pub format_tag: String,
}

/// A file that matched the extension filter but could not be loaded
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a directory load
#[derive(Debug)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

/// Recursive directory loader with extension-based dispatch
pub struct DocumentLoader {
    extractors: ExtractorRegistry,
    extensions: AHashSet<String>,
}

impl DocumentLoader {
    /// Loader with the built-in extractor registry
    pub fn new(extensions: &[String]) -> Result<Self> {
        Ok(Self::with_registry(
            extensions,
            ExtractorRegistry::with_defaults()?,
        ))
    }

    /// Loader with a caller-supplied registry (custom formats)
    pub fn with_registry(extensions: &[String], extractors: ExtractorRegistry) -> Self {
        Self {
            extractors,
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Load every matching file under `root`.
    ///
    /// Files with unrecognized extensions are skipped silently. Files that
    /// match but fail to read or decode are recoverable: they land in
    /// `LoadReport::skipped` and the load continues. Two files that
    /// normalize to the same source id abort the load with a
    /// configuration error before any indexing can proceed.
    pub fn load(&self, root: &Path) -> Result<LoadReport> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| VellumError::Io {
                source: e.into(),
                context: format!("Failed to walk directory {}", root.display()),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
                if self.extensions.contains(&ext.to_lowercase()) {
                    paths.push(path);
                }
            }
        }
        paths.sort();

        let mut documents = Vec::new();
        let mut skipped = Vec::new();
        let mut seen: AHashMap<String, PathBuf> = AHashMap::new();

        for path in paths {
            let source_id = normalize_source_id(root, &path);
            if let Some(previous) = seen.get(&source_id) {
                return Err(VellumError::Config(format!(
                    "duplicate source id '{}' from {} and {}",
                    source_id,
                    previous.display(),
                    path.display()
                )));
            }

            match self.load_file(&path) {
                Ok((raw_text, format_tag)) => {
                    seen.insert(source_id.clone(), path);
                    documents.push(Document {
                        source_id,
                        raw_text,
                        format_tag,
                    });
                }
                Err(reason) => {
                    tracing::warn!("Skipping {}: {}", path.display(), reason);
                    skipped.push(SkippedFile { path, reason });
                }
            }
        }

        tracing::info!(
            "Loaded {} documents from {} ({} skipped)",
            documents.len(),
            root.display(),
            skipped.len()
        );

        Ok(LoadReport { documents, skipped })
    }

    fn load_file(&self, path: &Path) -> std::result::Result<(String, String), String> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .ok_or_else(|| "missing extension".to_string())?;

        let extract = self
            .extractors
            .get(&ext)
            .ok_or_else(|| format!("no extractor registered for extension '{}'", ext))?;

        let bytes = std::fs::read(path).map_err(|e| format!("read failed: {}", e))?;
        let text = extract(&bytes).map_err(|e| e.to_string())?;
        Ok((text, ext))
    }
}

/// Relative path with `/` separators; doubles as the citation label.
fn normalize_source_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}
