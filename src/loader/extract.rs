use ahash::AHashMap;
use anyhow::{anyhow, Result};
use regex::Regex;

/// Text extraction function: raw file bytes to plain text.
pub type ExtractFn = Box<dyn Fn(&[u8]) -> Result<String> + Send + Sync>;

/// Extension-keyed registry of text extractors.
///
/// Format dispatch is resolved once at load time by looking the extension
/// up here; there is no runtime type inspection. Callers can register
/// additional formats before handing the registry to a loader.
pub struct ExtractorRegistry {
    by_ext: AHashMap<String, ExtractFn>,
}

impl ExtractorRegistry {
    /// Registry with the built-in extractors: UTF-8 text for plain,
    /// markup-free, code, and data formats; tag-stripping for HTML.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self {
            by_ext: AHashMap::new(),
        };

        const TEXT_EXTENSIONS: &[&str] = &[
            "md", "txt", "rst", "log", "json", "csv", "yaml", "yml", "toml", "rs", "py", "js",
            "ts", "java", "c", "cpp", "go", "sh",
        ];
        for ext in TEXT_EXTENSIONS {
            registry.register(ext, Box::new(extract_utf8));
        }

        // Tags carry no retrievable prose; strip them, keep the text.
        let script_re = Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>")?;
        let tag_re = Regex::new(r"(?s)<[^>]*>")?;
        let html = move |bytes: &[u8]| -> Result<String> {
            let raw = extract_utf8(bytes)?;
            let without_blocks = script_re.replace_all(&raw, " ");
            Ok(tag_re.replace_all(&without_blocks, " ").into_owned())
        };
        let html: std::sync::Arc<dyn Fn(&[u8]) -> Result<String> + Send + Sync> =
            std::sync::Arc::new(html);
        for ext in ["html", "htm"] {
            let html = html.clone();
            registry.register(ext, Box::new(move |bytes| html(bytes)));
        }

        Ok(registry)
    }

    /// Register an extractor for an extension (without dot, lowercased).
    pub fn register(&mut self, extension: &str, extractor: ExtractFn) {
        self.by_ext.insert(extension.to_lowercase(), extractor);
    }

    /// Look up the extractor for an extension, if one is registered.
    pub fn get(&self, extension: &str) -> Option<&ExtractFn> {
        self.by_ext.get(&extension.to_lowercase())
    }
}

fn extract_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| anyhow!("invalid UTF-8: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_extraction() {
        let registry = ExtractorRegistry::with_defaults().unwrap();
        let extract = registry.get("md").unwrap();
        assert_eq!(extract(b"# Title\nbody").unwrap(), "# Title\nbody");
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let registry = ExtractorRegistry::with_defaults().unwrap();
        let extract = registry.get("txt").unwrap();
        assert!(extract(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_html_tags_are_stripped() {
        let registry = ExtractorRegistry::with_defaults().unwrap();
        let extract = registry.get("html").unwrap();
        let text = extract(b"<html><script>var x = 1;</script><p>hello <b>world</b></p></html>")
            .unwrap();
        assert!(text.contains("hello"));
        assert!(text.contains("world"));
        assert!(!text.contains("script"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_unknown_extension_has_no_extractor() {
        let registry = ExtractorRegistry::with_defaults().unwrap();
        assert!(registry.get("exe").is_none());
    }

    #[test]
    fn test_custom_extractor_registration() {
        let mut registry = ExtractorRegistry::with_defaults().unwrap();
        registry.register("rot13", Box::new(|_| Ok("decoded".to_string())));
        let extract = registry.get("ROT13").unwrap();
        assert_eq!(extract(b"x").unwrap(), "decoded");
    }
}
