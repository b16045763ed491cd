//! Skeleton extraction module
//!
//! Reduces a source file to its structural summary:
//! - Python files are parsed with tree-sitter (signatures, docstrings, effects)
//! - TypeScript/JavaScript and Go files are scanned line by line
//! - Everything else is kept verbatim, truncated past a size ceiling
//!
//! Every variant also reports the raw, unresolved dependency names it saw.

mod go;
mod lines;
pub mod python;
mod typescript;

pub use python::{PythonSkeletonizer, PARSE_FAILURE_PREFIX};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::Path;

/// Default ceiling for verbatim skeletons of unsupported files
pub const MAX_RAW_SKELETON_BYTES: usize = 100 * 1024;

/// Compute a stable fingerprint for file content
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Source language, selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    TypeScript,
    JavaScript,
    Go,
    /// Unsupported or binary-like content
    Other,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Language::Python,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "go" => Language::Go,
            _ => Language::Other,
        }
    }

    /// Detect language from a (relative or absolute) path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Other)
    }

    /// Parse the stored name back into a language
    pub fn from_name(name: &str) -> Self {
        match name {
            "python" => Language::Python,
            "typescript" => Language::TypeScript,
            "javascript" => Language::JavaScript,
            "go" => Language::Go,
            _ => Language::Other,
        }
    }

    /// Stable lowercase name, used for storage and display
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Go => "go",
            Language::Other => "other",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structural summary of one file plus its unresolved dependency names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Skeleton {
    /// Skeleton text stored on the node
    pub text: String,
    /// Raw, language-native module names
    pub dependencies: BTreeSet<String>,
}

impl Skeleton {
    /// A skeleton without dependencies
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            dependencies: BTreeSet::new(),
        }
    }
}

/// Errors raised while parsing a file with a full grammar
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid syntax at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error("missing `{expected}` at line {line}, column {column}")]
    Missing {
        expected: String,
        line: usize,
        column: usize,
    },

    #[error("parser produced no tree")]
    NoTree,
}

/// Extracts skeletons, dispatching on the file's language
pub struct SkeletonExtractor {
    python: PythonSkeletonizer,
    raw_limit: usize,
}

impl SkeletonExtractor {
    /// Create a new extractor with the default raw size ceiling
    pub fn new() -> Result<Self> {
        Ok(Self {
            python: PythonSkeletonizer::new()?,
            raw_limit: MAX_RAW_SKELETON_BYTES,
        })
    }

    /// Override the ceiling applied to verbatim skeletons
    pub fn with_raw_limit(mut self, limit: usize) -> Self {
        self.raw_limit = limit;
        self
    }

    /// Extract the skeleton of `content`, located at repository-relative `path`.
    ///
    /// Never fails: Python parse errors turn into a one-line diagnostic skeleton.
    pub fn extract(&mut self, path: &str, content: &str) -> Skeleton {
        match Language::from_path(path) {
            Language::Python => match self.python.skeletonize(content) {
                Ok(skeleton) => skeleton,
                Err(e) => {
                    tracing::debug!("Parse failure in {}: {}", path, e);
                    Skeleton::text_only(format!("{} {}: {}", PARSE_FAILURE_PREFIX, path, e))
                }
            },
            Language::TypeScript | Language::JavaScript => typescript::skeletonize(content),
            Language::Go => go::skeletonize(content),
            Language::Other => raw_skeleton(content, self.raw_limit),
        }
    }
}

/// Verbatim skeleton, truncated to `limit` bytes with a notice
fn raw_skeleton(content: &str, limit: usize) -> Skeleton {
    if content.len() <= limit {
        return Skeleton::text_only(content);
    }

    let mut end = limit;
    while !content.is_char_boundary(end) {
        end -= 1;
    }

    Skeleton::text_only(format!(
        "# Content truncated (size: {} bytes)\n{}...",
        content.len(),
        &content[..end]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash(b"print('hi')\n");
        let b = content_hash(b"print('hi')\n");
        let c = content_hash(b"print('bye')\n");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::from_path("pkg/mod.py"), Language::Python);
        assert_eq!(Language::from_path("web/app.tsx"), Language::TypeScript);
        assert_eq!(Language::from_path("web/app.mjs"), Language::JavaScript);
        assert_eq!(Language::from_path("cmd/main.go"), Language::Go);
        assert_eq!(Language::from_path("README.md"), Language::Other);
        assert_eq!(Language::from_path("Makefile"), Language::Other);
        assert_eq!(Language::from_name("go"), Language::Go);
    }

    #[test]
    fn test_unknown_files_are_kept_verbatim() {
        let mut extractor = SkeletonExtractor::new().unwrap();
        let skeleton = extractor.extract("notes.txt", "hello\nworld\n");

        assert_eq!(skeleton.text, "hello\nworld\n");
        assert!(skeleton.dependencies.is_empty());
    }

    #[test]
    fn test_large_files_are_truncated() {
        let mut extractor = SkeletonExtractor::new().unwrap().with_raw_limit(16);
        let content = "x".repeat(40);
        let skeleton = extractor.extract("data.csv", &content);

        assert!(skeleton.text.starts_with("# Content truncated (size: 40 bytes)\n"));
        assert!(skeleton.text.ends_with(&format!("{}...", "x".repeat(16))));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let content = "é".repeat(10);
        let skeleton = raw_skeleton(&content, 5);

        assert!(skeleton.text.ends_with("éé..."));
    }

    #[test]
    fn test_python_parse_failure_is_a_diagnostic() {
        let mut extractor = SkeletonExtractor::new().unwrap();
        let skeleton = extractor.extract("pkg/broken.py", "def broken(:\n    return\n");

        assert!(skeleton.text.starts_with(PARSE_FAILURE_PREFIX));
        assert!(skeleton.text.contains("pkg/broken.py"));
        assert_eq!(skeleton.text.lines().count(), 1);
        assert!(skeleton.dependencies.is_empty());
    }
}
