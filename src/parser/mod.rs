//! Tree adapter: turns source files into [`SourceUnit`]s.
//!
//! This module provides:
//! - `TreeAdapter` trait: the only parsing interface the engine depends on
//! - `SyntaxNode` / `NodeKind`: the owned, language-neutral tree
//! - Tree-sitter implementation for Python, Rust, Go, JavaScript,
//!   TypeScript, Java, C and C++

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

mod tree;
mod unit;

#[cfg(feature = "tree-sitter")]
pub mod treesitter;

#[cfg(feature = "tree-sitter")]
pub mod languages;

pub use tree::{
    enclosing_function, visit, within_scope, Descendants, NodeKind, ScopedDescendants, Span,
    SyntaxNode,
};
pub use unit::SourceUnit;

#[cfg(feature = "tree-sitter")]
pub use treesitter::TreeSitterAdapter;

/// Deepest node nesting an adapter accepts. Detectors and the derived
/// trait impls on [`SyntaxNode`] recurse per level, so deeper files are
/// rejected at parse time and reported as ingestion failures.
pub const MAX_TREE_DEPTH: usize = 512;

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Rust,
    Go,
    JavaScript,
    TypeScript,
    Tsx,
    Java,
    C,
    Cpp,
}

impl Language {
    pub const ALL: &'static [Language] = &[
        Language::Python,
        Language::Rust,
        Language::Go,
        Language::JavaScript,
        Language::TypeScript,
        Language::Tsx,
        Language::Java,
        Language::C,
        Language::Cpp,
    ];

    /// Language for a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" | "pyi" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            "go" => Some(Language::Go),
            "js" | "mjs" | "cjs" | "jsx" => Some(Language::JavaScript),
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            "tsx" => Some(Language::Tsx),
            "java" => Some(Language::Java),
            "c" | "h" => Some(Language::C),
            "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }

    /// Whether a plain assignment inside a function creates a local binding.
    pub fn assignment_declares_local(&self) -> bool {
        matches!(self, Language::Python)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Converts raw source into the uniform tree view detectors consume.
pub trait TreeAdapter: Send + Sync {
    /// Read and parse one file.
    fn parse(&self, path: &Path, language: Language) -> Result<SourceUnit, ParseError>;

    /// Language for a path, or `None` when the adapter cannot handle it.
    fn detect_language(&self, path: &Path) -> Option<Language> {
        Language::from_path(path)
    }
}

/// An adapter used when no parser backend is compiled in. Every file
/// becomes an ingestion failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableAdapter;

impl TreeAdapter for UnavailableAdapter {
    fn parse(&self, path: &Path, _language: Language) -> Result<SourceUnit, ParseError> {
        Err(ParseError::new(
            path.display().to_string(),
            "no parser backend compiled in",
        ))
    }
}

/// The adapter used when the caller does not supply one.
pub fn default_adapter() -> Box<dyn TreeAdapter> {
    #[cfg(feature = "tree-sitter")]
    {
        Box::new(TreeSitterAdapter::new())
    }
    #[cfg(not(feature = "tree-sitter"))]
    {
        Box::new(UnavailableAdapter)
    }
}
