//! The per-file value every detector consumes.

use super::tree::{NodeKind, Span, SyntaxNode};
use super::Language;

/// One parsed file. Immutable once built.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: String,
    pub language: Language,
    pub source: String,
    pub tree: SyntaxNode,
    /// Physical lines.
    pub line_count: u32,
    /// Lines holding at least one non-comment token.
    pub logical_line_count: u32,
    /// The parser recovered from syntax errors somewhere in the file.
    pub has_parse_errors: bool,
    code_lines: Vec<bool>,
}

impl SourceUnit {
    /// Assemble a unit from an already converted tree.
    ///
    /// `code_lines[i]` marks whether 1-indexed line `i + 1` carries code.
    pub fn new(
        path: impl Into<String>,
        language: Language,
        source: String,
        tree: SyntaxNode,
        code_lines: Vec<bool>,
        has_parse_errors: bool,
    ) -> Self {
        let line_count = count_lines(&source);
        let logical_line_count = code_lines.iter().filter(|c| **c).count() as u32;
        Self {
            path: path.into(),
            language,
            source,
            tree,
            line_count,
            logical_line_count,
            has_parse_errors,
            code_lines,
        }
    }

    /// Parse in-memory text with the default adapter.
    #[cfg(feature = "tree-sitter")]
    pub fn from_source(
        path: impl Into<String>,
        language: Language,
        source: impl Into<String>,
    ) -> Result<Self, crate::error::ParseError> {
        super::treesitter::parse_source(path.into(), language, source.into())
    }

    /// Source text covered by a node.
    pub fn text(&self, node: &SyntaxNode) -> &str {
        self.slice(&node.span)
    }

    pub fn slice(&self, span: &Span) -> &str {
        self.source
            .get(span.start_byte..span.end_byte)
            .unwrap_or_default()
    }

    /// Logical lines between two 1-indexed lines, inclusive.
    pub fn logical_lines_in(&self, start_line: u32, end_line: u32) -> u32 {
        if start_line == 0 || end_line < start_line {
            return 0;
        }
        let start = (start_line - 1) as usize;
        let end = (end_line as usize).min(self.code_lines.len());
        if start >= end {
            return 0;
        }
        self.code_lines[start..end].iter().filter(|c| **c).count() as u32
    }

    pub fn is_code_line(&self, line: u32) -> bool {
        line > 0
            && self
                .code_lines
                .get((line - 1) as usize)
                .copied()
                .unwrap_or(false)
    }

    /// First line that carries code, if any.
    pub fn first_code_line(&self) -> Option<u32> {
        self.code_lines
            .iter()
            .position(|c| *c)
            .map(|idx| idx as u32 + 1)
    }

    /// Comment nodes in document order.
    pub fn comments(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.tree
            .descendants()
            .filter(|n| n.kind == NodeKind::Comment)
    }
}

fn count_lines(source: &str) -> u32 {
    if source.is_empty() {
        return 0;
    }
    let newlines = source.bytes().filter(|b| *b == b'\n').count() as u32;
    if source.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}
