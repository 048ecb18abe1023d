//! Tree-sitter backed [`TreeAdapter`].
//!
//! Parsing happens in two passes over the native tree: the language's
//! declaration query names functions and classes, then a cursor walk
//! converts every named node into an owned [`SyntaxNode`] and records which
//! lines carry code.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser as TsParser, QueryCursor, TreeCursor};

use super::languages::{config_for, LanguageConfig};
use super::{Language, NodeKind, SourceUnit, Span, SyntaxNode, TreeAdapter, MAX_TREE_DEPTH};
use crate::error::ParseError;

/// Adapter over the bundled tree-sitter grammars.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterAdapter;

impl TreeSitterAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl TreeAdapter for TreeSitterAdapter {
    fn parse(&self, path: &Path, language: Language) -> Result<SourceUnit, ParseError> {
        let display = path.display().to_string();
        let bytes = fs::read(path).map_err(|e| ParseError::new(&display, e.to_string()))?;
        let source = String::from_utf8_lossy(&bytes).into_owned();
        parse_source(display, language, source)
    }
}

/// Parse in-memory source into a unit.
pub fn parse_source(
    path: String,
    language: Language,
    source: String,
) -> Result<SourceUnit, ParseError> {
    match build_unit(&path, language, source) {
        Ok(unit) => Ok(unit),
        Err(e) => Err(ParseError::new(path, format!("{:#}", e))),
    }
}

fn build_unit(path: &str, language: Language, source: String) -> anyhow::Result<SourceUnit> {
    let config = config_for(language);
    let mut parser = TsParser::new();
    parser
        .set_language(&config.grammar())
        .context("grammar rejected by tree-sitter runtime")?;
    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| anyhow::anyhow!("failed to parse source"))?;
    let root = tree.root_node();

    if exceeds_depth(root, MAX_TREE_DEPTH) {
        anyhow::bail!("syntax tree nests deeper than {} levels", MAX_TREE_DEPTH);
    }

    let declarations = collect_declarations(config, root, source.as_bytes())?;
    let rows = source.split('\n').count();

    let (syntax, code_lines) = {
        let mut builder = Builder {
            config,
            language,
            source: &source,
            declarations,
            code_lines: vec![false; rows],
        };
        let mut cursor = root.walk();
        let syntax = builder
            .convert(&mut cursor)
            .context("cursor left the syntax tree")?;
        (syntax, builder.code_lines)
    };

    Ok(SourceUnit::new(
        path,
        language,
        source,
        syntax,
        code_lines,
        root.has_error(),
    ))
}

/// Whether any node below `root` sits more than `limit` levels deep.
fn exceeds_depth(root: Node<'_>, limit: usize) -> bool {
    let mut cursor = root.walk();
    let mut depth = 0usize;
    loop {
        if cursor.goto_first_child() {
            depth += 1;
            if depth > limit {
                return true;
            }
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return false;
            }
            depth -= 1;
        }
    }
}

/// A function or class named by the declaration query.
struct Declared {
    kind: NodeKind,
    name: String,
}

fn collect_declarations(
    config: &LanguageConfig,
    root: Node<'_>,
    source: &[u8],
) -> anyhow::Result<HashMap<usize, Declared>> {
    let query = config.declaration_query()?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source);
    let mut declared = HashMap::new();

    while let Some(m) = matches.next() {
        let mut target = None;
        let mut name = None;

        for capture in m.captures {
            match query.capture_names()[capture.index as usize] {
                "function" => target = Some((capture.node.id(), NodeKind::Function)),
                "class" => target = Some((capture.node.id(), NodeKind::Class)),
                "name" => name = capture.node.utf8_text(source).ok(),
                _ => {}
            }
        }

        if let (Some((id, kind)), Some(name)) = (target, name) {
            declared.entry(id).or_insert_with(|| Declared {
                kind,
                name: type_name(name),
            });
        }
    }

    Ok(declared)
}

/// A named node whose children are still being converted.
struct Frame<'t> {
    node: Node<'t>,
    out: SyntaxNode,
    operator: Option<&'static str>,
}

struct Builder<'s> {
    config: &'static LanguageConfig,
    language: Language,
    source: &'s str,
    declarations: HashMap<usize, Declared>,
    code_lines: Vec<bool>,
}

impl<'s> Builder<'s> {
    /// Convert the subtree under `cursor` without recursing, so tree depth
    /// costs heap rather than stack.
    fn convert<'t>(&mut self, cursor: &mut TreeCursor<'t>) -> Option<SyntaxNode> {
        let mut open = vec![self.open(cursor)];
        // whether the node under the cursor owns the top frame
        let mut owned = true;
        // whether the node under the cursor still has children to walk
        let mut fresh = true;

        loop {
            let walks =
                owned && fresh && open.last().is_some_and(|f| f.out.kind != NodeKind::Comment);
            if walks && cursor.goto_first_child() {
                owned = self.enter(cursor, &mut open);
                fresh = owned;
                continue;
            }

            if owned {
                let done = self.close(open.pop()?);
                match open.last_mut() {
                    Some(parent) => parent.out.children.push(done),
                    None => return Some(done),
                }
            }

            if cursor.goto_next_sibling() {
                owned = self.enter(cursor, &mut open);
                fresh = owned;
            } else if cursor.goto_parent() {
                owned = true;
                fresh = false;
            } else {
                return None;
            }
        }
    }

    fn open<'t>(&mut self, cursor: &TreeCursor<'t>) -> Frame<'t> {
        let node = cursor.node();
        let kind = self.config.kind_of(node.kind());
        let mut out = SyntaxNode::new(kind, node.kind(), span_of(&node));
        out.field = cursor.field_name();
        if kind != NodeKind::Comment && node.child_count() == 0 {
            self.mark(&node);
        }
        Frame {
            node,
            out,
            operator: None,
        }
    }

    /// Handle the child under the cursor. Named children open a frame;
    /// anonymous tokens only mark their line and may supply the operator.
    fn enter<'t>(&mut self, cursor: &TreeCursor<'t>, open: &mut Vec<Frame<'t>>) -> bool {
        let child = cursor.node();
        if child.is_named() {
            let frame = self.open(cursor);
            open.push(frame);
            return true;
        }
        self.mark(&child);
        if let Some(parent) = open.last_mut() {
            if parent.operator.is_none() && !is_punctuation(child.kind()) {
                parent.operator = Some(child.kind());
            }
        }
        false
    }

    fn close(&self, frame: Frame<'_>) -> SyntaxNode {
        let Frame {
            node,
            mut out,
            operator,
        } = frame;
        if out.kind == NodeKind::Comment {
            return out;
        }
        if carries_operator(out.kind) {
            out.operator = operator;
        }
        self.refine(&mut out, &node);
        out
    }

    /// Apply query names and the refinements a kind table cannot express.
    fn refine(&self, out: &mut SyntaxNode, node: &Node<'_>) {
        if let Some(declared) = self.declarations.get(&node.id()) {
            out.kind = declared.kind;
            out.name = Some(declared.name.clone());
        }

        match out.raw_kind {
            "for_statement" if self.language == Language::Go => {
                out.kind = if out.children.iter().any(|c| c.raw_kind == "range_clause") {
                    NodeKind::ForEach
                } else if out.children.iter().any(|c| c.raw_kind == "for_clause") {
                    NodeKind::For
                } else {
                    NodeKind::While
                };
            }
            "static_item" => {
                if !out.children.iter().any(|c| c.raw_kind == "mutable_specifier") {
                    out.kind = NodeKind::ConstDecl;
                }
            }
            "field_declaration" | "local_variable_declaration" => {
                let modifiers = out
                    .children
                    .iter()
                    .find(|c| c.raw_kind == "modifiers")
                    .map(|m| self.text(m))
                    .unwrap_or_default();
                if modifiers.split_whitespace().any(|m| m == "final") {
                    out.kind = NodeKind::ConstDecl;
                } else if out.raw_kind == "field_declaration"
                    && modifiers.split_whitespace().any(|m| m == "static")
                {
                    out.kind = NodeKind::StaticDecl;
                }
            }
            "lexical_declaration" => {
                if self.text(out).starts_with("const") {
                    out.kind = NodeKind::ConstDecl;
                }
            }
            "declaration" => {
                let is_const = out.children.iter().any(|c| {
                    c.raw_kind == "type_qualifier"
                        && matches!(self.text(c), "const" | "constexpr")
                });
                if is_const {
                    out.kind = NodeKind::ConstDecl;
                }
            }
            _ => {}
        }

        if out.kind == NodeKind::Assignment
            && !matches!(out.operator, None | Some("=") | Some(":="))
        {
            out.kind = NodeKind::AugmentedAssignment;
        }

        if matches!(out.kind, NodeKind::Function | NodeKind::Class) {
            self.resolve_name(out);
        }
    }

    fn resolve_name(&self, out: &mut SyntaxNode) {
        if out.raw_kind == "method_declaration" && out.child_by_field("receiver").is_some() {
            out.receiver = out
                .child_by_field("receiver")
                .and_then(|r| r.descendants().find(|n| n.raw_kind == "type_identifier"))
                .map(|n| self.text(n).to_string());
        }

        if out.child_by_field("declarator").is_some() {
            if let Some(target) = innermost_declarator(out) {
                let full = self.text(target);
                match full.rsplit_once("::") {
                    Some((scope, name)) => {
                        out.receiver = Some(type_name(scope));
                        if out.name.is_none() {
                            out.name = Some(name.trim().to_string());
                        }
                    }
                    None => {
                        if out.name.is_none() {
                            out.name = Some(full.trim().to_string());
                        }
                    }
                }
            }
        }

        if out.name.is_none() {
            out.name = out
                .child_by_field("name")
                .map(|n| type_name(self.text(n)));
        }
    }

    fn text(&self, node: &SyntaxNode) -> &'s str {
        self.source
            .get(node.span.start_byte..node.span.end_byte)
            .unwrap_or_default()
    }

    fn mark(&mut self, node: &Node<'_>) {
        let start = node.start_position().row;
        let end = node.end_position().row.min(self.code_lines.len().saturating_sub(1));
        if node.start_byte() == node.end_byte() {
            return;
        }
        for row in start..=end {
            if let Some(slot) = self.code_lines.get_mut(row) {
                *slot = true;
            }
        }
    }
}

/// Follow `declarator` fields down to the declared name.
fn innermost_declarator(node: &SyntaxNode) -> Option<&SyntaxNode> {
    let mut current = node.child_by_field("declarator")?;
    while let Some(next) = current.child_by_field("declarator") {
        current = next;
    }
    Some(current)
}

/// Strip generic arguments, references and module paths from a type name.
fn type_name(raw: &str) -> String {
    let base = raw.split('<').next().unwrap_or(raw);
    let base = base.trim().trim_start_matches('&').trim();
    let base = base.rsplit("::").next().unwrap_or(base);
    base.trim().to_string()
}

fn carries_operator(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Binary
            | NodeKind::Unary
            | NodeKind::Update
            | NodeKind::Assignment
            | NodeKind::AugmentedAssignment
    )
}

fn is_punctuation(kind: &str) -> bool {
    matches!(
        kind,
        "(" | ")" | "[" | "]" | "{" | "}" | "," | ";" | ":" | "." | "::" | "->" | "=>" | "\"" | "'"
            | "`"
    )
}

fn span_of(node: &Node<'_>) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span {
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        start_line: start.row as u32 + 1,
        start_col: start.column as u32 + 1,
        end_line: end.row as u32 + 1,
        end_col: end.column as u32 + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(language: Language, source: &str) -> SourceUnit {
        parse_source("test".to_string(), language, source.to_string()).unwrap()
    }

    fn functions(unit: &SourceUnit) -> Vec<(String, Option<String>)> {
        unit.tree
            .descendants()
            .filter(|n| n.kind == NodeKind::Function)
            .map(|n| (n.name.clone().unwrap_or_default(), n.receiver.clone()))
            .collect()
    }

    #[test]
    fn test_python_names_and_lines() {
        let unit = parse(
            Language::Python,
            r#"# header comment
class Greeter:
    def greet(self, name):
        # inline note
        return "hi " + name


def helper():
    pass
"#,
        );
        assert_eq!(unit.line_count, 9);
        assert_eq!(unit.logical_line_count, 5);
        let class = unit
            .tree
            .descendants()
            .find(|n| n.kind == NodeKind::Class)
            .unwrap();
        assert_eq!(class.name.as_deref(), Some("Greeter"));
        assert_eq!(
            functions(&unit),
            vec![("greet".to_string(), None), ("helper".to_string(), None)]
        );
        assert!(!unit.has_parse_errors);
    }

    #[test]
    fn test_go_receiver_and_loops() {
        let unit = parse(
            Language::Go,
            r#"package main

type Server struct{}

func (s *Server) Start() {
	for i := 0; i < 3; i++ {
	}
	for _, v := range items {
		_ = v
	}
	for {
	}
}
"#,
        );
        assert_eq!(
            functions(&unit),
            vec![("Start".to_string(), Some("Server".to_string()))]
        );
        let loops: Vec<_> = unit
            .tree
            .descendants()
            .filter(|n| n.raw_kind == "for_statement")
            .map(|n| n.kind)
            .collect();
        assert_eq!(loops, vec![NodeKind::For, NodeKind::ForEach, NodeKind::While]);
    }

    #[test]
    fn test_cpp_qualified_method() {
        let unit = parse(
            Language::Cpp,
            "void Widget::draw(int x) {\n  paint(x);\n}\n",
        );
        assert_eq!(
            functions(&unit),
            vec![("draw".to_string(), Some("Widget".to_string()))]
        );
    }

    #[test]
    fn test_rust_impl_and_static() {
        let unit = parse(
            Language::Rust,
            "static mut COUNTER: u32 = 0;\nstatic LIMIT: u32 = 4;\nimpl<T> Stack<T> {\n    fn push(&mut self, v: T) {}\n}\n",
        );
        let class = unit
            .tree
            .descendants()
            .find(|n| n.kind == NodeKind::Class)
            .unwrap();
        assert_eq!(class.name.as_deref(), Some("Stack"));
        let statics: Vec<_> = unit
            .tree
            .descendants()
            .filter(|n| n.raw_kind == "static_item")
            .map(|n| n.kind)
            .collect();
        assert_eq!(statics, vec![NodeKind::StaticDecl, NodeKind::ConstDecl]);
    }

    #[test]
    fn test_operators_and_augmented_assignment() {
        let unit = parse(Language::JavaScript, "let i = 0;\ni += 2;\nconst y = a[i++];\n");
        let augmented = unit
            .tree
            .descendants()
            .find(|n| n.kind == NodeKind::AugmentedAssignment)
            .unwrap();
        assert_eq!(augmented.operator, Some("+="));
        let update = unit
            .tree
            .descendants()
            .find(|n| n.kind == NodeKind::Update)
            .unwrap();
        assert_eq!(update.operator, Some("++"));
        assert!(unit.tree.descendants().any(|n| n.kind == NodeKind::ConstDecl));
    }

    #[test]
    fn test_type_name_normalization() {
        assert_eq!(type_name("Stack<T>"), "Stack");
        assert_eq!(type_name("crate::net::Server"), "Server");
        assert_eq!(type_name(" &Buffer "), "Buffer");
    }

    fn sum_of(terms: usize) -> String {
        let expr = vec!["a"; terms].join(" + ");
        format!("def f(a):\n    assert a\n    return {}\n", expr)
    }

    #[test]
    fn test_long_chain_converts_without_recursion() {
        let unit = parse(Language::Python, &sum_of(300));
        let binaries = unit
            .tree
            .descendants()
            .filter(|n| n.kind == NodeKind::Binary)
            .count();
        assert_eq!(binaries, 299);
        assert!(unit
            .tree
            .descendants()
            .filter(|n| n.kind == NodeKind::Binary)
            .all(|n| n.operator == Some("+") && n.children.len() == 2));
    }

    #[test]
    fn test_over_deep_tree_is_a_parse_error() {
        let err = parse_source("deep.py".to_string(), Language::Python, sum_of(20_000)).unwrap_err();
        assert_eq!(err.path, "deep.py");
        assert!(err.reason.contains("nests deeper than"));
    }
}
