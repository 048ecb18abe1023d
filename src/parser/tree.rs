//! Owned, language-neutral syntax tree.
//!
//! Adapters convert their native parse trees into [`SyntaxNode`]s so that
//! detectors never depend on a particular parser library. Node text is not
//! stored; slice it from the owning [`super::SourceUnit`].

use serde::{Deserialize, Serialize};

/// A source range. Lines and columns are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    /// Number of physical lines covered, inclusive.
    pub fn line_len(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }
}

/// Normalized node categories shared by every language.
///
/// Anything a detector does not need to distinguish maps to `Other`; the
/// grammar's own kind is still available as [`SyntaxNode::raw_kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Module,
    /// Named function, method or constructor definition.
    Function,
    /// Anonymous function (lambda, closure, arrow function, func literal).
    Lambda,
    /// Type-level container: class, struct with methods, trait, impl block.
    Class,
    Parameters,
    Parameter,
    Block,
    If,
    While,
    /// Counted loop with an explicit condition (`for (;;)`).
    For,
    /// Iteration over a collection or range.
    ForEach,
    Try,
    Catch,
    /// `finally` clause or `defer` statement.
    Finally,
    /// Scoped resource statement (`with`, try-with-resources).
    With,
    Call,
    Assignment,
    AugmentedAssignment,
    Declaration,
    ConstDecl,
    StaticDecl,
    GlobalDecl,
    Subscript,
    Update,
    Binary,
    Unary,
    Assert,
    Return,
    Import,
    Member,
    Identifier,
    Property,
    Number,
    String,
    Boolean,
    Collection,
    ExprStatement,
    TypeCheck,
    Comment,
    Other,
}

impl NodeKind {
    pub fn is_loop(self) -> bool {
        matches!(self, NodeKind::While | NodeKind::For | NodeKind::ForEach)
    }

    pub fn is_function_like(self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Lambda)
    }

    pub fn is_literal(self) -> bool {
        matches!(self, NodeKind::Number | NodeKind::String | NodeKind::Boolean)
    }
}

/// One node of the owned tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// The grammar's node kind, e.g. `function_definition`.
    pub raw_kind: &'static str,
    /// Field name this node occupies in its parent, if any.
    pub field: Option<&'static str>,
    pub span: Span,
    /// Declared name for functions and classes.
    pub name: Option<String>,
    /// Owning type for methods declared outside their type (Go receivers,
    /// C++ `Type::method` definitions).
    pub receiver: Option<String>,
    /// First operator token for binary, unary, update and assignment nodes.
    pub operator: Option<&'static str>,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, raw_kind: &'static str, span: Span) -> Self {
        Self {
            kind,
            raw_kind,
            field: None,
            span,
            name: None,
            receiver: None,
            operator: None,
            children: Vec::new(),
        }
    }

    /// First child stored under `field`.
    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    /// All children stored under `field`.
    pub fn children_by_field<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a SyntaxNode> + 'a {
        self.children.iter().filter(move |c| c.field == Some(field))
    }

    /// Children that are not comments.
    pub fn code_children(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(|c| c.kind != NodeKind::Comment)
    }

    pub fn first_child_of_kind(&self, kind: NodeKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn start_line(&self) -> u32 {
        self.span.start_line
    }

    /// Preorder iterator over this node and all descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Preorder iterator that does not enter nested functions, lambdas or
    /// classes below this node.
    pub fn descendants_in_scope(&self) -> ScopedDescendants<'_> {
        ScopedDescendants {
            root: self,
            stack: vec![self],
        }
    }

    pub fn contains_kind(&self, kind: NodeKind) -> bool {
        self.descendants().any(|n| n.kind == kind)
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

pub struct ScopedDescendants<'a> {
    root: &'a SyntaxNode,
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for ScopedDescendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let opens_scope = matches!(
            node.kind,
            NodeKind::Function | NodeKind::Lambda | NodeKind::Class
        );
        if !opens_scope || std::ptr::eq(node, self.root) {
            self.stack.extend(node.children.iter().rev());
        }
        Some(node)
    }
}

/// Visit every node in preorder together with its ancestor chain
/// (outermost first, not including the node itself).
pub fn visit<'a, F>(root: &'a SyntaxNode, mut f: F)
where
    F: FnMut(&'a SyntaxNode, &[&'a SyntaxNode]),
{
    let mut path: Vec<&'a SyntaxNode> = Vec::new();
    let mut pending: Vec<std::slice::Iter<'a, SyntaxNode>> = Vec::new();

    f(root, &path);
    path.push(root);
    pending.push(root.children.iter());

    while let Some(children) = pending.last_mut() {
        match children.next() {
            Some(child) => {
                f(child, &path);
                path.push(child);
                pending.push(child.children.iter());
            }
            None => {
                pending.pop();
                path.pop();
            }
        }
    }
}

/// Innermost named function in an ancestor chain.
pub fn enclosing_function<'a>(ancestors: &[&'a SyntaxNode]) -> Option<&'a SyntaxNode> {
    ancestors
        .iter()
        .rev()
        .find(|n| n.kind == NodeKind::Function)
        .copied()
}

/// Ancestors between the node and its innermost function-like scope.
pub fn within_scope<'a, 'b>(ancestors: &'b [&'a SyntaxNode]) -> &'b [&'a SyntaxNode] {
    match ancestors
        .iter()
        .rposition(|n| n.kind.is_function_like())
    {
        Some(idx) => &ancestors[idx + 1..],
        None => ancestors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, line: u32) -> Span {
        Span {
            start_byte: start,
            end_byte: end,
            start_line: line,
            start_col: 1,
            end_line: line,
            end_col: 1,
        }
    }

    fn sample() -> SyntaxNode {
        let mut root = SyntaxNode::new(NodeKind::Module, "module", span(0, 30, 1));
        let mut func = SyntaxNode::new(NodeKind::Function, "function_definition", span(0, 20, 1));
        func.name = Some("outer".into());
        let mut inner = SyntaxNode::new(NodeKind::Function, "function_definition", span(5, 15, 2));
        inner.children.push(SyntaxNode::new(NodeKind::Call, "call", span(6, 10, 2)));
        func.children.push(SyntaxNode::new(NodeKind::Call, "call", span(2, 4, 1)));
        func.children.push(inner);
        root.children.push(func);
        root.children.push(SyntaxNode::new(NodeKind::Number, "integer", span(21, 23, 3)));
        root
    }

    #[test]
    fn test_descendants_preorder() {
        let root = sample();
        let kinds: Vec<_> = root.descendants().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Module,
                NodeKind::Function,
                NodeKind::Call,
                NodeKind::Function,
                NodeKind::Call,
                NodeKind::Number
            ]
        );
    }

    #[test]
    fn test_scoped_descendants_skip_nested_functions() {
        let root = sample();
        let outer = &root.children[0];
        let calls = outer
            .descendants_in_scope()
            .filter(|n| n.kind == NodeKind::Call)
            .count();
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_visit_ancestors() {
        let root = sample();
        let mut seen = Vec::new();
        visit(&root, |node, ancestors| {
            if node.kind == NodeKind::Call {
                let func = enclosing_function(ancestors).unwrap();
                seen.push((node.span.start_byte, func.span.start_byte));
            }
        });
        assert_eq!(seen, vec![(2, 0), (6, 5)]);
    }

    #[test]
    fn test_span_helpers() {
        let outer = Span {
            start_byte: 0,
            end_byte: 100,
            start_line: 3,
            start_col: 1,
            end_line: 12,
            end_col: 2,
        };
        let inner = span(10, 20, 4);
        assert_eq!(outer.line_len(), 10);
        assert!(outer.contains(&inner));
        assert!(outer.overlaps(&inner));
        assert!(!inner.contains(&outer));
    }
}
