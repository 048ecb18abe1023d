//! Tree queries shared by several detectors.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::parser::{NodeKind, SourceUnit, SyntaxNode};

lazy_static! {
    static ref CONSTANT_NAME: Regex = Regex::new(r"^_*[A-Z][A-Z0-9_]*$").unwrap();
    static ref ASSERTION_CALL: Regex =
        Regex::new(r"^(?:debug_)?assert\w*$|^static_assert$|^invariant$|^precondition$|^require$")
            .unwrap();
}

const RELATIONAL_OPERATORS: &[&str] = &["<", "<=", ">", ">=", "==", "!=", "===", "!=="];

/// Receiver names that refer to the current instance.
pub const SELF_NAMES: &[&str] = &["self", "this", "Self", "cls", "super"];

/// `UPPER_CASE` names are treated as named constants.
pub fn is_constant_name(name: &str) -> bool {
    CONSTANT_NAME.is_match(name)
}

/// Text of the called expression, e.g. `os.path.join` or `vec`.
pub fn callee<'u>(unit: &'u SourceUnit, call: &SyntaxNode) -> Option<&'u str> {
    for field in ["function", "macro", "constructor"] {
        if let Some(node) = call.child_by_field(field) {
            return Some(unit.text(node));
        }
    }
    // Java method_invocation: `object.name(...)` with separate fields.
    if let Some(name) = call.child_by_field("name") {
        let start = call.span.start_byte;
        let end = name.span.end_byte;
        return unit.source.get(start..end);
    }
    call.child_by_field("type").map(|node| unit.text(node))
}

/// Last path segment of a callee: `self.conn.close` -> `close`.
pub fn last_segment(callee: &str) -> &str {
    let trimmed = callee.trim().trim_end_matches('!');
    trimmed
        .rsplit(|c: char| c == '.' || c == ':' || c == '-')
        .map(|s| s.trim_start_matches('>').trim())
        .find(|s| !s.is_empty() && !s.starts_with('<'))
        .map(|s| s.split('<').next().unwrap_or(s).trim_end_matches('>'))
        .unwrap_or(trimmed)
}

/// Everything before the last segment: `self.conn.close` -> `self.conn`.
pub fn receiver_path(callee: &str) -> Option<&str> {
    let last = last_segment(callee);
    let idx = callee.rfind(last)?;
    let head = callee[..idx].trim_end_matches(['.', ':', '-', '>']);
    if head.is_empty() {
        None
    } else {
        Some(head)
    }
}

/// Argument expressions of a call, in order.
pub fn call_arguments(call: &SyntaxNode) -> Vec<&SyntaxNode> {
    let args = call.child_by_field("arguments").or_else(|| {
        call.children
            .iter()
            .find(|c| matches!(c.raw_kind, "token_tree" | "argument_list" | "arguments"))
    });
    match args {
        Some(args) => args.code_children().collect(),
        None => Vec::new(),
    }
}

/// Target and value of an assignment or declaration.
pub fn binding_parts(node: &SyntaxNode) -> Option<(&SyntaxNode, Option<&SyntaxNode>)> {
    let target = ["left", "name", "pattern", "declarator"]
        .iter()
        .find_map(|f| node.child_by_field(f))?;
    let value = ["right", "value"].iter().find_map(|f| node.child_by_field(f));
    Some((unwrap_list(target), value.map(unwrap_list)))
}

/// First element of an expression list (Go `a, b := ...`).
fn unwrap_list(node: &SyntaxNode) -> &SyntaxNode {
    if matches!(node.raw_kind, "expression_list" | "pattern_list") {
        node.code_children().next().unwrap_or(node)
    } else {
        node
    }
}

/// Plain variable name bound by a target, if it is one.
pub fn bound_name<'u>(unit: &'u SourceUnit, target: &SyntaxNode) -> Option<&'u str> {
    let mut current = target;
    loop {
        match current.kind {
            NodeKind::Identifier => return Some(unit.text(current)),
            _ if current.raw_kind == "mutable_specifier" => return None,
            _ => {}
        }
        // C declarators nest (`*p`, `p[4]`); Rust patterns wrap (`mut x`).
        current = current
            .child_by_field("declarator")
            .or_else(|| {
                if matches!(current.raw_kind, "mut_pattern" | "pointer_declarator") {
                    current.code_children().find(|c| c.kind == NodeKind::Identifier)
                } else {
                    None
                }
            })?;
    }
}

/// Whether a node sits inside a constant definition.
pub fn in_constant_definition(unit: &SourceUnit, ancestors: &[&SyntaxNode]) -> bool {
    ancestors.iter().rev().any(|a| match a.kind {
        NodeKind::ConstDecl => true,
        NodeKind::Assignment | NodeKind::Declaration => binding_parts(a)
            .and_then(|(target, _)| bound_name(unit, target))
            .map(is_constant_name)
            .unwrap_or(false),
        _ => false,
    })
}

/// Assertion statements and assertion-like calls.
pub fn is_assertion(unit: &SourceUnit, node: &SyntaxNode) -> bool {
    match node.kind {
        NodeKind::Assert => true,
        NodeKind::Call => callee(unit, node)
            .map(|c| ASSERTION_CALL.is_match(last_segment(c)))
            .unwrap_or(false),
        _ => false,
    }
}

/// The parameter list of a function or lambda.
pub fn function_parameters(func: &SyntaxNode) -> Option<&SyntaxNode> {
    if let Some(params) = func.child_by_field("parameters") {
        return Some(params);
    }
    let mut current = func.child_by_field("declarator")?;
    loop {
        if let Some(params) = current.child_by_field("parameters") {
            return Some(params);
        }
        current = current.child_by_field("declarator")?;
    }
}

/// Number of positional parameters, excluding receivers, variadics and
/// keyword-only parameters.
pub fn positional_arity(unit: &SourceUnit, params: &SyntaxNode) -> usize {
    let mut count = 0;
    for (idx, param) in params.code_children().enumerate() {
        match param.raw_kind {
            "keyword_separator" | "list_splat_pattern" | "dictionary_splat_pattern" => break,
            "self_parameter"
            | "rest_pattern"
            | "variadic_parameter_declaration"
            | "variadic_parameter"
            | "spread_parameter"
            | "receiver_parameter"
            | "positional_separator" => continue,
            "parameter_declaration" => {
                let text = unit.text(param).trim();
                if text == "void" || text == "..." {
                    continue;
                }
                // Go groups names: `a, b int`.
                let names = param
                    .children_by_field("name")
                    .filter(|n| n.kind == NodeKind::Identifier)
                    .count();
                count += names.max(1);
            }
            "identifier" if idx == 0 && matches!(unit.text(param), "self" | "cls") => continue,
            _ => count += 1,
        }
    }
    count
}

/// Header of a branch or loop: everything except its bodies.
pub fn header_parts(node: &SyntaxNode) -> impl Iterator<Item = &SyntaxNode> {
    node.code_children().filter(|c| {
        !matches!(c.field, Some("body" | "consequence" | "alternative"))
            && c.kind != NodeKind::Block
            && !matches!(c.raw_kind, "else_clause" | "elif_clause" | "block")
    })
}

/// Variable names referenced anywhere below `node`.
pub fn identifiers_in<'u>(unit: &'u SourceUnit, node: &SyntaxNode) -> BTreeSet<&'u str> {
    node.descendants()
        .filter(|n| n.kind == NodeKind::Identifier)
        .map(|n| unit.text(n))
        .filter(|name| !SELF_NAMES.contains(name))
        .collect()
}

/// Whether `node` holds a relational comparison that mentions one of `names`.
pub fn compares_any(unit: &SourceUnit, node: &SyntaxNode, names: &BTreeSet<&str>) -> bool {
    node.descendants().any(|n| {
        n.kind == NodeKind::Binary
            && is_relational(n)
            && n
                .descendants()
                .any(|id| id.kind == NodeKind::Identifier && names.contains(unit.text(id)))
    })
}

fn is_relational(node: &SyntaxNode) -> bool {
    node.operator
        .map(|op| RELATIONAL_OPERATORS.contains(&op))
        .unwrap_or(false)
}

/// Whether a relational comparison below `node` involves a literal or an
/// `UPPER_CASE` constant, i.e. a statically visible bound.
pub fn has_static_bound(unit: &SourceUnit, node: &SyntaxNode) -> bool {
    node.descendants().any(|n| {
        n.kind == NodeKind::Binary
            && is_relational(n)
            && n.descendants().any(|leaf| match leaf.kind {
                NodeKind::Number => true,
                NodeKind::Identifier => is_constant_name(unit.text(leaf)),
                _ => false,
            })
    })
}

/// Whether access at `target` is protected by a range check on `names`:
/// an enclosing branch or loop header that compares one of them, a
/// for-each loop binding one of them, or an earlier guard clause or
/// assertion in the same function.
pub fn has_range_guard(
    unit: &SourceUnit,
    ancestors: &[&SyntaxNode],
    names: &BTreeSet<&str>,
    target: &SyntaxNode,
) -> bool {
    if names.is_empty() {
        return true;
    }

    for ancestor in crate::parser::within_scope(ancestors) {
        let guarded = match ancestor.kind {
            NodeKind::If | NodeKind::While | NodeKind::For => {
                header_parts(ancestor).any(|h| compares_any(unit, h, names))
            }
            NodeKind::ForEach => header_parts(ancestor).any(|h| {
                h.descendants()
                    .any(|id| id.kind == NodeKind::Identifier && names.contains(unit.text(id)))
            }),
            _ => false,
        };
        if guarded {
            return true;
        }
    }

    let scope = ancestors
        .iter()
        .rev()
        .find(|n| n.kind.is_function_like())
        .copied();
    let Some(scope) = scope else {
        return false;
    };
    scope.descendants_in_scope().any(|n| {
        n.span.end_byte <= target.span.start_byte
            && match n.kind {
                NodeKind::If => header_parts(n).any(|h| compares_any(unit, h, names)),
                _ if is_assertion(unit, n) => compares_any(unit, n, names),
                _ => false,
            }
    })
}
