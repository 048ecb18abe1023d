//! Allocation must be bounded.
//!
//! Two shapes are reported: an allocation whose size comes from a variable
//! with no visible upper bound, and a collection that grows inside a loop
//! with no static bound.

use std::collections::BTreeSet;

use crate::detect::syntax::{
    call_arguments, callee, has_range_guard, has_static_bound, header_parts, identifiers_in,
    is_constant_name, last_segment, receiver_path,
};
use crate::detect::types::{Category, SafetyRule, Severity, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{enclosing_function, visit, within_scope, NodeKind, SourceUnit, SyntaxNode};

use super::violation;

const RULE: SafetyRule = SafetyRule::BoundedAllocation;

/// Methods that add elements to a collection.
const GROWTH_CALLS: &[&str] = &[
    "append",
    "appendleft",
    "extend",
    "extendleft",
    "push",
    "push_back",
    "push_front",
    "emplace_back",
    "push_str",
    "insert",
    "add",
    "addAll",
    "put",
    "unshift",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedAllocationDetector;

impl Detector for BoundedAllocationDetector {
    fn name(&self) -> &str {
        RULE.rule_id()
    }

    fn category(&self) -> Category {
        Category::Safety(RULE)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let mut violations = Vec::new();
        visit(&unit.tree, |node, ancestors| {
            if node.kind != NodeKind::Call {
                return;
            }
            let found = unbounded_size(unit, node, ancestors)
                .or_else(|| unbounded_growth(unit, node, ancestors));
            if let Some(v) = found {
                violations.push(v.in_function(enclosing_function(ancestors)));
            }
        });
        Ok(violations)
    }
}

/// Size expressions of a sizing allocation call.
fn size_arguments<'a>(unit: &SourceUnit, call: &'a SyntaxNode) -> Vec<&'a SyntaxNode> {
    match call.raw_kind {
        // Java `new int[n]`
        "array_creation_expression" => {
            return call
                .children_by_field("dimensions")
                .flat_map(|d| d.code_children())
                .collect();
        }
        // C++ `new T[n]`
        "new_expression" => {
            if let Some(declarator) = call.children.iter().find(|c| c.raw_kind == "new_declarator") {
                return declarator.code_children().collect();
            }
        }
        _ => {}
    }

    let Some(name) = callee(unit, call).map(last_segment) else {
        return Vec::new();
    };
    let args = call_arguments(call);
    match name {
        "with_capacity" | "malloc" | "alloca" | "reserve" | "resize" | "Array" => {
            args.into_iter().take(1).collect()
        }
        "calloc" => args.into_iter().take(2).collect(),
        "realloc" => args.into_iter().skip(1).take(1).collect(),
        // Go `make([]T, n, cap)`
        "make" if unit.language == crate::parser::Language::Go => {
            args.into_iter().skip(1).collect()
        }
        "bytearray" | "bytes" => args
            .into_iter()
            .take(1)
            .filter(|a| !matches!(a.kind, NodeKind::String | NodeKind::Collection))
            .collect(),
        // `vec![x; n]`: tokens after the semicolon.
        "vec" => vec_repeat_count(unit, call),
        _ => Vec::new(),
    }
}

fn vec_repeat_count<'a>(unit: &SourceUnit, call: &'a SyntaxNode) -> Vec<&'a SyntaxNode> {
    let Some(tokens) = call.children.iter().find(|c| c.raw_kind == "token_tree") else {
        return Vec::new();
    };
    let Some(offset) = unit.text(tokens).find(';') else {
        return Vec::new();
    };
    let semicolon = tokens.span.start_byte + offset;
    tokens
        .code_children()
        .filter(|t| t.span.start_byte > semicolon)
        .collect()
}

fn unbounded_size(
    unit: &SourceUnit,
    call: &SyntaxNode,
    ancestors: &[&SyntaxNode],
) -> Option<Violation> {
    let sizes = size_arguments(unit, call);
    if sizes.is_empty() {
        return None;
    }
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for size in &sizes {
        // `sizeof(T)` is a compile-time quantity.
        if size.raw_kind == "sizeof_expression" {
            continue;
        }
        names.extend(
            identifiers_in(unit, size)
                .into_iter()
                .filter(|n| !is_constant_name(n)),
        );
    }
    if names.is_empty() || has_range_guard(unit, ancestors, &names, call) {
        return None;
    }
    let size_text = sizes.iter().map(|s| unit.text(s)).collect::<Vec<_>>().join(", ");
    Some(
        violation(
            RULE,
            Severity::Medium,
            unit,
            &call.span,
            format!("allocation size `{}` has no visible upper bound", size_text),
        )
        .with_fix(format!("clamp `{}` against a named maximum before allocating", size_text)),
    )
}

fn unbounded_growth(
    unit: &SourceUnit,
    call: &SyntaxNode,
    ancestors: &[&SyntaxNode],
) -> Option<Violation> {
    let full = callee(unit, call)?;
    let name = last_segment(full);
    let go_append = unit.language == crate::parser::Language::Go && full == "append";
    if !GROWTH_CALLS.contains(&name) || (receiver_path(full).is_none() && !go_append) {
        return None;
    }

    let scope = within_scope(ancestors);
    let loop_idx = scope.iter().rposition(|a| a.kind.is_loop())?;
    let enclosing_loop = scope[loop_idx];
    // Iteration over a finite collection bounds the growth.
    if enclosing_loop.kind == NodeKind::ForEach {
        return None;
    }
    if header_parts(enclosing_loop).any(|h| has_static_bound(unit, h)) {
        return None;
    }
    let capped = scope[loop_idx + 1..]
        .iter()
        .any(|a| a.kind == NodeKind::If && header_parts(a).any(|h| has_static_bound(unit, h)));
    if capped {
        return None;
    }

    let target = receiver_path(full).unwrap_or(full);
    Some(
        violation(
            RULE,
            Severity::High,
            unit,
            &call.span,
            format!(
                "`{}` grows `{}` inside a loop with no static bound (line {})",
                full,
                target,
                enclosing_loop.start_line()
            ),
        )
        .with_fix(format!(
            "bound the loop or stop growing `{}` once it reaches a named maximum",
            target
        )),
    )
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use super::*;
    use crate::parser::Language;

    fn detect(language: Language, source: &str) -> Vec<Violation> {
        let unit = SourceUnit::from_source("test", language, source).unwrap();
        BoundedAllocationDetector.detect(&unit).unwrap()
    }

    #[test]
    fn test_growth_in_unbounded_loop() {
        let source = r#"def drain(queue, out):
    while True:
        out.append(queue.get())
    for item in queue:
        out.append(item)
    i = 0
    while i < 100:
        out.append(i)
        i += 1
"#;
        let found = detect(Language::Python, source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 3);
        assert_eq!(found[0].severity, Severity::High);
    }

    #[test]
    fn test_capped_growth() {
        let source = "def fill(src, out):\n    while src.more():\n        if len(out) < MAX_ITEMS:\n            out.append(src.next())\n";
        assert!(detect(Language::Python, source).is_empty());
    }

    #[test]
    fn test_dynamic_size() {
        let source = r#"fn buffers(n: usize, m: usize) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let a = Vec::with_capacity(n);
    let b = Vec::with_capacity(MAX_LEN);
    let c = if m < 64 { vec![0u8; m] } else { Vec::new() };
    (a, b, c)
}
"#;
        let found = detect(Language::Rust, source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 2);
        assert_eq!(found[0].severity, Severity::Medium);
    }

    #[test]
    fn test_c_malloc() {
        let source = "void *grab(size_t n) {\n  void *p = malloc(n * sizeof(int));\n  void *q = malloc(sizeof(int));\n  return p;\n}\n";
        let found = detect(Language::C, source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 2);
    }
}
