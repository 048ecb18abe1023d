//! Index expressions must be provably in range.
//!
//! An index that mutates its own variable is always reported. An index
//! computed by arithmetic on variables is reported unless a comparison on
//! one of those variables guards the access.

use std::collections::BTreeSet;

use crate::detect::syntax::{has_range_guard, identifiers_in, is_constant_name};
use crate::detect::types::{Category, SafetyRule, Severity, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{enclosing_function, visit, NodeKind, SourceUnit, SyntaxNode};

use super::violation;

const RULE: SafetyRule = SafetyRule::BoundedIndexing;

const OFFSET_OPERATORS: &[&str] = &["+", "-", "*", "<<"];

/// Index forms that cannot go out of range.
const SAFE_INDEX_KINDS: &[&str] = &["slice", "range_expression"];

#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedIndexingDetector;

impl Detector for BoundedIndexingDetector {
    fn name(&self) -> &str {
        RULE.rule_id()
    }

    fn category(&self) -> Category {
        Category::Safety(RULE)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let mut violations = Vec::new();
        visit(&unit.tree, |node, ancestors| {
            if node.kind != NodeKind::Subscript {
                return;
            }
            // The first child is the indexed value.
            for index in node.code_children().skip(1) {
                if let Some(v) = check_index(unit, node, index, ancestors) {
                    violations.push(v.in_function(enclosing_function(ancestors)));
                }
            }
        });
        Ok(violations)
    }
}

fn check_index(
    unit: &SourceUnit,
    access: &SyntaxNode,
    index: &SyntaxNode,
    ancestors: &[&SyntaxNode],
) -> Option<Violation> {
    if SAFE_INDEX_KINDS.contains(&index.raw_kind) {
        return None;
    }
    let text = unit.text(index);

    if index.contains_kind(NodeKind::Update) {
        return Some(
            violation(
                RULE,
                Severity::High,
                unit,
                &access.span,
                format!("index `{}` modifies a variable inside the access", text),
            )
            .with_fix("update the index in its own statement and check it before indexing"),
        );
    }

    let computed = index.descendants().any(|n| {
        n.kind == NodeKind::Binary
            && n.operator.map(|op| OFFSET_OPERATORS.contains(&op)).unwrap_or(false)
    });
    if !computed {
        return None;
    }
    let names: BTreeSet<&str> = identifiers_in(unit, index)
        .into_iter()
        .filter(|name| !is_constant_name(name))
        .collect();
    if names.is_empty() || has_range_guard(unit, ancestors, &names, access) {
        return None;
    }

    let subject = unit.text(access.code_children().next()?);
    Some(
        violation(
            RULE,
            Severity::Medium,
            unit,
            &access.span,
            format!("index `{}` into `{}` is computed without a range check", text, subject),
        )
        .with_fix(format!("check that `{}` is within the bounds of `{}` first", text, subject)),
    )
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use super::*;
    use crate::parser::Language;

    fn detect(language: Language, source: &str) -> Vec<Violation> {
        let unit = SourceUnit::from_source("test", language, source).unwrap();
        BoundedIndexingDetector.detect(&unit).unwrap()
    }

    #[test]
    fn test_unchecked_offset() {
        let source = r#"def pairs(items, i):
    a = items[i + 1]
    if i + 1 < len(items):
        b = items[i + 1]
    c = items[i]
    d = items[i:i + 2]
    return a, b, c, d
"#;
        let found = detect(Language::Python, source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 2);
        assert_eq!(found[0].severity, Severity::Medium);
    }

    #[test]
    fn test_update_in_index() {
        let source = "int next(int *buf, int i) {\n  return buf[i++];\n}\n";
        let found = detect(Language::C, source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::High);
    }

    #[test]
    fn test_loop_header_guards_index() {
        let source = "void copy(int *dst, int *src, int n) {\n  for (int i = 0; i < n - 1; i++) {\n    dst[i] = src[i + 1];\n  }\n}\n";
        assert!(detect(Language::C, source).is_empty());
    }

    #[test]
    fn test_earlier_assert_guards_index() {
        let source = "def last(xs, k):\n    assert k < len(xs)\n    return xs[k - 1]\n";
        assert!(detect(Language::Python, source).is_empty());
    }
}
