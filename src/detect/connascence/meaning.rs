//! Connascence of meaning: magic numbers and magic strings.
//!
//! Numeric literals outside the common set and outside constant
//! definitions are flagged, as are string literals compared for equality.

use crate::detect::syntax::in_constant_definition;
use crate::detect::types::{Category, ConnascenceKind, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{enclosing_function, visit, NodeKind, SourceUnit, SyntaxNode};

use super::{in_literal_exempt_context, is_common_number, violation};

const KIND: ConnascenceKind = ConnascenceKind::Meaning;

const EQUALITY: &[&str] = &["==", "!=", "===", "!==", "in"];

#[derive(Debug, Clone, Copy, Default)]
pub struct MeaningDetector;

impl Detector for MeaningDetector {
    fn name(&self) -> &str {
        KIND.rule_id()
    }

    fn category(&self) -> Category {
        Category::Connascence(KIND)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let mut violations = Vec::new();
        visit(&unit.tree, |node, ancestors| {
            let parent = ancestors.last().copied();
            let found = match node.kind {
                NodeKind::Number => magic_number(unit, node, parent, ancestors),
                NodeKind::String => magic_string(unit, node, parent, ancestors),
                _ => None,
            };
            if let Some(v) = found {
                violations.push(v.in_function(enclosing_function(ancestors)));
            }
        });
        Ok(violations)
    }
}

fn magic_number(
    unit: &SourceUnit,
    node: &SyntaxNode,
    parent: Option<&SyntaxNode>,
    ancestors: &[&SyntaxNode],
) -> Option<Violation> {
    if is_common_number(unit, node, parent)
        || in_constant_definition(unit, ancestors)
        || in_literal_exempt_context(unit, ancestors)
    {
        return None;
    }
    let literal = unit.text(node);
    Some(
        violation(KIND, unit, &node.span, format!("magic number `{}`", literal))
            .with_fix(format!("extract `{}` into a named constant", literal)),
    )
}

fn magic_string(
    unit: &SourceUnit,
    node: &SyntaxNode,
    parent: Option<&SyntaxNode>,
    ancestors: &[&SyntaxNode],
) -> Option<Violation> {
    let compared = parent
        .filter(|p| p.kind == NodeKind::Binary)
        .and_then(|p| p.operator)
        .map(|op| EQUALITY.contains(&op))
        .unwrap_or(false);
    if !compared || in_constant_definition(unit, ancestors) || in_literal_exempt_context(unit, ancestors) {
        return None;
    }
    let literal = unit.text(node);
    let content = literal.trim_matches(|c| c == '"' || c == '\'' || c == '`');
    if content.is_empty() {
        return None;
    }
    Some(
        violation(
            KIND,
            unit,
            &node.span,
            format!("string literal {} compared as a hidden code", literal),
        )
        .with_fix("replace the literal with an enum variant or named constant"),
    )
}
