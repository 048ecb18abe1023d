//! Connascence of type: branching on the runtime type of a value.

use crate::detect::syntax::{callee, last_segment};
use crate::detect::types::{Category, ConnascenceKind, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{enclosing_function, visit, NodeKind, SourceUnit, SyntaxNode};

use super::{excerpt, violation};

const KIND: ConnascenceKind = ConnascenceKind::Type;

const TYPE_CHECK_CALLS: &[&str] = &[
    "isinstance",
    "issubclass",
    "dynamic_cast",
    "downcast",
    "downcast_ref",
    "downcast_mut",
    "type_id",
];

const EQUALITY: &[&str] = &["==", "!=", "===", "!==", "is", "is not"];

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeDetector;

impl Detector for TypeDetector {
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
            if is_type_check(unit, node, parent) {
                violations.push(
                    violation(
                        KIND,
                        unit,
                        &node.span,
                        format!("runtime type check `{}`", excerpt(unit, node)),
                    )
                    .with_fix("dispatch through a shared interface instead of inspecting the concrete type")
                    .in_function(enclosing_function(ancestors)),
                );
            }
        });
        Ok(violations)
    }
}

fn is_type_check(unit: &SourceUnit, node: &SyntaxNode, parent: Option<&SyntaxNode>) -> bool {
    match node.kind {
        NodeKind::TypeCheck => true,
        NodeKind::Binary => node.operator == Some("instanceof"),
        // `typeof x === "string"`
        NodeKind::Unary => node.operator == Some("typeof") && compared(parent),
        NodeKind::Call => match callee(unit, node).map(last_segment) {
            Some(name) if TYPE_CHECK_CALLS.contains(&name) => true,
            // `type(x) == Foo`
            Some("type") => compared(parent),
            _ => false,
        },
        _ => false,
    }
}

fn compared(parent: Option<&SyntaxNode>) -> bool {
    parent
        .filter(|p| p.kind == NodeKind::Binary)
        .and_then(|p| p.operator)
        .map(|op| EQUALITY.contains(&op))
        .unwrap_or(false)
}
