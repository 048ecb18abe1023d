//! Connascence of value: the same literal repeated where every copy must
//! change together.

use std::collections::HashMap;

use crate::detect::syntax::in_constant_definition;
use crate::detect::types::{Category, ConnascenceKind, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{enclosing_function, visit, NodeKind, SourceUnit, SyntaxNode};

use super::{in_literal_exempt_context, is_common_number, normalize_number, violation};

const KIND: ConnascenceKind = ConnascenceKind::Value;

const DEFAULT_MIN_OCCURRENCES: usize = 3;

#[derive(Debug, Clone)]
pub struct ValueDetector {
    min_occurrences: usize,
}

impl Default for ValueDetector {
    fn default() -> Self {
        Self {
            min_occurrences: DEFAULT_MIN_OCCURRENCES,
        }
    }
}

impl ValueDetector {
    pub fn with_min_occurrences(min_occurrences: usize) -> Self {
        Self { min_occurrences }
    }
}

struct Occurrence<'a> {
    node: &'a SyntaxNode,
    function: Option<&'a SyntaxNode>,
}

impl Detector for ValueDetector {
    fn name(&self) -> &str {
        KIND.rule_id()
    }

    fn category(&self) -> Category {
        Category::Connascence(KIND)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let mut order: Vec<String> = Vec::new();
        let mut seen: HashMap<String, Vec<Occurrence<'_>>> = HashMap::new();

        visit(&unit.tree, |node, ancestors| {
            let parent = ancestors.last().copied();
            let Some(key) = literal_key(unit, node, parent) else {
                return;
            };
            if in_constant_definition(unit, ancestors) || in_literal_exempt_context(unit, ancestors) {
                return;
            }
            let occurrences = seen.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            occurrences.push(Occurrence {
                node,
                function: enclosing_function(ancestors),
            });
        });

        let mut violations = Vec::new();
        for key in &order {
            let occurrences = &seen[key];
            if occurrences.len() < self.min_occurrences {
                continue;
            }
            let lines: Vec<String> = occurrences
                .iter()
                .map(|o| o.node.start_line().to_string())
                .collect();
            let first = &occurrences[0];
            let literal = unit.text(first.node);
            violations.push(
                violation(
                    KIND,
                    unit,
                    &first.node.span,
                    format!(
                        "literal {} appears {} times (lines {}); every copy must change together",
                        literal,
                        occurrences.len(),
                        lines.join(", ")
                    ),
                )
                .with_fix(format!("define {} once as a named constant", literal))
                .in_function(first.function),
            );
        }
        Ok(violations)
    }
}

/// Grouping key for literals worth tracking.
fn literal_key(unit: &SourceUnit, node: &SyntaxNode, parent: Option<&SyntaxNode>) -> Option<String> {
    match node.kind {
        NodeKind::Number => {
            if is_common_number(unit, node, parent) {
                None
            } else {
                Some(format!("n:{}", normalize_number(unit.text(node))))
            }
        }
        NodeKind::String => {
            // Docstrings and other bare string statements.
            if parent.map(|p| p.kind == NodeKind::ExprStatement).unwrap_or(false) {
                return None;
            }
            let text = unit.text(node);
            let content = text.trim_matches(|c| c == '"' || c == '\'' || c == '`');
            if content.chars().count() < 2 {
                return None;
            }
            Some(format!("s:{}", text))
        }
        _ => None,
    }
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use super::*;
    use crate::parser::Language;

    fn detect(source: &str) -> Vec<Violation> {
        let unit = SourceUnit::from_source("codec.py", Language::Python, source).unwrap();
        ValueDetector::default().detect(&unit).unwrap()
    }

    #[test]
    fn test_repeated_literal_reported_once() {
        let source = r#"def encode(text):
    """Encode text."""
    return text.encode("utf-8")

def decode(data):
    return data.decode("utf-8")

def size(text):
    return len(text.encode("utf-8")) + 17
"#;
        let found = detect(source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 3);
        assert!(found[0].message.contains("3 times (lines 3, 6, 9)"));
        assert_eq!(found[0].function.as_ref().unwrap().name, "encode");
    }

    #[test]
    fn test_constants_and_common_values_ignored() {
        let source = r#"TIMEOUT = 30
RETRY_TIMEOUT = 30
BACKOFF = 30

def f(x):
    return x + 1 + 1 + 1
"#;
        assert!(detect(source).is_empty());
    }
}
