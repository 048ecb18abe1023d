//! Functions must fit on a printed page.

use crate::detect::types::{Category, SafetyRule, Severity, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{NodeKind, SourceUnit};

use super::violation;

const RULE: SafetyRule = SafetyRule::FunctionSize;

#[derive(Debug, Clone, Copy)]
pub struct FunctionSizeDetector {
    /// Maximum logical lines per function, inclusive.
    limit: u32,
}

impl FunctionSizeDetector {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }
}

impl Detector for FunctionSizeDetector {
    fn name(&self) -> &str {
        RULE.rule_id()
    }

    fn category(&self) -> Category {
        Category::Safety(RULE)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let mut violations = Vec::new();
        for func in unit.tree.descendants().filter(|n| n.kind == NodeKind::Function) {
            let span = func.span;
            let lines = unit.logical_lines_in(span.start_line, span.end_line);
            if lines <= self.limit {
                continue;
            }
            let name = func.name.as_deref().unwrap_or("<anonymous>");
            violations.push(
                violation(
                    RULE,
                    Severity::High,
                    unit,
                    &span,
                    format!(
                        "function `{}` has {} logical lines (limit {}), lines {}-{}",
                        name, lines, self.limit, span.start_line, span.end_line
                    ),
                )
                .with_fix(format!(
                    "extract helpers from `{}` until it has at most {} logical lines",
                    name, self.limit
                ))
                .in_function(Some(func)),
            );
        }
        Ok(violations)
    }
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use super::*;
    use crate::parser::Language;

    /// A Python function with exactly `body + 1` logical lines.
    fn function_with(body: usize) -> String {
        let mut source = String::from("def long_one(x):\n");
        for i in 0..body {
            source.push_str(&format!("    x = x + {}\n", i));
            if i % 10 == 0 {
                source.push_str("    # progress\n\n");
            }
        }
        source
    }

    #[test]
    fn test_limit_is_inclusive() {
        let at_limit = SourceUnit::from_source("a.py", Language::Python, function_with(59)).unwrap();
        assert!(FunctionSizeDetector::new(60).detect(&at_limit).unwrap().is_empty());

        let over = SourceUnit::from_source("b.py", Language::Python, function_with(60)).unwrap();
        let found = FunctionSizeDetector::new(60).detect(&over).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("61 logical lines"));
        assert_eq!(found[0].severity, Severity::High);
        assert_eq!(found[0].line, 1);
    }

    #[test]
    fn test_nested_functions_counted_separately() {
        let source = "def outer():\n    def inner():\n        return 1\n    return inner\n";
        let unit = SourceUnit::from_source("c.py", Language::Python, source).unwrap();
        assert!(FunctionSizeDetector::new(3).detect(&unit).unwrap().len() == 1);
        assert!(FunctionSizeDetector::new(4).detect(&unit).unwrap().is_empty());
    }
}
