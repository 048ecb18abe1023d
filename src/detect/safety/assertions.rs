//! Assertion density: assertions per logical line of function code.
//!
//! Reported at most once per file. Files without functions are exempt.

use crate::detect::syntax::is_assertion;
use crate::detect::types::{Category, SafetyRule, Severity, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{visit, NodeKind, SourceUnit, SyntaxNode};

use super::violation;

const RULE: SafetyRule = SafetyRule::AssertionDensity;

/// Names listed in the message before truncating.
const MAX_LISTED: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct AssertionDensityDetector {
    /// Minimum percentage of assertion statements per logical line.
    min_pct: f64,
}

impl AssertionDensityDetector {
    pub fn new(min_pct: f64) -> Self {
        Self { min_pct }
    }
}

impl Detector for AssertionDensityDetector {
    fn name(&self) -> &str {
        RULE.rule_id()
    }

    fn category(&self) -> Category {
        Category::Safety(RULE)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let functions = outermost_functions(&unit.tree);
        let Some(first) = functions.first() else {
            return Ok(Vec::new());
        };

        let mut logical = 0u32;
        let mut assertions = 0usize;
        let mut bare = Vec::new();
        for func in &functions {
            logical += unit.logical_lines_in(func.span.start_line, func.span.end_line);
            let count = func.descendants().filter(|n| is_assertion(unit, n)).count();
            if count == 0 {
                bare.push(func.name.as_deref().unwrap_or("<anonymous>"));
            }
            assertions += count;
        }
        if logical == 0 {
            return Ok(Vec::new());
        }

        let pct = assertions as f64 / logical as f64 * 100.0;
        if pct >= self.min_pct {
            return Ok(Vec::new());
        }

        let mut listed = bare
            .iter()
            .take(MAX_LISTED)
            .map(|n| format!("`{}`", n))
            .collect::<Vec<_>>()
            .join(", ");
        if bare.len() > MAX_LISTED {
            listed.push_str(&format!(" and {} more", bare.len() - MAX_LISTED));
        }
        let mut message = format!(
            "assertion density {:.1}% is below {}% ({} assertions in {} logical lines of function code)",
            pct, self.min_pct, assertions, logical
        );
        if !listed.is_empty() {
            message.push_str(&format!("; no assertions in {}", listed));
        }

        Ok(vec![violation(RULE, Severity::Medium, unit, &first.span, message)
            .with_fix("assert preconditions and invariants at function entry and after state changes")])
    }
}

/// Functions not nested in another function, in document order.
fn outermost_functions(root: &SyntaxNode) -> Vec<&SyntaxNode> {
    let mut found = Vec::new();
    visit(root, |node, ancestors| {
        if node.kind == NodeKind::Function && !ancestors.iter().any(|a| a.kind.is_function_like()) {
            found.push(node);
        }
    });
    found
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use super::*;
    use crate::parser::Language;

    fn detect(language: Language, source: &str) -> Vec<Violation> {
        let unit = SourceUnit::from_source("test", language, source).unwrap();
        AssertionDensityDetector::new(2.0).detect(&unit).unwrap()
    }

    #[test]
    fn test_low_density_reported_once() {
        let source = r#"def a(x):
    return x + 1

def b(x):
    assert x > 0
    return x * 2

def c(x):
    return x
"#;
        // 1 assertion in 7 logical lines is above 2%.
        assert!(detect(Language::Python, source).is_empty());

        let source = "def a(x):\n    return x\n\ndef c(x):\n    return x\n";
        let found = detect(Language::Python, source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Medium);
        assert_eq!(found[0].line, 1);
        assert!(found[0].message.contains("no assertions in `a`, `c`"));
    }

    #[test]
    fn test_files_without_functions_are_exempt() {
        assert!(detect(Language::Python, "X = 1\nY = 2\n").is_empty());
    }

    #[test]
    fn test_rust_assert_macros_count() {
        let source = "fn f(x: u32) -> u32 {\n    debug_assert!(x < 10);\n    x\n}\n";
        assert!(detect(Language::Rust, source).is_empty());
    }
}
