//! Connascence of position: long positional parameter lists.

use crate::detect::syntax::{function_parameters, positional_arity};
use crate::detect::types::{Category, ConnascenceKind, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{NodeKind, SourceUnit};

use super::violation;

const KIND: ConnascenceKind = ConnascenceKind::Position;

#[derive(Debug, Clone, Copy)]
pub struct PositionDetector {
    /// Highest positional arity that is not reported.
    threshold: u32,
}

impl PositionDetector {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }
}

impl Detector for PositionDetector {
    fn name(&self) -> &str {
        KIND.rule_id()
    }

    fn category(&self) -> Category {
        Category::Connascence(KIND)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let mut violations = Vec::new();
        for func in unit.tree.descendants().filter(|n| n.kind == NodeKind::Function) {
            let Some(params) = function_parameters(func) else {
                continue;
            };
            let arity = positional_arity(unit, params) as u32;
            if arity <= self.threshold {
                continue;
            }
            let name = func.name.as_deref().unwrap_or("<anonymous>");
            violations.push(
                violation(
                    KIND,
                    unit,
                    &params.span,
                    format!(
                        "`{}` takes {} positional parameters (threshold {}); callers must match their order",
                        name, arity, self.threshold
                    ),
                )
                .with_fix(format!(
                    "group the parameters of `{}` into a parameter object or pass them by keyword",
                    name
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

    fn detect(language: Language, source: &str) -> Vec<Violation> {
        let unit = SourceUnit::from_source("test", language, source).unwrap();
        PositionDetector::new(3).detect(&unit).unwrap()
    }

    #[test]
    fn test_python_arity() {
        let source = r#"class Mailer:
    def send(self, to, subject, body):
        pass

    def send_all(self, to, cc, subject, body):
        pass

def kw(a, b, c, *, d, e):
    pass
"#;
        let found = detect(Language::Python, source);
        assert_eq!(found.len(), 1);
        assert!(found[0].message.starts_with("`send_all` takes 4"));
        assert_eq!(found[0].line, 5);
    }

    #[test]
    fn test_go_grouped_parameters() {
        let source = "package p\n\nfunc mix(a, b, c int, d string) {}\n";
        let found = detect(Language::Go, source);
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("takes 4"));
    }

    #[test]
    fn test_c_void_and_rust_self() {
        assert!(detect(Language::C, "int run(void) { return 0; }\n").is_empty());
        let source = "impl S {\n    fn f(&self, a: u8, b: u8, c: u8) {}\n}\n";
        assert!(detect(Language::Rust, source).is_empty());
    }
}
