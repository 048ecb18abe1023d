//! Connascence of identity: several call sites must share one object.
//!
//! Covers `global` rebinding, mutable default arguments, mutable statics and
//! functions that reassign module-level variables.

use std::collections::BTreeSet;

use crate::detect::syntax::{binding_parts, bound_name, function_parameters};
use crate::detect::types::{Category, ConnascenceKind, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{enclosing_function, visit, Language, NodeKind, SourceUnit, SyntaxNode};

use super::{excerpt, violation};

const KIND: ConnascenceKind = ConnascenceKind::Identity;

const MUTABLE_DEFAULT_KINDS: &[&str] = &["list", "dictionary", "set"];
const MUTABLE_CONSTRUCTORS: &[&str] = &["list", "dict", "set", "bytearray"];

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDetector;

impl Detector for IdentityDetector {
    fn name(&self) -> &str {
        KIND.rule_id()
    }

    fn category(&self) -> Category {
        Category::Connascence(KIND)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let mut violations = Vec::new();

        visit(&unit.tree, |node, ancestors| {
            let found = match node.kind {
                NodeKind::GlobalDecl => Some(
                    violation(
                        KIND,
                        unit,
                        &node.span,
                        format!("`{}` rebinds module state shared by every caller", excerpt(unit, node)),
                    )
                    .with_fix("return the new value or keep the state on an object passed in"),
                ),
                NodeKind::StaticDecl => Some(
                    violation(
                        KIND,
                        unit,
                        &node.span,
                        format!("mutable static `{}` is one shared instance for every caller", excerpt(unit, node)),
                    )
                    .with_fix("pass the state explicitly or hide it behind a synchronized accessor"),
                ),
                NodeKind::Parameter => mutable_default(unit, node),
                _ => None,
            };
            if let Some(v) = found {
                violations.push(v.in_function(enclosing_function(ancestors)));
            }
        });

        if !matches!(unit.language, Language::Python | Language::Rust | Language::Java) {
            violations.extend(module_reassignments(unit));
        }

        violations.sort_by_key(|v| (v.line, v.column));
        Ok(violations)
    }
}

fn mutable_default(unit: &SourceUnit, param: &SyntaxNode) -> Option<Violation> {
    if !matches!(param.raw_kind, "default_parameter" | "typed_default_parameter") {
        return None;
    }
    let value = param.child_by_field("value")?;
    let mutable = MUTABLE_DEFAULT_KINDS.contains(&value.raw_kind)
        || (value.kind == NodeKind::Call
            && value
                .child_by_field("function")
                .map(|f| MUTABLE_CONSTRUCTORS.contains(&unit.text(f)))
                .unwrap_or(false));
    if !mutable {
        return None;
    }
    Some(
        violation(
            KIND,
            unit,
            &param.span,
            format!(
                "mutable default `{}` is created once and shared across calls",
                unit.text(param)
            ),
        )
        .with_fix("default to None and create the object inside the function"),
    )
}

/// Functions that assign to variables declared at file scope.
fn module_reassignments(unit: &SourceUnit) -> Vec<Violation> {
    let mut module_names: BTreeSet<&str> = BTreeSet::new();
    visit(&unit.tree, |node, ancestors| {
        if node.kind != NodeKind::Declaration {
            return;
        }
        let nested = ancestors.iter().any(|a| {
            a.kind.is_function_like() || matches!(a.kind, NodeKind::Class | NodeKind::ConstDecl)
        });
        if nested {
            return;
        }
        if let Some(name) = binding_parts(node).and_then(|(target, _)| bound_name(unit, target)) {
            module_names.insert(name);
        }
    });
    if module_names.is_empty() {
        return Vec::new();
    }

    let mut violations = Vec::new();
    for func in unit.tree.descendants().filter(|n| n.kind == NodeKind::Function) {
        let locals = local_names(unit, func);
        let mut reported: BTreeSet<&str> = BTreeSet::new();
        for node in func.descendants() {
            let Some(target) = mutation_target(unit, node) else {
                continue;
            };
            if !module_names.contains(target) || locals.contains(target) || !reported.insert(target) {
                continue;
            }
            let name = func.name.as_deref().unwrap_or("<anonymous>");
            violations.push(
                violation(
                    KIND,
                    unit,
                    &node.span,
                    format!(
                        "`{}` reassigns file-level `{}`; every caller shares that one variable",
                        name, target
                    ),
                )
                .with_fix(format!("pass `{}` in and return the updated value", target))
                .in_function(Some(func)),
            );
        }
    }
    violations
}

fn local_names<'u>(unit: &'u SourceUnit, func: &SyntaxNode) -> BTreeSet<&'u str> {
    let mut locals: BTreeSet<&str> = func
        .descendants()
        .filter(|n| n.kind == NodeKind::Declaration)
        .filter_map(|n| binding_parts(n).and_then(|(target, _)| bound_name(unit, target)))
        .collect();
    if let Some(params) = function_parameters(func) {
        locals.extend(
            params
                .descendants()
                .filter(|n| n.kind == NodeKind::Identifier)
                .map(|n| unit.text(n)),
        );
    }
    locals
}

fn mutation_target<'u>(unit: &'u SourceUnit, node: &SyntaxNode) -> Option<&'u str> {
    let target = match node.kind {
        NodeKind::Assignment | NodeKind::AugmentedAssignment => binding_parts(node)?.0,
        NodeKind::Update => node
            .child_by_field("argument")
            .or_else(|| node.code_children().next())?,
        _ => return None,
    };
    (target.kind == NodeKind::Identifier).then(|| unit.text(target))
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use super::*;

    fn detect(language: Language, source: &str) -> Vec<Violation> {
        let unit = SourceUnit::from_source("test", language, source).unwrap();
        IdentityDetector.detect(&unit).unwrap()
    }

    #[test]
    fn test_python_global_and_mutable_default() {
        let source = r#"counter = 0

def bump():
    global counter
    counter += 1

def collect(item, bucket=[]):
    bucket.append(item)
    return bucket

def fine(item, bucket=None):
    return item
"#;
        let found = detect(Language::Python, source);
        let lines: Vec<_> = found.iter().map(|v| v.line).collect();
        assert_eq!(lines, vec![4, 7]);
        assert_eq!(found[1].function.as_ref().unwrap().name, "collect");
    }

    #[test]
    fn test_rust_static_mut() {
        let source = "static mut COUNT: u32 = 0;\nstatic NAME: &str = \"x\";\n";
        let found = detect(Language::Rust, source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 1);
    }

    #[test]
    fn test_javascript_module_reassignment() {
        let source = r#"let hits = 0;
const LIMIT = 5;

function record() {
  hits += 1;
  hits++;
}

function shadow() {
  let hits = 3;
  hits = 4;
}
"#;
        let found = detect(Language::JavaScript, source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 5);
        assert_eq!(found[0].function.as_ref().unwrap().name, "record");
    }

    #[test]
    fn test_go_package_variable() {
        let source = "package p\n\nvar total int\n\nfunc add(n int) {\n\ttotal = total + n\n}\n";
        let found = detect(Language::Go, source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 6);
    }
}
