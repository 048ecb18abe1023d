//! Return values of non-void functions must be checked.
//!
//! A call is checked when its result is used. Bare call statements and
//! results stored in a variable that is never read again are reported,
//! unless an enclosing `try` handles the failure path.

use std::collections::BTreeSet;

use phf::phf_set;

use crate::detect::syntax::{binding_parts, bound_name, callee, last_segment, receiver_path, SELF_NAMES};
use crate::detect::types::{Category, SafetyRule, Severity, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{enclosing_function, visit, within_scope, Language, NodeKind, SourceUnit, SyntaxNode};

use super::violation;

const RULE: SafetyRule = SafetyRule::ReturnValueCheck;

/// Unqualified library calls whose result reports failure.
static FREE_CHECKED: phf::Set<&'static str> = phf_set! {
    "open",
    "fopen",
    "fclose",
    "malloc",
    "calloc",
    "realloc",
    "read",
    "write",
    "fread",
    "fwrite",
    "fgets",
    "scanf",
    "fscanf",
    "sscanf",
    "recv",
    "send",
    "pthread_create",
    "pthread_join",
    "setuid",
    "chdir",
    "fcntl",
    "ioctl",
    "poll",
};

/// Qualified calls whose result reports failure.
static QUALIFIED_CHECKED: phf::Set<&'static str> = phf_set! {
    "subprocess.run",
    "subprocess.call",
    "os.system",
    "os.write",
    "os.read",
    "os.Remove",
    "os.Mkdir",
    "os.MkdirAll",
    "os.Chdir",
    "os.Setenv",
    "os.ReadFile",
    "os.WriteFile",
    "ioutil.ReadFile",
    "ioutil.WriteFile",
    "io.ReadAll",
    "json.Marshal",
    "json.Unmarshal",
    "strconv.Atoi",
};

const AWAIT_KINDS: &[&str] = &["await", "await_expression"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnValueDetector;

impl Detector for ReturnValueDetector {
    fn name(&self) -> &str {
        RULE.rule_id()
    }

    fn category(&self) -> Category {
        Category::Safety(RULE)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let returning = value_returning_functions(unit);
        let mut violations = Vec::new();

        visit(&unit.tree, |node, ancestors| {
            if within_scope(ancestors).iter().any(|a| a.kind == NodeKind::Try) {
                return;
            }
            let found = match node.kind {
                NodeKind::ExprStatement => discarded_call(unit, node, &returning),
                NodeKind::Assignment | NodeKind::Declaration => {
                    unread_result(unit, node, ancestors, &returning)
                }
                _ => None,
            };
            if let Some(v) = found {
                violations.push(v.in_function(enclosing_function(ancestors)));
            }
        });
        Ok(violations)
    }
}

/// Names of functions in this unit that return a value.
fn value_returning_functions(unit: &SourceUnit) -> BTreeSet<&str> {
    unit.tree
        .descendants()
        .filter(|n| n.kind == NodeKind::Function)
        .filter(|f| returns_value(unit, f))
        .filter_map(|f| f.name.as_deref())
        .collect()
}

fn returns_value(unit: &SourceUnit, func: &SyntaxNode) -> bool {
    match unit.language {
        Language::Rust => func.child_by_field("return_type").is_some(),
        Language::Go => func.child_by_field("result").is_some(),
        Language::Java | Language::C | Language::Cpp => func
            .child_by_field("type")
            .map(|t| unit.text(t).trim() != "void")
            .unwrap_or(false),
        Language::TypeScript | Language::Tsx
            if func.child_by_field("return_type").is_some() =>
        {
            func.child_by_field("return_type")
                .map(|t| !unit.text(t).contains("void"))
                .unwrap_or(false)
        }
        _ => func
            .descendants_in_scope()
            .any(|n| n.kind == NodeKind::Return && n.code_children().next().is_some()),
    }
}

/// Whether the result of `call` must be consumed.
fn must_check(unit: &SourceUnit, call: &SyntaxNode, returning: &BTreeSet<&str>) -> Option<String> {
    if call.kind != NodeKind::Call || call.raw_kind == "macro_invocation" {
        return None;
    }
    let full = callee(unit, call)?;
    let name = last_segment(full);
    let checked = match receiver_path(full) {
        None => FREE_CHECKED.contains(name) || returning.contains(name),
        Some(receiver) => {
            QUALIFIED_CHECKED.contains(full)
                || (SELF_NAMES.contains(&receiver) && returning.contains(name))
        }
    };
    checked.then(|| full.to_string())
}

fn discarded_call(unit: &SourceUnit, stmt: &SyntaxNode, returning: &BTreeSet<&str>) -> Option<Violation> {
    let mut expr = stmt.code_children().next()?;
    if AWAIT_KINDS.contains(&expr.raw_kind) {
        expr = expr.code_children().next()?;
    }
    let full = must_check(unit, expr, returning)?;
    Some(
        violation(
            RULE,
            Severity::High,
            unit,
            &expr.span,
            format!("return value of `{}` is discarded", full),
        )
        .with_fix(format!("check the result of `{}` or discard it explicitly", full)),
    )
}

fn unread_result(
    unit: &SourceUnit,
    binding: &SyntaxNode,
    ancestors: &[&SyntaxNode],
    returning: &BTreeSet<&str>,
) -> Option<Violation> {
    let (target, value) = binding_parts(binding)?;
    let mut value = value?;
    if AWAIT_KINDS.contains(&value.raw_kind) {
        value = value.code_children().next()?;
    }
    let full = must_check(unit, value, returning)?;
    let name = bound_name(unit, target)?;
    if name.starts_with('_') {
        return None;
    }
    let scope = enclosing_function(ancestors)?;
    let read_later = scope.descendants().any(|n| {
        n.kind == NodeKind::Identifier
            && n.span.start_byte >= binding.span.end_byte
            && unit.text(n) == name
    });
    if read_later {
        return None;
    }
    Some(
        violation(
            RULE,
            Severity::High,
            unit,
            &binding.span,
            format!("result of `{}` is stored in `{}` but never checked", full, name),
        )
        .with_fix(format!("check `{}` before continuing", name)),
    )
}
