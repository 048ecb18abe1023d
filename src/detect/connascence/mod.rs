//! Connascence detectors, one per coupling category.
//!
//! Every detector walks the unit's tree once and emits violations with
//! the category's default severity.

mod algorithm;
mod execution;
mod identity;
mod meaning;
mod name;
mod position;
mod timing;
mod type_;
mod value;

pub use algorithm::AlgorithmDetector;
pub use execution::ExecutionDetector;
pub use identity::IdentityDetector;
pub use meaning::MeaningDetector;
pub use name::NameDetector;
pub use position::PositionDetector;
pub use timing::TimingDetector;
pub use type_::TypeDetector;
pub use value::ValueDetector;

use crate::parser::{SourceUnit, Span, SyntaxNode};

use super::types::{Category, ConnascenceKind, Violation};

/// Numeric literals that rarely carry hidden meaning.
pub(crate) const COMMON_NUMBERS: &[&str] = &[
    "0", "1", "-1", "2", "10", "100", "1000", "0.0", "1.0", "-1.0", "0.5", "2.0",
];

fn violation(
    kind: ConnascenceKind,
    unit: &SourceUnit,
    span: &Span,
    message: impl Into<String>,
) -> Violation {
    Violation::new(
        kind.rule_id(),
        Category::Connascence(kind),
        kind.default_severity(),
        unit,
        span,
        message,
    )
}

/// Numeric literal text without separators or type suffixes.
pub(crate) fn normalize_number(text: &str) -> String {
    let lower = text.replace('_', "").to_ascii_lowercase();
    if lower.starts_with("0x") || lower.starts_with("0b") || lower.starts_with("0o") {
        return lower;
    }
    const SUFFIXES: &[&str] = &[
        "usize", "isize", "u128", "i128", "u64", "i64", "u32", "i32", "u16", "i16", "u8", "i8",
        "f64", "f32", "ull", "ul", "ll", "u", "l", "f", "d",
    ];
    for suffix in SUFFIXES {
        if let Some(stripped) = lower.strip_suffix(suffix) {
            if !stripped.is_empty() && !stripped.ends_with('e') {
                return stripped.to_string();
            }
        }
    }
    lower
}

/// Whether a numeric literal (with an optional unary minus parent) is in
/// the common set.
pub(crate) fn is_common_number(unit: &SourceUnit, node: &SyntaxNode, parent: Option<&SyntaxNode>) -> bool {
    let value = normalize_number(unit.text(node));
    let negated = parent
        .filter(|p| p.operator == Some("-") && p.children.len() == 1)
        .is_some();
    let value = if negated { format!("-{}", value) } else { value };
    COMMON_NUMBERS.contains(&value.as_str())
}

/// Contexts where literals are configuration rather than logic.
pub(crate) fn in_literal_exempt_context(unit: &SourceUnit, ancestors: &[&SyntaxNode]) -> bool {
    ancestors.iter().any(|a| {
        matches!(
            a.raw_kind,
            "attribute_item" | "decorator" | "annotation" | "marker_annotation" | "preproc_if"
        ) || a.kind == crate::parser::NodeKind::Import
            || super::syntax::is_assertion(unit, a)
    })
}

/// Short single-line excerpt of a node for messages.
pub(crate) fn excerpt(unit: &SourceUnit, node: &SyntaxNode) -> String {
    let text = unit.text(node);
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() > 40 {
        let cut: String = line.chars().take(37).collect();
        format!("{}...", cut)
    } else if text.contains('\n') {
        format!("{}...", line)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_number() {
        assert_eq!(normalize_number("1_000"), "1000");
        assert_eq!(normalize_number("42u32"), "42");
        assert_eq!(normalize_number("10UL"), "10");
        assert_eq!(normalize_number("2.0f"), "2.0");
        assert_eq!(normalize_number("0xFF"), "0xff");
        assert_eq!(normalize_number("1e5"), "1e5");
    }
}
