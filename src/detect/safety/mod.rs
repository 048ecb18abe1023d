//! Safety rules adapted from the NASA/JPL "Power of Ten".

mod allocation;
mod assertions;
mod function_size;
mod indexing;
mod return_values;

pub use allocation::BoundedAllocationDetector;
pub use assertions::AssertionDensityDetector;
pub use function_size::FunctionSizeDetector;
pub use indexing::BoundedIndexingDetector;
pub use return_values::ReturnValueDetector;

use crate::parser::{SourceUnit, Span};

use super::types::{Category, SafetyRule, Severity, Violation};

fn violation(
    rule: SafetyRule,
    severity: Severity,
    unit: &SourceUnit,
    span: &Span,
    message: impl Into<String>,
) -> Violation {
    Violation::new(
        rule.rule_id(),
        Category::Safety(rule),
        severity,
        unit,
        span,
        message,
    )
}
