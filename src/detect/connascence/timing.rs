//! Connascence of timing: correctness that depends on wall-clock delays.

use crate::detect::syntax::{call_arguments, callee, last_segment};
use crate::detect::types::{Category, ConnascenceKind, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{enclosing_function, visit, NodeKind, SourceUnit};

use super::{excerpt, violation};

const KIND: ConnascenceKind = ConnascenceKind::Timing;

const DELAY_CALLS: &[&str] = &[
    "sleep",
    "usleep",
    "nanosleep",
    "msleep",
    "Sleep",
    "sleep_for",
    "sleep_until",
    "setTimeout",
    "setInterval",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct TimingDetector;

impl Detector for TimingDetector {
    fn name(&self) -> &str {
        KIND.rule_id()
    }

    fn category(&self) -> Category {
        Category::Connascence(KIND)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let mut violations = Vec::new();
        visit(&unit.tree, |node, ancestors| {
            if node.kind != NodeKind::Call {
                return;
            }
            let Some(name) = callee(unit, node).map(last_segment) else {
                return;
            };
            if !DELAY_CALLS.contains(&name) {
                return;
            }
            // `sleep(0)` only yields.
            let args = call_arguments(node);
            if args.len() == 1 && unit.text(args[0]).trim() == "0" {
                return;
            }
            violations.push(
                violation(
                    KIND,
                    unit,
                    &node.span,
                    format!(
                        "`{}` orders work by elapsed time; correctness depends on timing",
                        excerpt(unit, node)
                    ),
                )
                .with_fix("wait on an explicit signal such as an event, join handle or future")
                .in_function(enclosing_function(ancestors)),
            );
        });
        Ok(violations)
    }
}
