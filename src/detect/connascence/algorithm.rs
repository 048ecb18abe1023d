//! Connascence of algorithm: functions in one file that implement the same
//! steps and must change together.
//!
//! Uses the structural fingerprints of the duplication analyzer, restricted
//! to a single unit.

use std::collections::BTreeMap;

use crate::analysis::duplication::{candidate_functions, fingerprint, similar_pairs};
use crate::detect::types::{Category, ConnascenceKind, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::SourceUnit;

use super::violation;

const KIND: ConnascenceKind = ConnascenceKind::Algorithm;

#[derive(Debug, Clone, Copy)]
pub struct AlgorithmDetector {
    threshold: f64,
    min_lines: u32,
}

impl AlgorithmDetector {
    pub fn new(threshold: f64, min_lines: u32) -> Self {
        Self {
            threshold,
            min_lines,
        }
    }
}

impl Detector for AlgorithmDetector {
    fn name(&self) -> &str {
        KIND.rule_id()
    }

    fn category(&self) -> Category {
        Category::Connascence(KIND)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let functions = candidate_functions(unit, self.min_lines);
        if functions.len() < 2 {
            return Ok(Vec::new());
        }
        let fingerprints: Vec<_> = functions.iter().map(|f| fingerprint(f)).collect();

        // Report each later copy once, against its closest earlier twin.
        let mut best: BTreeMap<usize, (usize, f64)> = BTreeMap::new();
        for (a, b, similarity) in similar_pairs(&fingerprints, self.threshold) {
            let entry = best.entry(b).or_insert((a, similarity));
            if similarity > entry.1 {
                *entry = (a, similarity);
            }
        }

        let violations = best
            .into_iter()
            .map(|(later, (earlier, similarity))| {
                let copy = functions[later];
                let original = functions[earlier];
                let copy_name = copy.name.as_deref().unwrap_or("<anonymous>");
                let original_name = original.name.as_deref().unwrap_or("<anonymous>");
                violation(
                    KIND,
                    unit,
                    &copy.span,
                    format!(
                        "`{}` repeats the algorithm of `{}` (line {}, similarity {:.2})",
                        copy_name,
                        original_name,
                        original.start_line(),
                        similarity
                    ),
                )
                .with_fix(format!(
                    "extract the shared steps of `{}` and `{}` into one helper",
                    original_name, copy_name
                ))
                .in_function(Some(copy))
            })
            .collect();
        Ok(violations)
    }
}
