//! Aggregation, NASA compliance and quality scoring.
//!
//! Compliance is 100 minus the severity-weighted density of safety
//! violations, where `compliance_calibration` weighted points per logical
//! line cost the whole 100. The default calibration of 100 means one
//! weighted point per hundred logical lines costs one percentage point.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::{DuplicateGroup, DuplicationReport, GodObjectCandidate, GodObjectReport};
use crate::detect::{
    DetectorFailure, DetectorResult, IngestionFailure, Severity, SuppressedViolation, Violation,
};
use crate::recommend::Recommendation;

/// Fixed weights of the quality score. Not configurable so that scores
/// stay comparable between runs.
pub mod weights {
    pub const COMPLIANCE: f64 = 0.5;
    pub const DUPLICATION: f64 = 0.25;
    pub const GOD_OBJECTS: f64 = 0.25;
}

/// Lowest quality score for each grade.
pub mod grades {
    pub const A_MIN: f64 = 0.9;
    pub const B_MIN: f64 = 0.8;
    pub const C_MIN: f64 = 0.7;
    pub const D_MIN: f64 = 0.6;
}

/// The terminal aggregate of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub files_analyzed: usize,
    pub logical_lines: u64,
    /// Active violations in unit order, registration order within a unit.
    pub violations: Vec<Violation>,
    pub violations_by_severity: BTreeMap<Severity, usize>,
    /// Keyed by [`crate::detect::Category::label`].
    pub violations_by_category: BTreeMap<String, usize>,
    pub god_objects: Vec<GodObjectCandidate>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub duplication_ratio: f64,
    pub god_object_ratio: f64,
    /// Always within `[0, 100]`.
    pub nasa_compliance_pct: f64,
    /// Always within `[0, 1]`.
    pub quality_score: f64,
    pub grade: String,
    pub recommendations: Vec<Recommendation>,
    pub suppressed: Vec<SuppressedViolation>,
    pub ingestion_failures: Vec<IngestionFailure>,
    pub detector_failures: Vec<DetectorFailure>,
    /// Set when the run was cancelled before every unit was scanned.
    pub incomplete: bool,
    pub unscanned_units: usize,
}

impl AnalysisResult {
    /// Whether any active violation is High or Critical.
    pub fn has_blocking_violations(&self) -> bool {
        self.violations.iter().any(|v| v.severity <= Severity::High)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.violations_by_severity
            .get(&severity)
            .copied()
            .unwrap_or(0)
    }
}

/// Everything the aggregation step reduces.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub files_analyzed: usize,
    pub logical_lines: u64,
    /// Detector output after suppressions were applied.
    pub results: Vec<DetectorResult>,
    pub suppressed: Vec<SuppressedViolation>,
    pub god_objects: GodObjectReport,
    pub duplication: DuplicationReport,
    pub ingestion_failures: Vec<IngestionFailure>,
    pub unscanned_units: usize,
    pub compliance_calibration: f64,
}

/// Sum of severity weights over safety violations.
pub fn weighted_safety_points<'a, I>(violations: I) -> f64
where
    I: IntoIterator<Item = &'a Violation>,
{
    violations
        .into_iter()
        .filter(|v| v.category.is_safety())
        .map(|v| v.severity.weight())
        .sum()
}

/// `100 - clamp(points / logical_lines * calibration, 0, 100)`.
pub fn compliance_from_points(points: f64, logical_lines: u64, calibration: f64) -> f64 {
    let density = points / logical_lines.max(1) as f64 * calibration;
    let pct = 100.0 - density.clamp(0.0, 100.0);
    round4(pct)
}

pub fn nasa_compliance<'a, I>(violations: I, logical_lines: u64, calibration: f64) -> f64
where
    I: IntoIterator<Item = &'a Violation>,
{
    compliance_from_points(weighted_safety_points(violations), logical_lines, calibration)
}

/// Weighted average of compliance and the inverse duplication and
/// god-object ratios.
pub fn quality_score(compliance_pct: f64, duplication_ratio: f64, god_object_ratio: f64) -> f64 {
    let score = weights::COMPLIANCE * compliance_pct / 100.0
        + weights::DUPLICATION * (1.0 - duplication_ratio)
        + weights::GOD_OBJECTS * (1.0 - god_object_ratio);
    round4(score.clamp(0.0, 1.0))
}

/// Letter grade for a quality score.
pub fn grade(quality: f64) -> &'static str {
    match quality {
        q if q >= grades::A_MIN => "A",
        q if q >= grades::B_MIN => "B",
        q if q >= grades::C_MIN => "C",
        q if q >= grades::D_MIN => "D",
        _ => "F",
    }
}

/// Reduce detector and analyzer output. Never fails: a detector failure
/// counts as zero violations for its unit.
pub fn aggregate(input: Aggregation) -> AnalysisResult {
    let mut violations = Vec::new();
    let mut detector_failures = Vec::new();
    for result in input.results {
        match result.failure {
            Some(reason) => detector_failures.push(DetectorFailure {
                detector: result.detector_name,
                path: result.file,
                reason,
            }),
            None => violations.extend(result.violations),
        }
    }

    let mut violations_by_severity: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|s| (*s, 0)).collect();
    let mut violations_by_category: BTreeMap<String, usize> = BTreeMap::new();
    for v in &violations {
        *violations_by_severity.entry(v.severity).or_insert(0) += 1;
        *violations_by_category.entry(v.category.label()).or_insert(0) += 1;
    }

    let nasa_compliance_pct = nasa_compliance(
        &violations,
        input.logical_lines,
        input.compliance_calibration,
    );
    let duplication_ratio = round4(input.duplication.ratio());
    let god_object_ratio = round4(input.god_objects.ratio());
    let quality_score = quality_score(nasa_compliance_pct, duplication_ratio, god_object_ratio);

    AnalysisResult {
        files_analyzed: input.files_analyzed,
        logical_lines: input.logical_lines,
        violations,
        violations_by_severity,
        violations_by_category,
        god_objects: input.god_objects.candidates,
        duplicate_groups: input.duplication.groups,
        duplication_ratio,
        god_object_ratio,
        nasa_compliance_pct,
        quality_score,
        grade: grade(quality_score).to_string(),
        recommendations: Vec::new(),
        suppressed: input.suppressed,
        ingestion_failures: input.ingestion_failures,
        detector_failures,
        incomplete: input.unscanned_units > 0,
        unscanned_units: input.unscanned_units,
    }
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::UnitId;
    use crate::detect::{Category, ConnascenceKind, SafetyRule};
    use std::time::Duration;

    fn violation(category: Category, severity: Severity) -> Violation {
        Violation {
            rule_id: "rule".to_string(),
            category,
            severity,
            file: "a.py".to_string(),
            line: 1,
            column: 1,
            span_end: (1, 2),
            message: "m".to_string(),
            suggested_fix: None,
            function: None,
        }
    }

    fn result(name: &str, violations: Vec<Violation>, failure: Option<&str>) -> DetectorResult {
        DetectorResult {
            detector_name: name.to_string(),
            detector_version: "0".to_string(),
            unit: UnitId(0),
            file: "a.py".to_string(),
            violations,
            duration: Duration::ZERO,
            failure: failure.map(str::to_string),
        }
    }

    #[test]
    fn test_compliance_counts_only_safety() {
        let violations = vec![
            violation(Category::Safety(SafetyRule::AssertionDensity), Severity::Medium),
            violation(Category::Safety(SafetyRule::ReturnValueCheck), Severity::High),
            violation(Category::Connascence(ConnascenceKind::Meaning), Severity::Critical),
        ];
        assert_eq!(weighted_safety_points(&violations), 3.0);
        assert_eq!(nasa_compliance(&violations, 10, 100.0), 70.0);
        assert_eq!(nasa_compliance(&violations, 1000, 100.0), 99.7);
    }

    #[test]
    fn test_compliance_is_clamped() {
        assert_eq!(compliance_from_points(0.0, 0, 100.0), 100.0);
        assert_eq!(compliance_from_points(50.0, 1, 100.0), 0.0);
        assert_eq!(compliance_from_points(4.0, 0, 100.0), 0.0);
    }

    #[test]
    fn test_quality_and_grade() {
        assert_eq!(quality_score(100.0, 0.0, 0.0), 1.0);
        assert_eq!(quality_score(100.0, 1.0, 0.5), 0.625);
        assert_eq!(quality_score(0.0, 1.0, 1.0), 0.0);
        assert_eq!(grade(1.0), "A");
        assert_eq!(grade(0.9), "A");
        assert_eq!(grade(0.85), "B");
        assert_eq!(grade(0.7), "C");
        assert_eq!(grade(0.6), "D");
        assert_eq!(grade(0.59), "F");
    }

    #[test]
    fn test_aggregate_isolates_failures() {
        let results = vec![
            result(
                "function_size",
                vec![violation(Category::Safety(SafetyRule::FunctionSize), Severity::High)],
                None,
            ),
            result("broken", Vec::new(), Some("boom")),
        ];
        let out = aggregate(Aggregation {
            files_analyzed: 1,
            logical_lines: 200,
            results,
            compliance_calibration: 100.0,
            ..Default::default()
        });
        assert_eq!(out.violations.len(), 1);
        assert_eq!(out.count(Severity::High), 1);
        assert_eq!(out.count(Severity::Low), 0);
        assert_eq!(out.violations_by_category.get("safety.function_size"), Some(&1));
        assert_eq!(out.detector_failures.len(), 1);
        assert_eq!(out.detector_failures[0].detector, "broken");
        assert_eq!(out.nasa_compliance_pct, 99.0);
        assert!(!out.incomplete);
        assert!(out.has_blocking_violations());
    }
}
