//! Property tests for compliance and quality scoring.

use connascence::detect::Severity;
use connascence::score::{compliance_from_points, grade, quality_score};
use proptest::prelude::*;

proptest! {
    #[test]
    fn compliance_stays_in_range(
        points in 0.0f64..10_000.0,
        lines in 0u64..100_000,
        calibration in 0.01f64..1_000.0,
    ) {
        let pct = compliance_from_points(points, lines, calibration);
        prop_assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn another_critical_never_raises_compliance(
        points in 0.0f64..10_000.0,
        lines in 1u64..100_000,
        calibration in 0.01f64..1_000.0,
    ) {
        let before = compliance_from_points(points, lines, calibration);
        let after = compliance_from_points(points + Severity::Critical.weight(), lines, calibration);
        prop_assert!(after <= before);
    }

    #[test]
    fn quality_stays_in_range(
        compliance in 0.0f64..=100.0,
        duplication in 0.0f64..=1.0,
        god_objects in 0.0f64..=1.0,
    ) {
        let q = quality_score(compliance, duplication, god_objects);
        prop_assert!((0.0..=1.0).contains(&q));
        prop_assert!(["A", "B", "C", "D", "F"].contains(&grade(q)));
    }

    #[test]
    fn quality_falls_with_duplication(
        compliance in 0.0f64..=100.0,
        low in 0.0f64..=0.5,
        extra in 0.0f64..=0.5,
    ) {
        let clean = quality_score(compliance, low, 0.0);
        let worse = quality_score(compliance, low + extra, 0.0);
        prop_assert!(worse <= clean);
    }
}

#[test]
fn no_violations_is_full_compliance() {
    assert_eq!(compliance_from_points(0.0, 500, 100.0), 100.0);
    assert_eq!(quality_score(100.0, 0.0, 0.0), 1.0);
}
