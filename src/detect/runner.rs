//! Dispatches every registered detector over every unit.
//!
//! Units run in parallel; detectors within a unit run in registration
//! order. A detector that errors or panics yields an empty result with a
//! failure reason and never affects other detectors.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::analysis::{UnitArena, UnitId};
use crate::parser::SourceUnit;

use super::registry::Registry;
use super::types::DetectorResult;
use super::Detector;

/// Cooperative cancellation flag, checked between units.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Results of one run over an arena.
#[derive(Debug, Default)]
pub struct RunOutput {
    /// Unit order first, registration order within a unit.
    pub results: Vec<DetectorResult>,
    pub scanned: Vec<UnitId>,
    /// Units skipped because the run was cancelled.
    pub unscanned: Vec<UnitId>,
}

/// Executes registry detectors against units.
pub struct Runner<'r> {
    registry: &'r Registry,
    cancel: Option<CancellationToken>,
}

impl<'r> Runner<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            cancel: None,
        }
    }

    /// Stop dispatching new units once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|t| t.is_cancelled()).unwrap_or(false)
    }

    /// Run every detector over every unit in the arena.
    pub fn run(&self, arena: &UnitArena) -> RunOutput {
        let per_unit: Vec<(UnitId, Option<Vec<DetectorResult>>)> = arena
            .units()
            .par_iter()
            .enumerate()
            .map(|(idx, unit)| {
                let id = UnitId(idx as u32);
                if self.is_cancelled() {
                    return (id, None);
                }
                (id, Some(self.run_unit(id, unit)))
            })
            .collect();

        let mut output = RunOutput::default();
        for (id, results) in per_unit {
            match results {
                Some(results) => {
                    output.scanned.push(id);
                    output.results.extend(results);
                }
                None => output.unscanned.push(id),
            }
        }

        if !output.unscanned.is_empty() {
            debug!(
                unscanned = output.unscanned.len(),
                "detection cancelled before all units were scanned"
            );
        }
        output
    }

    /// Run every detector over a single unit.
    pub fn run_unit(&self, id: UnitId, unit: &SourceUnit) -> Vec<DetectorResult> {
        let started = Instant::now();
        let results: Vec<DetectorResult> = self
            .registry
            .iter()
            .map(|detector| run_detector(detector, id, unit))
            .collect();
        debug!(
            file = %unit.path,
            detectors = results.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "unit scanned"
        );
        results
    }
}

fn run_detector(detector: &dyn Detector, id: UnitId, unit: &SourceUnit) -> DetectorResult {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(unit)));

    let (violations, failure) = match outcome {
        Ok(Ok(violations)) => match violations.iter().find(|v| v.rule_id != detector.name()) {
            Some(stray) => (
                Vec::new(),
                Some(format!(
                    "emitted violation for rule `{}` it does not own",
                    stray.rule_id
                )),
            ),
            None => (violations, None),
        },
        Ok(Err(err)) => (Vec::new(), Some(err.to_string())),
        Err(payload) => (
            Vec::new(),
            Some(format!("detector panicked: {}", panic_message(payload.as_ref()))),
        ),
    };

    if let Some(reason) = &failure {
        warn!(detector = detector.name(), file = %unit.path, %reason, "detector failed");
    }

    DetectorResult {
        detector_name: detector.name().to_string(),
        detector_version: detector.version().to_string(),
        unit: id,
        file: unit.path.clone(),
        violations,
        duration: started.elapsed(),
        failure,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Category, SafetyRule, Severity, Violation};
    use crate::error::DetectorError;
    use crate::parser::{Language, NodeKind, Span, SyntaxNode};

    struct Always(&'static str);

    impl Detector for Always {
        fn name(&self) -> &str {
            self.0
        }

        fn category(&self) -> Category {
            Category::Safety(SafetyRule::FunctionSize)
        }

        fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
            Ok(vec![Violation::new(
                self.0,
                self.category(),
                Severity::Low,
                unit,
                &unit.tree.span,
                "found",
            )])
        }
    }

    struct Failing;

    impl Detector for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn category(&self) -> Category {
            Category::Safety(SafetyRule::FunctionSize)
        }

        fn detect(&self, _unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
            Err(DetectorError::Internal("boom".into()))
        }
    }

    struct Panicking;

    impl Detector for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn category(&self) -> Category {
            Category::Safety(SafetyRule::FunctionSize)
        }

        fn detect(&self, _unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
            panic!("index out of range")
        }
    }

    fn arena(paths: &[&str]) -> UnitArena {
        let mut arena = UnitArena::new();
        for path in paths {
            let tree = SyntaxNode::new(NodeKind::Module, "module", Span::default());
            arena.push(SourceUnit::new(
                *path,
                Language::Python,
                String::new(),
                tree,
                Vec::new(),
                false,
            ));
        }
        arena
    }

    #[test]
    fn test_results_follow_unit_then_registration_order() {
        let mut registry = Registry::new();
        registry.register(Box::new(Always("first"))).unwrap();
        registry.register(Box::new(Always("second"))).unwrap();

        let output = Runner::new(&registry).run(&arena(&["a.py", "b.py"]));
        let order: Vec<_> = output
            .results
            .iter()
            .map(|r| (r.file.as_str(), r.detector_name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.py", "first"),
                ("a.py", "second"),
                ("b.py", "first"),
                ("b.py", "second")
            ]
        );
        assert_eq!(output.scanned.len(), 2);
        assert!(output.unscanned.is_empty());
    }

    #[test]
    fn test_failures_are_isolated() {
        let mut registry = Registry::new();
        registry.register(Box::new(Failing)).unwrap();
        registry.register(Box::new(Panicking)).unwrap();
        registry.register(Box::new(Always("healthy"))).unwrap();

        let output = Runner::new(&registry).run(&arena(&["a.py"]));
        assert_eq!(output.results.len(), 3);
        assert_eq!(output.results[0].failure.as_deref(), Some("boom"));
        assert!(output.results[1]
            .failure
            .as_deref()
            .unwrap()
            .contains("index out of range"));
        assert!(output.results[0].violations.is_empty());
        assert_eq!(output.results[2].violations.len(), 1);
        assert!(output.results[2].failure.is_none());
    }

    #[test]
    fn test_foreign_rule_ids_are_rejected() {
        struct Liar;
        impl Detector for Liar {
            fn name(&self) -> &str {
                "liar"
            }
            fn category(&self) -> Category {
                Category::Safety(SafetyRule::FunctionSize)
            }
            fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
                Always("function_size").detect(unit)
            }
        }

        let mut registry = Registry::new();
        registry.register(Box::new(Liar)).unwrap();
        let output = Runner::new(&registry).run(&arena(&["a.py"]));
        assert!(output.results[0].violations.is_empty());
        assert!(output.results[0].failure.is_some());
    }

    #[test]
    fn test_cancelled_run_reports_unscanned() {
        let mut registry = Registry::new();
        registry.register(Box::new(Always("only"))).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let output = Runner::new(&registry)
            .with_cancellation(token)
            .run(&arena(&["a.py", "b.py", "c.py"]));
        assert!(output.results.is_empty());
        assert_eq!(output.unscanned, vec![UnitId(0), UnitId(1), UnitId(2)]);
    }
}
