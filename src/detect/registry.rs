//! Fixed registry of detectors, built once per analysis.

use crate::config::AnalysisConfig;
use crate::error::DuplicateDetectorError;

use super::connascence::{
    AlgorithmDetector, ExecutionDetector, IdentityDetector, MeaningDetector, NameDetector,
    PositionDetector, TimingDetector, TypeDetector, ValueDetector,
};
use super::safety::{
    AssertionDensityDetector, BoundedAllocationDetector, BoundedIndexingDetector,
    FunctionSizeDetector, ReturnValueDetector,
};
use super::types::{ConnascenceKind, SafetyRule};
use super::Detector;

/// Every built-in detector, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    Connascence(ConnascenceKind),
    Safety(SafetyRule),
}

impl DetectorKind {
    pub fn all() -> impl Iterator<Item = DetectorKind> {
        ConnascenceKind::ALL
            .into_iter()
            .map(DetectorKind::Connascence)
            .chain(SafetyRule::ALL.into_iter().map(DetectorKind::Safety))
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectorKind::Connascence(kind) => kind.rule_id(),
            DetectorKind::Safety(rule) => rule.rule_id(),
        }
    }

    /// Instantiate the detector with thresholds from `config`.
    pub fn build(&self, config: &AnalysisConfig) -> Box<dyn Detector> {
        match self {
            DetectorKind::Connascence(kind) => match kind {
                ConnascenceKind::Name => Box::new(NameDetector::default()),
                ConnascenceKind::Type => Box::new(TypeDetector),
                ConnascenceKind::Meaning => Box::new(MeaningDetector),
                ConnascenceKind::Position => {
                    Box::new(PositionDetector::new(config.position_arity_threshold))
                }
                ConnascenceKind::Algorithm => Box::new(AlgorithmDetector::new(
                    config.duplication_threshold,
                    config.duplication_min_lines,
                )),
                ConnascenceKind::Execution => Box::new(ExecutionDetector),
                ConnascenceKind::Timing => Box::new(TimingDetector),
                ConnascenceKind::Value => Box::new(ValueDetector::default()),
                ConnascenceKind::Identity => Box::new(IdentityDetector),
            },
            DetectorKind::Safety(rule) => match rule {
                SafetyRule::BoundedIndexing => Box::new(BoundedIndexingDetector),
                SafetyRule::BoundedAllocation => Box::new(BoundedAllocationDetector),
                SafetyRule::FunctionSize => {
                    Box::new(FunctionSizeDetector::new(config.function_size_limit))
                }
                SafetyRule::AssertionDensity => Box::new(AssertionDensityDetector::new(
                    config.assertion_density_min_pct,
                )),
                SafetyRule::ReturnValueCheck => Box::new(ReturnValueDetector),
            },
        }
    }
}

/// Names of all built-in detectors.
pub fn builtin_names() -> Vec<&'static str> {
    DetectorKind::all().map(|k| k.name()).collect()
}

/// Holds detectors in registration order.
#[derive(Default)]
pub struct Registry {
    detectors: Vec<Box<dyn Detector>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in detectors enabled by `config`.
    pub fn with_builtins(config: &AnalysisConfig) -> Self {
        let detectors = DetectorKind::all()
            .filter(|kind| config.is_enabled(kind.name()))
            .map(|kind| kind.build(config))
            .collect();
        Self { detectors }
    }

    /// Append a detector. Names must be unique.
    pub fn register(&mut self, detector: Box<dyn Detector>) -> Result<(), DuplicateDetectorError> {
        if self.contains(detector.name()) {
            return Err(DuplicateDetectorError {
                name: detector.name().to_string(),
            });
        }
        self.detectors.push(detector);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.detectors.iter().any(|d| d.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Detector> {
        self.detectors.iter().map(|d| d.as_ref())
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("detectors", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Category, Violation};
    use crate::error::DetectorError;
    use crate::parser::SourceUnit;

    struct Named(&'static str);

    impl Detector for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn category(&self) -> Category {
            Category::Safety(SafetyRule::FunctionSize)
        }

        fn detect(&self, _unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_builtins_in_registration_order() {
        let registry = Registry::with_builtins(&AnalysisConfig::default());
        assert_eq!(registry.len(), 14);
        let names = registry.names();
        assert_eq!(names[0], "connascence_of_name");
        assert_eq!(names[8], "connascence_of_identity");
        assert_eq!(names[9], "bounded_indexing");
        assert_eq!(names[13], "return_value_check");
        assert_eq!(builtin_names(), names);
    }

    #[test]
    fn test_enabled_subset() {
        let config = AnalysisConfig::default().with_enabled(["function_size", "connascence_of_type"]);
        let registry = Registry::with_builtins(&config);
        assert_eq!(registry.names(), vec!["connascence_of_type", "function_size"]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = Registry::new();
        registry.register(Box::new(Named("custom"))).unwrap();
        let err = registry.register(Box::new(Named("custom"))).unwrap_err();
        assert_eq!(err.name, "custom");
        assert_eq!(registry.len(), 1);

        let mut builtins = Registry::with_builtins(&AnalysisConfig::default());
        assert!(builtins.register(Box::new(Named("function_size"))).is_err());
    }
}
