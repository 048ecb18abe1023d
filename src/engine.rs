//! The analysis pipeline: ingest, detect, analyze across units, aggregate,
//! recommend.
//!
//! ```text
//! paths ──▶ TreeAdapter ──▶ UnitArena ──▶ Runner (per unit, parallel)
//!                │                             │
//!                ▼                             ▼ barrier
//!        IngestionFailure        GodObjectAnalyzer ∥ DuplicationAnalyzer
//!                                              │
//!                                              ▼
//!                                 aggregate ──▶ recommend ──▶ AnalysisResult
//! ```
//!
//! Only configuration problems fail a call. Anything scoped to one file or
//! one detector is recorded in the result.

use std::path::Path;
use std::time::Instant;

use globset::GlobSet;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::analysis::{duplication, god_objects, DuplicationAnalyzer, GodObjectAnalyzer, UnitArena};
use crate::config::AnalysisConfig;
use crate::detect::{
    builtin_names, filter_suppressed, parse_suppressions, CancellationToken, Detector,
    DetectorResult, IngestionFailure, Registry, Runner, SuppressedViolation,
};
use crate::error::{ConfigurationError, DuplicateDetectorError};
use crate::parser::{default_adapter, SourceUnit, TreeAdapter};
use crate::recommend::recommend;
use crate::score::{aggregate, Aggregation, AnalysisResult};

/// Analyze `paths` with the default tree adapter.
///
/// Fails only when `config` is invalid, before any file is read.
pub fn analyze<P: AsRef<Path> + Sync>(
    paths: &[P],
    config: AnalysisConfig,
) -> Result<AnalysisResult, ConfigurationError> {
    Ok(Engine::new(config)?.analyze(paths))
}

/// Every name `enabled_detectors` may contain.
pub fn known_names() -> Vec<&'static str> {
    let mut names = builtin_names();
    names.push(god_objects::ANALYZER_NAME);
    names.push(duplication::ANALYZER_NAME);
    names
}

/// A configured pipeline. Holds no state between runs.
pub struct Engine {
    config: AnalysisConfig,
    registry: Registry,
    adapter: Box<dyn TreeAdapter>,
    cancel: Option<CancellationToken>,
}

impl Engine {
    /// Validate `config` and build the built-in registry.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        config.validate_detector_names(known_names())?;
        let registry = Registry::with_builtins(&config);
        debug!(detectors = ?registry.names(), "engine configured");
        Ok(Self {
            config,
            registry,
            adapter: default_adapter(),
            cancel: None,
        })
    }

    pub fn with_adapter(mut self, adapter: Box<dyn TreeAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    /// Stop scanning new units once `token` is cancelled. The result is then
    /// marked incomplete.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Add a detector after the built-ins.
    pub fn register(&mut self, detector: Box<dyn Detector>) -> Result<(), DuplicateDetectorError> {
        self.registry.register(detector)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Parse and analyze files.
    pub fn analyze<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> AnalysisResult {
        let started = Instant::now();
        let (units, failures) = self.ingest(paths);
        debug!(
            units = units.len(),
            failures = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ingestion finished"
        );
        self.analyze_units(units, failures)
    }

    /// Analyze units that were parsed elsewhere.
    pub fn analyze_units(
        &self,
        units: Vec<SourceUnit>,
        ingestion_failures: Vec<IngestionFailure>,
    ) -> AnalysisResult {
        let arena = UnitArena::from_units(units);

        let started = Instant::now();
        let mut runner = Runner::new(&self.registry);
        if let Some(token) = &self.cancel {
            runner = runner.with_cancellation(token.clone());
        }
        let run = runner.run(&arena);
        debug!(
            results = run.results.len(),
            scanned = run.scanned.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "detection finished"
        );

        let (results, suppressed) = apply_suppressions(&arena, run.results);

        let started = Instant::now();
        let (god_objects, duplication) = rayon::join(
            || {
                if self.config.is_enabled(god_objects::ANALYZER_NAME) {
                    GodObjectAnalyzer::from_config(&self.config).analyze(&arena, &run.scanned)
                } else {
                    Default::default()
                }
            },
            || {
                if self.config.is_enabled(duplication::ANALYZER_NAME) {
                    DuplicationAnalyzer::from_config(&self.config).analyze(&arena, &run.scanned)
                } else {
                    Default::default()
                }
            },
        );
        debug!(
            god_objects = god_objects.candidates.len(),
            duplicate_groups = duplication.groups.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cross-unit analysis finished"
        );

        let logical_lines = run
            .scanned
            .iter()
            .filter_map(|id| arena.get(*id))
            .map(|unit| u64::from(unit.logical_line_count))
            .sum();

        let mut result = aggregate(Aggregation {
            files_analyzed: run.scanned.len(),
            logical_lines,
            results,
            suppressed,
            god_objects,
            duplication,
            ingestion_failures,
            unscanned_units: run.unscanned.len(),
            compliance_calibration: self.config.compliance_calibration,
        });
        result.recommendations = recommend(&result);
        debug!(
            violations = result.violations.len(),
            compliance = result.nasa_compliance_pct,
            quality = result.quality_score,
            incomplete = result.incomplete,
            "aggregation finished"
        );
        result
    }

    /// Parse every non-excluded path, in input order.
    fn ingest<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> (Vec<SourceUnit>, Vec<IngestionFailure>) {
        // validate() already compiled these globs once
        let excluded = self
            .config
            .exclusion_set()
            .unwrap_or_else(|_| GlobSet::empty());

        let parsed: Vec<Result<SourceUnit, IngestionFailure>> = paths
            .par_iter()
            .map(|p| p.as_ref())
            .filter(|path| !excluded.is_match(path))
            .map(|path| self.parse_one(path))
            .collect();

        let mut units = Vec::new();
        let mut failures = Vec::new();
        for outcome in parsed {
            match outcome {
                Ok(unit) => units.push(unit),
                Err(failure) => {
                    warn!(path = %failure.path, reason = %failure.reason, "skipping file");
                    failures.push(failure);
                }
            }
        }
        (units, failures)
    }

    fn parse_one(&self, path: &Path) -> Result<SourceUnit, IngestionFailure> {
        let display = path.display().to_string();
        let language = self
            .adapter
            .detect_language(path)
            .ok_or_else(|| IngestionFailure {
                path: display.clone(),
                reason: "unsupported language".to_string(),
            })?;
        self.adapter
            .parse(path, language)
            .map_err(|err| IngestionFailure {
                path: display,
                reason: err.reason,
            })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Move violations covered by inline directives out of the results.
fn apply_suppressions(
    arena: &UnitArena,
    results: Vec<DetectorResult>,
) -> (Vec<DetectorResult>, Vec<SuppressedViolation>) {
    let directives: Vec<_> = arena
        .units()
        .par_iter()
        .map(parse_suppressions)
        .collect();

    let mut suppressed = Vec::new();
    let results = results
        .into_iter()
        .map(|mut result| {
            let unit_directives = directives
                .get(result.unit.index())
                .map(Vec::as_slice)
                .unwrap_or_default();
            let (active, hidden) =
                filter_suppressed(std::mem::take(&mut result.violations), unit_directives);
            result.violations = active;
            suppressed.extend(hidden);
            result
        })
        .collect();
    (results, suppressed)
}
