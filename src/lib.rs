//! Connascence - static analysis for structural coupling and safety rules.
//!
//! The engine parses source files into a uniform syntax tree and runs a
//! fixed registry of detectors over every file: nine connascence detectors
//! (name, type, meaning, position, algorithm, execution, timing, value,
//! identity) and five NASA-style safety rules (bounded indexing, bounded
//! allocation, function size, assertion density, return-value checks).
//! Two cross-file analyzers then flag god objects and near-duplicate
//! functions. Everything is reduced into one [`AnalysisResult`] with a
//! compliance percentage, a quality score and ranked recommendations.
//!
//! # Architecture
//!
//! - `parser`: tree adapter; tree-sitter grammars normalized into `SyntaxNode`
//! - `detect`: `Detector` trait, registry, parallel runner, suppressions
//! - `analysis`: unit arena, god-object and duplication analyzers
//! - `score`: aggregation, compliance and quality scoring
//! - `recommend`: remediation rule table
//! - `engine`: the `analyze` pipeline
//! - `report`, `cli`: output formatting and the command-line front end
//!
//! # Example
//!
//! ```no_run
//! use connascence::{analyze, AnalysisConfig};
//!
//! let result = analyze(&["src/service.py"], AnalysisConfig::default())?;
//! println!("{:.1}% compliant, grade {}", result.nasa_compliance_pct, result.grade);
//! # Ok::<(), connascence::ConfigurationError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod parser;
pub mod recommend;
pub mod report;
pub mod score;

pub use analysis::{DuplicateGroup, GodObjectCandidate, UnitArena, UnitId};
pub use config::AnalysisConfig;
pub use detect::{Category, ConnascenceKind, Detector, SafetyRule, Severity, Violation};
pub use engine::{analyze, Engine};
pub use error::{ConfigurationError, DetectorError, DuplicateDetectorError, ParseError};
pub use parser::{Language, SourceUnit, TreeAdapter};
pub use recommend::{Recommendation, RecommendationKind};
pub use score::AnalysisResult;
