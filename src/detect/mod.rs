//! Per-unit detection rules.
//!
//! Each rule implements [`Detector`]: a pure function from a
//! [`SourceUnit`] to violations. Detectors never see each other's output.

mod registry;
mod runner;
mod suppress;
pub mod syntax;
mod types;

pub mod connascence;
pub mod safety;

pub use registry::{builtin_names, DetectorKind, Registry};
pub use runner::{CancellationToken, RunOutput, Runner};
pub use suppress::{
    filter_suppressed, parse_suppressions, SuppressedViolation, Suppression, SuppressionScope,
};
pub use types::{
    Category, ConnascenceKind, DetectorFailure, DetectorResult, FunctionScope, IngestionFailure,
    SafetyRule, Severity, Violation,
};

use crate::error::DetectorError;
use crate::parser::SourceUnit;

/// A single rule run over one unit at a time.
///
/// Implementations must be stateless: the runner calls `detect` from many
/// threads at once and in any order.
pub trait Detector: Send + Sync {
    /// Unique name. Also the `rule_id` of every violation it emits.
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn category(&self) -> Category;

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError>;
}
