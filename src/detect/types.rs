//! Core types for detection results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::UnitId;
use crate::parser::{SourceUnit, Span, SyntaxNode};

/// Severity levels for violations, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Weight used by the compliance density.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Critical => 4.0,
            Severity::High => 2.0,
            Severity::Medium => 1.0,
            Severity::Low => 0.25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// The nine forms of connascence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnascenceKind {
    Name,
    Type,
    Meaning,
    Position,
    Algorithm,
    Execution,
    Timing,
    Value,
    Identity,
}

impl ConnascenceKind {
    pub const ALL: [ConnascenceKind; 9] = [
        ConnascenceKind::Name,
        ConnascenceKind::Type,
        ConnascenceKind::Meaning,
        ConnascenceKind::Position,
        ConnascenceKind::Algorithm,
        ConnascenceKind::Execution,
        ConnascenceKind::Timing,
        ConnascenceKind::Value,
        ConnascenceKind::Identity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnascenceKind::Name => "name",
            ConnascenceKind::Type => "type",
            ConnascenceKind::Meaning => "meaning",
            ConnascenceKind::Position => "position",
            ConnascenceKind::Algorithm => "algorithm",
            ConnascenceKind::Execution => "execution",
            ConnascenceKind::Timing => "timing",
            ConnascenceKind::Value => "value",
            ConnascenceKind::Identity => "identity",
        }
    }

    /// Rule id and detector name, e.g. `connascence_of_meaning`.
    pub fn rule_id(&self) -> &'static str {
        match self {
            ConnascenceKind::Name => "connascence_of_name",
            ConnascenceKind::Type => "connascence_of_type",
            ConnascenceKind::Meaning => "connascence_of_meaning",
            ConnascenceKind::Position => "connascence_of_position",
            ConnascenceKind::Algorithm => "connascence_of_algorithm",
            ConnascenceKind::Execution => "connascence_of_execution",
            ConnascenceKind::Timing => "connascence_of_timing",
            ConnascenceKind::Value => "connascence_of_value",
            ConnascenceKind::Identity => "connascence_of_identity",
        }
    }

    /// Default severity from the per-category weight table.
    pub fn default_severity(&self) -> Severity {
        match self {
            ConnascenceKind::Name => Severity::Low,
            ConnascenceKind::Type
            | ConnascenceKind::Meaning
            | ConnascenceKind::Position
            | ConnascenceKind::Value => Severity::Medium,
            ConnascenceKind::Algorithm
            | ConnascenceKind::Execution
            | ConnascenceKind::Timing
            | ConnascenceKind::Identity => Severity::High,
        }
    }
}

/// The five safety rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyRule {
    BoundedIndexing,
    BoundedAllocation,
    FunctionSize,
    AssertionDensity,
    ReturnValueCheck,
}

impl SafetyRule {
    pub const ALL: [SafetyRule; 5] = [
        SafetyRule::BoundedIndexing,
        SafetyRule::BoundedAllocation,
        SafetyRule::FunctionSize,
        SafetyRule::AssertionDensity,
        SafetyRule::ReturnValueCheck,
    ];

    /// Rule id and detector name.
    pub fn rule_id(&self) -> &'static str {
        match self {
            SafetyRule::BoundedIndexing => "bounded_indexing",
            SafetyRule::BoundedAllocation => "bounded_allocation",
            SafetyRule::FunctionSize => "function_size",
            SafetyRule::AssertionDensity => "assertion_density",
            SafetyRule::ReturnValueCheck => "return_value_check",
        }
    }
}

/// What a violation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "family", content = "kind", rename_all = "snake_case")]
pub enum Category {
    Connascence(ConnascenceKind),
    Safety(SafetyRule),
}

impl Category {
    pub fn is_safety(&self) -> bool {
        matches!(self, Category::Safety(_))
    }

    /// Stable label used for per-category counts, e.g. `connascence.meaning`.
    pub fn label(&self) -> String {
        match self {
            Category::Connascence(kind) => format!("connascence.{}", kind.as_str()),
            Category::Safety(rule) => format!("safety.{}", rule.rule_id()),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The function a violation sits in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionScope {
    pub name: String,
    pub line: u32,
}

/// A single detected issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub category: Category,
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// (line, column) where the offending span ends.
    pub span_end: (u32, u32),
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionScope>,
}

impl Violation {
    /// A violation located at `span` in `unit`.
    pub fn new(
        rule_id: &str,
        category: Category,
        severity: Severity,
        unit: &SourceUnit,
        span: &Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            category,
            severity,
            file: unit.path.clone(),
            line: span.start_line,
            column: span.start_col,
            span_end: (span.end_line, span.end_col),
            message: message.into(),
            suggested_fix: None,
            function: None,
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    /// Record the enclosing function, if there is one.
    pub fn in_function(mut self, function: Option<&SyntaxNode>) -> Self {
        self.function = function.map(|f| FunctionScope {
            name: f.name.clone().unwrap_or_else(|| "<anonymous>".to_string()),
            line: f.span.start_line,
        });
        self
    }

    /// Create a unique key for this violation (for deduplication/comparison).
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}:{}|{}",
            self.rule_id, self.file, self.line, self.column, self.message
        )
    }
}

/// Output of one detector on one unit. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorResult {
    pub detector_name: String,
    pub detector_version: String,
    pub unit: UnitId,
    pub file: String,
    pub violations: Vec<Violation>,
    pub duration: Duration,
    /// Set when the detector failed; `violations` is then empty.
    pub failure: Option<String>,
}

/// A file that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionFailure {
    pub path: String,
    pub reason: String,
}

/// A detector that failed on one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorFailure {
    pub detector: String,
    pub path: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order_and_weights() {
        let mut severities = vec![Severity::Low, Severity::Critical, Severity::Medium, Severity::High];
        severities.sort();
        assert_eq!(severities, Severity::ALL.to_vec());
        assert_eq!(Severity::Critical.weight(), 4.0);
        assert_eq!(Severity::Low.weight(), 0.25);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_category_weight_table() {
        assert_eq!(ConnascenceKind::Algorithm.default_severity(), Severity::High);
        assert_eq!(ConnascenceKind::Execution.default_severity(), Severity::High);
        assert_eq!(ConnascenceKind::Meaning.default_severity(), Severity::Medium);
        assert_eq!(ConnascenceKind::Value.default_severity(), Severity::Medium);
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&Category::Safety(SafetyRule::FunctionSize)).unwrap();
        assert_eq!(json, r#"{"family":"safety","kind":"function_size"}"#);
        assert_eq!(
            Category::Connascence(ConnascenceKind::Position).label(),
            "connascence.position"
        );
    }
}
