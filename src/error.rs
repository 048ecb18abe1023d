//! Error taxonomy.
//!
//! Only misconfiguration is fatal. Per-file and per-detector problems are
//! recovered locally and surface as data in [`crate::AnalysisResult`].

use thiserror::Error;

/// Invalid [`crate::AnalysisConfig`]. Raised before any file is read.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid configuration: `{field}` {reason}")]
pub struct ConfigurationError {
    pub field: String,
    pub reason: String,
}

impl ConfigurationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A detector name was registered twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("detector `{name}` is already registered")]
pub struct DuplicateDetectorError {
    pub name: String,
}

/// Setup failures raised by [`crate::Engine`] construction.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    DuplicateDetector(#[from] DuplicateDetectorError),
}

/// A file could not be turned into a syntax tree.
#[derive(Debug, Clone, Error)]
#[error("failed to parse {path}: {reason}")]
pub struct ParseError {
    pub path: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// An internal error raised by a single detector on a single unit.
#[derive(Debug, Clone, Error)]
pub enum DetectorError {
    #[error("{0}")]
    Internal(String),
    #[error("unsupported syntax: {0}")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigurationError::new("duplication_threshold", "must be within (0, 1]");
        assert_eq!(
            err.to_string(),
            "invalid configuration: `duplication_threshold` must be within (0, 1]"
        );

        let dup = DuplicateDetectorError {
            name: "function_size".to_string(),
        };
        let engine: EngineError = dup.into();
        assert_eq!(
            engine.to_string(),
            "detector `function_size` is already registered"
        );
    }
}
