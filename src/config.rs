//! Analysis configuration.
//!
//! Every option has a default, so an empty YAML document is a valid config.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

pub const DEFAULT_DUPLICATION_THRESHOLD: f64 = 0.85;
pub const DEFAULT_GOD_OBJECT_LOC_THRESHOLD: u32 = 500;
pub const DEFAULT_GOD_OBJECT_METHOD_THRESHOLD: u32 = 20;
pub const DEFAULT_FUNCTION_SIZE_LIMIT: u32 = 60;
pub const DEFAULT_ASSERTION_DENSITY_MIN_PCT: f64 = 2.0;
pub const DEFAULT_POSITION_ARITY_THRESHOLD: u32 = 3;
pub const DEFAULT_DUPLICATION_MIN_LINES: u32 = 10;

/// Weighted safety points per hundred logical lines that cost one
/// percentage point of compliance. With the default of 100, one High
/// violation (weight 2) in a 200-line file costs 1%.
pub const DEFAULT_COMPLIANCE_CALIBRATION: f64 = 100.0;

/// Options recognized by [`crate::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub duplication_threshold: f64,
    pub god_object_loc_threshold: u32,
    pub god_object_method_threshold: u32,
    pub function_size_limit: u32,
    pub assertion_density_min_pct: f64,
    /// Detector and analyzer names to run. `None` runs everything.
    pub enabled_detectors: Option<BTreeSet<String>>,
    pub position_arity_threshold: u32,
    /// Minimum logical lines for a function to be a duplication candidate.
    pub duplication_min_lines: u32,
    pub compliance_calibration: f64,
    /// Glob patterns for paths dropped before ingestion (e.g. "**/vendor/**").
    pub excluded_paths: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            duplication_threshold: DEFAULT_DUPLICATION_THRESHOLD,
            god_object_loc_threshold: DEFAULT_GOD_OBJECT_LOC_THRESHOLD,
            god_object_method_threshold: DEFAULT_GOD_OBJECT_METHOD_THRESHOLD,
            function_size_limit: DEFAULT_FUNCTION_SIZE_LIMIT,
            assertion_density_min_pct: DEFAULT_ASSERTION_DENSITY_MIN_PCT,
            enabled_detectors: None,
            position_arity_threshold: DEFAULT_POSITION_ARITY_THRESHOLD,
            duplication_min_lines: DEFAULT_DUPLICATION_MIN_LINES,
            compliance_calibration: DEFAULT_COMPLIANCE_CALIBRATION,
            excluded_paths: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    /// Parse a config from YAML text. An empty document yields the defaults.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AnalysisConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Only run the named detectors and analyzers.
    pub fn with_enabled<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_detectors = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Whether the detector or analyzer called `name` should run.
    pub fn is_enabled(&self, name: &str) -> bool {
        match &self.enabled_detectors {
            Some(set) => set.contains(name),
            None => true,
        }
    }

    /// Check numeric options and exclusion globs.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.duplication_threshold.is_finite()
            || self.duplication_threshold <= 0.0
            || self.duplication_threshold > 1.0
        {
            return Err(ConfigurationError::new(
                "duplication_threshold",
                format!("must be within (0, 1], got {}", self.duplication_threshold),
            ));
        }
        if !self.assertion_density_min_pct.is_finite()
            || !(0.0..=100.0).contains(&self.assertion_density_min_pct)
        {
            return Err(ConfigurationError::new(
                "assertion_density_min_pct",
                format!(
                    "must be within [0, 100], got {}",
                    self.assertion_density_min_pct
                ),
            ));
        }
        if !self.compliance_calibration.is_finite() || self.compliance_calibration <= 0.0 {
            return Err(ConfigurationError::new(
                "compliance_calibration",
                format!("must be positive, got {}", self.compliance_calibration),
            ));
        }

        let positive = [
            ("god_object_loc_threshold", self.god_object_loc_threshold),
            ("god_object_method_threshold", self.god_object_method_threshold),
            ("function_size_limit", self.function_size_limit),
            ("position_arity_threshold", self.position_arity_threshold),
            ("duplication_min_lines", self.duplication_min_lines),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigurationError::new(field, "must be greater than zero"));
            }
        }

        self.exclusion_set()?;
        Ok(())
    }

    /// Reject `enabled_detectors` entries that name nothing in `known`.
    pub fn validate_detector_names<'a, I>(&self, known: I) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(enabled) = &self.enabled_detectors else {
            return Ok(());
        };
        let known: BTreeSet<&str> = known.into_iter().collect();
        let unknown: Vec<&str> = enabled
            .iter()
            .map(String::as_str)
            .filter(|name| !known.contains(name))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::new(
                "enabled_detectors",
                format!("names unknown detectors: {}", unknown.join(", ")),
            ))
        }
    }

    /// Compile `excluded_paths`. Supports `**` for recursive matching.
    pub fn exclusion_set(&self) -> Result<GlobSet, ConfigurationError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|e| {
                ConfigurationError::new("excluded_paths", format!("bad glob `{}`: {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ConfigurationError::new("excluded_paths", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.duplication_threshold, 0.85);
        assert_eq!(config.god_object_loc_threshold, 500);
        assert_eq!(config.god_object_method_threshold, 20);
        assert_eq!(config.function_size_limit, 60);
        assert_eq!(config.assertion_density_min_pct, 2.0);
        assert!(config.enabled_detectors.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml_partial() {
        let yaml = r#"
function_size_limit: 40
enabled_detectors:
  - function_size
  - duplication
excluded_paths:
  - "**/generated/**"
"#;
        let config = AnalysisConfig::parse_str(yaml).unwrap();
        assert_eq!(config.function_size_limit, 40);
        assert_eq!(config.god_object_loc_threshold, 500);
        assert!(config.is_enabled("duplication"));
        assert!(!config.is_enabled("connascence_of_name"));

        let globs = config.exclusion_set().unwrap();
        assert!(globs.is_match("src/generated/api.py"));
        assert!(!globs.is_match("src/api.py"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = AnalysisConfig::parse_str("  \n").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AnalysisConfig {
            duplication_threshold: -0.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "duplication_threshold");

        let config = AnalysisConfig {
            function_size_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "function_size_limit");

        let config = AnalysisConfig {
            assertion_density_min_pct: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            excluded_paths: vec!["src/[".to_string()],
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "excluded_paths");
    }

    #[test]
    fn test_unknown_detector_names() {
        let config = AnalysisConfig::default().with_enabled(["function_size", "no_such_rule"]);
        let err = config
            .validate_detector_names(["function_size", "bounded_indexing"])
            .unwrap_err();
        assert!(err.reason.contains("no_such_rule"));
        assert!(!err.reason.contains("function_size"));
    }
}
