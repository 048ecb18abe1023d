//! Output formatting for analysis results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: the full [`AnalysisResult`] wrapped with run metadata
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use std::io::{self, Write};
use std::path::Path;

use colored::*;
use serde::{Deserialize, Serialize};

use crate::detect::{Severity, SuppressedViolation, SuppressionScope, Violation};
use crate::score::AnalysisResult;

/// Output formats understood by [`write_report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
    Sarif,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Format::Pretty),
            "json" => Ok(Format::Json),
            "sarif" => Ok(Format::Sarif),
            other => Err(format!(
                "invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
                other
            )),
        }
    }
}

/// Write `result` to stdout in the chosen format.
pub fn write_report(
    format: Format,
    path: &Path,
    config_path: Option<&Path>,
    result: &AnalysisResult,
    show_suppressed: bool,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        Format::Json => {
            let report = JsonReport::new(path, config_path, result);
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        Format::Sarif => {
            writeln!(out, "{}", serde_json::to_string_pretty(&sarif(path, result))?)?;
        }
        Format::Pretty => write_pretty(&mut out, path, config_path, result, show_suppressed)?,
    }
    Ok(())
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    pub passed: bool,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

impl JsonReport {
    pub fn new(path: &Path, config_path: Option<&Path>, result: &AnalysisResult) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            path: path.display().to_string(),
            config: config_path.map(|p| p.display().to_string()),
            passed: !result.has_blocking_violations(),
            result: result.clone(),
        }
    }
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "connascence";

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifReport {
    pub version: String,
    #[serde(rename = "$schema")]
    pub schema: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRule {
    pub id: String,
    #[serde(rename = "shortDescription")]
    pub short_description: SarifMessage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifResult {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub level: String,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    pub artifact_location: SarifArtifact,
    pub region: SarifRegion,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifArtifact {
    pub uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRegion {
    #[serde(rename = "startLine")]
    pub start_line: u32,
    #[serde(rename = "startColumn")]
    pub start_column: u32,
    #[serde(rename = "endLine")]
    pub end_line: u32,
    #[serde(rename = "endColumn")]
    pub end_column: u32,
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low => "note",
    }
}

/// Path relative to the scanned root when possible, with forward slashes.
fn relative_path(file: &str, base: &Path) -> String {
    let file_path = Path::new(file);
    let base = if base.is_file() {
        base.parent().unwrap_or(base)
    } else {
        base
    };
    file_path
        .strip_prefix(base)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| file.to_string())
}

/// Build a SARIF log. Rules appear in first-use order.
pub fn sarif(base_path: &Path, result: &AnalysisResult) -> SarifReport {
    let mut rules: Vec<SarifRule> = Vec::new();
    for v in &result.violations {
        if !rules.iter().any(|r| r.id == v.rule_id) {
            rules.push(SarifRule {
                id: v.rule_id.clone(),
                short_description: SarifMessage {
                    text: v.category.label(),
                },
            });
        }
    }

    let results = result
        .violations
        .iter()
        .map(|v| SarifResult {
            rule_id: v.rule_id.clone(),
            level: sarif_level(v.severity).to_string(),
            message: SarifMessage {
                text: v.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: relative_path(&v.file, base_path),
                    },
                    region: SarifRegion {
                        start_line: v.line.max(1),
                        start_column: v.column.max(1),
                        end_line: v.span_end.0.max(1),
                        end_column: v.span_end.1.max(1),
                    },
                },
            }],
        })
        .collect();

    SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            results,
        }],
    }
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Human-readable report.
pub fn write_pretty<W: Write>(
    out: &mut W,
    path: &Path,
    config_path: Option<&Path>,
    result: &AnalysisResult,
    show_suppressed: bool,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "  {} v{}",
        TOOL_NAME.cyan().bold(),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out)?;
    writeln!(out, "  {}{}", "Scanning: ".dimmed(), path.display())?;
    if let Some(config) = config_path {
        writeln!(out, "  {}{}", "Config:   ".dimmed(), config.display())?;
    }
    writeln!(
        out,
        "  {}{} files, {} logical lines",
        "Analyzed: ".dimmed(),
        result.files_analyzed,
        result.logical_lines
    )?;
    writeln!(out)?;

    write_summary(out, result)?;
    writeln!(out)?;

    if !result.violations.is_empty() {
        write_violations(out, &result.violations)?;
    }
    if !result.god_objects.is_empty() {
        write_god_objects(out, result)?;
    }
    if !result.duplicate_groups.is_empty() {
        write_duplicates(out, result)?;
    }
    if !result.recommendations.is_empty() {
        writeln!(out, "  {} ({}):", "Recommendations".bold(), result.recommendations.len())?;
        for rec in &result.recommendations {
            writeln!(
                out,
                "    {} {}{}",
                rec.title,
                rec.file.blue(),
                format!(":{}", rec.line).dimmed()
            )?;
            writeln!(out, "            {}", rec.description.dimmed())?;
        }
        writeln!(out)?;
    }
    if !result.suppressed.is_empty() {
        write_suppressed(out, &result.suppressed, show_suppressed)?;
        writeln!(out)?;
    }
    write_failures(out, result)?;
    Ok(())
}

fn write_summary<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    if result.has_blocking_violations() {
        write!(out, "  {}", "✗ FAIL".red())?;
    } else {
        write!(out, "  {}", "✓ PASS".green())?;
    }
    write!(
        out,
        "  NASA compliance: {}%  Quality: {}  Grade: {}",
        colored_pct(result.nasa_compliance_pct),
        format!("{:.2}", result.quality_score).bold(),
        colored_grade(&result.grade)
    )?;
    if !result.suppressed.is_empty() {
        write!(
            out,
            "  {}",
            format!("({} suppressed)", result.suppressed.len()).dimmed()
        )?;
    }
    if result.incomplete {
        write!(
            out,
            "  {}",
            format!("(incomplete: {} units not scanned)", result.unscanned_units).yellow()
        )?;
    }
    writeln!(out)?;

    let counts: Vec<String> = result
        .violations_by_severity
        .iter()
        .map(|(severity, count)| format!("{} {}", count, severity))
        .collect();
    writeln!(out, "  {}", counts.join(", ").dimmed())
}

fn colored_pct(pct: f64) -> ColoredString {
    let text = format!("{:.1}", pct);
    match pct {
        p if p >= 95.0 => text.green().bold(),
        p if p >= 80.0 => text.green(),
        p if p >= 60.0 => text.yellow(),
        _ => text.red(),
    }
}

fn colored_grade(grade: &str) -> ColoredString {
    match grade {
        "A" => grade.green().bold(),
        "B" => grade.green(),
        "C" => grade.yellow(),
        "D" => grade.yellow().bold(),
        _ => grade.red(),
    }
}

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRIT ".red().bold(),
        Severity::High => "HIGH ".red(),
        Severity::Medium => "MED  ".yellow(),
        Severity::Low => "LOW  ".blue(),
    }
}

fn write_violations<W: Write>(out: &mut W, violations: &[Violation]) -> io::Result<()> {
    writeln!(out, "  {} ({}):", "Violations".bold(), violations.len())?;
    writeln!(out)?;
    for v in violations {
        writeln!(
            out,
            "    {}  {:<26}{}{}",
            severity_tag(v.severity),
            v.rule_id.dimmed(),
            v.file.blue(),
            format!(":{}:{}", v.line, v.column).dimmed()
        )?;
        writeln!(out, "            {}", v.message)?;
        if let Some(fix) = &v.suggested_fix {
            writeln!(out, "            {}", format!("fix: {}", fix).dimmed())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_god_objects<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    writeln!(out, "  {} ({}):", "God objects".bold(), result.god_objects.len())?;
    for c in &result.god_objects {
        writeln!(
            out,
            "    {:<24} {}{}  {} lines, {} methods, score {:.2}",
            c.type_name,
            c.file.blue(),
            format!(":{}", c.line).dimmed(),
            c.loc,
            c.method_count,
            c.score
        )?;
    }
    writeln!(out)
}

fn write_duplicates<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    writeln!(
        out,
        "  {} ({}):",
        "Duplicate groups".bold(),
        result.duplicate_groups.len()
    )?;
    for group in &result.duplicate_groups {
        writeln!(
            out,
            "    {:<24} {} members, similarity {:.2}",
            group.signature,
            group.members.len(),
            group.similarity
        )?;
        for m in &group.members {
            writeln!(
                out,
                "      {}{}",
                m.file.blue(),
                format!(":{}-{}", m.span.start_line, m.span.end_line).dimmed()
            )?;
        }
    }
    writeln!(out)
}

fn write_suppressed<W: Write>(
    out: &mut W,
    suppressed: &[SuppressedViolation],
    show_details: bool,
) -> io::Result<()> {
    writeln!(out, "  {} ({}):", "Suppressed".dimmed(), suppressed.len())?;
    if !show_details {
        return writeln!(out, "    {}", "(use --show-suppressed to see details)".dimmed());
    }
    for sv in suppressed {
        let v = &sv.violation;
        let location = match sv.suppression.scope {
            SuppressionScope::File => ":* (file)".to_string(),
            _ => format!(":{}", v.line),
        };
        writeln!(
            out,
            "    {:<26}{}{}",
            v.rule_id.dimmed(),
            v.file.blue(),
            location.dimmed()
        )?;
        if !sv.suppression.reason.is_empty() {
            writeln!(
                out,
                "            {}",
                format!("reason: {:?}", sv.suppression.reason).dimmed()
            )?;
        }
    }
    Ok(())
}

fn write_failures<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    for f in &result.ingestion_failures {
        writeln!(out, "  {} {}: {}", "skipped".yellow(), f.path, f.reason)?;
    }
    for f in &result.detector_failures {
        writeln!(
            out,
            "  {} {} on {}: {}",
            "detector failed".red(),
            f.detector,
            f.path,
            f.reason
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Category, SafetyRule};
    use crate::score::{aggregate, Aggregation};

    fn result_with(violations: Vec<Violation>) -> AnalysisResult {
        let mut result = aggregate(Aggregation {
            files_analyzed: 1,
            logical_lines: 10,
            compliance_calibration: 100.0,
            ..Default::default()
        });
        result.violations = violations;
        result
    }

    fn violation(file: &str, severity: Severity) -> Violation {
        Violation {
            rule_id: "function_size".to_string(),
            category: Category::Safety(SafetyRule::FunctionSize),
            severity,
            file: file.to_string(),
            line: 3,
            column: 1,
            span_end: (70, 2),
            message: "function `f` is too long".to_string(),
            suggested_fix: Some("extract helpers".to_string()),
            function: None,
        }
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<Format>(), Ok(Format::Json));
        assert_eq!("sarif".parse::<Format>(), Ok(Format::Sarif));
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_json_report_flattens_result() {
        let result = result_with(vec![violation("/repo/a.py", Severity::High)]);
        let report = JsonReport::new(Path::new("/repo"), None, &result);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["passed"], false);
        assert_eq!(value["files_analyzed"], 1);
        assert_eq!(value["violations"][0]["rule_id"], "function_size");
        assert!(value.get("config").is_none());
    }

    #[test]
    fn test_sarif_paths_and_levels() {
        let result = result_with(vec![
            violation("/repo/src/a.py", Severity::High),
            violation("/elsewhere/b.py", Severity::Low),
        ]);
        let report = sarif(Path::new("/repo"), &result);
        let run = &report.runs[0];
        assert_eq!(run.tool.driver.rules.len(), 1);
        assert_eq!(run.results[0].level, "error");
        assert_eq!(run.results[1].level, "note");
        assert_eq!(
            run.results[0].locations[0].physical_location.artifact_location.uri,
            "src/a.py"
        );
        assert_eq!(
            run.results[1].locations[0].physical_location.artifact_location.uri,
            "/elsewhere/b.py"
        );
        assert_eq!(run.results[0].locations[0].physical_location.region.end_line, 70);
    }

    #[test]
    fn test_pretty_lists_violations() {
        colored::control::set_override(false);
        let result = result_with(vec![violation("a.py", Severity::Medium)]);
        let mut buf = Vec::new();
        write_pretty(&mut buf, Path::new("."), None, &result, false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("✓ PASS"));
        assert!(text.contains("Violations (1)"));
        assert!(text.contains("a.py:3:1"));
        assert!(text.contains("fix: extract helpers"));
    }
}
