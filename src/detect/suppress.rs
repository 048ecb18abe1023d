//! Inline suppression of violations via comments.
//!
//! Supports suppression comments like:
//! - `# connascence:ignore <rule> - <reason>`
//! - `// connascence:ignore-next-line <rule>[,<rule>] - <reason>`
//! - `/* connascence:ignore-file * - <reason> */`
//!
//! Directives are read from the comment nodes of the parsed tree, so any
//! comment syntax a grammar supports works.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parser::SourceUnit;

use super::Violation;

/// Lines a directive reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionScope {
    /// Trailing comment; covers the code on its own line.
    SameLine,
    NextLine,
    /// Header directive covering every line of the unit.
    File,
}

/// One parsed `connascence:ignore*` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    /// Rule ids, `*` meaning any rule.
    pub rules: Vec<String>,
    pub reason: String,
    pub file: String,
    /// Directive line; 0 when the scope is the whole file.
    pub line: u32,
    pub scope: SuppressionScope,
}

impl Suppression {
    fn names_rule(&self, rule_id: &str) -> bool {
        self.rules.iter().any(|r| r == "*" || r == rule_id)
    }

    /// Whether this directive silences `violation`.
    pub fn covers(&self, violation: &Violation) -> bool {
        let line_hit = match self.scope {
            SuppressionScope::File => true,
            SuppressionScope::SameLine => violation.line == self.line,
            SuppressionScope::NextLine => violation.line == self.line + 1,
        };
        line_hit && violation.file == self.file && self.names_rule(&violation.rule_id)
    }
}

/// A violation that was suppressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressedViolation {
    pub violation: Violation,
    pub suppression: Suppression,
}

lazy_static::lazy_static! {
    static ref DIRECTIVE: Regex = Regex::new(
        r"connascence:(ignore(?:-file|-next-line)?)\s+([\w*]+(?:\s*,\s*[\w*]+)*)(?:\s+-\s*(.*?))?\s*(?:\*/)?\s*$"
    )
    .unwrap();
}

/// Collect suppression directives from a unit's comments.
pub fn parse_suppressions(unit: &SourceUnit) -> Vec<Suppression> {
    let first_code_line = unit.first_code_line();
    let mut suppressions = Vec::new();

    for comment in unit.comments() {
        let text = unit.text(comment);
        let line = comment.span.start_line;
        for (offset, raw_line) in text.lines().enumerate() {
            let Some(caps) = DIRECTIVE.captures(raw_line) else {
                continue;
            };
            let directive_line = line + offset as u32;
            let rules = caps
                .get(2)
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .map(|r| r.trim().to_string())
                        .filter(|r| !r.is_empty())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            let reason = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();

            let scope = match caps.get(1).map(|m| m.as_str()) {
                // only honored in the header, before any code
                Some("ignore-file") if first_code_line.map_or(true, |c| directive_line <= c) => {
                    SuppressionScope::File
                }
                Some("ignore-next-line") => SuppressionScope::NextLine,
                Some("ignore") if offset == 0 && unit.is_code_line(directive_line) => {
                    SuppressionScope::SameLine
                }
                Some("ignore") => SuppressionScope::NextLine,
                _ => continue,
            };

            suppressions.push(Suppression {
                rules,
                reason,
                file: unit.path.clone(),
                line: match scope {
                    SuppressionScope::File => 0,
                    _ => directive_line,
                },
                scope,
            });
        }
    }

    suppressions
}

/// Split `violations` into those still reported and those silenced by a
/// directive. The first covering directive is recorded with each silenced one.
pub fn filter_suppressed(
    violations: Vec<Violation>,
    suppressions: &[Suppression],
) -> (Vec<Violation>, Vec<SuppressedViolation>) {
    let mut active = Vec::with_capacity(violations.len());
    let mut suppressed = Vec::new();
    for violation in violations {
        if let Some(suppression) = suppressions.iter().find(|s| s.covers(&violation)) {
            let suppression = suppression.clone();
            suppressed.push(SuppressedViolation {
                violation,
                suppression,
            });
        } else {
            active.push(violation);
        }
    }
    (active, suppressed)
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use super::*;
    use crate::detect::{Category, ConnascenceKind, Severity};
    use crate::parser::{Language, Span};

    fn violation(unit: &SourceUnit, rule: &str, line: u32) -> Violation {
        let span = Span {
            start_line: line,
            end_line: line,
            start_col: 1,
            end_col: 2,
            ..Default::default()
        };
        Violation::new(
            rule,
            Category::Connascence(ConnascenceKind::Meaning),
            Severity::Medium,
            unit,
            &span,
            "magic",
        )
    }

    #[test]
    fn test_parse_suppressions() {
        let unit = SourceUnit::from_source(
            "app.py",
            Language::Python,
            r#"# connascence:ignore-file connascence_of_name - legacy module
import os

# connascence:ignore-next-line connascence_of_meaning - protocol constant
x = 42
y = 7  # connascence:ignore connascence_of_meaning,connascence_of_value
# connascence:ignore-file * - too late, ignored
"#,
        )
        .unwrap();

        let suppressions = parse_suppressions(&unit);
        assert_eq!(suppressions.len(), 3);

        assert_eq!(suppressions[0].scope, SuppressionScope::File);
        assert_eq!(suppressions[0].rules, vec!["connascence_of_name"]);
        assert_eq!(suppressions[0].reason, "legacy module");

        assert_eq!(suppressions[1].scope, SuppressionScope::NextLine);
        assert_eq!(suppressions[1].line, 4);

        assert_eq!(suppressions[2].scope, SuppressionScope::SameLine);
        assert_eq!(suppressions[2].line, 6);
        assert_eq!(suppressions[2].rules.len(), 2);
    }

    #[test]
    fn test_filter_suppressed() {
        let unit = SourceUnit::from_source(
            "app.py",
            Language::Python,
            "# connascence:ignore-next-line connascence_of_meaning\nx = 42\ny = 42\n",
        )
        .unwrap();
        let suppressions = parse_suppressions(&unit);

        let violations = vec![
            violation(&unit, "connascence_of_meaning", 2),
            violation(&unit, "connascence_of_meaning", 3),
            violation(&unit, "connascence_of_value", 2),
        ];
        let (active, suppressed) = filter_suppressed(violations, &suppressions);
        assert_eq!(active.len(), 2);
        assert_eq!(suppressed.len(), 1);
        assert_eq!(suppressed[0].violation.line, 2);
    }

    #[test]
    fn test_wildcard_file_scope_covers_every_rule() {
        let unit = SourceUnit::from_source(
            "gen.py",
            Language::Python,
            "# connascence:ignore-file * - generated\nx = 42\n",
        )
        .unwrap();
        let suppressions = parse_suppressions(&unit);
        assert_eq!(suppressions[0].line, 0);
        assert!(suppressions[0].covers(&violation(&unit, "connascence_of_value", 2)));

        let other = SourceUnit::from_source("other.py", Language::Python, "x = 42\n").unwrap();
        assert!(!suppressions[0].covers(&violation(&other, "connascence_of_value", 1)));
    }

    #[test]
    fn test_block_comment_directive() {
        let unit = SourceUnit::from_source(
            "main.c",
            Language::C,
            "/* connascence:ignore-file * - generated */\nint x = 3;\n",
        )
        .unwrap();
        let suppressions = parse_suppressions(&unit);
        assert_eq!(suppressions.len(), 1);
        assert_eq!(suppressions[0].rules, vec!["*"]);
        assert_eq!(suppressions[0].reason, "generated");
    }
}
