//! Connascence of name: callers agreeing on names they do not own.
//!
//! Flags wildcard imports, which couple a module to every name its target
//! exports, and imported modules reached through many distinct member
//! names.

use std::collections::BTreeMap;

use crate::detect::types::{Category, ConnascenceKind, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{Language, NodeKind, SourceUnit, SyntaxNode};

use super::{excerpt, violation};

const KIND: ConnascenceKind = ConnascenceKind::Name;

/// Raw kinds marking a wildcard inside an import.
const WILDCARD_KINDS: &[&str] = &["wildcard_import", "use_wildcard", "asterisk", "dot"];

const DEFAULT_FAN_OUT: usize = 8;

#[derive(Debug, Clone)]
pub struct NameDetector {
    /// Distinct member names through one imported module before it is
    /// reported.
    fan_out_threshold: usize,
}

impl Default for NameDetector {
    fn default() -> Self {
        Self {
            fan_out_threshold: DEFAULT_FAN_OUT,
        }
    }
}

impl NameDetector {
    pub fn with_fan_out_threshold(fan_out_threshold: usize) -> Self {
        Self { fan_out_threshold }
    }
}

impl Detector for NameDetector {
    fn name(&self) -> &str {
        KIND.rule_id()
    }

    fn category(&self) -> Category {
        Category::Connascence(KIND)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        let mut violations = Vec::new();
        let mut bindings = Vec::new();

        for import in unit.tree.descendants().filter(|n| n.kind == NodeKind::Import) {
            if import
                .descendants()
                .any(|n| WILDCARD_KINDS.contains(&n.raw_kind))
            {
                violations.push(
                    violation(
                        KIND,
                        unit,
                        &import.span,
                        format!(
                            "wildcard import `{}` couples this file to every name the module exports",
                            excerpt(unit, import)
                        ),
                    )
                    .with_fix("import the names in use explicitly"),
                );
                continue;
            }
            bindings.extend(module_bindings(unit, import));
        }

        if !bindings.is_empty() {
            violations.extend(self.fan_out(unit, &bindings));
        }
        Ok(violations)
    }
}

impl NameDetector {
    fn fan_out(&self, unit: &SourceUnit, bindings: &[&str]) -> Vec<Violation> {
        // module -> (first reference, distinct members)
        let mut usage: BTreeMap<&str, (&SyntaxNode, Vec<&str>)> = BTreeMap::new();

        for node in unit.tree.descendants() {
            let Some((root, member)) = member_reference(unit, node) else {
                continue;
            };
            if !bindings.contains(&root) {
                continue;
            }
            let entry = usage.entry(root).or_insert_with(|| (node, Vec::new()));
            if !entry.1.contains(&member) {
                entry.1.push(member);
            }
        }

        let mut found: Vec<_> = usage
            .into_iter()
            .filter(|(_, (_, members))| members.len() >= self.fan_out_threshold)
            .map(|(module, (first, members))| {
                violation(
                    KIND,
                    unit,
                    &first.span,
                    format!(
                        "module `{}` is referenced through {} distinct names ({}); every one must keep its name",
                        module,
                        members.len(),
                        members.join(", ")
                    ),
                )
                .with_fix(format!("wrap the `{}` calls behind a local interface", module))
            })
            .collect();
        found.sort_by_key(|v| (v.line, v.column));
        found
    }
}

/// Local names an import binds to whole modules.
fn module_bindings<'u>(unit: &'u SourceUnit, import: &SyntaxNode) -> Vec<&'u str> {
    let mut names = Vec::new();
    match unit.language {
        Language::Python => {
            if import.raw_kind != "import_statement" {
                return names;
            }
            for child in import.code_children() {
                match child.raw_kind {
                    // `import os.path` binds `os`.
                    "dotted_name" => {
                        if let Some(first) = child.code_children().next() {
                            names.push(unit.text(first));
                        }
                    }
                    "aliased_import" => {
                        if let Some(alias) = child.child_by_field("alias") {
                            names.push(unit.text(alias));
                        }
                    }
                    _ => {}
                }
            }
        }
        Language::JavaScript | Language::TypeScript | Language::Tsx => {
            for node in import.descendants() {
                match node.raw_kind {
                    "namespace_import" => names.extend(
                        node.code_children()
                            .filter(|c| c.kind == NodeKind::Identifier)
                            .map(|c| unit.text(c)),
                    ),
                    "import_clause" => names.extend(
                        node.code_children()
                            .filter(|c| c.kind == NodeKind::Identifier)
                            .map(|c| unit.text(c)),
                    ),
                    _ => {}
                }
            }
        }
        Language::Go => {
            for spec in import.descendants().filter(|n| n.raw_kind == "import_spec") {
                match spec.child_by_field("name").map(|n| unit.text(n)) {
                    Some("_") => {}
                    Some(alias) => names.push(alias),
                    None => {
                        if let Some(path) = spec.child_by_field("path") {
                            let path = unit.text(path).trim_matches(|c| c == '"' || c == '`');
                            names.push(path.rsplit('/').next().unwrap_or(path));
                        }
                    }
                }
            }
        }
        Language::Rust => {
            if let Some(argument) = import.child_by_field("argument") {
                match argument.raw_kind {
                    "scoped_identifier" => {
                        if let Some(name) = argument.child_by_field("name") {
                            names.push(unit.text(name));
                        }
                    }
                    "identifier" => names.push(unit.text(argument)),
                    "use_as_clause" => {
                        if let Some(alias) = argument.child_by_field("alias") {
                            names.push(unit.text(alias));
                        }
                    }
                    _ => {}
                }
            }
        }
        Language::Java => {
            if let Some(path) = import.code_children().find(|c| c.raw_kind == "scoped_identifier") {
                if let Some(name) = path.child_by_field("name") {
                    names.push(unit.text(name));
                }
            }
        }
        Language::C | Language::Cpp => {}
    }
    names
}

/// `(root, member)` for `root.member` style references.
fn member_reference<'u>(unit: &'u SourceUnit, node: &SyntaxNode) -> Option<(&'u str, &'u str)> {
    let (root, member) = match node.kind {
        NodeKind::Member => {
            let root = ["object", "operand", "path", "value"]
                .iter()
                .find_map(|f| node.child_by_field(f))?;
            let member = ["attribute", "field", "property", "name"]
                .iter()
                .find_map(|f| node.child_by_field(f))?;
            (root, member)
        }
        // Java `Collections.sort(x)` has no member node.
        NodeKind::Call if unit.language == Language::Java => {
            (node.child_by_field("object")?, node.child_by_field("name")?)
        }
        _ => return None,
    };
    if root.kind != NodeKind::Identifier {
        return None;
    }
    Some((unit.text(root), unit.text(member)))
}
