//! God-object detection over type-level containers.
//!
//! A container is a class-like declaration (Rust impls and C++/Go methods
//! declared outside their type are merged by type name), or the module's
//! own top-level functions. A file that declares no types is a module
//! container even when it has no functions. It is a candidate when its LOC or
//! its method count exceeds the configured threshold.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::detect::syntax::{binding_parts, bound_name, function_parameters, SELF_NAMES};
use crate::parser::{NodeKind, SourceUnit, SyntaxNode};
use crate::score::round4;

use super::{UnitArena, UnitId};

/// Name used in `enabled_detectors`.
pub const ANALYZER_NAME: &str = "god_objects";

/// Sibling units suggested as extraction targets.
const MAX_EXTRACTION_TARGETS: usize = 3;

/// An oversized or overloaded container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GodObjectCandidate {
    pub unit: UnitId,
    pub file: String,
    pub type_name: String,
    pub line: u32,
    pub method_count: u32,
    pub loc: u32,
    /// Distinct external namespaces referenced by the methods.
    pub responsibility_estimate: u32,
    /// Methods grouped by the instance state they share.
    pub responsibility_clusters: Vec<Vec<String>>,
    /// Sibling files least coupled to this container.
    pub extraction_targets: Vec<String>,
    /// `loc / loc_threshold + methods / method_threshold`. Ranking only.
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GodObjectReport {
    pub candidates: Vec<GodObjectCandidate>,
    pub containers_analyzed: usize,
}

impl GodObjectReport {
    /// Share of analyzed containers that are candidates.
    pub fn ratio(&self) -> f64 {
        if self.containers_analyzed == 0 {
            0.0
        } else {
            self.candidates.len() as f64 / self.containers_analyzed as f64
        }
    }
}

/// A type or module with its methods.
struct Container<'a> {
    name: String,
    line: u32,
    loc: u32,
    methods: Vec<&'a SyntaxNode>,
    /// Nodes to scan for references, i.e. class bodies or methods.
    bodies: Vec<&'a SyntaxNode>,
}

#[derive(Debug, Clone, Copy)]
pub struct GodObjectAnalyzer {
    loc_threshold: u32,
    method_threshold: u32,
}

impl GodObjectAnalyzer {
    pub fn new(loc_threshold: u32, method_threshold: u32) -> Self {
        Self {
            loc_threshold,
            method_threshold,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.god_object_loc_threshold,
            config.god_object_method_threshold,
        )
    }

    fn is_candidate(&self, loc: u32, methods: u32) -> bool {
        loc > self.loc_threshold || methods > self.method_threshold
    }

    /// Flag god objects in the given units. Needs the whole set so that
    /// extraction targets can point at sibling files.
    pub fn analyze(&self, arena: &UnitArena, ids: &[UnitId]) -> GodObjectReport {
        let units = arena.select(ids);

        let per_unit: Vec<(usize, Vec<GodObjectCandidate>)> = units
            .par_iter()
            .map(|(id, unit)| {
                let containers = containers(unit);
                let found = containers
                    .iter()
                    .filter(|c| self.is_candidate(c.loc, c.methods.len() as u32))
                    .map(|c| self.candidate(*id, unit, c, &units))
                    .collect();
                (containers.len(), found)
            })
            .collect();

        let containers_analyzed = per_unit.iter().map(|(n, _)| n).sum();
        let mut candidates: Vec<GodObjectCandidate> =
            per_unit.into_iter().flat_map(|(_, found)| found).collect();
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file.cmp(&b.file))
                .then_with(|| a.line.cmp(&b.line))
        });

        debug!(
            containers = containers_analyzed,
            candidates = candidates.len(),
            "god object analysis finished"
        );
        GodObjectReport {
            candidates,
            containers_analyzed,
        }
    }

    fn candidate(
        &self,
        id: UnitId,
        unit: &SourceUnit,
        container: &Container<'_>,
        units: &[(UnitId, &SourceUnit)],
    ) -> GodObjectCandidate {
        let method_count = container.methods.len() as u32;
        let score = container.loc as f64 / self.loc_threshold as f64
            + method_count as f64 / self.method_threshold as f64;
        GodObjectCandidate {
            unit: id,
            file: unit.path.clone(),
            type_name: container.name.clone(),
            line: container.line,
            method_count,
            loc: container.loc,
            responsibility_estimate: external_namespaces(unit, container).len() as u32,
            responsibility_clusters: responsibility_clusters(unit, container),
            extraction_targets: extraction_targets(unit, container, units),
            score: round4(score),
        }
    }
}

/// Containers of a unit in document order.
fn containers(unit: &SourceUnit) -> Vec<Container<'_>> {
    let mut classes: Vec<Container<'_>> = Vec::new();
    let mut by_name: BTreeMap<String, usize> = BTreeMap::new();
    let mut receivers: BTreeMap<String, Vec<&SyntaxNode>> = BTreeMap::new();
    let mut top_level: Vec<&SyntaxNode> = Vec::new();

    collect(&unit.tree, &mut |node, nested| match node.kind {
        NodeKind::Class => {
            let name = node.name.clone().unwrap_or_else(|| "<anonymous>".to_string());
            let methods = class_methods(node);
            let loc = node.span.line_len();
            match by_name.get(&name) {
                Some(&idx) => {
                    let existing = &mut classes[idx];
                    existing.loc += loc;
                    existing.methods.extend(methods);
                    existing.bodies.push(node);
                }
                None => {
                    by_name.insert(name.clone(), classes.len());
                    classes.push(Container {
                        name,
                        line: node.start_line(),
                        loc,
                        methods,
                        bodies: vec![node],
                    });
                }
            }
        }
        NodeKind::Function if !nested => match &node.receiver {
            Some(receiver) => receivers.entry(receiver.clone()).or_default().push(node),
            None => top_level.push(node),
        },
        _ => {}
    });

    for (receiver, methods) in receivers {
        let loc = methods.iter().map(|m| m.span.line_len()).sum();
        match by_name.get(&receiver) {
            Some(&idx) => {
                let existing = &mut classes[idx];
                existing.loc += loc;
                existing.bodies.extend(methods.iter().copied());
                existing.methods.extend(methods);
            }
            None => {
                by_name.insert(receiver.clone(), classes.len());
                classes.push(Container {
                    name: receiver,
                    line: methods.first().map(|m| m.start_line()).unwrap_or(1),
                    loc,
                    bodies: methods.clone(),
                    methods,
                });
            }
        }
    }

    if classes.is_empty() {
        return vec![module_container(unit, top_level, unit.line_count)];
    }
    if !top_level.is_empty() {
        let loc = unit.line_count.saturating_sub(lines_covered(unit, &classes));
        classes.push(module_container(unit, top_level, loc));
    }
    classes.sort_by_key(|c| c.line);
    classes
}

/// The module's own top-level functions as one container.
fn module_container<'u>(
    unit: &'u SourceUnit,
    functions: Vec<&'u SyntaxNode>,
    loc: u32,
) -> Container<'u> {
    Container {
        name: module_name(&unit.path),
        line: 1,
        loc,
        bodies: functions.clone(),
        methods: functions,
    }
}

/// Physical lines spanned by any type container, counted once.
fn lines_covered(unit: &SourceUnit, classes: &[Container<'_>]) -> u32 {
    let mut covered = vec![false; unit.line_count as usize + 1];
    for body in classes.iter().flat_map(|c| c.bodies.iter()) {
        for line in body.span.start_line..=body.span.end_line {
            if let Some(slot) = covered.get_mut(line as usize) {
                *slot = true;
            }
        }
    }
    covered.iter().filter(|&&hit| hit).count() as u32
}

/// Preorder walk below `root` reporting whether each node sits inside a
/// nested function, lambda or class.
fn collect<'a, F>(root: &'a SyntaxNode, f: &mut F)
where
    F: FnMut(&'a SyntaxNode, bool),
{
    let mut stack: Vec<(&'a SyntaxNode, bool)> =
        root.children.iter().rev().map(|c| (c, false)).collect();
    while let Some((node, nested)) = stack.pop() {
        f(node, nested);
        let opens = matches!(
            node.kind,
            NodeKind::Function | NodeKind::Lambda | NodeKind::Class
        );
        stack.extend(node.children.iter().rev().map(|c| (c, nested || opens)));
    }
}

/// Methods declared directly in a class body.
fn class_methods(class: &SyntaxNode) -> Vec<&SyntaxNode> {
    let mut methods = Vec::new();
    let mut stack: Vec<&SyntaxNode> = class.children.iter().rev().collect();
    while let Some(node) = stack.pop() {
        match node.kind {
            NodeKind::Function => methods.push(node),
            NodeKind::Lambda | NodeKind::Class => {}
            _ => stack.extend(node.children.iter().rev()),
        }
    }
    methods
}

fn module_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Names bound inside a method: parameters and local bindings.
fn local_names<'u>(unit: &'u SourceUnit, method: &SyntaxNode) -> BTreeSet<&'u str> {
    let mut names: BTreeSet<&str> = method
        .descendants()
        .filter(|n| matches!(n.kind, NodeKind::Declaration | NodeKind::Assignment))
        .filter_map(|n| binding_parts(n).and_then(|(target, _)| bound_name(unit, target)))
        .collect();
    if let Some(params) = function_parameters(method) {
        names.extend(
            params
                .descendants()
                .filter(|n| n.kind == NodeKind::Identifier)
                .map(|n| unit.text(n)),
        );
    }
    names
}

/// Roots of `root.member` references that are not the instance, a local or
/// a parameter.
fn external_namespaces<'u>(unit: &'u SourceUnit, container: &Container<'_>) -> BTreeSet<&'u str> {
    let mut namespaces = BTreeSet::new();
    for method in &container.methods {
        let locals = local_names(unit, method);
        for node in method.descendants().filter(|n| n.kind == NodeKind::Member) {
            let Some(root) = node.code_children().next() else {
                continue;
            };
            if root.kind != NodeKind::Identifier {
                continue;
            }
            let name = unit.text(root);
            if !SELF_NAMES.contains(&name) && !locals.contains(name) {
                namespaces.insert(name);
            }
        }
    }
    namespaces
}

/// Instance attributes a method touches through `self`/`this` or its Go
/// receiver.
fn instance_state<'u>(unit: &'u SourceUnit, method: &SyntaxNode) -> BTreeSet<&'u str> {
    let receiver = method
        .child_by_field("receiver")
        .and_then(|r| r.descendants().find(|n| n.kind == NodeKind::Identifier))
        .map(|n| unit.text(n));

    method
        .descendants()
        .filter(|n| n.kind == NodeKind::Member)
        .filter_map(|n| {
            let mut parts = n.code_children();
            let root = parts.next()?;
            let attribute = parts.last()?;
            let root_name = unit.text(root);
            let is_self = root.kind == NodeKind::Identifier
                && (SELF_NAMES.contains(&root_name) || Some(root_name) == receiver);
            is_self.then(|| unit.text(attribute))
        })
        .collect()
}

/// Methods connected through shared instance attributes. Stateless methods
/// belong to no cluster.
fn responsibility_clusters(unit: &SourceUnit, container: &Container<'_>) -> Vec<Vec<String>> {
    let states: Vec<BTreeSet<&str>> = container
        .methods
        .iter()
        .map(|m| instance_state(unit, m))
        .collect();

    // attribute -> first method index that touched it
    let mut owner: BTreeMap<&str, usize> = BTreeMap::new();
    let mut parent: Vec<usize> = (0..states.len()).collect();
    fn find(parent: &mut [usize], x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }

    for (idx, state) in states.iter().enumerate() {
        for attribute in state {
            match owner.get(attribute) {
                Some(&first) => {
                    let (a, b) = (find(&mut parent, first), find(&mut parent, idx));
                    if a != b {
                        parent[b.max(a)] = a.min(b);
                    }
                }
                None => {
                    owner.insert(attribute, idx);
                }
            }
        }
    }

    let mut clusters: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (idx, state) in states.iter().enumerate() {
        if state.is_empty() {
            continue;
        }
        let root = find(&mut parent, idx);
        let name = container.methods[idx]
            .name
            .clone()
            .unwrap_or_else(|| "<anonymous>".to_string());
        clusters.entry(root).or_default().push(name);
    }
    clusters.into_values().collect()
}

/// Sibling files (same directory) with the fewest references from the
/// container, ties broken by path.
fn extraction_targets(
    unit: &SourceUnit,
    container: &Container<'_>,
    units: &[(UnitId, &SourceUnit)],
) -> Vec<String> {
    let dir = Path::new(&unit.path).parent();
    let referenced: Vec<&str> = container
        .bodies
        .iter()
        .flat_map(|b| b.descendants())
        .filter(|n| n.kind == NodeKind::Identifier)
        .map(|n| unit.text(n))
        .collect();

    let mut siblings: Vec<(usize, &str)> = units
        .iter()
        .filter(|(_, other)| other.path != unit.path && Path::new(&other.path).parent() == dir)
        .map(|(_, other)| {
            let exported = exported_names(other);
            let coupling = referenced.iter().filter(|r| exported.contains(**r)).count();
            (coupling, other.path.as_str())
        })
        .collect();
    siblings.sort();
    siblings
        .into_iter()
        .take(MAX_EXTRACTION_TARGETS)
        .map(|(_, path)| path.to_string())
        .collect()
}

/// Top-level declaration names of a unit plus its module name.
fn exported_names(unit: &SourceUnit) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = unit
        .tree
        .descendants_in_scope()
        .filter(|n| matches!(n.kind, NodeKind::Function | NodeKind::Class))
        .filter_map(|n| n.name.clone())
        .collect();
    names.insert(module_name(&unit.path));
    names
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use super::*;
    use crate::parser::Language;

    /// A Python class whose span is exactly `loc` lines with `methods`
    /// methods, padded with comment lines.
    fn class_source(name: &str, loc: usize, methods: usize) -> String {
        let mut lines = vec![format!("class {}:", name)];
        for i in 0..methods {
            lines.push(format!("    def m{}(self):", i));
            lines.push(format!("        return self.v{}", i));
        }
        while lines.len() < loc - 1 {
            lines.push("    # padding".to_string());
        }
        lines.push("    last = None".to_string());
        let mut source = lines.join("\n");
        source.push('\n');
        source
    }

    fn analyze(sources: &[(&str, String)]) -> GodObjectReport {
        let units = sources
            .iter()
            .map(|(path, src)| SourceUnit::from_source(*path, Language::Python, src.clone()).unwrap())
            .collect();
        let arena = UnitArena::from_units(units);
        let ids: Vec<_> = arena.ids().collect();
        GodObjectAnalyzer::new(500, 20).analyze(&arena, &ids)
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let report = analyze(&[("a.py", class_source("Edge", 500, 20))]);
        assert_eq!(report.containers_analyzed, 1);
        assert!(report.candidates.is_empty());

        let report = analyze(&[("a.py", class_source("Long", 501, 20))]);
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].loc, 501);

        let report = analyze(&[("a.py", class_source("Wide", 100, 21))]);
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].method_count, 21);
        assert_eq!(report.candidates[0].score, 1.25);
    }

    #[test]
    fn test_clusters_and_namespaces() {
        let mut source = String::from("import os\nimport json\n\nclass Service:\n");
        for i in 0..11 {
            source.push_str(&format!("    def load{}(self):\n        return json.loads(self.raw)\n", i));
        }
        for i in 0..11 {
            source.push_str(&format!("    def path{}(self):\n        return os.path.join(self.root, 'x')\n", i));
        }
        let report = analyze(&[
            ("pkg/service.py", source),
            ("pkg/util.py", "def helper():\n    return 1\n".to_string()),
            ("other/far.py", "def far():\n    return 1\n".to_string()),
        ]);
        assert_eq!(report.candidates.len(), 1);
        let candidate = &report.candidates[0];
        assert_eq!(candidate.type_name, "Service");
        assert_eq!(candidate.method_count, 22);
        assert_eq!(candidate.responsibility_estimate, 2);
        assert_eq!(candidate.responsibility_clusters.len(), 2);
        assert_eq!(candidate.responsibility_clusters[0].len(), 11);
        assert_eq!(candidate.extraction_targets, vec!["pkg/util.py".to_string()]);
    }

    #[test]
    fn test_module_container_without_types() {
        let mut source = String::new();
        for i in 0..21 {
            source.push_str(&format!("def f{}():\n    return {}\n\n", i, i));
        }
        let report = analyze(&[("helpers.py", source)]);
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].type_name, "helpers");
        assert_eq!(report.candidates[0].method_count, 21);
    }

    #[test]
    fn test_module_container_beside_a_class() {
        let mut source = String::from("class Tiny:\n    pass\n\n");
        for i in 0..40 {
            source.push_str(&format!("def f{}(x):\n    assert x\n    return x\n\n", i));
        }
        let report = analyze(&[("helpers.py", source)]);
        assert_eq!(report.containers_analyzed, 2);
        assert_eq!(report.candidates.len(), 1);
        let module = &report.candidates[0];
        assert_eq!(module.type_name, "helpers");
        assert_eq!(module.method_count, 40);
        // 163 physical lines, two of them inside `Tiny`
        assert_eq!(module.loc, 161);
    }

    #[test]
    fn test_extraction_targets_prefer_loosely_coupled_siblings() {
        let mut source = String::from("class Hub:\n");
        for i in 0..21 {
            source.push_str(&format!("    def op{}(self):\n        return helper(self.v)\n", i));
        }
        let report = analyze(&[
            ("pkg/hub.py", source),
            ("pkg/util.py", "def helper(v):\n    return v\n".to_string()),
            ("pkg/zeta.py", "def unrelated():\n    return 2\n".to_string()),
        ]);
        assert_eq!(
            report.candidates[0].extraction_targets,
            vec!["pkg/zeta.py".to_string(), "pkg/util.py".to_string()]
        );
    }
}
