//! Remediation suggestions derived from an aggregated result.
//!
//! A fixed rule table maps violation patterns to refactorings:
//!
//! | pattern | suggestion |
//! |---|---|
//! | ≥ 3 position/meaning violations in one function | extract parameter object |
//! | god object with ≥ 2 responsibility clusters | facade + one class per cluster |
//! | duplicate group with ≥ 3 members | consolidate into a shared utility |
//! | any function size violation | extract method |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detect::{Category, ConnascenceKind, SafetyRule, Violation};
use crate::score::AnalysisResult;

/// Co-located position/meaning violations needed for a parameter object.
const PARAMETER_OBJECT_MIN: usize = 3;
/// Responsibility clusters needed for a facade split.
const FACADE_MIN_CLUSTERS: usize = 2;
/// Members needed before a duplicate group is worth consolidating.
const CONSOLIDATE_MIN_MEMBERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    ExtractParameterObject,
    FacadeDecomposition,
    ConsolidateDuplicates,
    ExtractMethod,
}

/// Most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub file: String,
    pub line: u32,
    /// Ranking weight within a priority.
    pub score: f64,
    /// Classes a facade split should produce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_classes: Option<u32>,
}

/// Apply the rule table to a result and rank the suggestions.
pub fn recommend(result: &AnalysisResult) -> Vec<Recommendation> {
    let mut out = parameter_objects(&result.violations);

    for candidate in &result.god_objects {
        let clusters = candidate.responsibility_clusters.len();
        if clusters < FACADE_MIN_CLUSTERS {
            continue;
        }
        let mut description = format!(
            "`{}` has {} methods over {} lines in {} independent groups of shared state; \
             keep `{}` as a facade delegating to {} extracted classes",
            candidate.type_name,
            candidate.method_count,
            candidate.loc,
            clusters,
            candidate.type_name,
            clusters
        );
        if !candidate.extraction_targets.is_empty() {
            description.push_str(&format!(
                " (loosely coupled homes: {})",
                candidate.extraction_targets.join(", ")
            ));
        }
        out.push(Recommendation {
            kind: RecommendationKind::FacadeDecomposition,
            priority: Priority::High,
            title: format!("split `{}` behind a facade", candidate.type_name),
            description,
            file: candidate.file.clone(),
            line: candidate.line,
            score: candidate.score,
            extracted_classes: Some(clusters as u32),
        });
    }

    for group in &result.duplicate_groups {
        if group.members.len() < CONSOLIDATE_MIN_MEMBERS {
            continue;
        }
        let Some(first) = group.members.first() else {
            continue;
        };
        let utility = group
            .signature
            .split('/')
            .next()
            .unwrap_or(group.signature.as_str());
        let locations: Vec<String> = group
            .members
            .iter()
            .map(|m| format!("{}:{}", m.file, m.span.start_line))
            .collect();
        out.push(Recommendation {
            kind: RecommendationKind::ConsolidateDuplicates,
            priority: Priority::High,
            title: format!(
                "consolidate {} copies of `{}` into a shared utility",
                group.members.len(),
                group.signature
            ),
            description: format!(
                "move the common body into one `{}` helper and call it from {}",
                utility,
                locations.join(", ")
            ),
            file: first.file.clone(),
            line: first.span.start_line,
            score: group.similarity * group.members.len() as f64,
            extracted_classes: None,
        });
    }

    for v in &result.violations {
        if v.category != Category::Safety(SafetyRule::FunctionSize) {
            continue;
        }
        let name = v
            .function
            .as_ref()
            .map(|f| f.name.as_str())
            .unwrap_or("<anonymous>");
        out.push(Recommendation {
            kind: RecommendationKind::ExtractMethod,
            priority: Priority::Medium,
            title: format!("extract methods from `{}`", name),
            description: v
                .suggested_fix
                .clone()
                .unwrap_or_else(|| v.message.clone()),
            file: v.file.clone(),
            line: v.line,
            score: (v.span_end.0.saturating_sub(v.line) + 1) as f64,
            extracted_classes: None,
        });
    }

    out.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line.cmp(&b.line))
    });
    out
}

/// Functions carrying enough position and meaning coupling that their
/// arguments want to travel together.
fn parameter_objects(violations: &[Violation]) -> Vec<Recommendation> {
    let mut by_function: BTreeMap<(&str, u32, &str), usize> = BTreeMap::new();
    for v in violations {
        let relevant = matches!(
            v.category,
            Category::Connascence(ConnascenceKind::Position)
                | Category::Connascence(ConnascenceKind::Meaning)
        );
        let Some(function) = v.function.as_ref().filter(|_| relevant) else {
            continue;
        };
        *by_function
            .entry((v.file.as_str(), function.line, function.name.as_str()))
            .or_insert(0) += 1;
    }

    by_function
        .into_iter()
        .filter(|(_, count)| *count >= PARAMETER_OBJECT_MIN)
        .map(|((file, line, name), count)| Recommendation {
            kind: RecommendationKind::ExtractParameterObject,
            priority: Priority::Medium,
            title: format!("introduce a parameter object for `{}`", name),
            description: format!(
                "`{}` has {} positional and magic-value couplings; group its inputs \
                 into one named structure",
                name, count
            ),
            file: file.to_string(),
            line,
            score: count as f64,
            extracted_classes: None,
        })
        .collect()
}
