//! Connascence of execution: acquire/release call pairs whose order only
//! holds on the happy path.
//!
//! A pair on the same receiver inside one function is flagged when the
//! release is not guarded by a `finally`, `defer` or scoped-resource
//! statement.

use std::collections::BTreeMap;

use phf::phf_map;

use crate::detect::syntax::{call_arguments, callee, last_segment, receiver_path};
use crate::detect::types::{Category, ConnascenceKind, Violation};
use crate::detect::Detector;
use crate::error::DetectorError;
use crate::parser::{enclosing_function, visit, NodeKind, SourceUnit, SyntaxNode};

use super::violation;

const KIND: ConnascenceKind = ConnascenceKind::Execution;

/// Method-style pairs: `receiver.acquire()` ... `receiver.release()`.
static METHOD_PAIRS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "open" => &["close"],
    "connect" => &["disconnect", "close"],
    "begin" => &["commit", "rollback", "end"],
    "begin_transaction" => &["commit", "rollback"],
    "beginTransaction" => &["commit", "rollback"],
    "start" => &["stop", "join"],
    "lock" => &["unlock"],
    "acquire" => &["release"],
    "setup" => &["teardown", "cleanup"],
    "set_up" => &["tear_down"],
    "setUp" => &["tearDown"],
    "init" => &["cleanup", "shutdown", "deinit"],
    "initialize" => &["shutdown", "finalize"],
    "subscribe" => &["unsubscribe"],
    "attach" => &["detach"],
    "mount" => &["unmount"],
    "enter" => &["exit", "leave"],
    "Lock" => &["Unlock"],
    "RLock" => &["RUnlock"],
    "Open" => &["Close"],
    "Start" => &["Stop"],
    "Begin" => &["Commit", "Rollback"],
};

/// Free-function pairs keyed on their first argument.
static FREE_PAIRS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "pthread_mutex_lock" => &["pthread_mutex_unlock"],
    "pthread_rwlock_rdlock" => &["pthread_rwlock_unlock"],
    "pthread_rwlock_wrlock" => &["pthread_rwlock_unlock"],
    "sem_wait" => &["sem_post"],
    "EnterCriticalSection" => &["LeaveCriticalSection"],
    "mtx_lock" => &["mtx_unlock"],
};

struct Site<'a> {
    /// Receiver expression, or first argument for free-function pairs.
    key: String,
    method: &'a str,
    node: &'a SyntaxNode,
    function: Option<&'a SyntaxNode>,
    protected: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionDetector;

impl Detector for ExecutionDetector {
    fn name(&self) -> &str {
        KIND.rule_id()
    }

    fn category(&self) -> Category {
        Category::Connascence(KIND)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        // Sites grouped by the start of their enclosing named function.
        let mut by_function: BTreeMap<usize, Vec<Site<'_>>> = BTreeMap::new();

        visit(&unit.tree, |node, ancestors| {
            if node.kind != NodeKind::Call {
                return;
            }
            let Some(site) = call_site(unit, node, ancestors) else {
                return;
            };
            let scope = site.function.map(|f| f.span.start_byte).unwrap_or(usize::MAX);
            by_function.entry(scope).or_default().push(site);
        });

        let mut violations = Vec::new();
        for sites in by_function.values() {
            for (idx, acquire) in sites.iter().enumerate() {
                let Some(releases) = METHOD_PAIRS
                    .get(acquire.method)
                    .or_else(|| FREE_PAIRS.get(acquire.method))
                else {
                    continue;
                };
                if acquire.protected {
                    continue;
                }
                let release = sites[idx + 1..]
                    .iter()
                    .find(|s| s.key == acquire.key && releases.contains(&s.method));
                let Some(release) = release else {
                    continue;
                };
                if release.protected {
                    continue;
                }
                violations.push(
                    violation(
                        KIND,
                        unit,
                        &acquire.node.span,
                        format!(
                            "`{}` on line {} must be followed by `{}` on line {}; an early return or error skips the release",
                            unit.text(acquire.node),
                            acquire.node.start_line(),
                            unit.text(release.node),
                            release.node.start_line()
                        ),
                    )
                    .with_fix("tie the release to scope exit with a context manager, finally block or defer")
                    .in_function(acquire.function),
                );
            }
        }
        violations.sort_by_key(|v| (v.line, v.column));
        Ok(violations)
    }
}

fn call_site<'a>(
    unit: &'a SourceUnit,
    node: &'a SyntaxNode,
    ancestors: &[&'a SyntaxNode],
) -> Option<Site<'a>> {
    let callee = callee(unit, node)?;
    let method = last_segment(callee);
    let key = if FREE_PAIRS.contains_key(method) || is_free_release(method) {
        unit.text(call_arguments(node).into_iter().next()?).trim_start_matches('&').to_string()
    } else {
        receiver_path(callee)?.to_string()
    };
    let protected = ancestors.iter().any(|a| {
        matches!(a.kind, NodeKind::Finally | NodeKind::With)
            || matches!(a.raw_kind, "try_with_resources_statement" | "resource_specification")
    });
    Some(Site {
        key,
        method,
        node,
        function: enclosing_function(ancestors),
        protected,
    })
}

fn is_free_release(method: &str) -> bool {
    FREE_PAIRS
        .values()
        .any(|releases| releases.contains(&method))
}
