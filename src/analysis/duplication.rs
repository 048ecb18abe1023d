//! Near-duplicate function detection via structural fingerprints.
//!
//! 1. Pick candidate blocks: functions with at least `min_lines` logical
//!    lines, not nested inside another candidate
//! 2. Serialize each block's tree shape with identifiers and literals
//!    elided, and hash every k-gram of that token stream with FxHash
//! 3. Find pairs with Jaccard similarity >= threshold. Small inputs are
//!    compared pairwise; larger ones go through a prefix-filter index so
//!    only blocks sharing a rare shingle are verified
//! 4. Union similar pairs into groups

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rayon::prelude::*;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::detect::syntax::{function_parameters, positional_arity};
use crate::parser::{visit, NodeKind, SourceUnit, Span, SyntaxNode};
use crate::score::round4;

use super::{UnitArena, UnitId};

/// Name used in `enabled_detectors`.
pub const ANALYZER_NAME: &str = "duplication";

/// Tokens per shingle.
const K: usize = 5;
/// Above this many blocks, pairs come from the prefix index.
const LINEAR_SCAN_LIMIT: usize = 256;

/// One block in a duplicate group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMember {
    pub unit: UnitId,
    pub file: String,
    pub function: String,
    pub span: Span,
}

/// Blocks whose structure is near-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Common call signature, `name/arity` of the first member.
    pub signature: String,
    /// At least two, ordered by file then line.
    pub members: Vec<DuplicateMember>,
    /// Mean similarity of the pairs that formed the group.
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicationReport {
    pub groups: Vec<DuplicateGroup>,
    pub candidate_blocks: usize,
    pub duplicated_blocks: usize,
}

impl DuplicationReport {
    /// Share of candidate blocks that belong to some group.
    pub fn ratio(&self) -> f64 {
        if self.candidate_blocks == 0 {
            0.0
        } else {
            self.duplicated_blocks as f64 / self.candidate_blocks as f64
        }
    }
}

/// Sorted, deduplicated shingle hashes of one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    shingles: Vec<u64>,
}

impl Fingerprint {
    pub fn len(&self) -> usize {
        self.shingles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shingles.is_empty()
    }
}

/// Functions large enough to compare, outermost first in document order.
pub fn candidate_functions(unit: &SourceUnit, min_lines: u32) -> Vec<&SyntaxNode> {
    let is_candidate = |node: &SyntaxNode| {
        node.kind == NodeKind::Function
            && unit.logical_lines_in(node.span.start_line, node.span.end_line) >= min_lines
    };
    let mut found = Vec::new();
    visit(&unit.tree, |node, ancestors| {
        if is_candidate(node) && !ancestors.iter().any(|a| is_candidate(a)) {
            found.push(node);
        }
    });
    found
}

/// Structural fingerprint of a block.
pub fn fingerprint(block: &SyntaxNode) -> Fingerprint {
    let mut tokens = Vec::new();
    shape_tokens(block, &mut tokens);

    let mut shingles: Vec<u64> = if tokens.len() <= K {
        vec![hash_slice(&tokens)]
    } else {
        tokens.windows(K).map(hash_slice).collect()
    };
    shingles.sort_unstable();
    shingles.dedup();
    Fingerprint { shingles }
}

fn shape_tokens(root: &SyntaxNode, out: &mut Vec<u64>) {
    enum Step<'a> {
        Enter(&'a SyntaxNode),
        Close,
    }

    let mut stack = vec![Step::Enter(root)];
    while let Some(step) = stack.pop() {
        let node = match step {
            Step::Enter(node) => node,
            Step::Close => {
                out.push(hash_str(")"));
                continue;
            }
        };
        match node.kind {
            NodeKind::Comment => continue,
            NodeKind::Identifier | NodeKind::Property => {
                out.push(hash_str("ID"));
                continue;
            }
            kind if kind.is_literal() => {
                out.push(hash_str("LIT"));
                continue;
            }
            _ => {}
        }
        out.push(hash_str(node.raw_kind));
        if let Some(op) = node.operator {
            out.push(hash_str(op));
        }
        if node.children.iter().any(|c| c.kind != NodeKind::Comment) {
            out.push(hash_str("("));
            stack.push(Step::Close);
            stack.extend(node.children.iter().rev().map(Step::Enter));
        }
    }
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = FxHasher::default();
    s.hash(&mut hasher);
    hasher.finish()
}

fn hash_slice(tokens: &[u64]) -> u64 {
    let mut hasher = FxHasher::default();
    tokens.hash(&mut hasher);
    hasher.finish()
}

/// Exact Jaccard similarity of two fingerprints.
pub fn jaccard(a: &Fingerprint, b: &Fingerprint) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let shared = shared_count(&a.shingles, &b.shingles);
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}

fn shared_count(a: &[u64], b: &[u64]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    shared
}

/// Every pair `(a, b, similarity)` with `a < b` and similarity at or above
/// `threshold`, ordered by `(a, b)`.
pub fn similar_pairs(fingerprints: &[Fingerprint], threshold: f64) -> Vec<(usize, usize, f64)> {
    if fingerprints.len() <= LINEAR_SCAN_LIMIT {
        linear_pairs(fingerprints, threshold)
    } else {
        indexed_pairs(fingerprints, threshold)
    }
}

fn linear_pairs(fingerprints: &[Fingerprint], threshold: f64) -> Vec<(usize, usize, f64)> {
    let mut pairs = Vec::new();
    for a in 0..fingerprints.len() {
        for b in (a + 1)..fingerprints.len() {
            if let Some(similarity) = verify(&fingerprints[a], &fingerprints[b], threshold) {
                pairs.push((a, b, similarity));
            }
        }
    }
    pairs
}

/// Prefix filtering: with shingles in a fixed global order, two sets with
/// Jaccard >= t share at least one shingle among the first
/// `len - floor(t * len) + 1` of each.
fn indexed_pairs(fingerprints: &[Fingerprint], threshold: f64) -> Vec<(usize, usize, f64)> {
    let mut index: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    let mut pairs = Vec::new();

    for (b, fp) in fingerprints.iter().enumerate() {
        if fp.is_empty() {
            continue;
        }
        let prefix = &fp.shingles[..prefix_len(fp.len(), threshold)];

        let mut candidates: Vec<usize> = prefix
            .iter()
            .filter_map(|s| index.get(s))
            .flatten()
            .copied()
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        for a in candidates {
            if let Some(similarity) = verify(&fingerprints[a], fp, threshold) {
                pairs.push((a, b, similarity));
            }
        }
        for shingle in prefix {
            index.entry(*shingle).or_default().push(b);
        }
    }

    pairs.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
    pairs
}

fn prefix_len(len: usize, threshold: f64) -> usize {
    let keep = (threshold * len as f64).floor() as usize;
    (len - keep.min(len) + 1).min(len)
}

fn verify(a: &Fingerprint, b: &Fingerprint, threshold: f64) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    // Length filter: |small| / |large| bounds the similarity.
    let (small, large) = if a.len() <= b.len() {
        (a.len(), b.len())
    } else {
        (b.len(), a.len())
    };
    if (small as f64) < threshold * large as f64 {
        return None;
    }
    let similarity = jaccard(a, b);
    (similarity >= threshold).then_some(similarity)
}

// ---------------------------------------------------------------------------
// Union-Find (Disjoint Sets) for grouping
// ---------------------------------------------------------------------------

/// Path-compressed union-find with union by rank.
struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

struct Block<'a> {
    unit: UnitId,
    source: &'a SourceUnit,
    node: &'a SyntaxNode,
}

/// Cross-file duplication analyzer.
#[derive(Debug, Clone, Copy)]
pub struct DuplicationAnalyzer {
    threshold: f64,
    min_lines: u32,
}

impl DuplicationAnalyzer {
    pub fn new(threshold: f64, min_lines: u32) -> Self {
        Self {
            threshold,
            min_lines,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.duplication_threshold, config.duplication_min_lines)
    }

    /// Group near-duplicate blocks across the given units.
    pub fn analyze(&self, arena: &UnitArena, ids: &[UnitId]) -> DuplicationReport {
        let blocks: Vec<Block<'_>> = arena
            .select(ids)
            .into_iter()
            .flat_map(|(id, unit)| {
                candidate_functions(unit, self.min_lines)
                    .into_iter()
                    .map(move |node| Block {
                        unit: id,
                        source: unit,
                        node,
                    })
            })
            .collect();

        let fingerprints: Vec<Fingerprint> = blocks
            .par_iter()
            .map(|b| fingerprint(b.node))
            .collect();

        let pairs = similar_pairs(&fingerprints, self.threshold);
        debug!(
            blocks = blocks.len(),
            pairs = pairs.len(),
            indexed = blocks.len() > LINEAR_SCAN_LIMIT,
            "duplication pairs computed"
        );

        let groups = group_pairs(&blocks, &pairs);
        let duplicated_blocks = groups.iter().map(|g| g.members.len()).sum();
        DuplicationReport {
            groups,
            candidate_blocks: blocks.len(),
            duplicated_blocks,
        }
    }
}

fn group_pairs(blocks: &[Block<'_>], pairs: &[(usize, usize, f64)]) -> Vec<DuplicateGroup> {
    let mut ds = DisjointSets::new(blocks.len());
    for &(a, b, _) in pairs {
        ds.union(a, b);
    }

    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut similarity_sums: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
    for &(a, b, similarity) in pairs {
        let root = ds.find(a);
        let entry = similarity_sums.entry(root).or_insert((0.0, 0));
        entry.0 += similarity;
        entry.1 += 1;
        for idx in [a, b] {
            let members = components.entry(root).or_default();
            if !members.contains(&idx) {
                members.push(idx);
            }
        }
    }

    let mut groups: Vec<DuplicateGroup> = components
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(root, mut members)| {
            members.sort_by(|&x, &y| {
                let (bx, by) = (&blocks[x], &blocks[y]);
                (bx.source.path.as_str(), bx.node.span.start_byte)
                    .cmp(&(by.source.path.as_str(), by.node.span.start_byte))
            });
            let (sum, count) = similarity_sums.get(&root).copied().unwrap_or((0.0, 0));
            let similarity = if count == 0 { 0.0 } else { round4(sum / count as f64) };
            DuplicateGroup {
                signature: signature(&blocks[members[0]]),
                members: members
                    .iter()
                    .map(|&i| {
                        let block = &blocks[i];
                        DuplicateMember {
                            unit: block.unit,
                            file: block.source.path.clone(),
                            function: block
                                .node
                                .name
                                .clone()
                                .unwrap_or_else(|| "<anonymous>".to_string()),
                            span: block.node.span,
                        }
                    })
                    .collect(),
                similarity,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.members[0].file.cmp(&b.members[0].file))
            .then_with(|| a.members[0].span.start_byte.cmp(&b.members[0].span.start_byte))
    });
    groups
}

fn signature(block: &Block<'_>) -> String {
    let name = block.node.name.as_deref().unwrap_or("<anonymous>");
    let arity = function_parameters(block.node)
        .map(|p| positional_arity(block.source, p))
        .unwrap_or(0);
    format!("{}/{}", name, arity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(shingles: &[u64]) -> Fingerprint {
        let mut shingles = shingles.to_vec();
        shingles.sort_unstable();
        shingles.dedup();
        Fingerprint { shingles }
    }

    #[test]
    fn test_jaccard() {
        let a = fp(&[1, 2, 3, 4]);
        let b = fp(&[2, 3, 4, 5]);
        assert!((jaccard(&a, &b) - 0.6).abs() < 1e-9);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&fp(&[]), &fp(&[])), 0.0);
    }

    #[test]
    fn test_prefix_len() {
        assert_eq!(prefix_len(20, 0.85), 4);
        assert_eq!(prefix_len(1, 0.85), 1);
        assert_eq!(prefix_len(10, 1.0), 1);
    }

    #[test]
    fn test_indexed_pairs_match_linear_scan() {
        // Families of near-identical sets plus unrelated noise.
        let mut fingerprints = Vec::new();
        for family in 0..40u64 {
            let base: Vec<u64> = (0..30).map(|i| family * 1_000 + i).collect();
            for variant in 0..8u64 {
                let mut set = base.clone();
                set[variant as usize] = 900_000 + family * 100 + variant;
                fingerprints.push(fp(&set));
            }
        }
        assert!(fingerprints.len() > LINEAR_SCAN_LIMIT);

        let linear = linear_pairs(&fingerprints, 0.85);
        let indexed = indexed_pairs(&fingerprints, 0.85);
        assert!(!linear.is_empty());
        assert_eq!(linear, indexed);
    }

    #[test]
    fn test_union_find_transitive() {
        let mut ds = DisjointSets::new(4);
        ds.union(0, 1);
        ds.union(1, 2);
        assert_eq!(ds.find(0), ds.find(2));
        assert_ne!(ds.find(0), ds.find(3));
    }
}
