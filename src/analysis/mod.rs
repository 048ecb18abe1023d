//! Cross-unit analyses that run after per-unit detection.
//!
//! Both analyzers need the whole unit set at once: god objects rank sibling
//! files as extraction targets, and duplication compares every pair of
//! candidate blocks across files.

mod arena;
pub mod duplication;
pub mod god_objects;

pub use arena::{UnitArena, UnitId};
pub use duplication::{DuplicateGroup, DuplicateMember, DuplicationAnalyzer, DuplicationReport};
pub use god_objects::{GodObjectAnalyzer, GodObjectCandidate, GodObjectReport};
