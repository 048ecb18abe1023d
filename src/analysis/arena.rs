//! Arena of parsed units shared read-only by every analysis stage.

use serde::{Deserialize, Serialize};

use crate::parser::SourceUnit;

/// Stable index of a unit within one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns every unit of a run. Ids follow insertion order.
#[derive(Debug, Default)]
pub struct UnitArena {
    units: Vec<SourceUnit>,
}

impl UnitArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_units(units: Vec<SourceUnit>) -> Self {
        Self { units }
    }

    pub fn push(&mut self, unit: SourceUnit) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push(unit);
        id
    }

    pub fn get(&self, id: UnitId) -> Option<&SourceUnit> {
        self.units.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    pub fn ids(&self) -> impl Iterator<Item = UnitId> {
        (0..self.units.len() as u32).map(UnitId)
    }

    /// Units paired with their ids, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &SourceUnit)> {
        self.units
            .iter()
            .enumerate()
            .map(|(idx, unit)| (UnitId(idx as u32), unit))
    }

    /// Id/unit pairs for a subset of ids, skipping unknown ones.
    pub fn select<'a>(&'a self, ids: &'a [UnitId]) -> Vec<(UnitId, &'a SourceUnit)> {
        ids.iter()
            .filter_map(|id| self.get(*id).map(|unit| (*id, unit)))
            .collect()
    }
}
