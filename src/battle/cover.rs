use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::map::{self, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverLevel {
    Half,
    Full,
}

impl CoverLevel {
    pub fn hit_probability(self) -> f32 {
        match self {
            CoverLevel::Half => 0.5,
            CoverLevel::Full => 0.0,
        }
    }
}

/// Cover structures placed on the grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoverMap {
    structures: BTreeMap<Position, CoverLevel>,
}

impl CoverMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pos: Position, level: CoverLevel) {
        self.structures.insert(pos, level);
    }

    pub fn remove(&mut self, pos: Position) -> Option<CoverLevel> {
        self.structures.remove(&pos)
    }

    pub fn level_at(&self, pos: Position) -> Option<CoverLevel> {
        self.structures.get(&pos).copied()
    }

    pub fn structures(&self) -> impl Iterator<Item = (Position, CoverLevel)> + '_ {
        self.structures.iter().map(|(&pos, &level)| (pos, level))
    }

    /// Chance that an attack from `attacker` reaches `defender`.
    ///
    /// Adjacent cells are never covered. Otherwise the strongest cover
    /// lying on the line between the two cells wins.
    pub fn hit_probability(&self, attacker: Position, defender: Position) -> f32 {
        if attacker.is_adjacent(defender) {
            return 1.0;
        }
        let line: BTreeSet<Position> = map::line_between(attacker, defender).into_iter().collect();
        let mut half_covered = false;
        for (pos, level) in self.structures() {
            if !line.contains(&pos) {
                continue;
            }
            match level {
                CoverLevel::Full => return CoverLevel::Full.hit_probability(),
                CoverLevel::Half => half_covered = true,
            }
        }
        if half_covered {
            CoverLevel::Half.hit_probability()
        } else {
            1.0
        }
    }
}
