use std::fmt;

use serde::{Deserialize, Serialize};

pub use crate::battle::{
    check::{check, AbilityUnavailable, Error},
    execute::execute,
    state::{Battle, BattleResult},
};

pub mod ability;
pub mod command;
pub mod component;
pub mod cover;
pub mod effect;
pub mod event;
pub mod execute;
pub mod movement;
pub mod state;
pub mod targeting;

mod check;

#[cfg(test)]
mod tests;

#[derive(
    Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash,
)]
pub struct Id(pub u32);

#[derive(
    Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash,
)]
pub struct BattleId(pub u64);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Team {
    Player,
    Enemy,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Player => Team::Enemy,
            Team::Enemy => Team::Player,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Team::Player => write!(f, "Player"),
            Team::Enemy => write!(f, "Enemy"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Enemies come in waves; clearing one bumps the wave counter.
    Arcade,
    Tutorial,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Arcade
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct AbilityId(pub String);

impl AbilityId {
    pub fn new(s: &str) -> Self {
        AbilityId(s.into())
    }
}

impl From<&str> for AbilityId {
    fn from(s: &str) -> Self {
        AbilityId::new(s)
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct EffectId(pub String);

impl EffectId {
    pub fn new(s: &str) -> Self {
        EffectId(s.into())
    }
}

impl From<&str> for EffectId {
    fn from(s: &str) -> Self {
        EffectId::new(s)
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
