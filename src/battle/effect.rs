use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    battle::{
        ability::StatModifier,
        component::{StatKind, Stats},
        EffectId, Id,
    },
    map::Distance,
    utils,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    Buff,
    Debuff,
    Neutral,
}

/// Points in an effect's life where its actions run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Trigger {
    Apply,
    TurnStart,
    TurnEnd,
    DamageTaken,
    Remove,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Formula {
    Flat,
    /// `base * source.stat * multiplier`
    SourceStat { stat: StatKind, multiplier: f32 },
    /// `base * target.stat / 100`
    TargetStatPercent { stat: StatKind },
    /// `base * elapsed_turns * multiplier`
    TurnScaled { multiplier: f32 },
}

impl Default for Formula {
    fn default() -> Self {
        Formula::Flat
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub base: f32,

    #[serde(default)]
    pub formula: Formula,
}

impl Value {
    pub fn flat(base: f32) -> Self {
        Self {
            base,
            formula: Formula::Flat,
        }
    }

    /// A missing source (removed from the battle) contributes zero.
    pub fn compute(&self, source: Option<&Stats>, target: &Stats, elapsed: u32) -> f32 {
        match self.formula {
            Formula::Flat => self.base,
            Formula::SourceStat { stat, multiplier } => {
                let stat = source.map_or(0, |stats| stats.stat(stat));
                self.base * stat as f32 * multiplier
            }
            Formula::TargetStatPercent { stat } => self.base * target.stat(stat) as f32 / 100.0,
            Formula::TurnScaled { multiplier } => self.base * elapsed as f32 * multiplier,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Add,
    /// Multiplies by `1 + value`.
    Multiply,
    Set,
}

impl Operation {
    /// New stat value computed against the unmodified base.
    pub fn apply(self, base: u32, value: f32, stacks: u32) -> u32 {
        match self {
            Operation::Add => utils::floor_to_u32(base as f32 + value * stacks as f32),
            Operation::Multiply => utils::floor_scaled(base, 1.0 + value),
            Operation::Set => utils::floor_to_u32(value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum IncomingDamage {
    Reduce(u32),
    ReducePercent(f32),
}

impl IncomingDamage {
    pub fn apply(self, amount: u32) -> u32 {
        match self {
            IncomingDamage::Reduce(n) => amount.saturating_sub(n),
            IncomingDamage::ReducePercent(percent) => utils::floor_scaled(amount, 1.0 - percent),
        }
    }
}

/// Behaviors that don't fit the generic actions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Script {
    GrantBonusMove { range: Distance },
    RefillEnergy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Damage(Value),
    Heal(Value),
    ModifyStat {
        stat: StatKind,
        operation: Operation,
        value: f32,
    },
    /// Consulted whenever the holder is about to take damage.
    ModifyIncomingDamage(IncomingDamage),
    Scripted(Script),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub id: EffectId,
    pub name: String,
    pub kind: Kind,
    pub duration: u32,

    #[serde(default)]
    pub stackable: bool,

    #[serde(default)]
    pub triggers: BTreeMap<Trigger, Vec<Action>>,
}

impl EffectDefinition {
    pub fn with_duration(&self, duration: u32) -> Self {
        Self {
            duration,
            ..self.clone()
        }
    }
}

/// An effect attached to a combatant.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub effect: EffectId,
    pub name: String,
    pub kind: Kind,
    pub duration: u32,
    pub elapsed: u32,
    pub stacks: u32,
    pub stackable: bool,
    pub source: Id,
    pub triggers: BTreeMap<Trigger, Vec<Action>>,

    /// Stat modifiers this instance has put into play.
    modifiers: Vec<StatModifier>,
}

impl Instance {
    pub fn new(definition: &EffectDefinition, source: Id) -> Self {
        Self {
            effect: definition.id.clone(),
            name: definition.name.clone(),
            kind: definition.kind,
            duration: definition.duration,
            elapsed: 0,
            stacks: 1,
            stackable: definition.stackable,
            source,
            triggers: definition.triggers.clone(),
            modifiers: Vec::new(),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.duration.saturating_sub(self.elapsed)
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn actions(&self, trigger: Trigger) -> &[Action] {
        self.triggers.get(&trigger).map_or(&[], |actions| actions)
    }

    pub fn add_stack(&mut self) {
        self.stacks += 1;
        self.elapsed = 0;
    }

    pub fn refresh(&mut self, duration: u32) {
        self.duration = duration;
        self.elapsed = 0;
    }

    /// Puts a modifier into play. Rerunning the same modifier is a no-op.
    pub fn add_modifier(&mut self, modifier: StatModifier) {
        if !self.modifiers.contains(&modifier) {
            self.modifiers.push(modifier);
        }
    }

    pub fn modifiers(&self) -> &[StatModifier] {
        &self.modifiers
    }

    pub fn take_modifiers(&mut self) -> Vec<StatModifier> {
        std::mem::take(&mut self.modifiers)
    }

    pub fn modify_incoming_damage(&self, amount: u32) -> u32 {
        self.actions(Trigger::DamageTaken)
            .iter()
            .fold(amount, |amount, action| match action {
                Action::ModifyIncomingDamage(modifier) => modifier.apply(amount),
                _ => amount,
            })
    }
}
