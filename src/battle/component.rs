use std::{
    collections::{BTreeMap, BTreeSet},
    error, fmt,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    battle::{
        ability::{AbilityDefinition, Status},
        check::{AbilityUnavailable, Error},
        effect::{Instance, Operation},
        event::{self, Event},
        AbilityId, EffectId, Id, Team,
    },
    map::{Distance, Position},
    utils,
};

/// Stats that effects are allowed to modify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Attack,
    Defense,
    Speed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatsError {
    HealthAboveMax { health: u32, max: u32 },
    PowerAboveMax { power: u32, max: u32 },
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StatsError::HealthAboveMax { health, max } => {
                write!(f, "Health {} is above its maximum {}", health, max)
            }
            StatsError::PowerAboveMax { power, max } => {
                write!(f, "Power {} is above its maximum {}", power, max)
            }
        }
    }
}

impl error::Error for StatsError {}

/// Health, power and the combat stats.
///
/// Both pools always stay within `0..=max`. Every "mutation" returns
/// a new, valid value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stats {
    max_health: u32,
    health: u32,
    max_power: u32,
    power: u32,
    attack: u32,
    defense: u32,
    speed: u32,
}

impl Stats {
    pub fn new(
        max_health: u32,
        health: u32,
        max_power: u32,
        power: u32,
        attack: u32,
        defense: u32,
        speed: u32,
    ) -> Result<Self, StatsError> {
        if health > max_health {
            return Err(StatsError::HealthAboveMax {
                health,
                max: max_health,
            });
        }
        if power > max_power {
            return Err(StatsError::PowerAboveMax {
                power,
                max: max_power,
            });
        }
        Ok(Self {
            max_health,
            health,
            max_power,
            power,
            attack,
            defense,
            speed,
        })
    }

    /// Both pools filled up.
    pub fn full(max_health: u32, max_power: u32, attack: u32, defense: u32, speed: u32) -> Self {
        Self {
            max_health,
            health: max_health,
            max_power,
            power: max_power,
            attack,
            defense,
            speed,
        }
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn missing_health(&self) -> u32 {
        self.max_health - self.health
    }

    pub fn max_power(&self) -> u32 {
        self.max_power
    }

    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn attack(&self) -> u32 {
        self.attack
    }

    pub fn defense(&self) -> u32 {
        self.defense
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn stat(&self, kind: StatKind) -> u32 {
        match kind {
            StatKind::Attack => self.attack,
            StatKind::Defense => self.defense,
            StatKind::Speed => self.speed,
        }
    }

    pub fn with_stat(self, kind: StatKind, value: u32) -> Self {
        let mut stats = self;
        match kind {
            StatKind::Attack => stats.attack = value,
            StatKind::Defense => stats.defense = value,
            StatKind::Speed => stats.speed = value,
        }
        stats
    }

    pub fn reduce_health(self, amount: u32) -> Self {
        Self {
            health: self.health.saturating_sub(amount),
            ..self
        }
    }

    pub fn restore_health(self, amount: u32) -> Self {
        Self {
            health: utils::clamp_max(self.health.saturating_add(amount), self.max_health),
            ..self
        }
    }

    pub fn reduce_power(self, amount: u32) -> Self {
        Self {
            power: self.power.saturating_sub(amount),
            ..self
        }
    }

    pub fn restore_power(self, amount: u32) -> Self {
        Self {
            power: utils::clamp_max(self.power.saturating_add(amount), self.max_power),
            ..self
        }
    }
}

/// Starting stats as written in character definitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub health: u32,
    pub power: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
}

impl From<BaseStats> for Stats {
    fn from(base: BaseStats) -> Self {
        Stats::full(base.health, base.power, base.attack, base.defense, base.speed)
    }
}

/// The pool ultimates are paid from. Starts empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Energy {
    current: u32,
    max: u32,
}

impl Energy {
    pub fn new(max: u32) -> Self {
        Self { current: 0, max }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Returns the amount actually gained.
    pub fn gain(&mut self, amount: u32) -> u32 {
        let old = self.current;
        self.current = utils::clamp_max(old.saturating_add(amount), self.max);
        self.current - old
    }

    pub fn spend(&mut self, amount: u32) -> bool {
        if self.current < amount {
            return false;
        }
        self.current -= amount;
        true
    }

    pub fn refill(&mut self) -> u32 {
        self.gain(self.max)
    }
}

/// Energy granted per kind of occurrence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyGain {
    pub on_hit: u32,
    pub on_damage_taken: u32,
    pub on_ability_use: u32,
    pub on_kill: u32,
    pub on_heal: u32,
    pub on_buff: u32,
    pub per_turn: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionKind {
    Move,
    Ability(AbilityId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Combatant {
    pub(crate) id: Id,
    pub(crate) name: String,
    pub(crate) class: String,
    pub(crate) team: Team,
    pub(crate) position: Position,
    pub(crate) stats: Stats,
    pub(crate) energy: Energy,
    pub(crate) energy_gain: EnergyGain,

    // per turn
    pub(crate) has_moved: bool,
    pub(crate) has_acted: bool,
    pub(crate) actions_used: BTreeSet<ActionKind>,
    pub(crate) bonus_move: Option<Distance>,

    // per move
    pub(crate) dash_targets: BTreeSet<Id>,

    pub(crate) cooldowns: BTreeMap<AbilityId, Status>,
    pub(crate) abilities: BTreeMap<AbilityId, AbilityDefinition>,
    pub(crate) effects: Vec<Instance>,

    /// Unmodified values of the stats some live effect is changing.
    pub(crate) base_stats: BTreeMap<StatKind, u32>,
}

impl Combatant {
    pub fn new(id: Id, name: &str, team: Team, position: Position, stats: Stats) -> Self {
        Self {
            id,
            name: name.into(),
            class: String::new(),
            team,
            position,
            stats,
            energy: Energy::default(),
            energy_gain: EnergyGain::default(),
            has_moved: false,
            has_acted: false,
            actions_used: BTreeSet::new(),
            bonus_move: None,
            dash_targets: BTreeSet::new(),
            cooldowns: BTreeMap::new(),
            abilities: BTreeMap::new(),
            effects: Vec::new(),
            base_stats: BTreeMap::new(),
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_energy(mut self, max: u32) -> Self {
        self.energy = Energy::new(max);
        self
    }

    pub fn with_energy_gain(mut self, energy_gain: EnergyGain) -> Self {
        self.energy_gain = energy_gain;
        self
    }

    pub fn with_ability(mut self, ability: AbilityDefinition) -> Self {
        self.cooldowns.insert(ability.id.clone(), Status::Ready);
        self.abilities.insert(ability.id.clone(), ability);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn energy(&self) -> Energy {
        self.energy
    }

    pub fn energy_gain(&self) -> &EnergyGain {
        &self.energy_gain
    }

    pub fn is_alive(&self) -> bool {
        self.stats.is_alive()
    }

    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    pub fn has_acted(&self) -> bool {
        self.has_acted
    }

    pub fn has_used(&self, kind: &ActionKind) -> bool {
        self.actions_used.contains(kind)
    }

    pub fn bonus_move(&self) -> Option<Distance> {
        self.bonus_move
    }

    pub fn dash_targets(&self) -> &BTreeSet<Id> {
        &self.dash_targets
    }

    pub fn ability(&self, id: &AbilityId) -> Option<&AbilityDefinition> {
        self.abilities.get(id)
    }

    pub fn abilities(&self) -> impl Iterator<Item = &AbilityDefinition> {
        self.abilities.values()
    }

    pub fn cooldown(&self, id: &AbilityId) -> u32 {
        self.cooldowns.get(id).map_or(0, |status| status.remaining())
    }

    pub fn effects(&self) -> &[Instance] {
        &self.effects
    }

    pub fn effect(&self, id: &EffectId) -> Option<&Instance> {
        self.effects.iter().find(|instance| &instance.effect == id)
    }

    pub fn base_stat(&self, stat: StatKind) -> Option<u32> {
        self.base_stats.get(&stat).copied()
    }

    /// Rebuilds `stat` from its base and the modifiers of every attached
    /// effect. Returns the old and the new value.
    ///
    /// Additive and multiplicative modifiers each contribute their change
    /// against the base; a `Set` overrides them all. Once nothing modifies
    /// the stat, the base is restored and forgotten.
    pub fn recompute_stat(&mut self, stat: StatKind) -> (u32, u32) {
        let old = self.stats.stat(stat);
        let is_modified = self
            .effects
            .iter()
            .any(|instance| instance.modifiers().iter().any(|m| m.stat == stat));
        if !is_modified {
            let new = self.base_stats.remove(&stat).unwrap_or(old);
            self.stats = self.stats.with_stat(stat, new);
            return (old, new);
        }
        let base = *self.base_stats.entry(stat).or_insert(old);
        let mut value = i64::from(base);
        let mut set = None;
        for instance in &self.effects {
            for modifier in instance.modifiers().iter().filter(|m| m.stat == stat) {
                let modified = modifier
                    .operation
                    .apply(base, modifier.value, instance.stacks);
                match modifier.operation {
                    Operation::Set => set = Some(modified),
                    Operation::Add | Operation::Multiply => {
                        value += i64::from(modified) - i64::from(base);
                    }
                }
            }
        }
        let new = set.unwrap_or_else(|| value.max(0) as u32);
        self.stats = self.stats.with_stat(stat, new);
        (old, new)
    }

    pub fn is_opponent_of(&self, other: &Combatant) -> bool {
        self.team != other.team
    }

    /// Cells the combatant may walk in one move.
    pub fn movement_range(&self, base: u32) -> Distance {
        let bonus = self.stats.speed.saturating_sub(5) / 2;
        Distance((base + bonus) as i32)
    }

    pub fn take_damage(&mut self, amount: u32) -> Vec<Event> {
        if !self.is_alive() {
            return Vec::new();
        }
        let old_health = self.stats.health;
        self.stats = self.stats.reduce_health(amount);
        let mut events = vec![event::Damaged {
            id: self.id,
            old_health,
            new_health: self.stats.health,
            amount,
        }
        .into()];
        if !self.is_alive() {
            debug!("{} ({:?}) died", self.name, self.id);
            events.push(event::Died { id: self.id }.into());
        }
        events
    }

    pub fn move_to(&mut self, position: Position) -> Result<(), Error> {
        if self.has_moved {
            return Err(Error::AlreadyMoved);
        }
        self.position = position;
        self.has_moved = true;
        self.actions_used.insert(ActionKind::Move);
        self.dash_targets.clear();
        Ok(())
    }

    /// Spends the pending bonus move granted by an effect.
    pub fn take_bonus_move(&mut self, position: Position) -> Result<Distance, Error> {
        let range = self.bonus_move.take().ok_or(Error::AlreadyMoved)?;
        self.position = position;
        self.dash_targets.clear();
        Ok(range)
    }

    pub fn execute_dash_attack(&mut self, target: &mut Combatant, damage: u32) -> Vec<Event> {
        if !self.dash_targets.insert(target.id) {
            return Vec::new();
        }
        let mut events = vec![event::DashExecuted {
            attacker_id: self.id,
            target_id: target.id,
            damage,
        }
        .into()];
        events.extend(target.take_damage(damage));
        events
    }

    pub fn check_ability(&self, id: &AbilityId) -> Result<&AbilityDefinition, Error> {
        let ability = self.ability(id).ok_or(Error::AbilityNotFound)?;
        if self.has_used(&ActionKind::Ability(id.clone())) {
            return Err(AbilityUnavailable::AlreadyUsed.into());
        }
        let cooldown = self.cooldown(id);
        if cooldown > 0 {
            return Err(AbilityUnavailable::Cooldown(cooldown).into());
        }
        if self.stats.power < ability.power_cost {
            return Err(AbilityUnavailable::NotEnoughPower.into());
        }
        if let Some(cost) = ability.energy_cost {
            if self.energy.current < cost {
                return Err(AbilityUnavailable::NotEnoughEnergy.into());
            }
        }
        Ok(ability)
    }

    /// Pays for an ability that has already resolved.
    pub fn commit_ability(&mut self, id: &AbilityId) {
        let (power_cost, energy_cost, cooldown) = match self.abilities.get(id) {
            Some(ability) => (
                ability.power_cost,
                ability.energy_cost.unwrap_or(0),
                ability.cooldown,
            ),
            None => return,
        };
        self.stats = self.stats.reduce_power(power_cost);
        let _ = self.energy.spend(energy_cost);
        self.cooldowns.insert(id.clone(), Status::new(cooldown));
        self.actions_used.insert(ActionKind::Ability(id.clone()));
        self.has_acted = true;
    }

    pub fn reset_turn_state(&mut self, regen_percent: u32) {
        self.has_moved = false;
        self.has_acted = false;
        self.actions_used.clear();
        self.dash_targets.clear();
        self.bonus_move = None;
        let regen = utils::percent_of(self.stats.max_power, regen_percent);
        self.stats = self.stats.restore_power(regen);
        for status in self.cooldowns.values_mut() {
            status.update();
        }
        let per_turn = self.energy_gain.per_turn;
        self.energy.gain(per_turn);
    }
}
