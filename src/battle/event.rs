use crate::{
    battle::{component::StatKind, state::BattleResult, AbilityId, EffectId, Id, Team},
    map::{Distance, Position},
};

/// Something that happened while a command ran.
///
/// Commands return these in order; the battle also queues them until
/// they are drained.
#[derive(Debug, Clone, PartialEq, derive_more::From)]
pub enum Event {
    TurnStarted(TurnStarted),
    TurnEnded(TurnEnded),
    ActionConsumed(ActionConsumed),
    Moved(Moved),
    DashExecuted(DashExecuted),
    Damaged(Damaged),
    Died(Died),
    AttackMissed(AttackMissed),
    Healed(Healed),
    ResourceRecovered(ResourceRecovered),
    AbilityUsed(AbilityUsed),
    BonusMoveGranted(BonusMoveGranted),
    StatChanged(StatChanged),
    EffectApplied(EffectApplied),
    EffectRemoved(EffectRemoved),
    WaveCleared(WaveCleared),
    BattleEnded(BattleEnded),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnStarted {
    pub team: Team,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnEnded {
    pub team: Team,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionConsumed {
    pub remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Walk,
    Bonus,
    Teleport,
    Slide,
    Chain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Moved {
    pub id: Id,
    pub from: Position,
    pub to: Position,

    /// Cells crossed, the origin excluded.
    pub path: Vec<Position>,

    pub kind: MoveKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashExecuted {
    pub attacker_id: Id,
    pub target_id: Id,
    pub damage: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Damaged {
    pub id: Id,
    pub old_health: u32,
    pub new_health: u32,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Died {
    pub id: Id,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttackMissed {
    pub attacker_id: Id,
    pub target_id: Id,
    pub hit_probability: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Healed {
    pub id: Id,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecovered {
    pub id: Id,
    pub power: u32,
    pub energy: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbilityUsed {
    pub id: Id,
    pub ability: AbilityId,
    pub power_cost: u32,
    pub energy_cost: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BonusMoveGranted {
    pub id: Id,
    pub range: Distance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatChanged {
    pub id: Id,
    pub stat: StatKind,
    pub old: u32,
    pub new: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectApplied {
    pub id: Id,
    pub effect: EffectId,
    pub stacks: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectRemoved {
    pub id: Id,
    pub effect: EffectId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveCleared {
    pub wave: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BattleEnded {
    pub result: BattleResult,
}
