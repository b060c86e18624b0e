use serde::{Deserialize, Serialize};

use crate::{
    battle::{
        component::StatKind,
        effect::{Kind, Operation},
        AbilityId, EffectId,
    },
    map::Distance,
};

/// Cooldown state of a single ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Ready,
    Cooldown(u32),
}

impl Default for Status {
    fn default() -> Self {
        Status::Ready
    }
}

impl Status {
    pub fn new(cooldown: u32) -> Self {
        if cooldown == 0 {
            Status::Ready
        } else {
            Status::Cooldown(cooldown)
        }
    }

    pub fn update(&mut self) {
        if let Status::Cooldown(ref mut rounds) = *self {
            *rounds = rounds.saturating_sub(1);
        }
        if *self == Status::Cooldown(0) {
            *self = Status::Ready;
        }
    }

    pub fn remaining(self) -> u32 {
        match self {
            Status::Ready => 0,
            Status::Cooldown(n) => n,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetingMode {
    /// No target at all.
    None,
    SelfOnly,
    Ally,
    Enemy,
    Position,
    /// The clicked cell picks a direction; everything along the ray is hit.
    Line,
    Area,
    /// Each next target must be within range of the previous one.
    Chain {
        min: u32,
        max: u32,
    },
    GlobalAlly,
    GlobalSelf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub id: AbilityId,
    pub name: String,

    #[serde(default)]
    pub power_cost: u32,

    /// Present only on ultimates, paid from the energy pool.
    #[serde(default)]
    pub energy_cost: Option<u32>,

    #[serde(default)]
    pub cooldown: u32,

    pub targeting: TargetingMode,

    #[serde(default)]
    pub range: Distance,

    pub effects: Vec<EffectDescriptor>,
}

impl AbilityDefinition {
    pub fn is_ultimate(&self) -> bool {
        self.energy_cost.is_some()
    }

    /// All persistent effects this ability refers to by id.
    pub fn referenced_effects(&self) -> impl Iterator<Item = &EffectId> {
        self.effects.iter().filter_map(|descriptor| match descriptor {
            EffectDescriptor::Status(status) => Some(&status.effect),
            EffectDescriptor::ApplyEffect(apply) => Some(&apply.effect),
            _ => None,
        })
    }
}

/// Which of the resolved entities an effect descriptor touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetFilter {
    Caster,
    /// The entities picked during target resolution, as they are.
    Selected,
    Enemies,
    Allies,
    All,
    /// Every living member of the caster's team, ignoring range.
    AllAllies,
    AllEnemies,
}

fn enemies() -> TargetFilter {
    TargetFilter::Enemies
}

fn allies() -> TargetFilter {
    TargetFilter::Allies
}

fn caster() -> TargetFilter {
    TargetFilter::Caster
}

fn selected() -> TargetFilter {
    TargetFilter::Selected
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, derive_more::From)]
pub enum EffectDescriptor {
    Damage(Damage),
    Heal(Heal),
    Buff(Buff),
    Status(InflictStatus),
    ResourceRecovery(ResourceRecovery),
    Movement(Movement),
    ChainMovement(ChainMovement),
    ApplyEffect(ApplyEffect),
    Cleanse(Cleanse),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Damage {
    pub multiplier: f32,

    #[serde(default)]
    pub area_radius: Option<Distance>,

    #[serde(default = "enemies")]
    pub targets: TargetFilter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Heal {
    pub amount: u32,

    #[serde(default)]
    pub area_radius: Option<Distance>,

    #[serde(default = "allies")]
    pub targets: TargetFilter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: StatKind,
    pub operation: Operation,
    pub value: f32,
}

/// A temporary stat change, tracked like any other persistent effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    #[serde(default)]
    pub name: Option<String>,

    pub modifiers: Vec<StatModifier>,

    pub duration: u32,

    #[serde(default)]
    pub area_radius: Option<Distance>,

    #[serde(default = "caster")]
    pub targets: TargetFilter,
}

/// Applies a named effect with its duration overridden.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InflictStatus {
    pub effect: EffectId,

    #[serde(default)]
    pub duration: Option<u32>,

    #[serde(default = "enemies")]
    pub targets: TargetFilter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecovery {
    #[serde(default)]
    pub power: u32,

    #[serde(default)]
    pub energy: u32,

    #[serde(default = "caster")]
    pub targets: TargetFilter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Movement {
    /// The caster jumps to the target position.
    Teleport,

    /// The caster slides along the resolved direction. Without a length
    /// the ability's line length is used.
    LineSlide {
        #[serde(default)]
        length: Option<u32>,
    },

    /// Grants a bonus move that the movement command resolves later.
    Deferred { range: Distance },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainMovement {
    /// Applied by target index, the last entry repeating.
    pub multipliers: Vec<f32>,
}

impl ChainMovement {
    pub fn multiplier(&self, index: usize) -> Option<f32> {
        let last = self.multipliers.len().checked_sub(1)?;
        Some(self.multipliers[index.min(last)])
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplyEffect {
    pub effect: EffectId,

    #[serde(default)]
    pub area_radius: Option<Distance>,

    #[serde(default = "selected")]
    pub targets: TargetFilter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cleanse {
    pub kind: Kind,

    #[serde(default = "allies")]
    pub targets: TargetFilter,
}
