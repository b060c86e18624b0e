use log::trace;

use crate::{
    battle::{
        ability::{AbilityDefinition, TargetingMode},
        check::Error,
        component::Combatant,
        state::Battle,
        Id,
    },
    map::{Dir, Distance, Position},
};

/// What the caller picked for an ability.
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    None,
    Entity(Id),
    Position(Position),
    /// Chain picks, in selection order.
    Chain(Vec<Id>),
}

impl Default for Target {
    fn default() -> Self {
        Target::None
    }
}

/// A resolved target, ready for the effect descriptors.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    pub caster: Id,
    pub target: Option<Id>,
    pub position: Option<Position>,

    /// Everything the targeting mode picked, in order.
    pub entities: Vec<Id>,

    pub direction: Option<Dir>,
    pub line_length: Option<u32>,
}

impl Context {
    fn new(caster: Id) -> Self {
        Self {
            caster,
            target: None,
            position: None,
            entities: Vec::new(),
            direction: None,
            line_length: None,
        }
    }

    fn with_entity(mut self, entity: &Combatant) -> Self {
        self.target = Some(entity.id());
        self.position = Some(entity.position());
        self.entities = vec![entity.id()];
        self
    }
}

pub fn resolve(
    battle: &Battle,
    caster: &Combatant,
    ability: &AbilityDefinition,
    target: &Target,
) -> Result<Context, Error> {
    trace!(
        "targeting: {} uses {} on {:?}",
        caster.name(),
        ability.id,
        target
    );
    let context = Context::new(caster.id());
    match ability.targeting {
        TargetingMode::None => Ok(context),
        TargetingMode::SelfOnly | TargetingMode::GlobalSelf => Ok(context.with_entity(caster)),
        TargetingMode::Ally => {
            let ally = try_get_target(battle, target)?;
            if ally.team() != caster.team() || ally.id() == caster.id() {
                return Err(Error::InvalidTarget);
            }
            check_range(caster.position(), ally.position(), ability.range)?;
            Ok(context.with_entity(ally))
        }
        TargetingMode::GlobalAlly => {
            let ally = try_get_target(battle, target)?;
            if ally.team() != caster.team() || ally.id() == caster.id() {
                return Err(Error::InvalidTarget);
            }
            Ok(context.with_entity(ally))
        }
        TargetingMode::Enemy => {
            let enemy = try_get_target(battle, target)?;
            if !enemy.is_opponent_of(caster) {
                return Err(Error::InvalidTarget);
            }
            check_range(caster.position(), enemy.position(), ability.range)?;
            Ok(context.with_entity(enemy))
        }
        TargetingMode::Position | TargetingMode::Area => {
            let pos = try_get_position(battle, target)?;
            let is_area = ability.targeting == TargetingMode::Area;
            if !is_area && pos == caster.position() {
                return Err(Error::InvalidTarget);
            }
            check_range(caster.position(), pos, ability.range)?;
            let mut context = context;
            context.position = Some(pos);
            if let Some(entity) = battle.entity_at(pos) {
                context.target = Some(entity.id());
                context.entities = vec![entity.id()];
            }
            Ok(context)
        }
        TargetingMode::Line => {
            let pos = try_get_position(battle, target)?;
            let dir = Dir::dominant(caster.position(), pos).ok_or(Error::InvalidTarget)?;
            let length = ability.range.0.max(0) as u32;
            let mut context = context;
            context.position = Some(pos);
            context.direction = Some(dir);
            context.line_length = Some(length);
            context.entities = entities_along(battle, caster, dir, length);
            context.target = context.entities.first().copied();
            Ok(context)
        }
        TargetingMode::Chain { min, max } => {
            let ids = match target {
                Target::Chain(ids) => ids,
                _ => return Err(Error::InvalidTarget),
            };
            let mut selection = ChainSelection::with_limits(caster.id(), ability.range, min, max);
            for &id in ids {
                selection.select(battle, id)?;
            }
            if !selection.is_ready() {
                return Err(Error::InvalidTarget);
            }
            let mut context = context;
            context.target = selection.selected.last().copied();
            context.position = context
                .target
                .and_then(|id| battle.get_entity(id))
                .map(Combatant::position);
            context.entities = selection.selected;
            Ok(context)
        }
    }
}

fn try_get_target<'a>(battle: &'a Battle, target: &Target) -> Result<&'a Combatant, Error> {
    let id = match *target {
        Target::Entity(id) => id,
        _ => return Err(Error::InvalidTarget),
    };
    let entity = battle.get_entity(id).ok_or(Error::EntityNotFound)?;
    if !entity.is_alive() {
        return Err(Error::InvalidTarget);
    }
    Ok(entity)
}

fn try_get_position(battle: &Battle, target: &Target) -> Result<Position, Error> {
    match *target {
        Target::Position(pos) if battle.position_valid(pos) => Ok(pos),
        _ => Err(Error::InvalidTarget),
    }
}

fn check_range(from: Position, to: Position, range: Distance) -> Result<(), Error> {
    if from.distance(to) > range {
        return Err(Error::InvalidTarget);
    }
    Ok(())
}

/// Living combatants on the ray from the caster, nearest first.
fn entities_along(battle: &Battle, caster: &Combatant, dir: Dir, length: u32) -> Vec<Id> {
    let mut ids = Vec::new();
    let mut pos = caster.position();
    for _ in 0..length {
        pos = pos.step(dir);
        if !battle.position_valid(pos) {
            break;
        }
        if let Some(entity) = battle.entity_at(pos) {
            ids.push(entity.id());
        }
    }
    ids
}

/// Incremental picking for chain abilities.
///
/// Each next candidate must be an unclaimed living opponent within range
/// of the previous pick. The first one is measured from the caster.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainSelection {
    caster: Id,
    range: Distance,
    min: u32,
    max: u32,
    selected: Vec<Id>,
}

impl ChainSelection {
    /// `None` unless the ability uses chain targeting.
    pub fn new(caster: &Combatant, ability: &AbilityDefinition) -> Option<Self> {
        match ability.targeting {
            TargetingMode::Chain { min, max } => {
                Some(Self::with_limits(caster.id(), ability.range, min, max))
            }
            _ => None,
        }
    }

    fn with_limits(caster: Id, range: Distance, min: u32, max: u32) -> Self {
        Self {
            caster,
            range,
            min,
            max,
            selected: Vec::new(),
        }
    }

    fn origin(&self, battle: &Battle) -> Option<Position> {
        let id = self.selected.last().copied().unwrap_or(self.caster);
        battle.get_entity(id).map(Combatant::position)
    }

    pub fn candidates(&self, battle: &Battle) -> Vec<Id> {
        if self.is_complete() {
            return Vec::new();
        }
        let (caster, origin) = match (battle.get_entity(self.caster), self.origin(battle)) {
            (Some(caster), Some(origin)) => (caster, origin),
            _ => return Vec::new(),
        };
        battle
            .entities()
            .filter(|entity| entity.is_alive() && entity.is_opponent_of(caster))
            .filter(|entity| !self.selected.contains(&entity.id()))
            .filter(|entity| origin.distance(entity.position()) <= self.range)
            .map(Combatant::id)
            .collect()
    }

    pub fn select(&mut self, battle: &Battle, id: Id) -> Result<(), Error> {
        if !self.candidates(battle).contains(&id) {
            return Err(Error::InvalidTarget);
        }
        self.selected.push(id);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.selected.len() as u32 >= self.max
    }

    pub fn is_ready(&self) -> bool {
        self.selected.len() as u32 >= self.min.max(1)
    }

    pub fn selected(&self) -> &[Id] {
        &self.selected
    }

    pub fn into_target(self) -> Target {
        Target::Chain(self.selected)
    }
}
