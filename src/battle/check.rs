use std::{error, fmt};

use log::trace;

use crate::{
    battle::{
        command::{self, Command},
        component::Combatant,
        movement::{self, Policy},
        state::Battle,
        targeting::{self, Context},
        Id, Team,
    },
    map::{Distance, Position},
};

pub fn check(battle: &Battle, command: &Command) -> Result<(), Error> {
    trace!("check: {:?}", command);
    if battle.is_completed() {
        return Err(Error::BattleEnded);
    }
    match *command {
        Command::ConsumeAction(_) => check_command_consume_action(battle),
        Command::CommitMovement(ref command) => plan_movement(battle, command).map(|_| ()),
        Command::UseAbility(ref command) => plan_ability(battle, command).map(|_| ()),
        Command::EndTurn(_) => check_command_end_turn(battle),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    WrongTurn,
    NoActionsRemaining,
    EntityNotFound,
    EntityDead,
    AbilityNotFound,
    AbilityUnavailable(AbilityUnavailable),
    InvalidTarget,
    InvalidAnchor,
    AlreadyMoved,
    NoValidRoute,
    RouteExceedsBudget,
    BattleEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityUnavailable {
    NotEnoughPower,
    NotEnoughEnergy,
    Cooldown(u32),
    AlreadyUsed,
}

impl From<AbilityUnavailable> for Error {
    fn from(reason: AbilityUnavailable) -> Self {
        Error::AbilityUnavailable(reason)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::WrongTurn => write!(f, "It's not this team's turn"),
            Error::NoActionsRemaining => write!(f, "No actions remaining this turn"),
            Error::EntityNotFound => write!(f, "No such entity"),
            Error::EntityDead => write!(f, "The entity is dead"),
            Error::AbilityNotFound => write!(f, "No such ability"),
            Error::AbilityUnavailable(AbilityUnavailable::NotEnoughPower) => {
                write!(f, "Not enough power")
            }
            Error::AbilityUnavailable(AbilityUnavailable::NotEnoughEnergy) => {
                write!(f, "Not enough energy")
            }
            Error::AbilityUnavailable(AbilityUnavailable::Cooldown(n)) => {
                write!(f, "The ability is on cooldown for {} more turns", n)
            }
            Error::AbilityUnavailable(AbilityUnavailable::AlreadyUsed) => {
                write!(f, "The ability was already used this turn")
            }
            Error::InvalidTarget => write!(f, "Invalid target"),
            Error::InvalidAnchor => {
                write!(f, "The dash anchor isn't an opposing combatant next to the route")
            }
            Error::AlreadyMoved => write!(f, "Already moved this turn"),
            Error::NoValidRoute => write!(f, "No valid route"),
            Error::RouteExceedsBudget => write!(f, "The route is longer than the movement range"),
            Error::BattleEnded => write!(f, "The battle has ended"),
        }
    }
}

impl error::Error for Error {}

/// A validated movement command.
#[derive(Debug, Clone, PartialEq)]
pub(in crate::battle) struct MovePlan {
    pub path: Vec<Position>,

    /// The move spends a pending bonus move instead of a turn action.
    pub bonus: bool,

    pub dash_targets: Vec<Id>,
}

pub(in crate::battle) fn plan_movement(
    battle: &Battle,
    command: &command::CommitMovement,
) -> Result<MovePlan, Error> {
    let actor = try_get_actor(battle, command.id)?;
    // A pending bonus move is taken once the regular move or the turn's
    // actions are spent.
    let (bonus, budget) = match actor.bonus_move() {
        Some(range) if actor.has_moved() || battle.actions_remaining() == 0 => (true, range),
        _ if actor.has_moved() => return Err(Error::AlreadyMoved),
        _ => {
            check_actions_left(battle)?;
            (false, actor.movement_range(battle.rules().base_movement))
        }
    };
    let destination = command.destination;
    if destination == actor.position() || !battle.is_cell_free_for(destination, actor.id()) {
        return Err(Error::InvalidTarget);
    }
    let path = movement::find_path(
        battle,
        actor.id(),
        actor.position(),
        destination,
        Policy::Commit,
    )
    .ok_or(Error::NoValidRoute)?;
    if Distance(path.len() as i32) > budget {
        return Err(Error::RouteExceedsBudget);
    }
    let mut anchored = Vec::with_capacity(command.anchors.len());
    for &pos in &command.anchors {
        match battle.entity_at(pos) {
            Some(target)
                if target.is_opponent_of(actor)
                    && movement::is_along_route(actor.position(), &path, pos) =>
            {
                anchored.push(target.id())
            }
            _ => return Err(Error::InvalidAnchor),
        }
    }
    let dash_targets = movement::resolve_dash_targets(battle, actor, &path, &anchored);
    Ok(MovePlan {
        path,
        bonus,
        dash_targets,
    })
}

pub(in crate::battle) fn plan_ability(
    battle: &Battle,
    command: &command::UseAbility,
) -> Result<Context, Error> {
    let actor = try_get_actor(battle, command.id)?;
    check_actions_left(battle)?;
    let ability = actor.check_ability(&command.ability)?;
    targeting::resolve(battle, actor, ability, &command.target)
}

fn check_command_consume_action(battle: &Battle) -> Result<(), Error> {
    check_player_turn(battle)?;
    check_actions_left(battle)
}

fn check_command_end_turn(battle: &Battle) -> Result<(), Error> {
    check_player_turn(battle)
}

/// Only the player side is commanded; the other side resolves on its own.
fn check_player_turn(battle: &Battle) -> Result<(), Error> {
    if battle.active_team() != Team::Player {
        return Err(Error::WrongTurn);
    }
    Ok(())
}

fn check_actions_left(battle: &Battle) -> Result<(), Error> {
    if battle.actions_remaining() == 0 {
        return Err(Error::NoActionsRemaining);
    }
    Ok(())
}

fn try_get_actor(battle: &Battle, id: Id) -> Result<&Combatant, Error> {
    let actor = battle.get_entity(id).ok_or(Error::EntityNotFound)?;
    check_player_turn(battle)?;
    if actor.team() != battle.active_team() {
        return Err(Error::WrongTurn);
    }
    if !actor.is_alive() {
        return Err(Error::EntityDead);
    }
    Ok(actor)
}
