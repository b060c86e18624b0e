use crate::{
    battle::{targeting::Target, AbilityId, Id},
    map::Position,
};

#[derive(Debug, Clone, PartialEq, derive_more::From)]
pub enum Command {
    ConsumeAction(ConsumeAction),
    CommitMovement(CommitMovement),
    UseAbility(UseAbility),
    EndTurn(EndTurn),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumeAction;

#[derive(Debug, Clone, PartialEq)]
pub struct CommitMovement {
    pub id: Id,
    pub destination: Position,

    /// Opposing cells to dash against even if the route doesn't touch them.
    pub anchors: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseAbility {
    pub id: Id,
    pub ability: AbilityId,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndTurn;
