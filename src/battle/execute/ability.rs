use std::collections::BTreeMap;

use log::debug;

use crate::{
    battle::{
        ability::{self, AbilityDefinition, EffectDescriptor, TargetFilter},
        check::{self, Error},
        command,
        component::Combatant,
        effect::{Action, EffectDefinition, Kind, Trigger},
        event::{self, Event, MoveKind},
        state::Battle,
        targeting::Context,
        EffectId, Id,
    },
    map::{self, Distance, Position},
    utils,
};

use super::{deal_damage, execute_consume_action, heal, lasting};

pub(super) fn execute_use_ability(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    command: &command::UseAbility,
) -> Result<(), Error> {
    let context = check::plan_ability(battle, command)?;
    let ability = battle
        .get_entity(command.id)
        .and_then(|caster| caster.ability(&command.ability))
        .cloned()
        .ok_or(Error::AbilityNotFound)?;

    // Work on a copy: nothing commits unless some descriptor took effect.
    let mut scratch = battle.clone();
    {
        let caster = scratch
            .combatant_mut(command.id)
            .ok_or(Error::EntityNotFound)?;
        caster.commit_ability(&ability.id);
        if !ability.is_ultimate() {
            let gain = caster.energy_gain.on_ability_use;
            caster.energy.gain(gain);
        }
    }
    let mut outcome = Vec::new();
    let mut changed = false;
    for descriptor in &ability.effects {
        changed |= execute_descriptor(&mut scratch, &mut outcome, &context, &ability, descriptor);
    }
    if !changed {
        debug!("{} had no effect", ability.id);
        return Err(Error::InvalidTarget);
    }
    *battle = scratch;
    events.push(
        event::AbilityUsed {
            id: command.id,
            ability: ability.id.clone(),
            power_cost: ability.power_cost,
            energy_cost: ability.energy_cost.unwrap_or(0),
        }
        .into(),
    );
    events.extend(outcome);
    execute_consume_action(battle, events);
    Ok(())
}

fn execute_descriptor(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    context: &Context,
    ability: &AbilityDefinition,
    descriptor: &EffectDescriptor,
) -> bool {
    let caster_id = context.caster;
    match *descriptor {
        EffectDescriptor::Damage(ref damage) => {
            let mut changed = false;
            for id in select_targets(battle, context, damage.targets, damage.area_radius) {
                changed |= strike(battle, events, caster_id, id, damage.multiplier);
            }
            changed
        }
        EffectDescriptor::Heal(ref descriptor) => {
            let mut changed = false;
            for id in select_targets(battle, context, descriptor.targets, descriptor.area_radius) {
                if heal(battle, events, id, descriptor.amount) > 0 {
                    changed = true;
                    if let Some(caster) = battle.combatant_mut(caster_id) {
                        let gain = caster.energy_gain.on_heal;
                        caster.energy.gain(gain);
                    }
                }
            }
            changed
        }
        EffectDescriptor::Buff(ref buff) => {
            let definition = buff_definition(ability, buff);
            let targets = select_targets(battle, context, buff.targets, buff.area_radius);
            apply_to_all(battle, events, caster_id, &targets, &definition)
        }
        EffectDescriptor::Status(ref status) => {
            let definition = match battle.definitions().effect(&status.effect) {
                Some(definition) => match status.duration {
                    Some(duration) => definition.with_duration(duration),
                    None => definition.clone(),
                },
                None => return false,
            };
            let targets = select_targets(battle, context, status.targets, None);
            apply_to_all(battle, events, caster_id, &targets, &definition)
        }
        EffectDescriptor::ApplyEffect(ref apply) => {
            let definition = match battle.definitions().effect(&apply.effect) {
                Some(definition) => definition.clone(),
                None => return false,
            };
            let targets = select_targets(battle, context, apply.targets, apply.area_radius);
            apply_to_all(battle, events, caster_id, &targets, &definition)
        }
        EffectDescriptor::ResourceRecovery(ref recovery) => {
            let mut changed = false;
            for id in select_targets(battle, context, recovery.targets, None) {
                changed |= recover(battle, events, id, recovery);
            }
            changed
        }
        EffectDescriptor::Movement(ref movement) => {
            execute_movement(battle, events, context, movement)
        }
        EffectDescriptor::ChainMovement(ref chain) => {
            execute_chain_movement(battle, events, context, chain)
        }
        EffectDescriptor::Cleanse(ref cleanse) => {
            let mut changed = false;
            for id in select_targets(battle, context, cleanse.targets, None) {
                changed |= lasting::cleanse(battle, events, id, cleanse.kind);
            }
            changed
        }
    }
}

/// Living combatants a descriptor touches.
///
/// With a radius the area is centered on the picked cell, or the picked
/// entity, or the caster. Without one the resolved entities are used.
fn select_targets(
    battle: &Battle,
    context: &Context,
    filter: TargetFilter,
    area_radius: Option<Distance>,
) -> Vec<Id> {
    let caster = match battle.get_entity(context.caster) {
        Some(caster) => caster,
        None => return Vec::new(),
    };
    let is_match = |entity: &Combatant| {
        entity.is_alive()
            && match filter {
                TargetFilter::Caster => entity.id() == caster.id(),
                TargetFilter::Selected | TargetFilter::All => true,
                TargetFilter::Enemies | TargetFilter::AllEnemies => entity.is_opponent_of(caster),
                TargetFilter::Allies | TargetFilter::AllAllies => !entity.is_opponent_of(caster),
            }
    };
    match filter {
        TargetFilter::Caster => vec![caster.id()],
        TargetFilter::AllAllies | TargetFilter::AllEnemies => battle
            .entities()
            .filter(|entity| is_match(entity))
            .map(Combatant::id)
            .collect(),
        _ => match area_radius {
            Some(radius) => {
                let center = context
                    .position
                    .or_else(|| {
                        context
                            .target
                            .and_then(|id| battle.get_entity(id))
                            .map(Combatant::position)
                    })
                    .unwrap_or_else(|| caster.position());
                map::cells_within(battle.grid(), center, radius)
                    .into_iter()
                    .filter_map(|pos| battle.entity_at(pos))
                    .filter(|entity| is_match(entity))
                    .map(Combatant::id)
                    .collect()
            }
            None => context
                .entities
                .iter()
                .filter_map(|&id| battle.get_entity(id))
                .filter(|entity| is_match(entity))
                .map(Combatant::id)
                .collect(),
        },
    }
}

/// `max(1, floor(attack * multiplier) - floor(defense / 2))`
fn damage_amount(attack: u32, multiplier: f32, defense: u32) -> u32 {
    utils::floor_scaled(attack, multiplier)
        .saturating_sub(defense / 2)
        .max(1)
}

fn attack_and_defense(battle: &Battle, attacker_id: Id, target_id: Id) -> Option<(u32, u32)> {
    let attacker = battle.get_entity(attacker_id)?;
    let target = battle.get_entity(target_id)?;
    if !target.is_alive() {
        return None;
    }
    Some((attacker.stats().attack(), target.stats().defense()))
}

/// A ranged hit, rolled against cover. A miss is still an outcome.
fn strike(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    attacker_id: Id,
    target_id: Id,
    multiplier: f32,
) -> bool {
    let (attack, defense) = match attack_and_defense(battle, attacker_id, target_id) {
        Some(stats) => stats,
        None => return false,
    };
    let hit_probability = battle.hit_probability(attacker_id, target_id).unwrap_or(1.0);
    if !utils::roll_hit(battle.rng_mut(), hit_probability) {
        debug!("{:?} missed {:?}", attacker_id, target_id);
        events.push(
            event::AttackMissed {
                attacker_id,
                target_id,
                hit_probability,
            }
            .into(),
        );
        return true;
    }
    let amount = damage_amount(attack, multiplier, defense);
    deal_damage(battle, events, attacker_id, target_id, amount, true);
    true
}

fn buff_definition(ability: &AbilityDefinition, buff: &ability::Buff) -> EffectDefinition {
    let actions = buff
        .modifiers
        .iter()
        .map(|modifier| Action::ModifyStat {
            stat: modifier.stat,
            operation: modifier.operation,
            value: modifier.value,
        })
        .collect();
    let mut triggers = BTreeMap::new();
    triggers.insert(Trigger::Apply, actions);
    let kind = if buff.modifiers.iter().all(|modifier| modifier.value >= 0.0) {
        Kind::Buff
    } else {
        Kind::Debuff
    };
    EffectDefinition {
        id: EffectId(format!("buff:{}", ability.id)),
        name: buff.name.clone().unwrap_or_else(|| ability.name.clone()),
        kind,
        duration: buff.duration,
        stackable: false,
        triggers,
    }
}

fn apply_to_all(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    source_id: Id,
    targets: &[Id],
    definition: &EffectDefinition,
) -> bool {
    let mut changed = false;
    for &id in targets {
        changed |= lasting::apply_effect(battle, events, source_id, id, definition);
    }
    changed
}

fn recover(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    id: Id,
    recovery: &ability::ResourceRecovery,
) -> bool {
    let target = match battle.combatant_mut(id) {
        Some(target) if target.is_alive() => target,
        _ => return false,
    };
    let old_power = target.stats.power();
    target.stats = target.stats.restore_power(recovery.power);
    let power = target.stats.power() - old_power;
    let energy = target.energy.gain(recovery.energy);
    if power == 0 && energy == 0 {
        return false;
    }
    events.push(event::ResourceRecovered { id, power, energy }.into());
    true
}

fn relocate(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    id: Id,
    path: Vec<Position>,
    kind: MoveKind,
) -> bool {
    let to = match path.last() {
        Some(&to) => to,
        None => return false,
    };
    let from = match battle.combatant_mut(id) {
        Some(combatant) => {
            let from = combatant.position();
            combatant.position = to;
            from
        }
        None => return false,
    };
    debug!("{:?} relocated {} -> {} ({:?})", id, from, to, kind);
    events.push(
        event::Moved {
            id,
            from,
            to,
            path,
            kind,
        }
        .into(),
    );
    true
}

fn execute_movement(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    context: &Context,
    movement: &ability::Movement,
) -> bool {
    let caster_id = context.caster;
    let start = match battle.get_entity(caster_id) {
        Some(caster) => caster.position(),
        None => return false,
    };
    match *movement {
        ability::Movement::Teleport => {
            let to = match context.position {
                Some(to) => to,
                None => return false,
            };
            if to == start || !battle.is_cell_free_for(to, caster_id) {
                return false;
            }
            relocate(battle, events, caster_id, vec![to], MoveKind::Teleport)
        }
        ability::Movement::LineSlide { length } => {
            let dir = match context.direction {
                Some(dir) => dir,
                None => return false,
            };
            let length = length.or(context.line_length).unwrap_or(0);
            let mut path = Vec::new();
            let mut pos = start;
            for _ in 0..length {
                pos = pos.step(dir);
                if !battle.is_cell_free_for(pos, caster_id) {
                    break;
                }
                path.push(pos);
            }
            relocate(battle, events, caster_id, path, MoveKind::Slide)
        }
        ability::Movement::Deferred { range } => {
            match battle.combatant_mut(caster_id) {
                Some(caster) => caster.bonus_move = Some(range),
                None => return false,
            }
            events.push(
                event::BonusMoveGranted {
                    id: caster_id,
                    range,
                }
                .into(),
            );
            true
        }
    }
}

/// Strikes every picked target with its positional multiplier, then
/// lands the caster on the cell right behind the last one if it's free.
fn execute_chain_movement(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    context: &Context,
    chain: &ability::ChainMovement,
) -> bool {
    let caster_id = context.caster;
    let mut changed = false;
    for (index, &target_id) in context.entities.iter().enumerate() {
        let multiplier = match chain.multiplier(index) {
            Some(multiplier) => multiplier,
            None => break,
        };
        if let Some((attack, defense)) = attack_and_defense(battle, caster_id, target_id) {
            let amount = damage_amount(attack, multiplier, defense);
            deal_damage(battle, events, caster_id, target_id, amount, true);
            changed = true;
        }
    }
    let behind = match landing_cell(battle, context) {
        Some(behind) => behind,
        None => return changed,
    };
    if battle.is_cell_free_for(behind, caster_id) {
        changed |= relocate(battle, events, caster_id, vec![behind], MoveKind::Chain);
    }
    changed
}

fn landing_cell(battle: &Battle, context: &Context) -> Option<Position> {
    let caster = battle.get_entity(context.caster)?;
    let last = battle.get_entity(*context.entities.last()?)?.position();
    let from = caster.position();
    let dx = (last.x - from.x).signum();
    let dy = (last.y - from.y).signum();
    if dx == 0 && dy == 0 {
        return None;
    }
    Some(Position::new(last.x + dx, last.y + dy))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::damage_amount;

    #[test]
    fn damage_formula() {
        assert_eq!(damage_amount(100, 0.5, 40), 30);
        assert_eq!(damage_amount(100, 0.65, 40), 45);
        assert_eq!(damage_amount(90, 0.65, 41), 38);
        assert_eq!(damage_amount(10, 1.0, 100), 1);
    }
}
