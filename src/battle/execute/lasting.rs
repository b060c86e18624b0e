//! Persistent effects: application, lifecycle triggers and removal.

use std::collections::BTreeSet;

use log::debug;

use crate::{
    battle::{
        ability::StatModifier,
        component::{Combatant, StatKind},
        effect::{Action, EffectDefinition, Instance, Kind, Script, Trigger},
        event::{self, Event},
        state::Battle,
        EffectId, Id,
    },
    utils,
};

/// Attaches the effect or, if the target already has it, adds a stack
/// or refreshes the duration. Returns `false` if there was no one to
/// attach it to.
pub(super) fn apply_effect(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    source_id: Id,
    target_id: Id,
    definition: &EffectDefinition,
) -> bool {
    let (stacks, is_new, is_stack) = {
        let target = match battle.combatant_mut(target_id) {
            Some(target) if target.is_alive() => target,
            _ => return false,
        };
        match target
            .effects
            .iter_mut()
            .find(|instance| instance.effect == definition.id)
        {
            Some(instance) if instance.stackable => {
                instance.add_stack();
                (instance.stacks, false, true)
            }
            Some(instance) => {
                instance.refresh(definition.duration);
                (instance.stacks, false, false)
            }
            None => {
                target.effects.push(Instance::new(definition, source_id));
                (1, true, false)
            }
        }
    };
    debug!(
        "{:?}: effect {} applied ({} stacks)",
        target_id, definition.id, stacks
    );
    events.push(
        event::EffectApplied {
            id: target_id,
            effect: definition.id.clone(),
            stacks,
        }
        .into(),
    );
    if is_new {
        run_trigger(battle, events, target_id, &definition.id, Trigger::Apply);
    } else if is_stack {
        rescale_stat_modifiers(battle, events, target_id, &definition.id);
    }
    if let Some(source) = battle.combatant_mut(source_id) {
        let gain = source.energy_gain.on_buff;
        source.energy.gain(gain);
    }
    true
}

/// Stat modifiers scale with stacks, so a new stack reruns them.
fn rescale_stat_modifiers(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    target_id: Id,
    effect: &EffectId,
) {
    let actions: Vec<Action> = match instance(battle, target_id, effect) {
        Some(instance) => instance
            .actions(Trigger::Apply)
            .iter()
            .filter(|action| matches!(action, Action::ModifyStat { .. }))
            .cloned()
            .collect(),
        None => return,
    };
    for action in &actions {
        run_action(battle, events, target_id, effect, action);
    }
}

fn instance<'a>(battle: &'a Battle, target_id: Id, effect: &EffectId) -> Option<&'a Instance> {
    battle.get_entity(target_id)?.effect(effect)
}

pub(super) fn run_trigger(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    target_id: Id,
    effect: &EffectId,
    trigger: Trigger,
) {
    let actions = match instance(battle, target_id, effect) {
        Some(instance) => instance.actions(trigger).to_vec(),
        None => return,
    };
    for action in &actions {
        let is_alive = battle
            .get_entity(target_id)
            .map_or(false, |target| target.is_alive());
        if !is_alive {
            break;
        }
        run_action(battle, events, target_id, effect, action);
    }
}

/// Runs one trigger of every effect the combatant holds.
pub(super) fn run_trigger_all(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    target_id: Id,
    trigger: Trigger,
) {
    for effect in effect_ids(battle, target_id) {
        run_trigger(battle, events, target_id, &effect, trigger);
    }
}

fn effect_ids(battle: &Battle, target_id: Id) -> Vec<EffectId> {
    battle.get_entity(target_id).map_or_else(Vec::new, |target| {
        target
            .effects()
            .iter()
            .map(|instance| instance.effect.clone())
            .collect()
    })
}

fn run_action(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    target_id: Id,
    effect: &EffectId,
    action: &Action,
) {
    let (source_id, elapsed, stacks) = match instance(battle, target_id, effect) {
        Some(instance) => (instance.source, instance.elapsed, instance.stacks),
        None => return,
    };
    let source_stats = battle.get_entity(source_id).map(|source| *source.stats());
    let target_stats = match battle.get_entity(target_id) {
        Some(target) => *target.stats(),
        None => return,
    };
    match *action {
        Action::Damage(value) => {
            let amount = value.compute(source_stats.as_ref(), &target_stats, elapsed);
            let amount = utils::floor_to_u32(amount * stacks as f32);
            if amount > 0 {
                // Effect damage doesn't trigger damage-taken reactions.
                super::deal_damage(battle, events, source_id, target_id, amount, false);
            }
        }
        Action::Heal(value) => {
            let amount = value.compute(source_stats.as_ref(), &target_stats, elapsed);
            let amount = utils::floor_to_u32(amount * stacks as f32);
            super::heal(battle, events, target_id, amount);
        }
        Action::ModifyStat {
            stat,
            operation,
            value,
        } => {
            let target = match battle.combatant_mut(target_id) {
                Some(target) => target,
                None => return,
            };
            match target
                .effects
                .iter_mut()
                .find(|instance| &instance.effect == effect)
            {
                Some(instance) => instance.add_modifier(StatModifier {
                    stat,
                    operation,
                    value,
                }),
                None => return,
            }
            recompute_stat(events, target, stat);
        }
        // Consulted by `deal_damage` directly.
        Action::ModifyIncomingDamage(_) => {}
        Action::Scripted(script) => run_script(battle, events, target_id, script),
    }
}

fn recompute_stat(events: &mut Vec<Event>, target: &mut Combatant, stat: StatKind) {
    let (old, new) = target.recompute_stat(stat);
    if old != new {
        events.push(
            event::StatChanged {
                id: target.id(),
                stat,
                old,
                new,
            }
            .into(),
        );
    }
}

fn run_script(battle: &mut Battle, events: &mut Vec<Event>, target_id: Id, script: Script) {
    let target = match battle.combatant_mut(target_id) {
        Some(target) => target,
        None => return,
    };
    match script {
        Script::GrantBonusMove { range } => {
            target.bonus_move = Some(range);
            events.push(
                event::BonusMoveGranted {
                    id: target_id,
                    range,
                }
                .into(),
            );
        }
        Script::RefillEnergy => {
            let energy = target.energy.refill();
            events.push(
                event::ResourceRecovered {
                    id: target_id,
                    power: 0,
                    energy,
                }
                .into(),
            );
        }
    }
}

/// Takes the effect's stat modifiers out of play, runs its removal
/// actions and detaches it.
pub(super) fn remove_effect(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    target_id: Id,
    effect: &EffectId,
) {
    let target = match battle.combatant_mut(target_id) {
        Some(target) => target,
        None => return,
    };
    let modifiers = match target
        .effects
        .iter_mut()
        .find(|instance| &instance.effect == effect)
    {
        Some(instance) => instance.take_modifiers(),
        None => return,
    };
    for stat in modified_stats(&modifiers) {
        recompute_stat(events, target, stat);
    }
    run_trigger(battle, events, target_id, effect, Trigger::Remove);
    if let Some(target) = battle.combatant_mut(target_id) {
        let index = target
            .effects
            .iter()
            .position(|instance| &instance.effect == effect);
        if let Some(index) = index {
            let removed = target.effects.remove(index);
            // Modifiers put into play by the removal actions themselves.
            for stat in modified_stats(removed.modifiers()) {
                recompute_stat(events, target, stat);
            }
        }
    }
    debug!("{:?}: effect {} removed", target_id, effect);
    events.push(
        event::EffectRemoved {
            id: target_id,
            effect: effect.clone(),
        }
        .into(),
    );
}

fn modified_stats(modifiers: &[StatModifier]) -> BTreeSet<StatKind> {
    modifiers.iter().map(|modifier| modifier.stat).collect()
}

/// Removes every instance of the given kind. Returns `true` if any.
pub(super) fn cleanse(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    target_id: Id,
    kind: Kind,
) -> bool {
    let effects: Vec<EffectId> = match battle.get_entity(target_id) {
        Some(target) => target
            .effects()
            .iter()
            .filter(|instance| instance.kind == kind)
            .map(|instance| instance.effect.clone())
            .collect(),
        None => return false,
    };
    for effect in &effects {
        remove_effect(battle, events, target_id, effect);
    }
    !effects.is_empty()
}

pub(super) fn on_turn_start(battle: &mut Battle, events: &mut Vec<Event>, id: Id) {
    for effect in effect_ids(battle, id) {
        let is_alive = match battle.combatant_mut(id) {
            Some(combatant) => {
                if let Some(instance) = combatant
                    .effects
                    .iter_mut()
                    .find(|instance| instance.effect == effect)
                {
                    instance.elapsed += 1;
                }
                combatant.is_alive()
            }
            None => return,
        };
        if !is_alive {
            return;
        }
        run_trigger(battle, events, id, &effect, Trigger::TurnStart);
    }
}

pub(super) fn on_turn_end(battle: &mut Battle, events: &mut Vec<Event>, id: Id) {
    for effect in effect_ids(battle, id) {
        run_trigger(battle, events, id, &effect, Trigger::TurnEnd);
        let is_alive = battle
            .get_entity(id)
            .map_or(false, |combatant| combatant.is_alive());
        if !is_alive {
            return;
        }
        let is_expired = instance(battle, id, &effect).map_or(false, Instance::is_expired);
        if is_expired {
            remove_effect(battle, events, id, &effect);
        }
    }
}
