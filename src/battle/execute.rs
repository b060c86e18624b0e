use log::{debug, error, trace};

use crate::battle::{
    check::{self, check, Error},
    command::{self, Command},
    effect::Trigger,
    event::{self, Event, MoveKind},
    state::{Battle, BattleResult},
    Id, Mode, Team,
};

mod ability;
mod lasting;

/// Validates and runs a command.
///
/// Returns the events in the order they happened. A failed command
/// leaves the battle untouched.
pub fn execute(battle: &mut Battle, command: &Command) -> Result<Vec<Event>, Error> {
    trace!("Simulator: do_command: {:?}", command);
    if let Err(err) = check(battle, command) {
        error!("Check failed: {:?}", err);
        return Err(err);
    }
    let mut events = Vec::new();
    let result = match *command {
        Command::ConsumeAction(_) => {
            execute_consume_action(battle, &mut events);
            Ok(())
        }
        Command::CommitMovement(ref command) => {
            execute_commit_movement(battle, &mut events, command)
        }
        Command::UseAbility(ref command) => {
            ability::execute_use_ability(battle, &mut events, command)
        }
        Command::EndTurn(_) => {
            execute_end_turn(battle, &mut events);
            Ok(())
        }
    };
    if let Err(err) = result {
        error!("Execution failed: {:?}", err);
        return Err(err);
    }
    try_execute_end_battle(battle, &mut events);
    battle.queue_events(&events);
    Ok(events)
}

fn execute_consume_action(battle: &mut Battle, events: &mut Vec<Event>) {
    let remaining = battle.actions_remaining().saturating_sub(1);
    battle.set_actions_remaining(remaining);
    events.push(event::ActionConsumed { remaining }.into());
    try_execute_turn_cycle(battle, events);
}

/// With the actions spent the turn ends, unless someone still has a bonus
/// move to take. `EndTurn` forfeits it.
fn try_execute_turn_cycle(battle: &mut Battle, events: &mut Vec<Event>) {
    if battle.actions_remaining() > 0 {
        return;
    }
    let is_bonus_pending = battle
        .alive_entities_by_team(Team::Player)
        .iter()
        .any(|combatant| combatant.bonus_move().is_some());
    if is_bonus_pending {
        debug!("Turn {}: waiting for a bonus move", battle.turn());
        return;
    }
    execute_turn_cycle(battle, events);
}

fn execute_end_turn(battle: &mut Battle, events: &mut Vec<Event>) {
    battle.set_actions_remaining(0);
    execute_turn_cycle(battle, events);
}

fn execute_commit_movement(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    command: &command::CommitMovement,
) -> Result<(), Error> {
    let plan = check::plan_movement(battle, command)?;
    let id = command.id;
    let from = {
        let mover = battle.combatant_mut(id).ok_or(Error::EntityNotFound)?;
        let from = mover.position();
        if plan.bonus {
            mover.take_bonus_move(command.destination)?;
        } else {
            mover.move_to(command.destination)?;
        }
        from
    };
    debug!("{:?} moved {} -> {}", id, from, command.destination);
    let kind = if plan.bonus {
        MoveKind::Bonus
    } else {
        MoveKind::Walk
    };
    events.push(
        event::Moved {
            id,
            from,
            to: command.destination,
            path: plan.path,
            kind,
        }
        .into(),
    );
    let damage = battle.rules().dash_damage;
    for target_id in plan.dash_targets {
        if let Some((attacker, target)) = battle.combatant_pair_mut(id, target_id) {
            events.extend(attacker.execute_dash_attack(target, damage));
        }
    }
    if plan.bonus {
        try_execute_turn_cycle(battle, events);
    } else {
        execute_consume_action(battle, events);
    }
    Ok(())
}

/// Ends the player's turn, lets the opposing side's turn resolve and
/// opens the next player turn.
fn execute_turn_cycle(battle: &mut Battle, events: &mut Vec<Event>) {
    if try_execute_end_battle(battle, events) {
        return;
    }
    execute_end_team_turn(battle, events, Team::Player);
    execute_begin_team_turn(battle, events, Team::Enemy);
    // The opposing side has no decision-making, its turn ends at once.
    execute_end_team_turn(battle, events, Team::Enemy);
    let turn = battle.turn() + 1;
    battle.set_turn(turn);
    let actions = battle.rules().actions_per_turn;
    battle.set_actions_remaining(actions);
    execute_begin_team_turn(battle, events, Team::Player);
}

fn execute_end_team_turn(battle: &mut Battle, events: &mut Vec<Event>, team: Team) {
    debug!("Turn {}: {} ends", battle.turn(), team);
    events.push(
        event::TurnEnded {
            team,
            turn: battle.turn(),
        }
        .into(),
    );
    let regen_percent = battle.rules().regen_percent;
    for id in battle.alive_ids(team) {
        lasting::on_turn_end(battle, events, id);
        if let Some(combatant) = battle.combatant_mut(id) {
            combatant.reset_turn_state(regen_percent);
        }
    }
}

fn execute_begin_team_turn(battle: &mut Battle, events: &mut Vec<Event>, team: Team) {
    battle.set_active_team(team);
    debug!("Turn {}: {} begins", battle.turn(), team);
    events.push(
        event::TurnStarted {
            team,
            turn: battle.turn(),
        }
        .into(),
    );
    for id in battle.alive_ids(team) {
        lasting::on_turn_start(battle, events, id);
    }
}

/// Returns `true` if the battle is over.
fn try_execute_end_battle(battle: &mut Battle, events: &mut Vec<Event>) -> bool {
    if battle.is_completed() {
        return true;
    }
    let winner = if battle.alive_ids(Team::Enemy).is_empty() {
        Team::Player
    } else if battle.alive_ids(Team::Player).is_empty() {
        Team::Enemy
    } else {
        return false;
    };
    if winner == Team::Player && battle.mode() == Mode::Arcade {
        let wave = battle.wave();
        battle.set_wave(wave + 1);
        debug!("Wave {} cleared", wave);
        events.push(event::WaveCleared { wave }.into());
    }
    let result = BattleResult {
        winner,
        survivors: battle.alive_ids(winner),
    };
    debug!("Battle {:?} ended: {:?}", battle.id(), result);
    battle.set_result(result.clone());
    events.push(event::BattleEnded { result }.into());
    true
}

/// Damage from abilities and effects.
///
/// Runs the target's incoming damage modifiers and hands out energy.
/// With `react` the target's damage-taken actions run afterwards.
fn deal_damage(
    battle: &mut Battle,
    events: &mut Vec<Event>,
    source_id: Id,
    target_id: Id,
    amount: u32,
    react: bool,
) {
    let died = {
        let target = match battle.combatant_mut(target_id) {
            Some(target) if target.is_alive() => target,
            _ => return,
        };
        let amount = target
            .effects
            .iter()
            .fold(amount, |amount, instance| instance.modify_incoming_damage(amount));
        events.extend(target.take_damage(amount));
        if amount > 0 {
            let gain = target.energy_gain.on_damage_taken;
            target.energy.gain(gain);
        }
        !target.is_alive()
    };
    if source_id != target_id {
        if let Some(source) = battle.combatant_mut(source_id) {
            let mut gain = source.energy_gain.on_hit;
            if died {
                gain += source.energy_gain.on_kill;
            }
            source.energy.gain(gain);
        }
    }
    if react && !died {
        lasting::run_trigger_all(battle, events, target_id, Trigger::DamageTaken);
    }
}

/// Returns the amount actually restored.
fn heal(battle: &mut Battle, events: &mut Vec<Event>, target_id: Id, amount: u32) -> u32 {
    let target = match battle.combatant_mut(target_id) {
        Some(target) if target.is_alive() => target,
        _ => return 0,
    };
    let amount = amount.min(target.stats.missing_health());
    if amount == 0 {
        return 0;
    }
    target.stats = target.stats.restore_health(amount);
    events.push(
        event::Healed {
            id: target_id,
            amount,
        }
        .into(),
    );
    amount
}
