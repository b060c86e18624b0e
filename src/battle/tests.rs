use std::{collections::BTreeMap, sync::Arc};

use pretty_assertions::assert_eq;

use crate::{
    battle::{
        ability::{
            self, AbilityDefinition, ChainMovement, EffectDescriptor, TargetFilter, TargetingMode,
        },
        check::{AbilityUnavailable, Error},
        command::{self, Command},
        component::{Combatant, Stats, StatKind},
        cover::CoverLevel,
        effect::{
            Action, EffectDefinition, Formula, IncomingDamage, Instance, Kind, Operation, Script,
            Trigger, Value,
        },
        event::{self, Event, MoveKind},
        execute::execute,
        state::{Battle, BattleResult},
        targeting::Target,
        AbilityId, BattleId, EffectId, Id, Mode, Team,
    },
    config::Catalog,
    map::{Distance, GridSize, Position},
    sink::CollectingSink,
};

const HERO: Id = Id(0);
const MAGE: Id = Id(1);
const GRUNT: Id = Id(10);
const BRUTE: Id = Id(11);
const BOSS: Id = Id(12);

fn pos(x: i32, y: i32) -> Position {
    Position::new(x, y)
}

/// Attack 40, defense 20, speed 5 (a movement range of 3).
fn stats_basic() -> Stats {
    Stats::full(100, 100, 40, 20, 5)
}

fn hero(position: Position) -> Combatant {
    Combatant::new(HERO, "hero", Team::Player, position, stats_basic())
}

fn enemy(id: Id, position: Position) -> Combatant {
    Combatant::new(id, "grunt", Team::Enemy, position, stats_basic())
}

fn battle_with(mode: Mode, catalog: Catalog, combatants: Vec<Combatant>) -> Battle {
    let mut battle = Battle::with_definitions(
        BattleId(1),
        mode,
        GridSize::default(),
        Arc::new(catalog),
    );
    for combatant in combatants {
        battle.add_entity(combatant);
    }
    battle
}

fn battle(combatants: Vec<Combatant>) -> Battle {
    battle_with(Mode::Tutorial, Catalog::default(), combatants)
}

fn try_exec(battle: &mut Battle, command: impl Into<Command>) -> Result<Vec<Event>, Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    execute(battle, &command.into())
}

fn exec(battle: &mut Battle, command: impl Into<Command>) -> Vec<Event> {
    try_exec(battle, command).unwrap()
}

fn exec_and_check(battle: &mut Battle, command: impl Into<Command>, expected: &[Event]) {
    let events = exec(battle, command);
    assert_eq!(events.as_slice(), expected);
}

fn command_move(id: Id, destination: Position) -> command::CommitMovement {
    command::CommitMovement {
        id,
        destination,
        anchors: Vec::new(),
    }
}

fn command_use(id: Id, ability: &str, target: Target) -> command::UseAbility {
    command::UseAbility {
        id,
        ability: AbilityId::new(ability),
        target,
    }
}

fn ability(
    id: &str,
    targeting: TargetingMode,
    range: i32,
    effects: Vec<EffectDescriptor>,
) -> AbilityDefinition {
    AbilityDefinition {
        id: AbilityId::new(id),
        name: id.into(),
        power_cost: 0,
        energy_cost: None,
        cooldown: 0,
        targeting,
        range: Distance(range),
        effects,
    }
}

/// Hits for `40 * 1.0 - 20 / 2 = 30` against basic stats.
fn ability_strike() -> AbilityDefinition {
    AbilityDefinition {
        power_cost: 30,
        cooldown: 2,
        ..ability(
            "strike",
            TargetingMode::Enemy,
            5,
            vec![ability::Damage {
                multiplier: 1.0,
                area_radius: None,
                targets: TargetFilter::Enemies,
            }
            .into()],
        )
    }
}

fn ability_apply_to_self(id: &str, effect: &str) -> AbilityDefinition {
    ability(
        id,
        TargetingMode::SelfOnly,
        0,
        vec![ability::ApplyEffect {
            effect: EffectId::new(effect),
            area_radius: None,
            targets: TargetFilter::Caster,
        }
        .into()],
    )
}

fn effect(
    id: &str,
    kind: Kind,
    duration: u32,
    triggers: Vec<(Trigger, Vec<Action>)>,
) -> EffectDefinition {
    EffectDefinition {
        id: EffectId::new(id),
        name: id.into(),
        kind,
        duration,
        stackable: false,
        triggers: triggers.into_iter().collect::<BTreeMap<_, _>>(),
    }
}

/// Multiplies attack by 1.5 for a turn.
fn effect_focus(duration: u32) -> EffectDefinition {
    effect(
        "focus",
        Kind::Buff,
        duration,
        vec![(
            Trigger::Apply,
            vec![Action::ModifyStat {
                stat: StatKind::Attack,
                operation: Operation::Multiply,
                value: 0.5,
            }],
        )],
    )
}

/// Deals the source's speed as damage on every turn start.
fn effect_burn() -> EffectDefinition {
    effect(
        "burn",
        Kind::Debuff,
        2,
        vec![(
            Trigger::TurnStart,
            vec![Action::Damage(Value {
                base: 1.0,
                formula: Formula::SourceStat {
                    stat: StatKind::Speed,
                    multiplier: 1.0,
                },
            })],
        )],
    )
}

fn catalog(effects: Vec<EffectDefinition>) -> Catalog {
    let mut catalog = Catalog::default();
    for effect in effects {
        catalog.add_effect(effect);
    }
    catalog
}

fn event_action_consumed(remaining: u32) -> Event {
    event::ActionConsumed { remaining }.into()
}

fn event_turn_ended(team: Team, turn: u32) -> Event {
    event::TurnEnded { team, turn }.into()
}

fn event_turn_started(team: Team, turn: u32) -> Event {
    event::TurnStarted { team, turn }.into()
}

fn event_ability_used(id: Id, ability: &str, power_cost: u32) -> Event {
    event::AbilityUsed {
        id,
        ability: AbilityId::new(ability),
        power_cost,
        energy_cost: 0,
    }
    .into()
}

fn event_damaged(id: Id, old_health: u32, new_health: u32, amount: u32) -> Event {
    event::Damaged {
        id,
        old_health,
        new_health,
        amount,
    }
    .into()
}

fn event_dash(attacker_id: Id, target_id: Id) -> Event {
    event::DashExecuted {
        attacker_id,
        target_id,
        damage: 15,
    }
    .into()
}

fn event_effect_applied(id: Id, effect: &str, stacks: u32) -> Event {
    event::EffectApplied {
        id,
        effect: EffectId::new(effect),
        stacks,
    }
    .into()
}

fn event_effect_removed(id: Id, effect: &str) -> Event {
    event::EffectRemoved {
        id,
        effect: EffectId::new(effect),
    }
    .into()
}

fn event_stat_changed(id: Id, stat: StatKind, old: u32, new: u32) -> Event {
    event::StatChanged { id, stat, old, new }.into()
}

fn events_enemy_turn(turn: u32) -> Vec<Event> {
    vec![
        event_turn_ended(Team::Player, turn),
        event_turn_started(Team::Enemy, turn),
        event_turn_ended(Team::Enemy, turn),
        event_turn_started(Team::Player, turn + 1),
    ]
}

#[test]
fn inactive_team_cannot_act() {
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(ability_strike()),
        enemy(GRUNT, pos(1, 3)).with_ability(ability_strike()),
    ]);
    assert_eq!(
        try_exec(&mut battle, command_move(GRUNT, pos(2, 3))),
        Err(Error::WrongTurn)
    );
    assert_eq!(
        try_exec(
            &mut battle,
            command_use(GRUNT, "strike", Target::Entity(HERO))
        ),
        Err(Error::WrongTurn)
    );
    battle.set_active_team(Team::Enemy);
    let commands: Vec<Command> = vec![
        command::ConsumeAction.into(),
        command_move(HERO, pos(1, 2)).into(),
        command_use(HERO, "strike", Target::Entity(GRUNT)).into(),
        command::EndTurn.into(),
    ];
    for command in commands {
        assert_eq!(try_exec(&mut battle, command), Err(Error::WrongTurn));
    }
    let hero = battle.get_entity(HERO).unwrap();
    assert_eq!(hero.position(), pos(1, 1));
    assert_eq!(hero.stats().power(), 100);
    assert_eq!(battle.actions_remaining(), 3);
    assert!(battle.pending_events().is_empty());
}

#[test]
fn unknown_or_dead_actor() {
    let mut dead = Combatant::new(MAGE, "ghost", Team::Player, pos(4, 4), stats_basic());
    dead.take_damage(1000);
    let mut battle = battle(vec![hero(pos(1, 1)), dead, enemy(GRUNT, pos(6, 6))]);
    assert_eq!(
        try_exec(&mut battle, command_move(Id(99), pos(2, 1))),
        Err(Error::EntityNotFound)
    );
    assert_eq!(
        try_exec(&mut battle, command_move(MAGE, pos(4, 5))),
        Err(Error::EntityDead)
    );
}

#[test]
fn turn_ends_after_all_actions() {
    let mut battle = battle(vec![hero(pos(1, 1)), enemy(GRUNT, pos(6, 6))]);
    exec_and_check(
        &mut battle,
        command::ConsumeAction,
        &[event_action_consumed(2)],
    );
    exec_and_check(
        &mut battle,
        command::ConsumeAction,
        &[event_action_consumed(1)],
    );
    let mut expected = vec![event_action_consumed(0)];
    expected.extend(events_enemy_turn(1));
    exec_and_check(&mut battle, command::ConsumeAction, &expected);
    assert_eq!(battle.turn(), 2);
    assert_eq!(battle.active_team(), Team::Player);
    assert_eq!(battle.actions_remaining(), 3);
}

#[test]
fn no_actions_remaining() {
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(ability_strike()),
        enemy(GRUNT, pos(1, 3)),
    ]);
    battle.set_actions_remaining(0);
    assert_eq!(
        try_exec(&mut battle, command::ConsumeAction),
        Err(Error::NoActionsRemaining)
    );
    assert_eq!(
        try_exec(&mut battle, command_move(HERO, pos(1, 2))),
        Err(Error::NoActionsRemaining)
    );
    assert_eq!(
        try_exec(
            &mut battle,
            command_use(HERO, "strike", Target::Entity(GRUNT))
        ),
        Err(Error::NoActionsRemaining)
    );
}

#[test]
fn end_turn_regenerates_power() {
    let stats = Stats::new(100, 100, 100, 50, 40, 20, 5).unwrap();
    let mut battle = battle(vec![
        Combatant::new(HERO, "hero", Team::Player, pos(1, 1), stats),
        enemy(GRUNT, pos(6, 6)),
    ]);
    exec_and_check(&mut battle, command::EndTurn, &events_enemy_turn(1));
    assert_eq!(battle.get_entity(HERO).unwrap().stats().power(), 70);
    exec(&mut battle, command::EndTurn);
    exec(&mut battle, command::EndTurn);
    assert_eq!(battle.get_entity(HERO).unwrap().stats().power(), 100);
    assert_eq!(battle.turn(), 4);
}

#[test]
fn commit_movement() {
    let mut battle = battle(vec![hero(pos(1, 1)), enemy(GRUNT, pos(6, 6))]);
    let expected = [
        event::Moved {
            id: HERO,
            from: pos(1, 1),
            to: pos(1, 3),
            path: vec![pos(1, 2), pos(1, 3)],
            kind: MoveKind::Walk,
        }
        .into(),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command_move(HERO, pos(1, 3)), &expected);
    let hero = battle.get_entity(HERO).unwrap();
    assert_eq!(hero.position(), pos(1, 3));
    assert!(hero.has_moved());
    assert_eq!(
        try_exec(&mut battle, command_move(HERO, pos(1, 4))),
        Err(Error::AlreadyMoved)
    );
    assert_eq!(battle.actions_remaining(), 2);
}

#[test]
fn commit_movement_failures() {
    let mut battle = battle(vec![
        hero(pos(1, 1)),
        enemy(GRUNT, pos(2, 1)),
        enemy(BRUTE, pos(5, 5)),
    ]);
    battle.add_obstacle(pos(1, 2));
    battle.add_obstacle(pos(6, 7));
    battle.add_obstacle(pos(7, 6));
    let cases = [
        (pos(1, 6), Error::RouteExceedsBudget),
        (pos(7, 7), Error::NoValidRoute),
        (pos(1, 2), Error::InvalidTarget),
        (pos(2, 1), Error::InvalidTarget),
        (pos(1, 1), Error::InvalidTarget),
        (pos(-1, 1), Error::InvalidTarget),
    ];
    for &(destination, err) in &cases {
        assert_eq!(
            try_exec(&mut battle, command_move(HERO, destination)),
            Err(err),
            "{}",
            destination
        );
    }
    let command = command::CommitMovement {
        anchors: vec![pos(4, 4)],
        ..command_move(HERO, pos(0, 1))
    };
    assert_eq!(try_exec(&mut battle, command), Err(Error::InvalidAnchor));
    assert_eq!(battle.get_entity(HERO).unwrap().position(), pos(1, 1));
    assert_eq!(battle.actions_remaining(), 3);
}

#[test]
fn dash_hits_enemies_along_the_path() {
    let mut battle = battle(vec![
        hero(pos(1, 1)),
        enemy(GRUNT, pos(3, 2)),
        enemy(BRUTE, pos(4, 0)),
    ]);
    let expected = [
        event::Moved {
            id: HERO,
            from: pos(1, 1),
            to: pos(4, 1),
            path: vec![pos(2, 1), pos(3, 1), pos(4, 1)],
            kind: MoveKind::Walk,
        }
        .into(),
        event_dash(HERO, GRUNT),
        event_damaged(GRUNT, 100, 85, 15),
        event_dash(HERO, BRUTE),
        event_damaged(BRUTE, 100, 85, 15),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command_move(HERO, pos(4, 1)), &expected);
    let hero = battle.get_entity(HERO).unwrap();
    assert!(hero.dash_targets().contains(&GRUNT));
    assert!(hero.dash_targets().contains(&BRUTE));
}

#[test]
fn anchored_dash_target() {
    let mut battle = battle(vec![
        hero(pos(1, 1)),
        enemy(GRUNT, pos(2, 2)),
        enemy(BRUTE, pos(5, 5)),
        enemy(BOSS, pos(0, 1)),
    ]);
    let far_away = command::CommitMovement {
        anchors: vec![pos(5, 5)],
        ..command_move(HERO, pos(1, 3))
    };
    assert_eq!(try_exec(&mut battle, far_away), Err(Error::InvalidAnchor));
    assert_eq!(battle.get_entity(BRUTE).unwrap().stats().health(), 100);
    assert_eq!(battle.get_entity(HERO).unwrap().position(), pos(1, 1));
    // BOSS only touches the starting cell, so the scan alone skips it.
    let command = command::CommitMovement {
        anchors: vec![pos(0, 1), pos(2, 2)],
        ..command_move(HERO, pos(1, 3))
    };
    let expected = [
        event::Moved {
            id: HERO,
            from: pos(1, 1),
            to: pos(1, 3),
            path: vec![pos(1, 2), pos(1, 3)],
            kind: MoveKind::Walk,
        }
        .into(),
        event_dash(HERO, GRUNT),
        event_damaged(GRUNT, 100, 85, 15),
        event_dash(HERO, BOSS),
        event_damaged(BOSS, 100, 85, 15),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command, &expected);
}

#[test]
fn preview_is_a_pure_read() {
    let mut battle = battle(vec![hero(pos(1, 1)), enemy(GRUNT, pos(5, 4))]);
    battle.add_obstacle(pos(3, 3));
    let route = battle.preview_route(HERO, &[pos(5, 5)]);
    assert!(route.is_valid());
    assert_eq!(route.total_distance(), Distance(8));
    assert!(!route.tiles().contains(&pos(3, 3)));
    assert_eq!(route.dash_candidates(), &[GRUNT]);
    let through_enemy = battle.preview_route(HERO, &[pos(5, 4)]);
    assert!(through_enemy.is_valid());
    assert!(!battle.preview_route(HERO, &[pos(3, 3)]).is_valid());
    assert!(!battle.preview_route(Id(42), &[pos(2, 2)]).is_valid());
    assert_eq!(battle.get_entity(HERO).unwrap().position(), pos(1, 1));
    assert!(battle.pending_events().is_empty());
}

#[test]
fn use_ability_pays_and_cools_down() {
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(ability_strike()),
        enemy(GRUNT, pos(1, 3)),
    ]);
    let strike = || command_use(HERO, "strike", Target::Entity(GRUNT));
    let expected = [
        event_ability_used(HERO, "strike", 30),
        event_damaged(GRUNT, 100, 70, 30),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, strike(), &expected);
    assert_eq!(battle.get_entity(HERO).unwrap().stats().power(), 70);
    assert_eq!(
        try_exec(&mut battle, strike()),
        Err(AbilityUnavailable::AlreadyUsed.into())
    );
    exec(&mut battle, command::EndTurn);
    assert_eq!(
        try_exec(&mut battle, strike()),
        Err(AbilityUnavailable::Cooldown(1).into())
    );
    exec(&mut battle, command::EndTurn);
    let hero = battle.get_entity(HERO).unwrap();
    assert_eq!(hero.cooldown(&AbilityId::new("strike")), 0);
    assert_eq!(hero.stats().power(), 100);
    exec(&mut battle, strike());
    assert_eq!(battle.get_entity(GRUNT).unwrap().stats().health(), 40);
}

#[test]
fn not_enough_power() {
    let poor = Stats::new(100, 100, 100, 20, 40, 20, 5).unwrap();
    let mut battle = battle(vec![
        Combatant::new(HERO, "hero", Team::Player, pos(1, 1), poor).with_ability(ability_strike()),
        enemy(GRUNT, pos(1, 3)),
    ]);
    assert_eq!(
        try_exec(&mut battle, command_use(HERO, "nope", Target::None)),
        Err(Error::AbilityNotFound)
    );
    assert_eq!(
        try_exec(
            &mut battle,
            command_use(HERO, "strike", Target::Entity(GRUNT))
        ),
        Err(AbilityUnavailable::NotEnoughPower.into())
    );
    assert_eq!(battle.get_entity(HERO).unwrap().stats().power(), 20);
}

#[test]
fn invalid_targets_change_nothing() {
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(ability_strike()),
        enemy(GRUNT, pos(1, 3)),
        enemy(BRUTE, pos(7, 7)),
    ]);
    let cases = [
        (BRUTE, Error::InvalidTarget),
        (HERO, Error::InvalidTarget),
        (Id(99), Error::EntityNotFound),
    ];
    for &(target, err) in &cases {
        assert_eq!(
            try_exec(
                &mut battle,
                command_use(HERO, "strike", Target::Entity(target))
            ),
            Err(err)
        );
    }
    assert_eq!(
        try_exec(
            &mut battle,
            command_use(HERO, "strike", Target::Position(pos(1, 3)))
        ),
        Err(Error::InvalidTarget)
    );
    let hero = battle.get_entity(HERO).unwrap();
    assert_eq!(hero.stats().power(), 100);
    assert_eq!(hero.cooldown(&AbilityId::new("strike")), 0);
    assert!(!hero.has_acted());
    assert_eq!(battle.actions_remaining(), 3);
    assert!(battle.pending_events().is_empty());
}

#[test]
fn ultimate_needs_energy() {
    let ultimate = AbilityDefinition {
        energy_cost: Some(50),
        power_cost: 0,
        ..ability_strike()
    };
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_energy(100).with_ability(ultimate),
        enemy(GRUNT, pos(1, 3)),
    ]);
    let command = || command_use(HERO, "strike", Target::Entity(GRUNT));
    assert_eq!(
        try_exec(&mut battle, command()),
        Err(AbilityUnavailable::NotEnoughEnergy.into())
    );
    battle.combatant_mut(HERO).unwrap().energy.gain(60);
    let events = exec(&mut battle, command());
    assert_eq!(
        events[0],
        event::AbilityUsed {
            id: HERO,
            ability: AbilityId::new("strike"),
            power_cost: 0,
            energy_cost: 50,
        }
        .into()
    );
    assert_eq!(battle.get_entity(HERO).unwrap().energy().current(), 10);
}

#[test]
fn ability_without_effect_is_rejected() {
    let heal = ability(
        "mend",
        TargetingMode::Ally,
        3,
        vec![ability::Heal {
            amount: 20,
            area_radius: None,
            targets: TargetFilter::Allies,
        }
        .into()],
    );
    let mage = Combatant::new(MAGE, "mage", Team::Player, pos(1, 2), stats_basic());
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(heal),
        mage,
        enemy(GRUNT, pos(6, 6)),
    ]);
    let command = || command_use(HERO, "mend", Target::Entity(MAGE));
    assert_eq!(try_exec(&mut battle, command()), Err(Error::InvalidTarget));
    assert!(!battle.get_entity(HERO).unwrap().has_acted());
    assert_eq!(battle.actions_remaining(), 3);
    battle.combatant_mut(MAGE).unwrap().take_damage(5);
    let expected = [
        event_ability_used(HERO, "mend", 0),
        event::Healed { id: MAGE, amount: 5 }.into(),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command(), &expected);
}

fn chain_battle() -> Battle {
    let assassin = Stats::full(100, 100, 100, 40, 5);
    let tank = Stats::full(200, 0, 10, 40, 5);
    let corte = AbilityDefinition {
        power_cost: 40,
        ..ability(
            "corte",
            TargetingMode::Chain { min: 1, max: 3 },
            6,
            vec![ChainMovement {
                multipliers: vec![0.5, 0.65, 0.9],
            }
            .into()],
        )
    };
    battle(vec![
        Combatant::new(HERO, "hero", Team::Player, pos(0, 0), assassin).with_ability(corte),
        Combatant::new(GRUNT, "a", Team::Enemy, pos(1, 2), tank),
        Combatant::new(BRUTE, "b", Team::Enemy, pos(3, 2), tank),
        Combatant::new(BOSS, "c", Team::Enemy, pos(4, 0), tank),
    ])
}

#[test]
fn chain_ability_lands_behind_last_target() {
    let mut battle = chain_battle();
    let command = command_use(HERO, "corte", Target::Chain(vec![GRUNT, BRUTE, BOSS]));
    let expected = [
        event_ability_used(HERO, "corte", 40),
        event_damaged(GRUNT, 200, 170, 30),
        event_damaged(BRUTE, 200, 155, 45),
        event_damaged(BOSS, 200, 130, 70),
        event::Moved {
            id: HERO,
            from: pos(0, 0),
            to: pos(5, 0),
            path: vec![pos(5, 0)],
            kind: MoveKind::Chain,
        }
        .into(),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command, &expected);
    assert_eq!(battle.get_entity(HERO).unwrap().position(), pos(5, 0));
}

#[test]
fn chain_ability_stays_put_if_landing_is_blocked() {
    let mut battle = chain_battle();
    battle.add_obstacle(pos(5, 0));
    let command = command_use(HERO, "corte", Target::Chain(vec![GRUNT, BRUTE, BOSS]));
    let expected = [
        event_ability_used(HERO, "corte", 40),
        event_damaged(GRUNT, 200, 170, 30),
        event_damaged(BRUTE, 200, 155, 45),
        event_damaged(BOSS, 200, 130, 70),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command, &expected);
    assert_eq!(battle.get_entity(HERO).unwrap().position(), pos(0, 0));
}

#[test]
fn full_cover_makes_ranged_attacks_miss() {
    let mut battle = battle(vec![
        hero(pos(0, 0)).with_ability(ability_strike()),
        enemy(GRUNT, pos(0, 4)),
    ]);
    battle.add_cover(pos(0, 2), CoverLevel::Full);
    assert_eq!(battle.hit_probability(HERO, GRUNT), Some(0.0));
    let expected = [
        event_ability_used(HERO, "strike", 30),
        event::AttackMissed {
            attacker_id: HERO,
            target_id: GRUNT,
            hit_probability: 0.0,
        }
        .into(),
        event_action_consumed(2),
    ];
    exec_and_check(
        &mut battle,
        command_use(HERO, "strike", Target::Entity(GRUNT)),
        &expected,
    );
    assert_eq!(battle.get_entity(GRUNT).unwrap().stats().health(), 100);
    assert!(battle.is_obstacle(pos(0, 2)));
}

#[test]
fn half_cover_rolls_are_seeded() {
    let mut battle = battle(vec![
        hero(pos(0, 0)).with_ability(ability_strike()),
        enemy(GRUNT, pos(0, 4)),
    ])
    .with_seed(7);
    battle.add_cover(pos(0, 2), CoverLevel::Half);
    assert_eq!(battle.hit_probability(HERO, GRUNT), Some(0.5));
    let mut twin = battle.clone();
    let command = || command_use(HERO, "strike", Target::Entity(GRUNT));
    assert_eq!(exec(&mut battle, command()), exec(&mut twin, command()));
}

#[test]
fn adjacent_attacks_ignore_cover() {
    let mut battle = battle(vec![hero(pos(2, 2)), enemy(GRUNT, pos(3, 3))]);
    battle.add_cover(pos(2, 3), CoverLevel::Full);
    battle.add_cover(pos(3, 2), CoverLevel::Full);
    assert_eq!(battle.hit_probability(HERO, GRUNT), Some(1.0));
}

#[test]
fn stat_modifier_lasts_and_restores() {
    let mut battle = battle_with(
        Mode::Tutorial,
        catalog(vec![effect_focus(1)]),
        vec![
            hero(pos(1, 1)).with_ability(ability_apply_to_self("concentrate", "focus")),
            enemy(GRUNT, pos(6, 6)),
        ],
    );
    let expected = [
        event_ability_used(HERO, "concentrate", 0),
        event_effect_applied(HERO, "focus", 1),
        event_stat_changed(HERO, StatKind::Attack, 40, 60),
        event_action_consumed(2),
    ];
    exec_and_check(
        &mut battle,
        command_use(HERO, "concentrate", Target::None),
        &expected,
    );
    exec_and_check(&mut battle, command::EndTurn, &events_enemy_turn(1));
    assert_eq!(battle.get_entity(HERO).unwrap().stats().attack(), 60);
    let expected = [
        event_turn_ended(Team::Player, 2),
        event_stat_changed(HERO, StatKind::Attack, 60, 40),
        event_effect_removed(HERO, "focus"),
        event_turn_started(Team::Enemy, 2),
        event_turn_ended(Team::Enemy, 2),
        event_turn_started(Team::Player, 3),
    ];
    exec_and_check(&mut battle, command::EndTurn, &expected);
    let hero = battle.get_entity(HERO).unwrap();
    assert_eq!(hero.stats().attack(), 40);
    assert!(hero.effects().is_empty());
}

#[test]
fn non_stackable_effect_refreshes() {
    let mut battle = battle_with(
        Mode::Tutorial,
        catalog(vec![effect_focus(2)]),
        vec![
            hero(pos(1, 1)).with_ability(ability_apply_to_self("concentrate", "focus")),
            enemy(GRUNT, pos(6, 6)),
        ],
    );
    let command = || command_use(HERO, "concentrate", Target::None);
    exec(&mut battle, command());
    exec(&mut battle, command::EndTurn);
    let focus = EffectId::new("focus");
    assert_eq!(battle.get_entity(HERO).unwrap().effect(&focus).unwrap().elapsed, 1);
    let expected = [
        event_ability_used(HERO, "concentrate", 0),
        event_effect_applied(HERO, "focus", 1),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command(), &expected);
    let hero = battle.get_entity(HERO).unwrap();
    let instance = hero.effect(&focus).unwrap();
    assert_eq!(instance.elapsed, 0);
    assert_eq!(instance.stacks, 1);
    assert_eq!(hero.stats().attack(), 60);
}

#[test]
fn stackable_effect_scales_with_stacks() {
    let rally = EffectDefinition {
        stackable: true,
        ..effect(
            "rally",
            Kind::Buff,
            3,
            vec![(
                Trigger::Apply,
                vec![Action::ModifyStat {
                    stat: StatKind::Attack,
                    operation: Operation::Add,
                    value: 5.0,
                }],
            )],
        )
    };
    let mut battle = battle_with(
        Mode::Tutorial,
        catalog(vec![rally]),
        vec![
            hero(pos(1, 1)).with_ability(ability_apply_to_self("shout", "rally")),
            enemy(GRUNT, pos(6, 6)),
        ],
    );
    let command = || command_use(HERO, "shout", Target::None);
    exec(&mut battle, command());
    assert_eq!(battle.get_entity(HERO).unwrap().stats().attack(), 45);
    exec(&mut battle, command::EndTurn);
    let expected = [
        event_ability_used(HERO, "shout", 0),
        event_effect_applied(HERO, "rally", 2),
        event_stat_changed(HERO, StatKind::Attack, 45, 50),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command(), &expected);
    let instance = battle
        .get_entity(HERO)
        .unwrap()
        .effect(&EffectId::new("rally"))
        .unwrap()
        .clone();
    assert_eq!(instance.stacks, 2);
    assert_eq!(instance.elapsed, 0);
}

#[test]
fn overlapping_stat_modifiers_share_the_base() {
    let rage = effect(
        "rage",
        Kind::Buff,
        3,
        vec![(
            Trigger::Apply,
            vec![Action::ModifyStat {
                stat: StatKind::Attack,
                operation: Operation::Multiply,
                value: 0.5,
            }],
        )],
    );
    let mut battle = battle_with(
        Mode::Tutorial,
        catalog(vec![effect_focus(1), rage]),
        vec![
            hero(pos(1, 1))
                .with_ability(ability_apply_to_self("concentrate", "focus"))
                .with_ability(ability_apply_to_self("enrage", "rage")),
            enemy(GRUNT, pos(6, 6)),
        ],
    );
    exec(&mut battle, command_use(HERO, "concentrate", Target::None));
    let expected = [
        event_ability_used(HERO, "enrage", 0),
        event_effect_applied(HERO, "rage", 1),
        event_stat_changed(HERO, StatKind::Attack, 60, 80),
        event_action_consumed(1),
    ];
    exec_and_check(&mut battle, command_use(HERO, "enrage", Target::None), &expected);
    assert_eq!(battle.get_entity(HERO).unwrap().base_stat(StatKind::Attack), Some(40));
    exec_and_check(&mut battle, command::EndTurn, &events_enemy_turn(1));
    let expected = [
        event_turn_ended(Team::Player, 2),
        event_stat_changed(HERO, StatKind::Attack, 80, 60),
        event_effect_removed(HERO, "focus"),
        event_turn_started(Team::Enemy, 2),
        event_turn_ended(Team::Enemy, 2),
        event_turn_started(Team::Player, 3),
    ];
    exec_and_check(&mut battle, command::EndTurn, &expected);
    assert_eq!(battle.get_entity(HERO).unwrap().stats().attack(), 60);
    exec_and_check(&mut battle, command::EndTurn, &events_enemy_turn(3));
    let expected = [
        event_turn_ended(Team::Player, 4),
        event_stat_changed(HERO, StatKind::Attack, 60, 40),
        event_effect_removed(HERO, "rage"),
        event_turn_started(Team::Enemy, 4),
        event_turn_ended(Team::Enemy, 4),
        event_turn_started(Team::Player, 5),
    ];
    exec_and_check(&mut battle, command::EndTurn, &expected);
    let hero = battle.get_entity(HERO).unwrap();
    assert_eq!(hero.stats().attack(), 40);
    assert_eq!(hero.base_stat(StatKind::Attack), None);
    assert!(hero.effects().is_empty());
}

#[test]
fn stacked_damage_over_time_hits_harder() {
    let burn = EffectDefinition {
        stackable: true,
        ..effect_burn()
    };
    let ignite = ability(
        "ignite",
        TargetingMode::Enemy,
        5,
        vec![ability::InflictStatus {
            effect: EffectId::new("burn"),
            duration: None,
            targets: TargetFilter::Enemies,
        }
        .into()],
    );
    let mut battle = battle_with(
        Mode::Tutorial,
        catalog(vec![burn]),
        vec![hero(pos(1, 1)).with_ability(ignite), enemy(GRUNT, pos(1, 4))],
    );
    let command = || command_use(HERO, "ignite", Target::Entity(GRUNT));
    let expected = [
        event_ability_used(HERO, "ignite", 0),
        event_effect_applied(GRUNT, "burn", 1),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command(), &expected);
    let expected = [
        event_turn_ended(Team::Player, 1),
        event_turn_started(Team::Enemy, 1),
        event_damaged(GRUNT, 100, 95, 5),
        event_turn_ended(Team::Enemy, 1),
        event_turn_started(Team::Player, 2),
    ];
    exec_and_check(&mut battle, command::EndTurn, &expected);
    let expected = [
        event_ability_used(HERO, "ignite", 0),
        event_effect_applied(GRUNT, "burn", 2),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command(), &expected);
    let expected = [
        event_turn_ended(Team::Player, 2),
        event_turn_started(Team::Enemy, 2),
        event_damaged(GRUNT, 95, 85, 10),
        event_turn_ended(Team::Enemy, 2),
        event_turn_started(Team::Player, 3),
    ];
    exec_and_check(&mut battle, command::EndTurn, &expected);
}

#[test]
fn damage_over_time_ticks_and_expires() {
    let ignite = ability(
        "ignite",
        TargetingMode::Enemy,
        5,
        vec![ability::InflictStatus {
            effect: EffectId::new("burn"),
            duration: None,
            targets: TargetFilter::Enemies,
        }
        .into()],
    );
    let mut battle = battle_with(
        Mode::Tutorial,
        catalog(vec![effect_burn()]),
        vec![
            hero(pos(1, 1)).with_ability(ignite),
            enemy(GRUNT, pos(1, 4)),
        ],
    );
    exec(
        &mut battle,
        command_use(HERO, "ignite", Target::Entity(GRUNT)),
    );
    let expected = [
        event_turn_ended(Team::Player, 1),
        event_turn_started(Team::Enemy, 1),
        event_damaged(GRUNT, 100, 95, 5),
        event_turn_ended(Team::Enemy, 1),
        event_turn_started(Team::Player, 2),
    ];
    exec_and_check(&mut battle, command::EndTurn, &expected);
    let expected = [
        event_turn_ended(Team::Player, 2),
        event_turn_started(Team::Enemy, 2),
        event_damaged(GRUNT, 95, 90, 5),
        event_turn_ended(Team::Enemy, 2),
        event_effect_removed(GRUNT, "burn"),
        event_turn_started(Team::Player, 3),
    ];
    exec_and_check(&mut battle, command::EndTurn, &expected);
    assert!(battle.get_entity(GRUNT).unwrap().effects().is_empty());
}

#[test]
fn incoming_damage_is_reduced() {
    let guard = effect(
        "guard",
        Kind::Buff,
        3,
        vec![(
            Trigger::DamageTaken,
            vec![Action::ModifyIncomingDamage(IncomingDamage::ReducePercent(
                0.5,
            ))],
        )],
    );
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(ability_strike()),
        enemy(GRUNT, pos(1, 3)),
    ]);
    battle
        .combatant_mut(GRUNT)
        .unwrap()
        .effects
        .push(Instance::new(&guard, GRUNT));
    let expected = [
        event_ability_used(HERO, "strike", 30),
        event_damaged(GRUNT, 100, 85, 15),
        event_action_consumed(2),
    ];
    exec_and_check(
        &mut battle,
        command_use(HERO, "strike", Target::Entity(GRUNT)),
        &expected,
    );
}

#[test]
fn deferred_move_grants_a_bonus_move() {
    let leap = ability(
        "leap",
        TargetingMode::SelfOnly,
        0,
        vec![ability::Movement::Deferred { range: Distance(2) }.into()],
    );
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(leap),
        enemy(GRUNT, pos(7, 7)),
    ]);
    let expected = [
        event_ability_used(HERO, "leap", 0),
        event::BonusMoveGranted {
            id: HERO,
            range: Distance(2),
        }
        .into(),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command_use(HERO, "leap", Target::None), &expected);
    exec(&mut battle, command_move(HERO, pos(1, 4)));
    assert_eq!(battle.actions_remaining(), 1);
    assert_eq!(
        try_exec(&mut battle, command_move(HERO, pos(4, 4))),
        Err(Error::RouteExceedsBudget)
    );
    let expected = [event::Moved {
        id: HERO,
        from: pos(1, 4),
        to: pos(1, 6),
        path: vec![pos(1, 5), pos(1, 6)],
        kind: MoveKind::Bonus,
    }
    .into()];
    exec_and_check(&mut battle, command_move(HERO, pos(1, 6)), &expected);
    assert_eq!(battle.actions_remaining(), 1);
    assert_eq!(
        try_exec(&mut battle, command_move(HERO, pos(1, 7))),
        Err(Error::AlreadyMoved)
    );
}

#[test]
fn bonus_move_outlasts_the_last_action() {
    let leap = ability(
        "leap",
        TargetingMode::SelfOnly,
        0,
        vec![ability::Movement::Deferred { range: Distance(2) }.into()],
    );
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(leap),
        enemy(GRUNT, pos(7, 7)),
    ]);
    battle.set_actions_remaining(1);
    let expected = [
        event_ability_used(HERO, "leap", 0),
        event::BonusMoveGranted {
            id: HERO,
            range: Distance(2),
        }
        .into(),
        event_action_consumed(0),
    ];
    exec_and_check(&mut battle, command_use(HERO, "leap", Target::None), &expected);
    assert_eq!(battle.turn(), 1);
    assert_eq!(battle.active_team(), Team::Player);
    assert_eq!(
        try_exec(&mut battle, command::ConsumeAction),
        Err(Error::NoActionsRemaining)
    );
    let mut expected = vec![event::Moved {
        id: HERO,
        from: pos(1, 1),
        to: pos(1, 3),
        path: vec![pos(1, 2), pos(1, 3)],
        kind: MoveKind::Bonus,
    }
    .into()];
    expected.extend(events_enemy_turn(1));
    exec_and_check(&mut battle, command_move(HERO, pos(1, 3)), &expected);
    assert_eq!(battle.actions_remaining(), 3);
    assert_eq!(battle.get_entity(HERO).unwrap().bonus_move(), None);

    // Ending the turn by hand forfeits a bonus move that wasn't taken.
    battle.set_actions_remaining(1);
    exec(&mut battle, command_use(HERO, "leap", Target::None));
    assert_eq!(battle.turn(), 2);
    exec_and_check(&mut battle, command::EndTurn, &events_enemy_turn(2));
    let hero = battle.get_entity(HERO).unwrap();
    assert_eq!(hero.bonus_move(), None);
    assert_eq!(hero.position(), pos(1, 3));
}

#[test]
fn teleport_to_a_free_cell() {
    let blink = ability(
        "blink",
        TargetingMode::Position,
        4,
        vec![ability::Movement::Teleport.into()],
    );
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(blink),
        enemy(GRUNT, pos(7, 7)),
    ]);
    battle.add_obstacle(pos(3, 1));
    assert_eq!(
        try_exec(
            &mut battle,
            command_use(HERO, "blink", Target::Position(pos(3, 1)))
        ),
        Err(Error::InvalidTarget)
    );
    let expected = [
        event_ability_used(HERO, "blink", 0),
        event::Moved {
            id: HERO,
            from: pos(1, 1),
            to: pos(1, 4),
            path: vec![pos(1, 4)],
            kind: MoveKind::Teleport,
        }
        .into(),
        event_action_consumed(2),
    ];
    exec_and_check(
        &mut battle,
        command_use(HERO, "blink", Target::Position(pos(1, 4))),
        &expected,
    );
    assert_eq!(battle.get_entity(HERO).unwrap().position(), pos(1, 4));
}

#[test]
fn line_slide_stops_before_a_blocked_cell() {
    let slide = ability(
        "slide",
        TargetingMode::Line,
        4,
        vec![ability::Movement::LineSlide { length: None }.into()],
    );
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(slide),
        enemy(GRUNT, pos(7, 7)),
    ]);
    battle.add_obstacle(pos(4, 1));
    let expected = [
        event_ability_used(HERO, "slide", 0),
        event::Moved {
            id: HERO,
            from: pos(1, 1),
            to: pos(3, 1),
            path: vec![pos(2, 1), pos(3, 1)],
            kind: MoveKind::Slide,
        }
        .into(),
        event_action_consumed(2),
    ];
    exec_and_check(
        &mut battle,
        command_use(HERO, "slide", Target::Position(pos(2, 1))),
        &expected,
    );
}

#[test]
fn buff_descriptor_is_a_timed_effect() {
    let harden = ability(
        "harden",
        TargetingMode::SelfOnly,
        0,
        vec![ability::Buff {
            name: None,
            modifiers: vec![ability::StatModifier {
                stat: StatKind::Defense,
                operation: Operation::Add,
                value: 10.0,
            }],
            duration: 1,
            area_radius: None,
            targets: TargetFilter::Caster,
        }
        .into()],
    );
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(harden),
        enemy(GRUNT, pos(7, 7)),
    ]);
    let expected = [
        event_ability_used(HERO, "harden", 0),
        event_effect_applied(HERO, "buff:harden", 1),
        event_stat_changed(HERO, StatKind::Defense, 20, 30),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command_use(HERO, "harden", Target::None), &expected);
    let buff = EffectId::new("buff:harden");
    assert_eq!(
        battle.get_entity(HERO).unwrap().effect(&buff).unwrap().kind,
        Kind::Buff
    );
    exec_and_check(&mut battle, command::EndTurn, &events_enemy_turn(1));
    let expected = [
        event_turn_ended(Team::Player, 2),
        event_stat_changed(HERO, StatKind::Defense, 30, 20),
        event_effect_removed(HERO, "buff:harden"),
        event_turn_started(Team::Enemy, 2),
        event_turn_ended(Team::Enemy, 2),
        event_turn_started(Team::Player, 3),
    ];
    exec_and_check(&mut battle, command::EndTurn, &expected);
}

#[test]
fn resource_recovery_refills_the_caster() {
    let meditate = ability(
        "meditate",
        TargetingMode::SelfOnly,
        0,
        vec![ability::ResourceRecovery {
            power: 30,
            energy: 20,
            targets: TargetFilter::Caster,
        }
        .into()],
    );
    let tired = Stats::new(100, 100, 100, 50, 40, 20, 5).unwrap();
    let mut battle = battle(vec![
        Combatant::new(HERO, "hero", Team::Player, pos(1, 1), tired)
            .with_energy(50)
            .with_ability(meditate),
        enemy(GRUNT, pos(7, 7)),
    ]);
    let expected = [
        event_ability_used(HERO, "meditate", 0),
        event::ResourceRecovered {
            id: HERO,
            power: 30,
            energy: 20,
        }
        .into(),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command_use(HERO, "meditate", Target::None), &expected);
    let hero = battle.get_entity(HERO).unwrap();
    assert_eq!(hero.stats().power(), 80);
    assert_eq!(hero.energy().current(), 20);
}

#[test]
fn area_damage_hits_enemies_around_the_cell() {
    let quake = ability(
        "quake",
        TargetingMode::Area,
        4,
        vec![ability::Damage {
            multiplier: 1.0,
            area_radius: Some(Distance(1)),
            targets: TargetFilter::Enemies,
        }
        .into()],
    );
    let mage = Combatant::new(MAGE, "mage", Team::Player, pos(3, 3), stats_basic());
    let mut battle = battle(vec![
        hero(pos(2, 2)).with_ability(quake),
        mage,
        enemy(GRUNT, pos(4, 3)),
        enemy(BRUTE, pos(4, 4)),
        enemy(BOSS, pos(5, 4)),
    ]);
    let expected = [
        event_ability_used(HERO, "quake", 0),
        event_damaged(GRUNT, 100, 70, 30),
        event_damaged(BRUTE, 100, 70, 30),
        event_action_consumed(2),
    ];
    exec_and_check(
        &mut battle,
        command_use(HERO, "quake", Target::Position(pos(4, 3))),
        &expected,
    );
    assert_eq!(battle.get_entity(BOSS).unwrap().stats().health(), 100);
    assert_eq!(battle.get_entity(MAGE).unwrap().stats().health(), 100);
}

#[test]
fn line_damage_hits_enemies_along_the_ray() {
    let lance = ability(
        "lance",
        TargetingMode::Line,
        4,
        vec![ability::Damage {
            multiplier: 1.0,
            area_radius: None,
            targets: TargetFilter::Enemies,
        }
        .into()],
    );
    let mage = Combatant::new(MAGE, "mage", Team::Player, pos(2, 1), stats_basic());
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(lance),
        mage,
        enemy(GRUNT, pos(3, 1)),
        enemy(BRUTE, pos(5, 1)),
        enemy(BOSS, pos(6, 1)),
    ]);
    let expected = [
        event_ability_used(HERO, "lance", 0),
        event_damaged(GRUNT, 100, 70, 30),
        event_damaged(BRUTE, 100, 70, 30),
        event_action_consumed(2),
    ];
    exec_and_check(
        &mut battle,
        command_use(HERO, "lance", Target::Position(pos(4, 1))),
        &expected,
    );
    assert_eq!(battle.get_entity(BOSS).unwrap().stats().health(), 100);
    assert_eq!(battle.get_entity(MAGE).unwrap().stats().health(), 100);
}

#[test]
fn scripted_effects() {
    let improved_dash = effect(
        "improved_dash",
        Kind::Buff,
        999,
        vec![(
            Trigger::TurnStart,
            vec![Action::Scripted(Script::GrantBonusMove {
                range: Distance(3),
            })],
        )],
    );
    let recharge = effect(
        "recharge",
        Kind::Buff,
        0,
        vec![(Trigger::Apply, vec![Action::Scripted(Script::RefillEnergy)])],
    );
    let mut battle = battle_with(
        Mode::Tutorial,
        catalog(vec![recharge]),
        vec![
            hero(pos(1, 1))
                .with_energy(50)
                .with_ability(ability_apply_to_self("charge", "recharge")),
            enemy(GRUNT, pos(7, 7)),
        ],
    );
    battle
        .combatant_mut(HERO)
        .unwrap()
        .effects
        .push(Instance::new(&improved_dash, HERO));
    let expected = [
        event_ability_used(HERO, "charge", 0),
        event_effect_applied(HERO, "recharge", 1),
        event::ResourceRecovered {
            id: HERO,
            power: 0,
            energy: 50,
        }
        .into(),
        event_action_consumed(2),
    ];
    exec_and_check(&mut battle, command_use(HERO, "charge", Target::None), &expected);
    assert_eq!(battle.get_entity(HERO).unwrap().energy().current(), 50);
    let expected = [
        event_turn_ended(Team::Player, 1),
        event_effect_removed(HERO, "recharge"),
        event_turn_started(Team::Enemy, 1),
        event_turn_ended(Team::Enemy, 1),
        event_turn_started(Team::Player, 2),
        event::BonusMoveGranted {
            id: HERO,
            range: Distance(3),
        }
        .into(),
    ];
    exec_and_check(&mut battle, command::EndTurn, &expected);
    assert_eq!(
        battle.get_entity(HERO).unwrap().bonus_move(),
        Some(Distance(3))
    );
}

#[test]
fn cleanse_removes_debuffs() {
    let purify = ability(
        "purify",
        TargetingMode::Ally,
        3,
        vec![ability::Cleanse {
            kind: Kind::Debuff,
            targets: TargetFilter::Allies,
        }
        .into()],
    );
    let mage = Combatant::new(MAGE, "mage", Team::Player, pos(1, 2), stats_basic());
    let mut battle = battle(vec![
        hero(pos(1, 1)).with_ability(purify),
        mage,
        enemy(GRUNT, pos(7, 7)),
    ]);
    battle
        .combatant_mut(MAGE)
        .unwrap()
        .effects
        .push(Instance::new(&effect_burn(), GRUNT));
    let expected = [
        event_ability_used(HERO, "purify", 0),
        event_effect_removed(MAGE, "burn"),
        event_action_consumed(2),
    ];
    exec_and_check(
        &mut battle,
        command_use(HERO, "purify", Target::Entity(MAGE)),
        &expected,
    );
    assert_eq!(
        try_exec(
            &mut battle,
            command_use(HERO, "purify", Target::Entity(MAGE))
        ),
        Err(AbilityUnavailable::AlreadyUsed.into())
    );
}

#[test]
fn clearing_the_wave_completes_the_battle_once() {
    let weak = Stats::new(100, 10, 0, 0, 10, 20, 5).unwrap();
    let mut battle = battle_with(
        Mode::Arcade,
        Catalog::default(),
        vec![
            hero(pos(1, 1)).with_ability(ability_strike()),
            Combatant::new(GRUNT, "grunt", Team::Enemy, pos(1, 3), weak),
        ],
    );
    let result = BattleResult {
        winner: Team::Player,
        survivors: vec![HERO],
    };
    let expected = [
        event_ability_used(HERO, "strike", 30),
        event_damaged(GRUNT, 10, 0, 30),
        event::Died { id: GRUNT }.into(),
        event_action_consumed(2),
        event::WaveCleared { wave: 1 }.into(),
        event::BattleEnded {
            result: result.clone(),
        }
        .into(),
    ];
    exec_and_check(
        &mut battle,
        command_use(HERO, "strike", Target::Entity(GRUNT)),
        &expected,
    );
    assert!(battle.is_completed());
    assert_eq!(battle.result(), Some(&result));
    assert_eq!(battle.wave(), 2);
    for _ in 0..2 {
        assert_eq!(
            try_exec(&mut battle, command::EndTurn),
            Err(Error::BattleEnded)
        );
        assert!(battle.is_completed());
        assert_eq!(battle.wave(), 2);
    }
}

#[test]
fn losing_every_player_combatant_is_a_defeat() {
    let frail = Stats::new(100, 1, 100, 100, 40, 20, 5).unwrap();
    let mut battle = battle(vec![
        Combatant::new(HERO, "hero", Team::Player, pos(1, 1), frail),
        enemy(GRUNT, pos(6, 6)),
    ]);
    battle
        .combatant_mut(HERO)
        .unwrap()
        .effects
        .push(Instance::new(&effect_burn(), GRUNT));
    let result = BattleResult {
        winner: Team::Enemy,
        survivors: vec![GRUNT],
    };
    let mut expected = events_enemy_turn(1);
    expected.extend(vec![
        event_damaged(HERO, 1, 0, 5),
        event::Died { id: HERO }.into(),
        event::BattleEnded { result }.into(),
    ]);
    exec_and_check(&mut battle, command::EndTurn, &expected);
    assert!(battle.is_completed());
    assert_eq!(battle.wave(), 1);
}

#[test]
fn events_are_queued_and_flushed() {
    let mut battle = battle(vec![hero(pos(1, 1)), enemy(GRUNT, pos(6, 6))]);
    let mut events = exec(&mut battle, command::ConsumeAction);
    events.extend(exec(&mut battle, command_move(HERO, pos(2, 1))));
    assert_eq!(battle.pending_events(), events.as_slice());
    let mut sink = CollectingSink::new();
    battle.flush_events(&mut sink);
    assert_eq!(sink.events(), events.as_slice());
    assert!(battle.pending_events().is_empty());
    battle.flush_events(&mut sink);
    assert_eq!(sink.events().len(), events.len());
    let _ = try_exec(&mut battle, command_move(HERO, pos(3, 1)));
    assert!(battle.pending_events().is_empty());
}

#[test]
fn catalog_characters_fight() {
    let catalog = Catalog::from_ron_str(include_str!("../../data/catalog.ron")).unwrap();
    let ricchard = catalog
        .spawn("Ricchard", HERO, Team::Player, pos(0, 0))
        .unwrap();
    let red_thunder = catalog
        .spawn("RedThunder", GRUNT, Team::Enemy, pos(2, 0))
        .unwrap();
    let mut battle = battle_with(Mode::Arcade, catalog, vec![ricchard, red_thunder]);
    assert_eq!(
        try_exec(
            &mut battle,
            command_use(HERO, "rayo_vacio", Target::Position(pos(4, 0)))
        ),
        Err(AbilityUnavailable::NotEnoughEnergy.into())
    );
    exec(
        &mut battle,
        command_use(HERO, "corte_fugaz", Target::Chain(vec![GRUNT])),
    );
    let ricchard = battle.get_entity(HERO).unwrap();
    assert_eq!(ricchard.position(), pos(3, 0));
    assert_eq!(ricchard.stats().power(), 90);
    assert_eq!(ricchard.energy().current(), 22);
    let red_thunder = battle.get_entity(GRUNT).unwrap();
    assert_eq!(red_thunder.stats().health(), 55);
    assert_eq!(red_thunder.energy().current(), 3);
}
