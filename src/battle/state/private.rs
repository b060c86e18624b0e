use std::{collections::BTreeSet, mem, sync::Arc};

use log::debug;
use memstore::Store;
use rand::{rngs::SmallRng, SeedableRng};

use crate::{
    battle::{
        component::Combatant,
        cover::{CoverLevel, CoverMap},
        event::Event,
        BattleId, Id, Mode, Team,
    },
    config::{Catalog, Definitions, Rules},
    map::{GridSize, Position},
};

#[derive(Clone, Debug, PartialEq)]
pub struct BattleResult {
    pub winner: Team,
    pub survivors: Vec<Id>,
}

#[derive(Clone, Debug)]
pub struct Battle {
    id: BattleId,
    mode: Mode,
    grid: GridSize,
    rules: Rules,
    definitions: Arc<dyn Definitions>,
    combatants: Store<Id, Combatant>,
    obstacles: BTreeSet<Position>,
    cover: CoverMap,
    active_team: Team,
    turn: u32,
    actions_remaining: u32,
    wave: u32,
    result: Option<BattleResult>,
    pending_events: Vec<Event>,
    rng: SmallRng,
}

impl Battle {
    pub fn new(id: BattleId, mode: Mode, grid: GridSize) -> Self {
        Self::with_definitions(id, mode, grid, Arc::new(Catalog::default()))
    }

    pub fn with_definitions(
        id: BattleId,
        mode: Mode,
        grid: GridSize,
        definitions: Arc<dyn Definitions>,
    ) -> Self {
        let rules = Rules::default();
        Self {
            id,
            mode,
            grid,
            actions_remaining: rules.actions_per_turn,
            rules,
            definitions,
            combatants: Store::new(),
            obstacles: BTreeSet::new(),
            cover: CoverMap::new(),
            active_team: Team::Player,
            turn: 1,
            wave: 1,
            result: None,
            pending_events: Vec::new(),
            rng: SmallRng::seed_from_u64(id.0),
        }
    }

    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.actions_remaining = rules.actions_per_turn;
        self.rules = rules;
        self
    }

    /// Reseeds the generator used for hit rolls.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Inserts the combatant, replacing any with the same id.
    pub fn add_entity(&mut self, combatant: Combatant) {
        debug!(
            "Battle {:?}: add {} ({:?}) at {}",
            self.id, combatant.name, combatant.id, combatant.position
        );
        self.combatants.save(combatant.id, combatant);
    }

    pub fn add_obstacle(&mut self, pos: Position) {
        self.obstacles.insert(pos);
    }

    /// Cover structures are physical and block movement too.
    pub fn add_cover(&mut self, pos: Position, level: CoverLevel) {
        self.cover.add(pos, level);
        self.obstacles.insert(pos);
    }

    pub fn remove_cover(&mut self, pos: Position) -> Option<CoverLevel> {
        let level = self.cover.remove(pos)?;
        self.obstacles.remove(&pos);
        Some(level)
    }

    pub fn id(&self) -> BattleId {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn definitions(&self) -> &dyn Definitions {
        &*self.definitions
    }

    pub fn entities(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    pub fn get_entity(&self, id: Id) -> Option<&Combatant> {
        self.combatants.get_opt(id)
    }

    pub fn obstacles(&self) -> &BTreeSet<Position> {
        &self.obstacles
    }

    pub fn is_obstacle(&self, pos: Position) -> bool {
        self.obstacles.contains(&pos)
    }

    pub fn cover(&self) -> &CoverMap {
        &self.cover
    }

    pub fn active_team(&self) -> Team {
        self.active_team
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn actions_remaining(&self) -> u32 {
        self.actions_remaining
    }

    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&BattleResult> {
        self.result.as_ref()
    }

    pub fn pending_events(&self) -> &[Event] {
        &self.pending_events
    }

    pub fn drain_pending_events(&mut self) -> Vec<Event> {
        mem::take(&mut self.pending_events)
    }
}

/// Mutators. Be careful with them!
impl Battle {
    pub(in crate::battle) fn combatant_mut(&mut self, id: Id) -> Option<&mut Combatant> {
        self.combatants.get_opt_mut(id)
    }

    pub(in crate::battle) fn combatant_pair_mut(
        &mut self,
        a: Id,
        b: Id,
    ) -> Option<(&mut Combatant, &mut Combatant)> {
        self.combatants.pair_mut(a, b)
    }

    pub(in crate::battle) fn set_active_team(&mut self, team: Team) {
        self.active_team = team;
    }

    pub(in crate::battle) fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }

    pub(in crate::battle) fn set_actions_remaining(&mut self, actions: u32) {
        assert!(actions <= self.rules.actions_per_turn);
        self.actions_remaining = actions;
    }

    pub(in crate::battle) fn set_wave(&mut self, wave: u32) {
        self.wave = wave;
    }

    /// The first result sticks.
    pub(in crate::battle) fn set_result(&mut self, result: BattleResult) {
        if self.result.is_none() {
            self.result = Some(result);
        }
    }

    pub(in crate::battle) fn rng_mut(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    pub(in crate::battle) fn queue_events(&mut self, events: &[Event]) {
        self.pending_events.extend_from_slice(events);
    }
}
