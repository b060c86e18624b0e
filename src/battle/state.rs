use crate::{
    battle::{
        check::Error,
        command::{self, Command},
        component::Combatant,
        event::Event,
        execute,
        movement::{self, Route},
        targeting::Target,
        AbilityId, Id, Team,
    },
    map::Position,
    sink::EventSink,
};

pub use self::private::{Battle, BattleResult};

mod private;

/// Pure reads.
impl Battle {
    pub fn entities_by_team(&self, team: Team) -> Vec<&Combatant> {
        self.entities().filter(|c| c.team() == team).collect()
    }

    pub fn alive_entities_by_team(&self, team: Team) -> Vec<&Combatant> {
        self.entities()
            .filter(|c| c.team() == team && c.is_alive())
            .collect()
    }

    pub fn alive_ids(&self, team: Team) -> Vec<Id> {
        self.alive_entities_by_team(team)
            .into_iter()
            .map(Combatant::id)
            .collect()
    }

    pub fn position_valid(&self, pos: Position) -> bool {
        self.grid().contains(pos)
    }

    /// Holds an obstacle or a living combatant.
    pub fn position_occupied(&self, pos: Position) -> bool {
        self.is_obstacle(pos) || self.entity_at(pos).is_some()
    }

    /// The living combatant standing on `pos`.
    pub fn entity_at(&self, pos: Position) -> Option<&Combatant> {
        self.entities()
            .find(|c| c.is_alive() && c.position() == pos)
    }

    /// Valid, not an obstacle, and no living combatant but `ignored` on it.
    pub fn is_cell_free_for(&self, pos: Position, ignored: Id) -> bool {
        if !self.position_valid(pos) || self.is_obstacle(pos) {
            return false;
        }
        match self.entity_at(pos) {
            Some(other) => other.id() == ignored,
            None => true,
        }
    }

    pub fn hit_probability(&self, attacker_id: Id, target_id: Id) -> Option<f32> {
        let attacker = self.get_entity(attacker_id)?;
        let target = self.get_entity(target_id)?;
        Some(
            self.cover()
                .hit_probability(attacker.position(), target.position()),
        )
    }

    /// Previews a route through `waypoints` for the given combatant.
    ///
    /// The combatant's own cell is the implicit start.
    pub fn preview_route(&self, id: Id, waypoints: &[Position]) -> Route {
        let start = match self.get_entity(id) {
            Some(combatant) => combatant.position(),
            None => return Route::invalid(),
        };
        let mut all = Vec::with_capacity(waypoints.len() + 1);
        all.push(start);
        all.extend_from_slice(waypoints);
        movement::compose_route(self, id, &all)
    }
}

/// Commands.
impl Battle {
    pub fn consume_action(&mut self) -> Result<Vec<Event>, Error> {
        execute::execute(self, &command::ConsumeAction.into())
    }

    pub fn commit_movement(
        &mut self,
        id: Id,
        destination: Position,
        manual_dash_anchors: &[Position],
    ) -> Result<Vec<Event>, Error> {
        let command = command::CommitMovement {
            id,
            destination,
            anchors: manual_dash_anchors.to_vec(),
        };
        execute::execute(self, &command.into())
    }

    pub fn use_ability(
        &mut self,
        id: Id,
        ability: &AbilityId,
        target: Target,
    ) -> Result<Vec<Event>, Error> {
        let command = command::UseAbility {
            id,
            ability: ability.clone(),
            target,
        };
        execute::execute(self, &command.into())
    }

    pub fn end_active_team_turn(&mut self) -> Result<Vec<Event>, Error> {
        execute::execute(self, &command::EndTurn.into())
    }

    pub fn execute(&mut self, command: &Command) -> Result<Vec<Event>, Error> {
        execute::execute(self, command)
    }

    /// Drains the queued events into a sink.
    pub fn flush_events(&mut self, sink: &mut dyn EventSink) {
        let events = self.drain_pending_events();
        if !events.is_empty() {
            sink.publish(events);
        }
    }
}
