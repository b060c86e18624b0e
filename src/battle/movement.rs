use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
    iter,
};

use log::trace;

use crate::{
    battle::{component::Combatant, state::Battle, Id},
    map::{dirs, Dir, Distance, Position},
    utils,
};

/// Which occupants block a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Obstacles and living allies block; enemies can be walked onto.
    Preview,
    /// Obstacles and every other living combatant block.
    Commit,
}

pub fn is_blocked(battle: &Battle, mover: &Combatant, pos: Position, policy: Policy) -> bool {
    if !battle.position_valid(pos) || battle.is_obstacle(pos) {
        return true;
    }
    match battle.entity_at(pos) {
        Some(other) if other.id() != mover.id() => match policy {
            Policy::Commit => true,
            Policy::Preview => other.team() == mover.team(),
        },
        _ => false,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Tile {
    cost: u32,
    parent_dir: Option<Dir>,
}

impl Tile {
    pub fn parent(self) -> Option<Dir> {
        self.parent_dir
    }

    pub fn cost(self) -> u32 {
        self.cost
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Node {
    estimate: u32,
    pos: Position,
}

// Reversed so that `BinaryHeap` pops the lowest estimate first.
impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn heuristic(from: Position, to: Position) -> u32 {
    from.distance(to).0 as u32
}

/// A* over the four-connected grid with a uniform step cost.
#[derive(Clone, Debug)]
pub struct Pathfinder {
    policy: Policy,
    queue: BinaryHeap<Node>,
    tiles: HashMap<Position, Tile>,
}

impl Pathfinder {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            queue: BinaryHeap::new(),
            tiles: HashMap::new(),
        }
    }

    pub fn tile(&self, pos: Position) -> Option<Tile> {
        self.tiles.get(&pos).copied()
    }

    fn clean(&mut self) {
        self.queue.clear();
        self.tiles.clear();
    }

    /// Cells from `from` (exclusive) to `to` (inclusive).
    pub fn path(
        &mut self,
        battle: &Battle,
        mover: &Combatant,
        from: Position,
        to: Position,
    ) -> Option<Vec<Position>> {
        self.clean();
        if is_blocked(battle, mover, to, self.policy) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }
        self.tiles.insert(
            from,
            Tile {
                cost: 0,
                parent_dir: None,
            },
        );
        self.queue.push(Node {
            estimate: heuristic(from, to),
            pos: from,
        });
        while let Some(Node { estimate, pos }) = self.queue.pop() {
            if pos == to {
                return self.reconstruct(from, to);
            }
            let cost = self.tiles[&pos].cost;
            if estimate > cost + heuristic(pos, to) {
                // a cheaper entry for this cell was already processed
                continue;
            }
            self.try_to_push_neighbors(battle, mover, pos, to);
        }
        None
    }

    fn try_to_push_neighbors(
        &mut self,
        battle: &Battle,
        mover: &Combatant,
        pos: Position,
        to: Position,
    ) {
        let new_cost = self.tiles[&pos].cost + 1;
        for dir in dirs() {
            let neighbor_pos = Dir::get_neighbor_pos(pos, dir);
            if is_blocked(battle, mover, neighbor_pos, self.policy) {
                continue;
            }
            let is_better = self
                .tiles
                .get(&neighbor_pos)
                .map_or(true, |tile| new_cost < tile.cost);
            if !is_better {
                continue;
            }
            trace!("pathfinder: {} -> {} costs {}", pos, neighbor_pos, new_cost);
            self.tiles.insert(
                neighbor_pos,
                Tile {
                    cost: new_cost,
                    parent_dir: Some(dir.opposite()),
                },
            );
            self.queue.push(Node {
                estimate: new_cost + heuristic(neighbor_pos, to),
                pos: neighbor_pos,
            });
        }
    }

    fn reconstruct(&self, from: Position, to: Position) -> Option<Vec<Position>> {
        let mut path = Vec::new();
        let mut pos = to;
        while pos != from {
            path.push(pos);
            let dir = self.tile(pos)?.parent()?;
            pos = Dir::get_neighbor_pos(pos, dir);
        }
        path.reverse();
        Some(path)
    }
}

pub fn find_path(
    battle: &Battle,
    mover_id: Id,
    from: Position,
    to: Position,
    policy: Policy,
) -> Option<Vec<Position>> {
    let mover = battle.get_entity(mover_id)?;
    Pathfinder::new(policy).path(battle, mover, from, to)
}

/// A previewed movement. Recomputed on demand, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    tiles: Vec<Position>,
    dash_candidates: Vec<Id>,
    is_valid: bool,
}

impl Route {
    pub fn invalid() -> Self {
        Self {
            tiles: Vec::new(),
            dash_candidates: Vec::new(),
            is_valid: false,
        }
    }

    /// Cells of the route, the origin excluded.
    pub fn tiles(&self) -> &[Position] {
        &self.tiles
    }

    pub fn destination(&self) -> Option<Position> {
        self.tiles.last().copied()
    }

    pub fn dash_candidates(&self) -> &[Id] {
        &self.dash_candidates
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn total_distance(&self) -> Distance {
        Distance(self.tiles.len() as i32)
    }
}

/// Chains the waypoints into one preview route.
///
/// The first waypoint is the origin. Any unreachable leg makes the
/// whole route invalid.
pub fn compose_route(battle: &Battle, mover_id: Id, waypoints: &[Position]) -> Route {
    let mover = match battle.get_entity(mover_id) {
        Some(mover) => mover,
        None => return Route::invalid(),
    };
    let mut pathfinder = Pathfinder::new(Policy::Preview);
    let mut tiles = Vec::new();
    for leg in waypoints.windows(2) {
        match pathfinder.path(battle, mover, leg[0], leg[1]) {
            Some(segment) => tiles.extend(segment),
            None => return Route::invalid(),
        }
    }
    if tiles.is_empty() {
        return Route::invalid();
    }
    let dash_candidates = scan_dash_candidates(battle, mover, &tiles);
    Route {
        tiles,
        dash_candidates,
        is_valid: true,
    }
}

/// Living opponents orthogonally next to any cell of the path, in the
/// order they are first met.
pub fn scan_dash_candidates(battle: &Battle, mover: &Combatant, tiles: &[Position]) -> Vec<Id> {
    let mut candidates = Vec::new();
    for &tile in tiles {
        for neighbor in tile.neighbors() {
            if let Some(other) = battle.entity_at(neighbor) {
                if other.is_opponent_of(mover) {
                    utils::push_unique(&mut candidates, other.id());
                }
            }
        }
    }
    candidates
}

/// `pos` is orthogonally next to the origin or to some cell of the path.
pub fn is_along_route(origin: Position, tiles: &[Position], pos: Position) -> bool {
    iter::once(origin)
        .chain(tiles.iter().copied())
        .any(|cell| cell.neighbors().any(|neighbor| neighbor == pos))
}

/// Automatic candidates in path order, then the anchored ones, minus
/// anything already dashed this move.
pub fn resolve_dash_targets(
    battle: &Battle,
    mover: &Combatant,
    tiles: &[Position],
    anchored: &[Id],
) -> Vec<Id> {
    let mut targets = scan_dash_candidates(battle, mover, tiles);
    for &id in anchored {
        utils::push_unique(&mut targets, id);
    }
    targets.retain(|id| !mover.dash_targets().contains(id));
    targets
}
