use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(transparent)]
pub struct Distance(pub i32);

/// A cell of the square grid.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance.
    pub fn distance(self, other: Position) -> Distance {
        Distance((self.x - other.x).abs() + (self.y - other.y).abs())
    }

    /// Both axis deltas are at most one and the cells differ.
    pub fn is_adjacent(self, other: Position) -> bool {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        dx <= 1 && dy <= 1 && self != other
    }

    pub fn step(self, dir: Dir) -> Position {
        Dir::get_neighbor_pos(self, dir)
    }

    /// The four orthogonal neighbors in `dirs()` order.
    pub fn neighbors(self) -> impl Iterator<Item = Position> {
        dirs().map(move |dir| self.step(dir))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSize {
    pub width: i32,
    pub height: i32,
}

impl GridSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    pub fn iter(self) -> impl Iterator<Item = Position> {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }
}

impl Default for GridSize {
    fn default() -> Self {
        GridSize::new(8, 8)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dir {
    East,
    West,
    South,
    North,
}

const DIR_TO_POS_DIFF: [[i32; 2]; 4] = [[1, 0], [-1, 0], [0, 1], [0, -1]];

impl Dir {
    pub fn from_int(n: i32) -> Self {
        assert!((0..4).contains(&n));
        let dirs = [Dir::East, Dir::West, Dir::South, Dir::North];
        dirs[n as usize]
    }

    pub fn to_int(self) -> i32 {
        match self {
            Dir::East => 0,
            Dir::West => 1,
            Dir::South => 2,
            Dir::North => 3,
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::East => Dir::West,
            Dir::West => Dir::East,
            Dir::South => Dir::North,
            Dir::North => Dir::South,
        }
    }

    pub fn get_neighbor_pos(pos: Position, dir: Dir) -> Position {
        let diff = DIR_TO_POS_DIFF[dir.to_int() as usize];
        Position::new(pos.x + diff[0], pos.y + diff[1])
    }

    /// Direction of the dominant axis from `from` towards `to`.
    ///
    /// Ties between the axes resolve to the vertical one.
    pub fn dominant(from: Position, to: Position) -> Option<Dir> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx == 0 && dy == 0 {
            None
        } else if dx.abs() > dy.abs() {
            Some(if dx > 0 { Dir::East } else { Dir::West })
        } else {
            Some(if dy > 0 { Dir::South } else { Dir::North })
        }
    }
}

#[derive(Clone, Debug)]
pub struct DirIter {
    index: i32,
}

pub fn dirs() -> DirIter {
    DirIter { index: 0 }
}

impl Iterator for DirIter {
    type Item = Dir;

    fn next(&mut self) -> Option<Self::Item> {
        let max = DIR_TO_POS_DIFF.len() as i32;
        let next_dir = if self.index >= max {
            None
        } else {
            Some(Dir::from_int(self.index))
        };
        self.index += 1;
        next_dir
    }
}

/// Cells strictly between two endpoints, traced with Bresenham's algorithm.
///
/// Straight and exact diagonal lines yield exactly the cells a ruler
/// would cross.
pub fn line_between(from: Position, to: Position) -> Vec<Position> {
    let mut cells = Vec::new();
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = (to.x - from.x).signum();
    let sy = (to.y - from.y).signum();
    let mut err = dx + dy;
    let mut current = from;
    while current != to {
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            current.x += sx;
        }
        if e2 <= dx {
            err += dx;
            current.y += sy;
        }
        if current != to {
            cells.push(current);
        }
    }
    cells
}

/// All grid cells within `radius` (Manhattan) of `center`.
pub fn cells_within(grid: GridSize, center: Position, radius: Distance) -> Vec<Position> {
    grid.iter()
        .filter(|&pos| pos.distance(center) <= radius)
        .collect()
}
