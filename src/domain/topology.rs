/// Toroidal grid addressing.
///
/// The dungeon is a 10×10 torus: both axes wrap independently, so walking
/// off the east edge re-enters on the west edge and so on. There are no
/// walls and no out-of-bounds cells.
///
/// Axis convention:
///   - `x` = column 0..9 (shown as the digit in `A0`..`J9`)
///   - `y` = row 0..9    (shown as the letter A..J)
///   - North = y-1, South = y+1, East = x+1, West = x-1

use std::fmt;

pub const GRID_SIZE: usize = 10;

pub const ROW_LABELS: [char; GRID_SIZE] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J'];

/// Wrap any integer into `0..GRID_SIZE`.
#[inline]
pub fn wrap(v: i32) -> usize {
    let n = GRID_SIZE as i32;
    (((v % n) + n) % n) as usize
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Fixed scan order used by proximity checks and BFS.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit offset `(dx, dy)` for one step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East  => (1, 0),
            Direction::South => (0, 1),
            Direction::West  => (-1, 0),
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East  => Direction::West,
            Direction::South => Direction::North,
            Direction::West  => Direction::East,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East  => "east",
            Direction::South => "south",
            Direction::West  => "west",
        }
    }
}

/// A dungeon cell. Always in range; construct through `Cell::new`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    /// The player's start cell on every new game.
    pub const START: Cell = Cell { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Cell { x: wrap(x), y: wrap(y) }
    }

    /// Flat index `y * GRID_SIZE + x`, for visited/occupancy tables.
    #[inline]
    pub fn index(self) -> usize {
        self.y * GRID_SIZE + self.x
    }

    /// Every cell of the grid, row by row.
    pub fn all() -> impl Iterator<Item = Cell> {
        (0..GRID_SIZE * GRID_SIZE).map(|i| Cell { x: i % GRID_SIZE, y: i / GRID_SIZE })
    }

    /// The four neighbours in N, E, S, W order.
    pub fn neighbors(self) -> [Cell; 4] {
        Direction::ALL.map(|d| step(self, d))
    }
}

impl fmt::Display for Cell {
    /// `A0`..`J9`: row letter then column digit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ROW_LABELS[self.y], self.x)
    }
}

/// One step in `dir`, wrapping both axes.
#[inline]
pub fn step(from: Cell, dir: Direction) -> Cell {
    let (dx, dy) = dir.delta();
    Cell::new(from.x as i32 + dx, from.y as i32 + dy)
}

/// Is `target` the neighbour of `from` in direction `dir`?
#[inline]
pub fn is_adjacent(from: Cell, dir: Direction, target: Cell) -> bool {
    step(from, dir) == target
}

/// Is `target` any of the four neighbours of `from`?
#[cfg_attr(not(test), allow(dead_code))]
pub fn is_neighbor(from: Cell, target: Cell) -> bool {
    Direction::ALL.iter().any(|&d| is_adjacent(from, d, target))
}

/// Flight path of an arrow: `GRID_SIZE` successive steps from `from`.
///
/// The first element is the neighbour of `from`; since each axis has
/// period `GRID_SIZE`, the last element closes the loop on `from`. The
/// path therefore visits every cell of the row (or column) exactly once.
pub fn arrow_path(from: Cell, dir: Direction) -> [Cell; GRID_SIZE] {
    let mut path = [from; GRID_SIZE];
    let mut cur = from;
    for slot in path.iter_mut() {
        cur = step(cur, dir);
        *slot = cur;
    }
    path
}
