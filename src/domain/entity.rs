/// Entities: Player, Dragon, Arrow, Rope.
/// Pits and bats carry no state beyond their cell, so they live on the
/// world as plain `Vec<Cell>`.

use super::topology::{Cell, Direction};

#[derive(Clone, Debug)]
pub struct Player {
    pub pos: Cell,
    pub has_arrow: bool,
    pub has_rope: bool,
    /// Presentation only.
    pub facing: Direction,
}

impl Player {
    pub fn new() -> Self {
        Player {
            pos: Cell::START,
            has_arrow: false,
            has_rope: false,
            facing: Direction::North,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Dragon {
    pub pos: Cell,
    pub alive: bool,
}

impl Dragon {
    pub fn new(pos: Cell) -> Self {
        Dragon { pos, alive: true }
    }

    /// Is the live dragon sitting on `cell`?
    #[inline]
    pub fn is_at(&self, cell: Cell) -> bool {
        self.alive && self.pos == cell
    }
}

/// Arrow lifecycle: Unfound → Held → (shot) → Landed → Held → …
///
/// "collected" and "in flight" are two views of this single enum,
/// so they can never be true at the same time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArrowState {
    /// Lying where the generator put it.
    Unfound,
    /// Picked up (or retrieved) by the player.
    Held,
    /// Shot and missed; waiting on its landing cell.
    Landed,
}

#[derive(Clone, Debug)]
pub struct Arrow {
    pub pos: Cell,
    pub state: ArrowState,
}

impl Arrow {
    pub fn new(pos: Cell) -> Self {
        Arrow { pos, state: ArrowState::Unfound }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn collected(&self) -> bool {
        self.state == ArrowState::Held
    }

    pub fn in_flight(&self) -> bool {
        self.state == ArrowState::Landed
    }

    /// Can the player take the arrow by stepping onto `cell`?
    pub fn lies_at(&self, cell: Cell) -> bool {
        self.pos == cell && self.state != ArrowState::Held
    }

    /// The arrow misses and comes to rest on `cell`.
    pub fn land(&mut self, cell: Cell) {
        self.pos = cell;
        self.state = ArrowState::Landed;
    }
}

/// Single-use pit insurance. `collected` stays true after the rope is
/// spent so it can't be picked up twice.
#[derive(Clone, Debug)]
pub struct Rope {
    pub pos: Cell,
    pub collected: bool,
}

impl Rope {
    pub fn new(pos: Cell) -> Self {
        Rope { pos, collected: false }
    }

    pub fn lies_at(&self, cell: Cell) -> bool {
        !self.collected && self.pos == cell
    }
}
